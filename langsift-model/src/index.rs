use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use log::debug;
use strum::IntoEnumIterator;
use wyhash2::WyHash;

use crate::profile::{LanguageProfile, NgramOrder, ProfileError};

type MyHasher = BuildHasherDefault<WyHash>;

/// Immutable lookup from n-gram to a dense per-language probability vector.
///
/// Language positions are assigned in profile load order and are part of the
/// caller-visible contract: every vector returned by [`Self::probabilities`]
/// indexes by them. Once built, the index is never mutated and can be shared
/// freely across threads.
#[derive(Debug, Default)]
pub struct ProbabilityIndex {
    languages: Vec<String>,
    table: HashMap<String, Vec<f64>, MyHasher>,
}

impl ProbabilityIndex {
    /// Build the index from profiles; the iteration order fixes language
    /// positions for the lifetime of the index.
    pub fn build(
        profiles: impl IntoIterator<Item = LanguageProfile>,
    ) -> Result<Self, ProfileError> {
        let profiles: Vec<LanguageProfile> = profiles.into_iter().collect();
        let total = profiles.len();
        let mut index = ProbabilityIndex {
            languages: Vec::with_capacity(total),
            table: HashMap::default(),
        };
        for (pos, profile) in profiles.into_iter().enumerate() {
            index.insert_profile(profile, pos, total)?;
        }
        Ok(index)
    }

    fn insert_profile(
        &mut self,
        profile: LanguageProfile,
        pos: usize,
        total: usize,
    ) -> Result<(), ProfileError> {
        if self.languages.contains(&profile.name) {
            return Err(ProfileError::DuplicateLanguage(profile.name));
        }
        // a gram of an order whose total is zero would divide by zero below
        for order in NgramOrder::iter() {
            if profile.n_words[order as usize] == 0
                && profile.freq.keys().any(|g| g.chars().count() == order.chars())
            {
                return Err(ProfileError::EmptyOrder {
                    lang: profile.name,
                    order,
                });
            }
        }
        debug!(
            "indexing '{}' at position {pos} with {} grams",
            profile.name,
            profile.freq.len()
        );

        let n_words = profile.n_words;
        self.languages.push(profile.name);
        for (gram, count) in profile.freq {
            let Some(order) = NgramOrder::from_len(gram.chars().count()) else {
                continue;
            };
            let vector = self
                .table
                .entry(gram)
                .or_insert_with(|| vec![0.0; total]);
            vector[pos] = count as f64 / n_words[order as usize] as f64;
        }
        Ok(())
    }

    /// Language codes in load order; positions match probability vectors.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Per-language probabilities of a gram, `None` when it was never seen.
    pub fn probabilities(&self, gram: &str) -> Option<&[f64]> {
        self.table.get(gram).map(Vec::as_slice)
    }

    pub fn contains(&self, gram: &str) -> bool {
        self.table.contains_key(gram)
    }

    /// Number of distinct n-grams across all languages.
    pub fn num_ngrams(&self) -> usize {
        self.table.len()
    }
}
