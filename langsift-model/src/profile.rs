use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, IntoEnumIterator};
use strum_macros::EnumIter;
use thiserror::Error;

/// The n-gram orders the classifier works with.
///
/// The discriminant doubles as the index into [`LanguageProfile::n_words`].
#[derive(EnumIter, Display, EnumCount, Debug, PartialEq, Eq, Clone, Copy)]
#[strum(serialize_all = "lowercase")]
pub enum NgramOrder {
    Unigram,
    Bigram,
    Trigram,
}

impl NgramOrder {
    /// Number of characters in a gram of this order.
    pub fn chars(self) -> usize {
        self as usize + 1
    }

    /// The order matching a character count, if there is one.
    pub fn from_len(len: usize) -> Option<Self> {
        NgramOrder::iter().find(|order| order.chars() == len)
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("error reading profile file")]
    Io(#[from] io::Error),
    #[error("malformed profile json")]
    Json(#[from] serde_json::Error),
    #[error("duplicate language code '{0}' in profile list")]
    DuplicateLanguage(String),
    #[error("profile '{lang}' contains {order}s but reports a zero {order} total")]
    EmptyOrder { lang: String, order: NgramOrder },
}

/// Per-language empirical n-gram distribution, the unit of training data.
///
/// Matches the classic JSON profile layout:
///
/// ```json
/// {"name": "en", "freq": {"a": 17, "ab": 3}, "n_words": [20, 3, 0]}
/// ```
///
/// `n_words[k]` is the total number of observed (k+1)-grams, i.e. the
/// denominator that turns a count into a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub name: String,
    pub freq: HashMap<String, u64>,
    pub n_words: [u64; NgramOrder::COUNT],
}

impl LanguageProfile {
    const MINIMUM_FREQ: u64 = 2;
    const LESS_FREQ_RATIO: u64 = 100_000;

    pub fn new(name: &str) -> Self {
        LanguageProfile {
            name: String::from(name),
            freq: HashMap::new(),
            n_words: [0; NgramOrder::COUNT],
        }
    }

    /// Count one gram occurrence. Grams outside 1..=3 chars are ignored.
    pub fn add(&mut self, gram: &str) {
        let Some(order) = NgramOrder::from_len(gram.chars().count()) else {
            return;
        };
        self.n_words[order as usize] += 1;
        *self.freq.entry(String::from(gram)).or_insert(0) += 1;
    }

    /// Prune the long tail of rare grams, then drop Latin-containing grams
    /// when single Latin letters make up less than a third of the unigram
    /// mass (stray romanized fragments in a non-Latin-script corpus).
    pub fn omit_less_freq(&mut self) {
        let mut threshold = self.n_words[NgramOrder::Unigram as usize] / Self::LESS_FREQ_RATIO;
        if threshold < Self::MINIMUM_FREQ {
            threshold = Self::MINIMUM_FREQ;
        }

        let mut roman = 0;
        let n_words = &mut self.n_words;
        self.freq.retain(|gram, count| {
            if *count <= threshold {
                if let Some(order) = NgramOrder::from_len(gram.chars().count()) {
                    n_words[order as usize] -= *count;
                }
                return false;
            }
            if gram.len() == 1 && gram.chars().all(|c| c.is_ascii_alphabetic()) {
                roman += *count;
            }
            true
        });

        if roman < self.n_words[NgramOrder::Unigram as usize] / 3 {
            let n_words = &mut self.n_words;
            self.freq.retain(|gram, count| {
                if gram.chars().any(|c| c.is_ascii_alphabetic()) {
                    if let Some(order) = NgramOrder::from_len(gram.chars().count()) {
                        n_words[order as usize] -= *count;
                    }
                    return false;
                }
                true
            });
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_roundtrip() {
        for order in NgramOrder::iter() {
            assert_eq!(NgramOrder::from_len(order.chars()), Some(order));
        }
        assert_eq!(NgramOrder::from_len(0), None);
        assert_eq!(NgramOrder::from_len(4), None);
        assert_eq!(NgramOrder::COUNT, 3);
    }

    #[test]
    fn test_add() {
        let mut profile = LanguageProfile::new("en");
        profile.add("a");
        profile.add("a");
        profile.add("ab");
        profile.add("");
        profile.add("abcd");
        assert_eq!(profile.freq.get("a"), Some(&2));
        assert_eq!(profile.freq.get("ab"), Some(&1));
        assert_eq!(profile.n_words, [2, 1, 0]);
        assert!(!profile.freq.contains_key("abcd"));
    }

    #[test]
    fn test_add_multibyte() {
        let mut profile = LanguageProfile::new("ja");
        profile.add("\u{3042}");
        profile.add("\u{3042}\u{3042}\u{3042}");
        assert_eq!(profile.n_words, [1, 0, 1]);
    }

    #[test]
    fn test_omit_less_freq() {
        let mut profile = LanguageProfile::new("tt");
        for gram in ["a", "b", "c"] {
            for _ in 0..5 {
                profile.add(gram);
            }
        }
        // below the minimum frequency of 2, must disappear
        profile.add("\u{3042}");
        profile.add("x");
        profile.omit_less_freq();
        assert!(!profile.freq.contains_key("\u{3042}"));
        assert!(!profile.freq.contains_key("x"));
        // latin unigrams carry the whole mass here, so they survive
        assert_eq!(profile.freq.get("a"), Some(&5));
        assert_eq!(profile.n_words[0], 15);
    }

    #[test]
    fn test_omit_less_freq_drops_minority_latin() {
        let mut profile = LanguageProfile::new("th");
        for _ in 0..30 {
            profile.add("\u{0e01}");
        }
        for _ in 0..3 {
            profile.add("a");
        }
        profile.omit_less_freq();
        // 3 < 33/3: the latin tail is noise for this script
        assert!(!profile.freq.contains_key("a"));
        assert_eq!(profile.freq.get("\u{0e01}"), Some(&30));
        assert_eq!(profile.n_words[0], 30);
    }

    #[test]
    fn test_from_json() {
        let profile = LanguageProfile::from_json(
            "{\"freq\":{\"A\":3,\"B\":6,\"C\":3,\"AB\":2,\"BC\":1,\"ABC\":2},\
             \"n_words\":[12,3,4],\"name\":\"lang1\"}",
        )
        .unwrap();
        assert_eq!(profile.name, "lang1");
        assert_eq!(profile.n_words, [12, 3, 4]);
        assert_eq!(profile.freq.get("ABC"), Some(&2));
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            LanguageProfile::from_json("{\"name\":\"x\""),
            Err(ProfileError::Json(_))
        ));
    }
}
