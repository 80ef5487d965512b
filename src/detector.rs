use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use strum::IntoEnumIterator;
use thiserror::Error;

use langsift_model::{NgramOrder, ProbabilityIndex};

use crate::ngram::{self, NgramWindow};
use crate::utils::{RE_MAIL, RE_URL};

/// Detection failures surfaced to the caller.
///
/// `"unknown"` is a valid detection result, not an error; these cover the
/// cases where detection cannot run at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("no language profiles loaded")]
    NoProfiles,
    #[error("no features in text")]
    NoFeatures,
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}

/// Single-use language detector over a shared probability index.
///
/// Feed text with [`Self::append`], then read the result with
/// [`Self::detect`] or [`Self::probabilities`]; the posterior is computed on
/// the first call and cached. [`Self::clear`] returns to a fresh state.
pub struct Detector {
    index: Arc<ProbabilityIndex>,
    text: String,
    langprob: Option<Vec<f64>>,
    alpha: f64,
    max_text_length: usize,
    prior: Option<Vec<f64>>,
    seed: Option<u64>,
    verbose: bool,
}

impl Detector {
    pub const ALPHA_DEFAULT: f64 = 0.5;
    pub const ALPHA_WIDTH: f64 = 0.05;
    pub const ITERATION_LIMIT: usize = 1000;
    pub const PROB_THRESHOLD: f64 = 0.1;
    pub const CONV_THRESHOLD: f64 = 0.99999;
    pub const BASE_FREQ: f64 = 10000.0;
    pub const N_TRIAL: usize = 7;
    pub const MAX_TEXT_LENGTH: usize = 10000;
    pub const UNKNOWN_LANG: &'static str = "unknown";

    pub(crate) fn new(index: Arc<ProbabilityIndex>, seed: Option<u64>) -> Self {
        Detector {
            index,
            text: String::new(),
            langprob: None,
            alpha: Self::ALPHA_DEFAULT,
            max_text_length: Self::MAX_TEXT_LENGTH,
            prior: None,
            seed,
            verbose: false,
        }
    }

    /// Accumulate text for detection, up to the configured length cap.
    ///
    /// URLs and mail addresses are replaced by a single space before the
    /// text enters the buffer, Vietnamese combining sequences are recomposed
    /// and runs of spaces collapse to one.
    pub fn append(&mut self, text: &str) {
        let text = RE_URL.replace_all(text, " ");
        let text = RE_MAIL.replace_all(&text, " ");
        let text = ngram::normalize_vi(&text);
        let mut stored = self.text.chars().count();
        let mut pre = self.text.chars().last().unwrap_or('\0');
        for ch in text.chars() {
            if stored >= self.max_text_length {
                break;
            }
            if ch != ' ' || pre != ' ' {
                self.text.push(ch);
                stored += 1;
            }
            pre = ch;
        }
    }

    /// Feed text from a reader, line by line, until EOF or a full buffer.
    ///
    /// I/O errors are returned verbatim; text read before the error stays in
    /// the buffer.
    pub fn append_reader<R: Read>(&mut self, reader: R) -> io::Result<()> {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        loop {
            if self.text.chars().count() >= self.max_text_length {
                return Ok(());
            }
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            self.append(&line);
        }
    }

    /// Smoothing parameter; small values trust the profiles strongly.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn set_max_text_length(&mut self, max_text_length: usize) {
        self.max_text_length = max_text_length;
    }

    /// Emit per-trial `debug!` events while detecting.
    pub fn set_verbose(&mut self) {
        self.verbose = true;
    }

    /// Install a prior distribution over the loaded languages.
    ///
    /// Values must be non-negative and at least one loaded language must get
    /// a positive weight; the vector is normalized to sum 1. Keys naming no
    /// loaded language are ignored.
    pub fn set_prior(&mut self, prior: &HashMap<String, f64>) -> Result<(), DetectError> {
        let mut vector = vec![0.0; self.index.languages().len()];
        let mut sum = 0.0;
        for (pos, lang) in self.index.languages().iter().enumerate() {
            if let Some(&p) = prior.get(lang) {
                if p < 0.0 {
                    return Err(DetectError::InvalidParam(format!(
                        "prior probability for '{lang}' is negative"
                    )));
                }
                vector[pos] = p;
                sum += p;
            }
        }
        if sum <= 0.0 {
            return Err(DetectError::InvalidParam(String::from(
                "at least one prior probability must be positive",
            )));
        }
        for p in vector.iter_mut() {
            *p /= sum;
        }
        self.prior = Some(vector);
        Ok(())
    }

    /// Detect the language of the accumulated text.
    ///
    /// Returns the most probable language code, or `"unknown"` when no
    /// language clears the reporting threshold.
    pub fn detect(&mut self) -> Result<String, DetectError> {
        let ranked = self.probabilities()?;
        Ok(ranked
            .into_iter()
            .next()
            .map(|(lang, _)| lang)
            .unwrap_or_else(|| String::from(Self::UNKNOWN_LANG)))
    }

    /// Ranked `(language, probability)` pairs above the reporting threshold,
    /// descending; ties keep profile load order. The posterior is computed
    /// once and reused by later calls.
    pub fn probabilities(&mut self) -> Result<Vec<(String, f64)>, DetectError> {
        if self.langprob.is_none() {
            self.detect_block()?;
        }
        let posterior = self.langprob.as_deref().unwrap_or(&[]);
        Ok(self.sort_probability(posterior))
    }

    /// Reset to a fresh state, keeping configuration and the index handle.
    pub fn clear(&mut self) {
        self.text.clear();
        self.langprob = None;
    }

    fn detect_block(&mut self) -> Result<(), DetectError> {
        if self.index.languages().is_empty() {
            return Err(DetectError::NoProfiles);
        }
        self.clean_buffer();
        let grams = self.extract_ngrams();
        if grams.is_empty() {
            return Err(DetectError::NoFeatures);
        }
        if self.verbose {
            debug!("sampling from {} grams", grams.len());
        }

        let mut posterior = vec![0.0; self.index.languages().len()];
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        for trial in 0..Self::N_TRIAL {
            let mut prob = self.init_probability();
            let jitter: f64 = rng.sample(StandardNormal);
            let alpha = self.alpha + jitter * Self::ALPHA_WIDTH;
            let mut i = 0;
            loop {
                let gram = &grams[rng.random_range(0..grams.len())];
                self.update_lang_prob(&mut prob, gram, alpha);
                if i % 5 == 0 {
                    if normalize_prob(&mut prob) > Self::CONV_THRESHOLD
                        || i >= Self::ITERATION_LIMIT
                    {
                        break;
                    }
                    if self.verbose {
                        debug!("trial {trial} step {i}: {:?}", self.sort_probability(&prob));
                    }
                }
                i += 1;
            }
            for (acc, p) in posterior.iter_mut().zip(&prob) {
                *acc += p / Self::N_TRIAL as f64;
            }
            if self.verbose {
                debug!("trial {trial} done, alpha {alpha}");
            }
        }
        self.langprob = Some(posterior);
        Ok(())
    }

    /// Drop Latin letters when the text is dominated by another script.
    ///
    /// Short Latin runs embedded in non-Latin text (trademarks, stray URL
    /// fragments) would otherwise bias the sampler.
    fn clean_buffer(&mut self) {
        let mut latin = 0usize;
        let mut non_latin = 0usize;
        for ch in self.text.chars() {
            if ('A'..='z').contains(&ch) {
                latin += 1;
            } else if ch >= '\u{300}' && !ngram::is_latin_extended_additional(ch) {
                non_latin += 1;
            }
        }
        if latin * 2 < non_latin {
            self.text.retain(|ch| !('A'..='z').contains(&ch));
        }
    }

    /// Grams of the buffer that the index knows about, with multiplicity.
    fn extract_ngrams(&self) -> Vec<String> {
        let mut grams = Vec::new();
        let mut window = NgramWindow::new();
        for ch in self.text.chars() {
            window.add_char(ch);
            for order in NgramOrder::iter() {
                let Some(gram) = window.get(order.chars()) else {
                    continue;
                };
                if self.index.contains(&gram) {
                    grams.push(gram);
                }
            }
        }
        grams
    }

    fn init_probability(&self) -> Vec<f64> {
        match &self.prior {
            Some(prior) => prior.clone(),
            None => {
                let n = self.index.languages().len();
                vec![1.0 / n as f64; n]
            }
        }
    }

    fn update_lang_prob(&self, prob: &mut [f64], gram: &str, alpha: f64) {
        if let Some(lang_probs) = self.index.probabilities(gram) {
            let weight = alpha / Self::BASE_FREQ;
            for (p, lang_prob) in prob.iter_mut().zip(lang_probs) {
                *p *= weight + lang_prob;
            }
        }
    }

    fn sort_probability(&self, prob: &[f64]) -> Vec<(String, f64)> {
        self.index
            .languages()
            .iter()
            .zip(prob)
            .filter(|(_, &p)| p > Self::PROB_THRESHOLD)
            .map(|(lang, &p)| (lang.clone(), p))
            .sorted_by_key(|&(_, p)| Reverse(OrderedFloat(p)))
            .collect()
    }
}

/// Normalize in place to sum 1 and return the largest component.
fn normalize_prob(prob: &mut [f64]) -> f64 {
    let sum: f64 = prob.iter().sum();
    let mut max = 0.0;
    for p in prob.iter_mut() {
        *p /= sum;
        if *p > max {
            max = *p;
        }
    }
    max
}
