//! Character n-gram naive-Bayes language detection with Monte-Carlo
//! refinement.
//!
//! Per-language 1..3-gram frequency profiles are compiled into an immutable
//! [`ProbabilityIndex`]; a [`DetectorFactory`] hands out short-lived
//! [`Detector`]s that share it and run a sampled Bayesian update loop over
//! the extracted grams.

pub mod detector;
pub mod factory;
pub mod ngram;
pub mod utils;

pub use crate::detector::{DetectError, Detector};
pub use crate::factory::DetectorFactory;
pub use langsift_model::{LanguageProfile, NgramOrder, ProbabilityIndex, ProfileError};
