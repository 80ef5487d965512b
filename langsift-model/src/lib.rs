pub mod index;
pub mod profile;

pub use crate::index::ProbabilityIndex;
pub use crate::profile::{LanguageProfile, NgramOrder, ProfileError};
