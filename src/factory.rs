use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use langsift_model::{LanguageProfile, ProbabilityIndex, ProfileError};

use crate::detector::{DetectError, Detector};

/// Hands out detectors over a shared, immutable probability index.
///
/// The factory owns the index behind an [`Arc`]; every detector holds a cheap
/// clone of the handle, so any number of them can run concurrently. Reloading
/// or clearing profiles swaps the factory's handle and leaves already created
/// detectors on their snapshot.
#[derive(Clone, Default)]
pub struct DetectorFactory {
    index: Arc<ProbabilityIndex>,
    seed: Option<u64>,
}

impl DetectorFactory {
    /// Build a factory from profiles; list order fixes the language
    /// positions reported by [`Self::languages`].
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = LanguageProfile>,
    ) -> Result<Self, ProfileError> {
        let index = ProbabilityIndex::build(profiles)?;
        info!(
            "loaded {} languages, {} distinct n-grams",
            index.languages().len(),
            index.num_ngrams()
        );
        Ok(DetectorFactory {
            index: Arc::new(index),
            seed: None,
        })
    }

    /// Load every profile file in a directory, in sorted filename order.
    ///
    /// Sorting keeps the language positions reproducible across platforms
    /// whose directory iteration order differs.
    pub fn from_dir(dir: &Path) -> Result<Self, ProfileError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();
        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths.iter().filter(|p| p.is_file()) {
            debug!("reading profile '{}'", path.display());
            profiles.push(LanguageProfile::from_file(path)?);
        }
        Self::from_profiles(profiles)
    }

    /// Language codes in load order; positions match probability vectors.
    pub fn languages(&self) -> &[String] {
        self.index.languages()
    }

    /// Drop all loaded profiles. Detectors created afterwards fail with
    /// [`DetectError::NoProfiles`]; already created ones keep their snapshot.
    pub fn clear(&mut self) {
        self.index = Arc::new(ProbabilityIndex::default());
    }

    /// Seed for detectors created after this call, making their detection
    /// reproducible bit for bit.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    pub fn create(&self) -> Detector {
        Detector::new(Arc::clone(&self.index), self.seed)
    }

    pub fn create_with_alpha(&self, alpha: f64) -> Detector {
        let mut detector = self.create();
        detector.set_alpha(alpha);
        detector
    }

    /// One-shot detection of a single text.
    pub fn detect(&self, text: &str) -> Result<String, DetectError> {
        let mut detector = self.create();
        detector.append(text);
        detector.detect()
    }

    /// Parallel version of [`Self::detect`] over many texts.
    pub fn par_detect<I>(&self, texts: I) -> Vec<Result<String, DetectError>>
    where
        I: IntoParallelIterator<Item = String>,
    {
        texts
            .into_par_iter()
            .map(|text| self.detect(&text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> Vec<LanguageProfile> {
        let mut en = LanguageProfile::new("en");
        let mut fr = LanguageProfile::new("fr");
        for gram in ["a", "a", "a", "b"] {
            en.add(gram);
        }
        for gram in ["a", "b", "b", "b"] {
            fr.add(gram);
        }
        vec![en, fr]
    }

    #[test]
    fn test_languages_in_load_order() {
        let factory = DetectorFactory::from_profiles(profiles()).unwrap();
        assert_eq!(factory.languages(), ["en", "fr"]);
    }

    #[test]
    fn test_clear_empties_languages() {
        let mut factory = DetectorFactory::from_profiles(profiles()).unwrap();
        factory.clear();
        assert!(factory.languages().is_empty());
        assert_eq!(factory.detect("aaa"), Err(DetectError::NoProfiles));
    }

    #[test]
    fn test_clear_keeps_existing_detectors() {
        let mut factory = DetectorFactory::from_profiles(profiles()).unwrap();
        factory.set_seed(3);
        let mut detector = factory.create();
        factory.clear();
        detector.append("a a a");
        assert_eq!(detector.detect().unwrap(), "en");
    }

    #[test]
    fn test_create_with_alpha() {
        let mut factory = DetectorFactory::from_profiles(profiles()).unwrap();
        factory.set_seed(3);
        let mut detector = factory.create_with_alpha(1.5);
        detector.append("a a a");
        assert_eq!(detector.detect().unwrap(), "en");
    }

    #[test_log::test]
    fn test_par_detect() {
        let mut factory = DetectorFactory::from_profiles(profiles()).unwrap();
        factory.set_seed(3);
        let results = factory.par_detect(vec![
            String::from("a a"),
            String::from("b b"),
            String::new(),
        ]);
        assert_eq!(results[0].as_deref(), Ok("en"));
        assert_eq!(results[1].as_deref(), Ok("fr"));
        assert_eq!(results[2], Err(DetectError::NoFeatures));
    }
}
