//! In-memory sample store and seed dataset loading

use crate::feature_extractor::{canonicalize_keys, flatten_landmarks};
use crate::types::sample::{DatasetEntry, FeatureMap, Sample};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Accumulating list of labeled samples shared by all requests
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: RwLock<Vec<Sample>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add feature sets under one label; keys are canonicalized on the way in.
    ///
    /// Returns the number of samples now held.
    pub fn add_labeled(&self, label: &str, features: Vec<FeatureMap>) -> usize {
        let incoming: Vec<Sample> = features
            .iter()
            .map(|raw| Sample::new(label, canonicalize_keys(raw)))
            .collect();

        let mut samples = self.samples.write();
        samples.extend(incoming);
        debug!(label = %label, total = samples.len(), "Samples stored");
        samples.len()
    }

    /// Append already-built samples (seed data)
    pub fn extend(&self, incoming: Vec<Sample>) -> usize {
        let mut samples = self.samples.write();
        samples.extend(incoming);
        samples.len()
    }

    /// Copy of the current samples for a training run
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.read().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }
}

/// Read a landmark dataset file and flatten every entry into a sample.
pub fn load_landmark_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let payload =
        fs::read(path).with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let entries: Vec<DatasetEntry> = serde_json::from_slice(&payload)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))?;

    let samples: Vec<Sample> = entries
        .into_iter()
        .map(|entry| Sample::new(entry.label, flatten_landmarks(&entry.landmarks)))
        .collect();

    info!(
        path = %path.display(),
        samples = samples.len(),
        "Loaded {} samples from dataset",
        samples.len()
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_add_canonicalizes_keys() {
        let store = SampleStore::new();
        let mut raw = FeatureMap::new();
        raw.insert("VNRecognizedPointKey(_rawValue: root)_x".to_string(), 0.5);

        assert_eq!(store.add_labeled("tree", vec![raw.clone(), raw]), 2);

        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].label, "tree");
        assert_eq!(snapshot[0].features["root_x"], 0.5);
    }

    #[test]
    fn test_load_landmark_dataset() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("training_dataset.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[
                {{"label": "tree", "landmarks": {{"root": {{"x": 0.5, "y": 0.4, "confidence": 0.9}}}}}},
                {{"label": "warrior", "landmarks": {{}}}}
            ]"#
        )
        .unwrap();

        let samples = load_landmark_dataset(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].features["root_y"], 0.4);
        assert!(samples[1].features.is_empty());

        let store = SampleStore::new();
        assert_eq!(store.extend(samples), 2);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_load_invalid_dataset_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_landmark_dataset(&path).is_err());
    }
}
