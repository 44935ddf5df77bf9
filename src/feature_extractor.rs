//! Feature extraction for pose classifier training and inference.
//!
//! The client reports landmarks as `<joint>_{x,y,confidence}` keys, sometimes
//! still wrapped in the platform's point-key description. This module owns
//! the canonical schema both the trainer and the predictor order their
//! vectors by.

use crate::types::sample::{FeatureMap, Landmark};
use std::collections::{BTreeMap, HashMap};

/// Textual wrapper the pose framework puts around raw joint names
pub const KEY_WRAPPER_PREFIX: &str = "VNRecognizedPointKey(_rawValue: ";

/// Joints in schema order
pub const JOINTS: [&str; 19] = [
    "right_shoulder_1_joint",
    "right_eye_joint",
    "left_upLeg_joint",
    "left_hand_joint",
    "root",
    "neck_1_joint",
    "head_joint",
    "left_shoulder_1_joint",
    "right_ear_joint",
    "left_leg_joint",
    "left_eye_joint",
    "left_foot_joint",
    "right_upLeg_joint",
    "right_leg_joint",
    "right_forearm_joint",
    "right_foot_joint",
    "right_hand_joint",
    "left_forearm_joint",
    "left_ear_joint",
];

/// Per-joint attributes in schema order
pub const ATTRIBUTES: [&str; 3] = ["x", "y", "confidence"];

/// Strip the platform wrapper from a feature key.
///
/// `VNRecognizedPointKey(_rawValue: root)_x` becomes `root_x`; clean keys
/// come back unchanged.
pub fn canonical_key(raw: &str) -> String {
    raw.replace(KEY_WRAPPER_PREFIX, "").replace(')', "")
}

/// Rewrite every key of a raw feature map to its canonical form.
///
/// Keys outside the schema are kept; the schema is only applied when a
/// vector is assembled.
pub fn canonicalize_keys(raw: &FeatureMap) -> FeatureMap {
    raw.iter()
        .map(|(key, &value)| (canonical_key(key), value))
        .collect()
}

/// Flatten per-joint landmarks into `<joint>_x`, `<joint>_y`, `<joint>_confidence`.
pub fn flatten_landmarks(landmarks: &BTreeMap<String, Landmark>) -> FeatureMap {
    let mut features = HashMap::with_capacity(landmarks.len() * ATTRIBUTES.len());
    for (joint, point) in landmarks {
        let joint = canonical_key(joint);
        features.insert(format!("{joint}_x"), point.x);
        features.insert(format!("{joint}_y"), point.y);
        features.insert(format!("{joint}_confidence"), point.confidence);
    }
    features
}

/// Feature extractor that turns landmark maps into ordered model input vectors.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    names: Vec<String>,
}

impl FeatureExtractor {
    /// Create an extractor over the canonical 57-key schema.
    pub fn new() -> Self {
        let names = JOINTS
            .iter()
            .flat_map(|joint| {
                ATTRIBUTES
                    .iter()
                    .map(move |attribute| format!("{joint}_{attribute}"))
            })
            .collect();
        Self { names }
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.names.len()
    }

    /// Get feature names in vector order.
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Normalize a raw feature map onto the schema.
    ///
    /// Every schema key is present in the output; keys missing from the input
    /// default to 0.0 and keys outside the schema are dropped.
    pub fn normalize(&self, raw: &FeatureMap) -> FeatureMap {
        self.names
            .iter()
            .cloned()
            .zip(self.extract(raw))
            .collect()
    }

    /// Extract an inference vector in schema order, missing keys as 0.0.
    pub fn extract(&self, raw: &FeatureMap) -> Vec<f64> {
        Self::extract_ordered(&self.names, raw)
    }

    /// Extract an inference vector ordered by an explicit name list.
    ///
    /// Used with the feature names stored inside a trained model so the
    /// vector always lines up with what the model was fitted on.
    pub fn extract_ordered(names: &[String], raw: &FeatureMap) -> Vec<f64> {
        ordered(names, raw, 0.0)
    }

    /// Extract a training row in schema order, missing keys as NaN for imputation.
    pub fn training_row(&self, features: &FeatureMap) -> Vec<f64> {
        ordered(&self.names, features, f64::NAN)
    }
}

/// Values of `raw` in `names` order after key canonicalization
fn ordered(names: &[String], raw: &FeatureMap, missing: f64) -> Vec<f64> {
    let clean = canonicalize_keys(raw);
    names
        .iter()
        .map(|name| clean.get(name).copied().unwrap_or(missing))
        .collect()
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(joint: &str, attribute: &str) -> String {
        format!("{KEY_WRAPPER_PREFIX}{joint})_{attribute}")
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 57);
        assert_eq!(extractor.feature_names()[0], "right_shoulder_1_joint_x");
        assert_eq!(extractor.feature_names()[14], "root_confidence");
        assert_eq!(extractor.feature_names()[56], "left_ear_joint_confidence");
    }

    #[test]
    fn test_wrapped_keys_strip_to_schema() {
        let extractor = FeatureExtractor::new();
        for joint in JOINTS {
            for attribute in ATTRIBUTES {
                let expected = format!("{joint}_{attribute}");
                assert_eq!(canonical_key(&wrapped(joint, attribute)), expected);
                assert!(extractor.feature_names().contains(&expected));
            }
        }
        assert_eq!(canonical_key("root_x"), "root_x");
    }

    #[test]
    fn test_missing_schema_keys_default_to_zero() {
        let extractor = FeatureExtractor::new();
        let mut raw = FeatureMap::new();
        raw.insert("head_joint_y".to_string(), 0.75);

        let normalized = extractor.normalize(&raw);
        assert_eq!(normalized.len(), extractor.feature_count());
        assert_eq!(normalized["head_joint_y"], 0.75);
        for name in extractor.feature_names() {
            if name != "head_joint_y" {
                assert_eq!(normalized[name], 0.0, "{name}");
            }
        }
    }

    #[test]
    fn test_bare_wrapped_joint_is_dropped() {
        let extractor = FeatureExtractor::new();
        let mut raw = FeatureMap::new();
        raw.insert(format!("{KEY_WRAPPER_PREFIX}root)"), 1.0);

        let normalized = extractor.normalize(&raw);
        assert_eq!(normalized["root_x"], 0.0);
        assert!(!normalized.contains_key("root"));
        assert!(extractor.extract(&raw).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extract_follows_given_order() {
        let mut raw = FeatureMap::new();
        raw.insert(wrapped("root", "x"), 0.4);
        raw.insert("neck_1_joint_y".to_string(), 0.8);
        raw.insert("tail_x".to_string(), 9.0);

        let names = vec![
            "neck_1_joint_y".to_string(),
            "root_x".to_string(),
            "root_y".to_string(),
        ];
        assert_eq!(FeatureExtractor::extract_ordered(&names, &raw), vec![0.8, 0.4, 0.0]);
    }

    #[test]
    fn test_training_row_marks_missing_as_nan() {
        let extractor = FeatureExtractor::new();
        let mut features = FeatureMap::new();
        features.insert("right_shoulder_1_joint_x".to_string(), 0.3);

        let row = extractor.training_row(&features);
        assert_eq!(row[0], 0.3);
        assert!(row[1].is_nan());
    }

    #[test]
    fn test_flatten_landmarks() {
        let mut landmarks = BTreeMap::new();
        landmarks.insert(
            "left_hand_joint".to_string(),
            Landmark {
                x: 0.1,
                y: 0.2,
                confidence: 0.9,
            },
        );

        let features = flatten_landmarks(&landmarks);
        assert_eq!(features.len(), 3);
        assert_eq!(features["left_hand_joint_x"], 0.1);
        assert_eq!(features["left_hand_joint_confidence"], 0.9);
    }
}
