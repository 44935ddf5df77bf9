//! Labeled landmark samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Raw feature set as sent by the client: landmark-derived key -> value
pub type FeatureMap = HashMap<String, f64>;

/// A single detected landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

/// One labeled sample held in the sample store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Pose label (e.g. "tree", "warrior")
    pub label: String,

    /// Landmark features keyed by canonical name; may be sparse
    pub features: FeatureMap,

    /// When the sample entered the store
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl Sample {
    /// Create a sample stamped with the current time
    pub fn new(label: impl Into<String>, features: FeatureMap) -> Self {
        Self {
            label: label.into(),
            features,
            received_at: Utc::now(),
        }
    }

    /// Whether the sample carries a usable label
    pub fn is_labeled(&self) -> bool {
        !self.label.trim().is_empty()
    }
}

/// Entry of the seed dataset file: one labeled pose with per-joint landmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub label: String,
    pub landmarks: BTreeMap<String, Landmark>,
}
