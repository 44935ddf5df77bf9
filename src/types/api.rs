//! HTTP request and response bodies

use crate::types::classifier::ClassifierKind;
use crate::types::sample::FeatureMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accepts either a single feature map or a list of them.
///
/// The labeling and live-feedback clients send a bare object while batch
/// clients send an array; both shapes are served by the same endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Body of `/upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub label: String,
    pub features: OneOrMany<FeatureMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Samples accepted from this request
    pub count: usize,
    /// Samples now held by the store
    pub total_samples: usize,
}

/// Whether the reported accuracy was measured on held-out samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatedOn {
    Test,
    Train,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
    pub model: ClassifierKind,
    pub model_id: String,
    /// Fraction of correctly classified evaluation samples (0.0 - 1.0)
    pub accuracy: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub evaluated_on: EvaluatedOn,
}

/// Body of `/predict*`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub features: OneOrMany<FeatureMap>,
    #[serde(default)]
    pub attempted_pose: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseCheckResponse {
    pub attempted_pose: String,
    pub predicted_pose: String,
    pub is_correct: bool,
    pub feedback: String,
}

/// `/predict*` answers with raw predictions, or a comparison when the
/// client names the pose it is attempting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Check(PoseCheckResponse),
    Predictions(PredictionsResponse),
}

/// Body of `/validate_*`
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub model: ClassifierKind,
    pub total: u64,
    pub correct: u64,
    /// Running accuracy in percent
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStatsResponse {
    pub models: Vec<ValidationResponse>,
}

/// Query string of `/inspect_model`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectParams {
    #[serde(default)]
    pub model: Option<ClassifierKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectResponse {
    pub model: ClassifierKind,
    pub model_id: String,
    pub expected_features: Vec<String>,
    pub classes: Vec<String>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model: ClassifierKind,
    pub loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub samples: usize,
    pub models: Vec<ModelStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
