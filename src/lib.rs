//! Pose Classifier Service Library
//!
//! Collects labeled body-pose landmark vectors, trains random forest and
//! k-nearest-neighbors classifiers over them, and serves pose predictions
//! to mobile clients over HTTP.

pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use dataset::SampleStore;
pub use error::{ServiceError, ServiceResult};
pub use feature_extractor::FeatureExtractor;
pub use models::inference::PredictionEngine;
pub use models::pipeline::PosePipeline;
pub use server::AppState;
pub use types::{classifier::ClassifierKind, sample::Sample};
