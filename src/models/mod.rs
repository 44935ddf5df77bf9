//! Pose classification models: preprocessing, classifiers, training and inference

pub mod forest;
pub mod imputer;
pub mod inference;
pub mod knn;
pub mod pipeline;
pub mod trainer;

pub use inference::PredictionEngine;
pub use pipeline::PosePipeline;
pub use trainer::Trainer;
