//! Type definitions for the pose classifier service

pub mod api;
pub mod classifier;
pub mod sample;

pub use classifier::ClassifierKind;
pub use sample::{DatasetEntry, FeatureMap, Landmark, Sample};
