//! Configuration management for the pose classifier service

use crate::types::classifier::ClassifierKind;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// On-disk locations for the seed dataset and persisted models
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Landmark dataset loaded into the sample store at startup
    pub dataset_path: Option<String>,
    /// Persisted random forest pipeline (None keeps the model in memory only)
    pub random_forest_model: Option<String>,
    /// Persisted kNN pipeline (None keeps the model in memory only)
    pub knn_model: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dataset_path: Some("training_dataset.json".to_string()),
            random_forest_model: Some("pose_model.json".to_string()),
            knn_model: Some("pose_knn_model.json".to_string()),
        }
    }
}

impl StorageConfig {
    /// Model file for a classifier variant; None or an empty path keeps it in memory only
    pub fn model_path(&self, kind: ClassifierKind) -> Option<PathBuf> {
        let path = match kind {
            ClassifierKind::RandomForest => self.random_forest_model.as_ref(),
            ClassifierKind::Knn => self.knn_model.as_ref(),
        };
        path.filter(|p| !p.trim().is_empty()).map(PathBuf::from)
    }
}

/// Training configuration shared by every classifier variant
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Variant trained and served by `/train` and `/predict`
    pub default_classifier: ClassifierKind,
    /// Fraction of samples held out for scoring
    pub test_size: f64,
    /// Seed for the split shuffle and forest bootstrap
    pub seed: u64,
    /// Below this many samples the model is trained and scored on everything
    pub min_split_samples: usize,
    pub forest: ForestConfig,
    pub knn: KnnConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            default_classifier: ClassifierKind::RandomForest,
            test_size: 0.2,
            seed: 42,
            min_split_samples: 5,
            forest: ForestConfig::default(),
            knn: KnnConfig::default(),
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of bagged trees
    pub n_trees: usize,
    /// Maximum tree depth (None grows until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// k-nearest-neighbors hyperparameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Number of neighbors consulted per prediction
    pub k: usize,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
    /// Period of the metrics summary log (None disables it)
    pub summary_interval_secs: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            summary_interval_secs: Some(300),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, if present, plus environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("POSE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.training.default_classifier, ClassifierKind::RandomForest);
        assert_eq!(config.training.test_size, 0.2);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.knn.k, 5);
        assert_eq!(config.training.forest.n_trees, 100);
    }

    #[test]
    fn test_model_paths() {
        let mut storage = StorageConfig::default();
        assert_eq!(
            storage.model_path(ClassifierKind::RandomForest),
            Some(PathBuf::from("pose_model.json"))
        );

        storage.knn_model = None;
        assert_eq!(storage.model_path(ClassifierKind::Knn), None);

        storage.random_forest_model = Some(String::new());
        assert_eq!(storage.model_path(ClassifierKind::RandomForest), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 9100\n\n[training.knn]\nk = 3").unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.training.knn.k, 3);
        assert_eq!(config.training.forest.n_trees, 100);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8000);
    }
}
