//! Imputation + classification pipeline and its on-disk form

use crate::config::TrainingConfig;
use crate::models::forest::RandomForest;
use crate::models::imputer::MeanImputer;
use crate::models::knn::KnnClassifier;
use crate::types::classifier::ClassifierKind;
use anyhow::{anyhow, ensure, Context, Result};
use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa::Dataset;
use ndarray::{Array1, Array2, ArrayView2, Ix1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Fitted classifier behind a pipeline
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    Knn(KnnClassifier),
}

impl Classifier {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        match self {
            Classifier::RandomForest(forest) => Ok(forest.predict(x)),
            Classifier::Knn(knn) => knn.predict(x),
        }
    }
}

/// Trained pose model: feature schema, label vocabulary, imputer and classifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct PosePipeline {
    /// Unique id of this training run
    pub id: String,
    pub kind: ClassifierKind,
    /// Column order the model was fitted on
    pub feature_names: Vec<String>,
    /// Sorted label vocabulary; class index `i` is `classes[i]`
    pub classes: Vec<String>,
    pub trained_at: DateTime<Utc>,
    imputer: MeanImputer,
    classifier: Classifier,
}

impl PosePipeline {
    /// Fit imputer and classifier on a dataset whose records may hold NaN
    /// for missing values and whose targets index into `classes`.
    pub fn fit(
        kind: ClassifierKind,
        feature_names: Vec<String>,
        classes: Vec<String>,
        train: &Dataset<f64, usize, Ix1>,
        config: &TrainingConfig,
    ) -> Result<Self> {
        ensure!(
            train.nfeatures() == feature_names.len(),
            "Training matrix has {} columns for {} feature names",
            train.nfeatures(),
            feature_names.len()
        );
        ensure!(
            train.targets().iter().all(|&class| class < classes.len()),
            "Training targets fall outside the {} known classes",
            classes.len()
        );

        let imputer = MeanImputer::fit(train.records().view());
        let filled = Dataset::new(
            imputer.transform(train.records().view())?,
            train.targets().to_owned(),
        );

        let classifier = match kind {
            ClassifierKind::RandomForest => Classifier::RandomForest(RandomForest::fit(
                &filled,
                classes.len(),
                &config.forest,
                config.seed,
            )?),
            ClassifierKind::Knn => {
                Classifier::Knn(KnnClassifier::fit(&filled, classes.len(), config.knn.k)?)
            }
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            feature_names,
            classes,
            trained_at: Utc::now(),
            imputer,
            classifier,
        })
    }

    /// Class indices for rows ordered by `feature_names`
    fn predict_classes(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let filled = self.imputer.transform(x)?;
        self.classifier.predict(filled.view())
    }

    /// Predict labels for rows ordered by `feature_names`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<String>> {
        Ok(self
            .predict_classes(x)?
            .into_iter()
            .map(|class| self.classes[class].clone())
            .collect())
    }

    /// Predict from row vectors built with [`crate::FeatureExtractor::extract_ordered`].
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<String>> {
        let x = rows_to_matrix(rows, self.feature_names.len())?;
        self.predict(x.view())
    }

    /// Accuracy (0.0 - 1.0) on a dataset encoded against `classes`
    pub fn score(&self, dataset: &Dataset<f64, usize, Ix1>) -> Result<f64> {
        let predicted = Array1::from(self.predict_classes(dataset.records().view())?);
        let matrix = predicted
            .confusion_matrix(dataset)
            .context("Failed to score model")?;
        Ok(f64::from(matrix.accuracy()))
    }

    /// Write the pipeline as JSON, replacing any previous file atomically.
    ///
    /// Each call stages to its own temporary file, so concurrent saves never
    /// share a staging path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let payload = serde_json::to_vec(self).context("Failed to serialize model")?;
        let staging = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&staging, payload)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e).with_context(|| format!("Failed to move model into {}", path.display()));
        }

        info!(
            model = %self.kind,
            model_id = %self.id,
            path = %path.display(),
            "Model saved"
        );
        Ok(())
    }

    /// Load a pipeline written by [`PosePipeline::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let payload =
            fs::read(path).with_context(|| format!("Failed to read model {}", path.display()))?;
        let pipeline: Self = serde_json::from_slice(&payload)
            .with_context(|| format!("Failed to parse model {}", path.display()))?;

        ensure!(
            pipeline.imputer.n_features() == pipeline.feature_names.len(),
            "Model {} is inconsistent: {} feature names, imputer fitted on {}",
            path.display(),
            pipeline.feature_names.len(),
            pipeline.imputer.n_features()
        );
        Ok(pipeline)
    }
}

/// Sorted, de-duplicated label vocabulary
pub fn class_vocabulary(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Map every label to its index in `classes`
pub fn encode_labels(classes: &[String], labels: &[String]) -> Result<Array1<usize>> {
    labels
        .iter()
        .map(|label| {
            classes
                .binary_search(label)
                .map_err(|_| anyhow!("Label '{}' is not in the class vocabulary", label))
        })
        .collect()
}

/// Stack equally sized rows into a matrix
pub fn rows_to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<Array2<f64>> {
    ensure!(
        rows.iter().all(|row| row.len() == n_features),
        "Every row must have {} features",
        n_features
    );
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_features), flat).context("Failed to build feature matrix")
}
