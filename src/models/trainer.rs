//! Training delegate: samples in, fitted and scored pipeline out

use crate::config::TrainingConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::feature_extractor::FeatureExtractor;
use crate::models::pipeline::{class_vocabulary, encode_labels, rows_to_matrix, PosePipeline};
use crate::types::api::EvaluatedOn;
use crate::types::classifier::ClassifierKind;
use crate::types::sample::Sample;
use linfa::prelude::*;
use linfa::Dataset;
use ndarray::Ix1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tracing::info;

/// Fitted pipeline together with how it scored
#[derive(Debug)]
pub struct TrainingOutcome {
    pub pipeline: PosePipeline,
    /// Fraction of evaluation samples classified correctly
    pub accuracy: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub evaluated_on: EvaluatedOn,
    pub duration: Duration,
}

/// Builds training matrices over the canonical schema and fits pipelines.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    extractor: FeatureExtractor,
}

impl Trainer {
    pub fn new(config: TrainingConfig, extractor: FeatureExtractor) -> Self {
        Self { config, extractor }
    }

    /// Train one classifier variant on the given samples.
    ///
    /// Samples are split into train/test when there are at least
    /// `min_split_samples` of them; otherwise the model is fitted and
    /// scored on everything.
    pub fn train(&self, kind: ClassifierKind, samples: &[Sample]) -> ServiceResult<TrainingOutcome> {
        if samples.is_empty() {
            return Err(ServiceError::NoTrainingData);
        }
        if samples.iter().any(|sample| !sample.is_labeled()) {
            return Err(ServiceError::MissingLabels);
        }

        let start = Instant::now();
        let rows: Vec<Vec<f64>> = samples
            .iter()
            .map(|sample| self.extractor.training_row(&sample.features))
            .collect();
        let labels: Vec<String> = samples.iter().map(|s| s.label.clone()).collect();
        let classes = class_vocabulary(&labels);
        let dataset = Dataset::new(
            rows_to_matrix(&rows, self.extractor.feature_count())?,
            encode_labels(&classes, &labels)?,
        );
        let feature_names = self.extractor.feature_names().to_vec();

        let outcome = match self.holdout(&dataset) {
            Some((train, test)) => {
                let pipeline = PosePipeline::fit(kind, feature_names, classes, &train, &self.config)?;
                TrainingOutcome {
                    accuracy: pipeline.score(&test)?,
                    pipeline,
                    train_samples: train.nsamples(),
                    test_samples: test.nsamples(),
                    evaluated_on: EvaluatedOn::Test,
                    duration: start.elapsed(),
                }
            }
            None => {
                let pipeline =
                    PosePipeline::fit(kind, feature_names, classes, &dataset, &self.config)?;
                TrainingOutcome {
                    accuracy: pipeline.score(&dataset)?,
                    pipeline,
                    train_samples: dataset.nsamples(),
                    test_samples: 0,
                    evaluated_on: EvaluatedOn::Train,
                    duration: start.elapsed(),
                }
            }
        };

        info!(
            model = %kind,
            model_id = %outcome.pipeline.id,
            classes = outcome.pipeline.classes.len(),
            train_samples = outcome.train_samples,
            test_samples = outcome.test_samples,
            accuracy = outcome.accuracy,
            duration_ms = outcome.duration.as_millis() as u64,
            "Model trained"
        );

        Ok(outcome)
    }

    /// Seeded shuffle and split keeping `1 - test_size` of the rows for training.
    ///
    /// None when the dataset is too small or either side would be empty.
    fn holdout(
        &self,
        dataset: &Dataset<f64, usize, Ix1>,
    ) -> Option<(Dataset<f64, usize, Ix1>, Dataset<f64, usize, Ix1>)> {
        if dataset.nsamples() < self.config.min_split_samples {
            return None;
        }

        let ratio = (1.0 - self.config.test_size).clamp(0.0, 1.0) as f32;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (train, test) = dataset.shuffle(&mut rng).split_with_ratio(ratio);
        (train.nsamples() > 0 && test.nsamples() > 0).then_some((train, test))
    }
}
