//! Prediction delegate: holds trained pipelines and serves predictions

use crate::error::{ServiceError, ServiceResult};
use crate::feature_extractor::FeatureExtractor;
use crate::models::pipeline::PosePipeline;
use crate::types::api::PoseCheckResponse;
use crate::types::classifier::ClassifierKind;
use crate::types::sample::FeatureMap;
use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Holder of one classifier variant's current pipeline
#[derive(Debug)]
struct ModelSlot {
    /// Persisted location, if this variant is persisted
    path: Option<PathBuf>,
    current: RwLock<Option<Arc<PosePipeline>>>,
    /// Serializes persist-then-swap so disk and memory hold the same model
    install: Mutex<()>,
}

impl ModelSlot {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            current: RwLock::new(None),
            install: Mutex::new(()),
        }
    }

    /// Held pipeline, falling back to the persisted file
    fn resolve(&self, kind: ClassifierKind) -> ServiceResult<Arc<PosePipeline>> {
        if let Some(pipeline) = self.current.read().as_ref() {
            return Ok(Arc::clone(pipeline));
        }

        let Some(path) = self.path.as_ref().filter(|p| p.exists()) else {
            return Err(ServiceError::ModelNotTrained(kind));
        };

        let pipeline = Arc::new(PosePipeline::load(path)?);
        info!(model = %kind, model_id = %pipeline.id, path = %path.display(), "Model loaded from disk");

        let mut current = self.current.write();
        // Another request may have installed a freshly trained model meanwhile
        Ok(Arc::clone(current.get_or_insert(pipeline)))
    }
}

/// Result of one prediction request
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub model: ClassifierKind,
    pub model_id: String,
    pub predictions: Vec<String>,
}

impl PredictionResult {
    /// Compare the first prediction against the pose the user is attempting
    pub fn check_pose(&self, attempted_pose: &str) -> PoseCheckResponse {
        let predicted_pose = self.predictions.first().cloned().unwrap_or_default();
        let is_correct = predicted_pose.eq_ignore_ascii_case(attempted_pose.trim());
        let feedback = if is_correct {
            format!("Great job! Your pose matches {attempted_pose}.")
        } else {
            format!("Your pose looks like {predicted_pose}. Adjust your form to match {attempted_pose}.")
        };

        PoseCheckResponse {
            attempted_pose: attempted_pose.to_string(),
            predicted_pose,
            is_correct,
            feedback,
        }
    }
}

/// Per-variant pipeline registry used by the prediction endpoints
#[derive(Debug)]
pub struct PredictionEngine {
    slots: HashMap<ClassifierKind, ModelSlot>,
}

impl PredictionEngine {
    /// Create an engine; `paths` gives the persisted location of each variant.
    pub fn new(paths: impl Fn(ClassifierKind) -> Option<PathBuf>) -> Self {
        let slots = ClassifierKind::ALL
            .into_iter()
            .map(|kind| (kind, ModelSlot::new(paths(kind))))
            .collect();
        Self { slots }
    }

    fn slot(&self, kind: ClassifierKind) -> &ModelSlot {
        // Every variant gets a slot in `new`
        &self.slots[&kind]
    }

    /// Load every persisted model that exists on disk; failures are logged and skipped.
    pub fn warm_start(&self) -> usize {
        let mut loaded = 0;
        for kind in ClassifierKind::ALL {
            let slot = self.slot(kind);
            if !slot.path.as_ref().is_some_and(|p| p.exists()) {
                debug!(model = %kind, "No persisted model");
                continue;
            }
            match slot.resolve(kind) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(model = %kind, error = %e, "Failed to load persisted model, skipping"),
            }
        }
        loaded
    }

    /// Persist (when configured) and swap in a freshly trained pipeline.
    pub fn install(&self, pipeline: PosePipeline) -> Result<Arc<PosePipeline>> {
        let slot = self.slot(pipeline.kind);
        let _installing = slot.install.lock();
        if let Some(path) = &slot.path {
            pipeline.save(path)?;
        }

        let pipeline = Arc::new(pipeline);
        *slot.current.write() = Some(Arc::clone(&pipeline));
        info!(model = %pipeline.kind, model_id = %pipeline.id, "Model installed");
        Ok(pipeline)
    }

    /// Current pipeline of a variant (held or persisted)
    pub fn model(&self, kind: ClassifierKind) -> ServiceResult<Arc<PosePipeline>> {
        self.slot(kind).resolve(kind)
    }

    /// Whether a variant is held in memory right now
    pub fn is_loaded(&self, kind: ClassifierKind) -> bool {
        self.slot(kind).current.read().is_some()
    }

    /// Normalize feature sets onto the model's schema and predict each one.
    pub fn predict(
        &self,
        kind: ClassifierKind,
        features: &[FeatureMap],
    ) -> ServiceResult<PredictionResult> {
        if features.is_empty() {
            return Err(ServiceError::invalid("No features provided"));
        }

        let pipeline = self.model(kind)?;
        let rows: Vec<Vec<f64>> = features
            .iter()
            .map(|raw| FeatureExtractor::extract_ordered(&pipeline.feature_names, raw))
            .collect();
        let predictions = pipeline.predict_rows(&rows)?;

        debug!(
            model = %kind,
            model_id = %pipeline.id,
            predictions = ?predictions,
            "Prediction complete"
        );

        Ok(PredictionResult {
            model: kind,
            model_id: pipeline.id.clone(),
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::models::trainer::Trainer;
    use crate::types::sample::Sample;

    fn samples() -> Vec<Sample> {
        let extractor = FeatureExtractor::new();
        ["tree", "warrior"]
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let features = extractor
                    .feature_names()
                    .iter()
                    .map(|name| (name.clone(), 0.1 + i as f64 * 0.8))
                    .collect();
                Sample::new(*label, features)
            })
            .collect()
    }

    fn trained(kind: ClassifierKind) -> PosePipeline {
        let mut config = TrainingConfig::default();
        config.knn.k = 1;
        config.forest.n_trees = 5;
        Trainer::new(config, FeatureExtractor::new())
            .train(kind, &samples())
            .unwrap()
            .pipeline
    }

    #[test]
    fn test_untrained_model_is_an_error() {
        let engine = PredictionEngine::new(|_| None);
        let result = engine.predict(ClassifierKind::Knn, &[FeatureMap::new()]);
        assert!(matches!(result, Err(ServiceError::ModelNotTrained(ClassifierKind::Knn))));
    }

    #[test]
    fn test_predict_with_wrapped_keys() {
        let engine = PredictionEngine::new(|_| None);
        engine.install(trained(ClassifierKind::Knn)).unwrap();

        let extractor = FeatureExtractor::new();
        let wrapped: FeatureMap = extractor
            .feature_names()
            .iter()
            .map(|name| {
                let (joint, attribute) = name.rsplit_once('_').unwrap();
                (format!("VNRecognizedPointKey(_rawValue: {joint})_{attribute}"), 0.88)
            })
            .collect();

        let result = engine.predict(ClassifierKind::Knn, &[wrapped]).unwrap();
        assert_eq!(result.predictions, vec!["warrior"]);
    }

    #[test]
    fn test_empty_feature_list_is_rejected() {
        let engine = PredictionEngine::new(|_| None);
        engine.install(trained(ClassifierKind::Knn)).unwrap();
        assert!(matches!(
            engine.predict(ClassifierKind::Knn, &[]),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_persisted_model_is_loaded_lazily() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pose_model.json");

        let writer = PredictionEngine::new({
            let path = path.clone();
            move |kind| (kind == ClassifierKind::RandomForest).then(|| path.clone())
        });
        writer.install(trained(ClassifierKind::RandomForest)).unwrap();
        assert!(path.exists());

        let reader = PredictionEngine::new(move |kind| {
            (kind == ClassifierKind::RandomForest).then(|| path.clone())
        });
        assert!(!reader.is_loaded(ClassifierKind::RandomForest));
        assert_eq!(reader.warm_start(), 1);
        assert!(reader.is_loaded(ClassifierKind::RandomForest));
        assert!(!reader.is_loaded(ClassifierKind::Knn));
    }

    #[test]
    fn test_concurrent_installs_keep_disk_and_memory_in_step() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pose_model.json");
        let engine = Arc::new(PredictionEngine::new({
            let path = path.clone();
            move |kind| (kind == ClassifierKind::RandomForest).then(|| path.clone())
        }));

        for _ in 0..5 {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    let pipeline = trained(ClassifierKind::RandomForest);
                    std::thread::spawn(move || engine.install(pipeline).map(|p| p.id.clone()))
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }

            let served = engine.model(ClassifierKind::RandomForest).unwrap();
            let persisted = PosePipeline::load(&path).unwrap();
            assert_eq!(persisted.id, served.id);
        }

        // No staging files are left next to the model
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_check_pose() {
        let result = PredictionResult {
            model: ClassifierKind::RandomForest,
            model_id: "id".to_string(),
            predictions: vec!["tree".to_string()],
        };

        let check = result.check_pose("Tree");
        assert!(check.is_correct);
        assert_eq!(check.predicted_pose, "tree");

        let check = result.check_pose("warrior");
        assert!(!check.is_correct);
        assert!(check.feedback.contains("tree"));
    }
}
