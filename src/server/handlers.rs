//! Request handlers for every endpoint

use crate::error::{ServiceError, ServiceResult};
use crate::metrics::FeedbackTally;
use crate::models::trainer::{Trainer, TrainingOutcome};
use crate::server::AppState;
use crate::types::api::{
    HealthResponse, InspectParams, InspectResponse, ModelStatus, PredictRequest,
    PredictResponse, PredictionsResponse, TrainResponse, UploadRequest, UploadResponse,
    ValidateRequest, ValidationResponse, ValidationStatsResponse,
};
use crate::types::classifier::ClassifierKind;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn body<T>(payload: JsonBody<T>) -> ServiceResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::invalid(rejection.body_text()))
}

/// Liveness plus a short view of what the service holds
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let models = ClassifierKind::ALL
        .into_iter()
        .map(|kind| ModelStatus {
            model: kind,
            loaded: state.engine.is_loaded(kind),
        })
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        samples: state.samples.len(),
        models,
    })
}

/// Store labeled feature sets for the next training run
pub async fn upload(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<UploadRequest>,
) -> ServiceResult<Json<UploadResponse>> {
    let request = body(payload)?;
    let label = request.label.trim();
    if label.is_empty() {
        return Err(ServiceError::invalid("label must not be empty"));
    }

    let features = request.features.into_vec();
    if features.is_empty() {
        return Err(ServiceError::invalid("No features provided"));
    }

    let count = features.len();
    let total_samples = state.samples.add_labeled(label, features);
    state.metrics.record_upload(count);
    info!(label = %label, count, total_samples, "Features uploaded");

    Ok(Json(UploadResponse {
        message: "Features uploaded successfully".to_string(),
        count,
        total_samples,
    }))
}

pub async fn train_default(State(state): State<Arc<AppState>>) -> ServiceResult<Json<TrainResponse>> {
    let kind = state.config.training.default_classifier;
    train(state, kind).await
}

pub async fn train_random_forest(
    State(state): State<Arc<AppState>>,
) -> ServiceResult<Json<TrainResponse>> {
    train(state, ClassifierKind::RandomForest).await
}

pub async fn train_knn(State(state): State<Arc<AppState>>) -> ServiceResult<Json<TrainResponse>> {
    train(state, ClassifierKind::Knn).await
}

/// Fit a variant on a snapshot of the samples and swap it in.
///
/// Runs on the blocking pool; uploads arriving meanwhile wait for the next run.
async fn train(state: Arc<AppState>, kind: ClassifierKind) -> ServiceResult<Json<TrainResponse>> {
    let samples = state.samples.snapshot();
    let trainer = Trainer::new(state.config.training.clone(), state.extractor.clone());
    info!(model = %kind, samples = samples.len(), "Training started");

    let worker_state = Arc::clone(&state);
    let response = tokio::task::spawn_blocking(move || -> ServiceResult<TrainResponse> {
        let TrainingOutcome {
            pipeline,
            accuracy,
            train_samples,
            test_samples,
            evaluated_on,
            ..
        } = trainer.train(kind, &samples)?;

        let pipeline = worker_state.engine.install(pipeline)?;
        worker_state.metrics.record_training(kind, accuracy);

        Ok(TrainResponse {
            message: "Model trained successfully".to_string(),
            model: kind,
            model_id: pipeline.id.clone(),
            accuracy,
            train_samples,
            test_samples,
            evaluated_on,
        })
    })
    .await
    .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Training task failed: {e}")))??;

    Ok(Json(response))
}

pub async fn predict_default(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<PredictRequest>,
) -> ServiceResult<Json<PredictResponse>> {
    let kind = state.config.training.default_classifier;
    predict(state, kind, payload).await
}

pub async fn predict_random_forest(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<PredictRequest>,
) -> ServiceResult<Json<PredictResponse>> {
    predict(state, ClassifierKind::RandomForest, payload).await
}

pub async fn predict_knn(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<PredictRequest>,
) -> ServiceResult<Json<PredictResponse>> {
    predict(state, ClassifierKind::Knn, payload).await
}

/// Classify on the blocking pool; a cold model may be read from disk first.
async fn predict(
    state: Arc<AppState>,
    kind: ClassifierKind,
    payload: JsonBody<PredictRequest>,
) -> ServiceResult<Json<PredictResponse>> {
    let request = body(payload)?;
    let features = request.features.into_vec();

    let start = Instant::now();
    let count = features.len();
    let worker_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || worker_state.engine.predict(kind, &features))
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Prediction task failed: {e}")))??;
    state.metrics.record_prediction(count, start.elapsed());

    let response = match request.attempted_pose.as_deref() {
        Some(attempted) => {
            let check = result.check_pose(attempted);
            info!(
                model = %kind,
                attempted_pose = %check.attempted_pose,
                predicted_pose = %check.predicted_pose,
                is_correct = check.is_correct,
                "Pose checked"
            );
            PredictResponse::Check(check)
        }
        None => PredictResponse::Predictions(PredictionsResponse {
            predictions: result.predictions,
        }),
    };

    Ok(Json(response))
}

pub async fn validate_random_forest(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<ValidateRequest>,
) -> ServiceResult<Json<ValidationResponse>> {
    validate(&state, ClassifierKind::RandomForest, payload)
}

pub async fn validate_knn(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<ValidateRequest>,
) -> ServiceResult<Json<ValidationResponse>> {
    validate(&state, ClassifierKind::Knn, payload)
}

/// Count the user's verdict on the last prediction of a variant
fn validate(
    state: &AppState,
    kind: ClassifierKind,
    payload: JsonBody<ValidateRequest>,
) -> ServiceResult<Json<ValidationResponse>> {
    let request = body(payload)?;
    let tally = state.metrics.record_feedback(kind, request.correct);
    info!(
        model = %kind,
        correct = request.correct,
        total = tally.total,
        accuracy = tally.accuracy(),
        "Prediction feedback recorded"
    );
    Ok(Json(validation_response(kind, tally)))
}

pub async fn validation_stats(State(state): State<Arc<AppState>>) -> Json<ValidationStatsResponse> {
    let models = ClassifierKind::ALL
        .into_iter()
        .map(|kind| validation_response(kind, state.metrics.feedback(kind)))
        .collect();
    Json(ValidationStatsResponse { models })
}

fn validation_response(kind: ClassifierKind, tally: FeedbackTally) -> ValidationResponse {
    ValidationResponse {
        model: kind,
        total: tally.total,
        correct: tally.correct,
        accuracy: tally.accuracy(),
    }
}

/// Report the feature schema and label vocabulary of a trained model
pub async fn inspect_model(
    State(state): State<Arc<AppState>>,
    params: Result<Query<InspectParams>, QueryRejection>,
) -> ServiceResult<Json<InspectResponse>> {
    let Query(params) = params.map_err(|e| ServiceError::invalid(e.body_text()))?;
    let kind = params
        .model
        .unwrap_or(state.config.training.default_classifier);

    let pipeline = state.engine.model(kind)?;
    Ok(Json(InspectResponse {
        model: kind,
        model_id: pipeline.id.clone(),
        expected_features: pipeline.feature_names.clone(),
        classes: pipeline.classes.clone(),
        trained_at: pipeline.trained_at,
    }))
}
