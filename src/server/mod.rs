//! HTTP surface: shared state, routes and the server loop

pub mod handlers;

use crate::config::AppConfig;
use crate::dataset::{load_landmark_dataset, SampleStore};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::ServiceMetrics;
use crate::models::inference::PredictionEngine;
use anyhow::{Context, Result};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use handlers::*;

/// State shared by every request handler
pub struct AppState {
    pub config: AppConfig,
    pub extractor: FeatureExtractor,
    pub samples: SampleStore,
    pub engine: PredictionEngine,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(config: AppConfig, metrics: Arc<ServiceMetrics>) -> Self {
        let storage = config.storage.clone();
        Self {
            engine: PredictionEngine::new(move |kind| storage.model_path(kind)),
            extractor: FeatureExtractor::new(),
            samples: SampleStore::new(),
            metrics,
            config,
        }
    }

    /// Load the seed dataset and any persisted models.
    ///
    /// Neither is required; failures are logged and the service starts empty.
    pub fn bootstrap(&self) {
        if let Some(path) = self.config.storage.dataset_path.as_deref() {
            if Path::new(path).exists() {
                match load_landmark_dataset(path) {
                    Ok(samples) => {
                        let total = self.samples.extend(samples);
                        info!(total_samples = total, "Seed dataset loaded");
                    }
                    Err(e) => warn!(path = %path, error = %format!("{e:#}"), "Error loading seed dataset"),
                }
            } else {
                info!(path = %path, "No seed dataset found, starting with an empty sample store");
            }
        }

        if self.samples.is_empty() {
            info!("Sample store is empty, upload labeled features before training");
        }

        let loaded = self.engine.warm_start();
        info!(models = loaded, "Persisted models loaded");
    }
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/train", post(train_default))
        .route("/trainRF", post(train_random_forest))
        .route("/trainKNN", post(train_knn))
        .route("/predict", post(predict_default))
        .route("/predictRF", post(predict_random_forest))
        .route("/predictKNN", post(predict_knn))
        .route("/validate_rf", post(validate_random_forest))
        .route("/validate_knn", post(validate_knn))
        .route("/validation_stats", get(validation_stats))
        .route("/inspect_model", get(inspect_model))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let address = state.config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
