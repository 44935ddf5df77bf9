//! Pose Classifier Service - Main Entry Point
//!
//! Loads configuration, seeds the sample store and persisted models, then
//! serves the upload / train / predict API until Ctrl-C.

use anyhow::Result;
use pose_classifier_service::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    server, AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pose_classifier_service={}", logging.level).parse()?)
        .add_directive("tower_http=info".parse()?);

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the log format can be configured
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Pose Classifier Service");
    info!(
        default_classifier = %config.training.default_classifier,
        test_size = config.training.test_size,
        seed = config.training.seed,
        n_trees = config.training.forest.n_trees,
        k = config.training.knn.k,
        "Configuration loaded"
    );

    let metrics = Arc::new(ServiceMetrics::new());
    if let Some(interval) = config.logging.summary_interval_secs {
        let reporter = MetricsReporter::new(Arc::clone(&metrics), interval);
        tokio::spawn(reporter.start());
    }

    let state = Arc::new(AppState::new(config, Arc::clone(&metrics)));
    info!(
        features = state.extractor.feature_count(),
        "Feature extractor initialized"
    );
    state.bootstrap();

    server::serve(state).await?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
