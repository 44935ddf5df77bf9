//! Service statistics and user feedback counters.

use crate::types::classifier::ClassifierKind;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Running tally of user confirmations for one classifier variant
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackTally {
    pub total: u64,
    pub correct: u64,
}

impl FeedbackTally {
    /// Share of confirmed-correct predictions in percent (0.0 with no feedback)
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// Metrics collector for the service
pub struct ServiceMetrics {
    /// Samples accepted by `/upload`
    pub samples_uploaded: AtomicU64,
    /// Completed training runs
    pub trainings: AtomicU64,
    /// Feature sets classified
    pub predictions: AtomicU64,
    /// Prediction request latency (in microseconds)
    prediction_times: RwLock<Vec<u64>>,
    /// Accuracy reported by the latest training run of each variant
    last_accuracy: RwLock<HashMap<ClassifierKind, f64>>,
    /// User feedback per variant
    feedback: Mutex<HashMap<ClassifierKind, FeedbackTally>>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            samples_uploaded: AtomicU64::new(0),
            trainings: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            prediction_times: RwLock::new(Vec::with_capacity(1000)),
            last_accuracy: RwLock::new(HashMap::new()),
            feedback: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn record_upload(&self, count: usize) {
        self.samples_uploaded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_training(&self, kind: ClassifierKind, accuracy: f64) {
        self.trainings.fetch_add(1, Ordering::Relaxed);
        self.last_accuracy.write().insert(kind, accuracy);
    }

    /// Record a served prediction request covering `count` feature sets
    pub fn record_prediction(&self, count: usize, elapsed: Duration) {
        self.predictions.fetch_add(count as u64, Ordering::Relaxed);

        let mut times = self.prediction_times.write();
        times.push(elapsed.as_micros() as u64);
        // Keep only the most recent latencies
        if times.len() > 10000 {
            times.drain(0..5000);
        }
    }

    /// Count one user confirmation and return the updated tally
    pub fn record_feedback(&self, kind: ClassifierKind, correct: bool) -> FeedbackTally {
        let mut feedback = self.feedback.lock();
        let tally = feedback.entry(kind).or_default();
        tally.total += 1;
        if correct {
            tally.correct += 1;
        }
        *tally
    }

    pub fn feedback(&self, kind: ClassifierKind) -> FeedbackTally {
        self.feedback.lock().get(&kind).copied().unwrap_or_default()
    }

    pub fn last_accuracy(&self, kind: ClassifierKind) -> Option<f64> {
        self.last_accuracy.read().get(&kind).copied()
    }

    /// Prediction latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = self.prediction_times.read().clone();
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let latency = self.get_latency_stats();
        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            samples_uploaded = self.samples_uploaded.load(Ordering::Relaxed),
            trainings = self.trainings.load(Ordering::Relaxed),
            predictions = self.predictions.load(Ordering::Relaxed),
            latency_mean_us = latency.mean_us,
            latency_p50_us = latency.p50_us,
            latency_p99_us = latency.p99_us,
            "Service metrics summary"
        );

        for kind in ClassifierKind::ALL {
            let tally = self.feedback(kind);
            info!(
                model = %kind,
                last_training_accuracy = ?self.last_accuracy(kind),
                feedback_total = tally.total,
                feedback_correct = tally.correct,
                feedback_accuracy = %format!("{:.1}%", tally.accuracy()),
                "Classifier summary"
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prediction latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics summary logger
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_accuracy() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.feedback(ClassifierKind::Knn).accuracy(), 0.0);

        metrics.record_feedback(ClassifierKind::Knn, true);
        metrics.record_feedback(ClassifierKind::Knn, true);
        metrics.record_feedback(ClassifierKind::Knn, false);
        let tally = metrics.record_feedback(ClassifierKind::Knn, true);

        assert_eq!(tally, FeedbackTally { total: 4, correct: 3 });
        assert_eq!(tally.accuracy(), 75.0);
        assert_eq!(metrics.feedback(ClassifierKind::RandomForest).total, 0);
    }

    #[test]
    fn test_counters() {
        let metrics = ServiceMetrics::new();
        metrics.record_upload(3);
        metrics.record_training(ClassifierKind::RandomForest, 0.9);
        metrics.record_prediction(2, Duration::from_micros(100));
        metrics.record_prediction(1, Duration::from_micros(300));

        assert_eq!(metrics.samples_uploaded.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.last_accuracy(ClassifierKind::RandomForest), Some(0.9));

        let latency = metrics.get_latency_stats();
        assert_eq!(latency.count, 2);
        assert_eq!(latency.mean_us, 200);
        assert_eq!(latency.max_us, 300);
    }
}
