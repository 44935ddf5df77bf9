//! Synthetic Landmark Dataset Generator
//!
//! Writes a seed dataset of jittered pose templates in the format the
//! service loads at startup, for exercising training without a camera.
//!
//! Usage: dataset_generator [output|-] [samples_per_pose] [jitter] [drop_rate]
//! An output of `-` prints a few samples instead of writing a file.

use pose_classifier_service::feature_extractor::JOINTS;
use pose_classifier_service::types::{DatasetEntry, Landmark};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

/// Joint positions of a pose template, normalized image coordinates (origin bottom-left)
struct PoseTemplate {
    label: &'static str,
    joints: [(f64, f64); 19],
}

/// Templates share the JOINTS order
const TEMPLATES: [PoseTemplate; 3] = [
    PoseTemplate {
        label: "mountain",
        joints: [
            (0.42, 0.72), (0.47, 0.86), (0.45, 0.48), (0.60, 0.45), (0.50, 0.48),
            (0.50, 0.72), (0.50, 0.84), (0.58, 0.72), (0.45, 0.84), (0.56, 0.28),
            (0.53, 0.86), (0.56, 0.08), (0.45, 0.48), (0.44, 0.28), (0.41, 0.58),
            (0.44, 0.08), (0.40, 0.45), (0.59, 0.58), (0.55, 0.84),
        ],
    },
    PoseTemplate {
        label: "tree",
        joints: [
            (0.42, 0.72), (0.47, 0.86), (0.45, 0.48), (0.52, 0.98), (0.50, 0.48),
            (0.50, 0.72), (0.50, 0.84), (0.58, 0.72), (0.45, 0.84), (0.66, 0.36),
            (0.53, 0.86), (0.48, 0.30), (0.45, 0.48), (0.45, 0.28), (0.44, 0.86),
            (0.45, 0.08), (0.48, 0.98), (0.56, 0.86), (0.55, 0.84),
        ],
    },
    PoseTemplate {
        label: "warrior",
        joints: [
            (0.42, 0.70), (0.47, 0.84), (0.44, 0.46), (0.86, 0.70), (0.50, 0.46),
            (0.50, 0.70), (0.50, 0.82), (0.58, 0.70), (0.45, 0.82), (0.70, 0.30),
            (0.53, 0.84), (0.76, 0.08), (0.44, 0.46), (0.30, 0.28), (0.28, 0.70),
            (0.22, 0.08), (0.14, 0.70), (0.72, 0.70), (0.55, 0.82),
        ],
    },
];

/// Landmark generator for one run
struct DatasetGenerator {
    rng: rand::rngs::ThreadRng,
    jitter: f64,
    drop_rate: f64,
}

impl DatasetGenerator {
    fn new(jitter: f64, drop_rate: f64) -> Self {
        Self {
            rng: rand::thread_rng(),
            jitter,
            drop_rate,
        }
    }

    /// Jitter every joint of a template; some joints go undetected
    fn generate(&mut self, template: &PoseTemplate) -> DatasetEntry {
        let mut landmarks = BTreeMap::new();
        for (joint, &(x, y)) in JOINTS.iter().zip(template.joints.iter()) {
            if self.rng.gen_bool(self.drop_rate) {
                continue;
            }
            landmarks.insert(
                joint.to_string(),
                Landmark {
                    x: (x + self.rng.gen_range(-self.jitter..=self.jitter)).clamp(0.0, 1.0),
                    y: (y + self.rng.gen_range(-self.jitter..=self.jitter)).clamp(0.0, 1.0),
                    confidence: self.rng.gen_range(0.5..1.0),
                },
            );
        }

        DatasetEntry {
            label: template.label.to_string(),
            landmarks,
        }
    }
}

/// Optional numeric argument; NaN and infinities are rejected
fn parse_finite(arg: Option<&String>, default: f64, name: &str) -> anyhow::Result<f64> {
    let Some(raw) = arg else {
        return Ok(default);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("Invalid {name} '{raw}': {e}"))?;
    anyhow::ensure!(value.is_finite(), "{name} must be a finite number, got {raw}");
    Ok(value)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dataset_generator=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let output = args.get(1).map(|s| s.as_str()).unwrap_or("training_dataset.json");
    let per_pose: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let jitter = parse_finite(args.get(3), 0.02, "jitter")?.abs();
    let drop_rate = parse_finite(args.get(4), 0.05, "drop_rate")?.clamp(0.0, 1.0);

    info!(
        output = %output,
        per_pose = per_pose,
        jitter = jitter,
        drop_rate = drop_rate,
        "Configuration loaded"
    );

    let mut generator = DatasetGenerator::new(jitter, drop_rate);
    let entries: Vec<DatasetEntry> = TEMPLATES
        .iter()
        .flat_map(|template| (0..per_pose).map(|_| template).collect::<Vec<_>>())
        .map(|template| generator.generate(template))
        .collect();

    if output == "-" {
        info!("Running in dry-run mode (no file written)");
        for (i, entry) in entries.iter().enumerate().step_by(per_pose.max(1)) {
            info!("Sample {}:\n{}", i + 1, serde_json::to_string_pretty(entry)?);
        }
        return Ok(());
    }

    std::fs::write(output, serde_json::to_vec_pretty(&entries)?)?;
    info!(
        "Completed! Wrote {} samples ({} poses x {}) to {}",
        entries.len(),
        TEMPLATES.len(),
        per_pose,
        output
    );

    Ok(())
}
