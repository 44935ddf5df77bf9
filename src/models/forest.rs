//! Random forest: bagged linfa decision trees with a majority vote

use crate::config::ForestConfig;
use anyhow::{ensure, Context, Result};
use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView2, Axis, Ix1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ensemble of Gini decision trees, each fitted on a bootstrap sample.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_classes: usize,
}

impl RandomForest {
    /// Fit a forest on an imputed dataset with encoded targets (`0..n_classes`).
    ///
    /// Bootstrap draws come from `seed`, so the fit is reproducible.
    pub fn fit(
        dataset: &Dataset<f64, usize, Ix1>,
        n_classes: usize,
        config: &ForestConfig,
        seed: u64,
    ) -> Result<Self> {
        let n = dataset.nsamples();
        ensure!(n > 0, "Cannot fit a forest on zero samples");
        ensure!(config.n_trees > 0, "A forest needs at least one tree");

        let params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(config.max_depth)
            .min_weight_split(config.min_samples_split.max(2) as f32);

        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..config.n_trees)
            .map(|_| {
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let bootstrap = Dataset::new(
                    dataset.records().select(Axis(0), &rows),
                    dataset.targets().select(Axis(0), &rows),
                );
                params
                    .fit(&bootstrap)
                    .context("Failed to fit decision tree")
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(trees = trees.len(), samples = n, "Random forest fitted");
        Ok(Self { trees, n_classes })
    }

    /// Most voted class for every row; ties resolve to the lowest class index.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<usize> {
        let mut votes = Array2::<usize>::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(&x);
            for (row, &class) in predicted.iter().enumerate() {
                votes[[row, class]] += 1;
            }
        }
        votes.axis_iter(Axis(0)).map(|row| majority(row)).collect()
    }
}

/// Index with the most votes; the lowest index wins a tie.
pub(crate) fn majority<'a>(votes: impl IntoIterator<Item = &'a usize>) -> usize {
    votes
        .into_iter()
        .enumerate()
        .fold((0, 0), |(best, best_votes), (class, &count)| {
            if count > best_votes {
                (class, count)
            } else {
                (best, best_votes)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Dataset<f64, usize, Ix1> {
        let x = array![
            [0.10, 0.20, 0.0],
            [0.12, 0.18, 0.0],
            [0.08, 0.22, 0.0],
            [0.11, 0.19, 0.0],
            [0.90, 0.80, 0.0],
            [0.88, 0.82, 0.0],
            [0.92, 0.79, 0.0],
            [0.91, 0.81, 0.0],
        ];
        Dataset::new(x, array![0, 0, 0, 0, 1, 1, 1, 1])
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            max_depth: None,
            min_samples_split: 2,
        }
    }

    #[test]
    fn test_forest_separates_blobs() {
        let data = two_blobs();
        let forest = RandomForest::fit(&data, 2, &small_config(), 42).unwrap();

        assert_eq!(forest.trees.len(), 15);
        assert_eq!(forest.predict(data.records().view()), data.targets().to_vec());

        let probe = array![[0.09, 0.21, 0.0], [0.89, 0.8, 0.0]];
        assert_eq!(forest.predict(probe.view()), vec![0, 1]);
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let data = two_blobs();
        let a = RandomForest::fit(&data, 2, &small_config(), 7).unwrap();
        let b = RandomForest::fit(&data, 2, &small_config(), 7).unwrap();

        let grid = array![[0.3, 0.3, 0.0], [0.5, 0.5, 0.0], [0.7, 0.6, 0.0]];
        assert_eq!(a.predict(grid.view()), b.predict(grid.view()));
    }

    #[test]
    fn test_single_class_forest() {
        let data = Dataset::new(array![[1.0], [2.0]], array![0, 0]);
        let forest = RandomForest::fit(&data, 1, &small_config(), 42).unwrap();
        assert_eq!(forest.predict(array![[5.0]].view()), vec![0]);
    }

    #[test]
    fn test_rejects_empty_forest() {
        let config = ForestConfig {
            n_trees: 0,
            ..small_config()
        };
        assert!(RandomForest::fit(&two_blobs(), 2, &config, 42).is_err());
    }

    #[test]
    fn test_majority_prefers_first_tie() {
        assert_eq!(majority(&[2, 2]), 0);
        assert_eq!(majority(&[1, 4, 2]), 1);
        assert_eq!(majority(&[0, 0, 0]), 0);
    }
}
