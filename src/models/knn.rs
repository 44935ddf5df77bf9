//! k-nearest-neighbors classifier over a linfa-nn ball tree

use crate::models::forest::majority;
use anyhow::{ensure, Context, Result};
use linfa::prelude::*;
use linfa::Dataset;
use linfa_nn::distance::L2Dist;
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array2, ArrayView2, Axis, Ix1};
use serde::{Deserialize, Serialize};

/// Majority vote among the `k` closest training rows (Euclidean distance).
///
/// Only the training points are persisted; the ball tree is rebuilt per call.
#[derive(Debug, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    n_classes: usize,
    points: Array2<f64>,
    labels: Vec<usize>,
}

impl KnnClassifier {
    /// Memorize an imputed dataset; `k` is clamped to its number of rows.
    pub fn fit(dataset: &Dataset<f64, usize, Ix1>, n_classes: usize, k: usize) -> Result<Self> {
        let n = dataset.nsamples();
        ensure!(n > 0, "Cannot fit kNN on zero samples");
        ensure!(k > 0, "k must be at least 1");

        Ok(Self {
            k: k.min(n),
            n_classes,
            points: dataset.records().to_owned(),
            labels: dataset.targets().to_vec(),
        })
    }

    /// Class of every row; vote ties resolve to the lowest class index.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        let index = CommonNearestNeighbour::BallTree
            .from_batch(&self.points, L2Dist)
            .context("Failed to build neighbor index")?;

        x.axis_iter(Axis(0))
            .map(|row| {
                let neighbors = index
                    .k_nearest(row, self.k)
                    .context("Nearest neighbor query failed")?;
                let mut votes = vec![0usize; self.n_classes];
                for (_, i) in neighbors {
                    votes[self.labels[i]] += 1;
                }
                Ok(majority(&votes))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nearest_neighbor_vote() {
        let data = Dataset::new(
            array![[0.0, 0.0], [0.1, 0.0], [1.0, 1.0], [0.9, 1.0], [1.0, 0.9]],
            array![0, 0, 1, 1, 1],
        );
        let knn = KnnClassifier::fit(&data, 2, 3).unwrap();

        let probe = array![[0.05, 0.0], [0.95, 0.95]];
        assert_eq!(knn.predict(probe.view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_k_is_clamped() {
        let data = Dataset::new(array![[0.0], [1.0]], array![0, 1]);
        let knn = KnnClassifier::fit(&data, 2, 5).unwrap();
        assert_eq!(knn.k, 2);
        assert_eq!(knn.predict(array![[0.2]].view()).unwrap().len(), 1);
    }

    #[test]
    fn test_tie_prefers_lowest_class() {
        let data = Dataset::new(array![[0.0], [2.0]], array![1, 0]);
        let knn = KnnClassifier::fit(&data, 2, 2).unwrap();
        assert_eq!(knn.predict(array![[1.0]].view()).unwrap(), vec![0]);
    }

    #[test]
    fn test_rejects_zero_k() {
        let data = Dataset::new(array![[0.0]], array![0]);
        assert!(KnnClassifier::fit(&data, 1, 0).is_err());
    }
}
