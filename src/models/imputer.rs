//! Mean imputation for missing landmark values

use anyhow::{ensure, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Replaces missing (non-finite) values with the per-column training mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanImputer {
    means: Vec<f64>,
}

impl MeanImputer {
    /// Learn column means from the observed (finite) values.
    ///
    /// A column with no observed value imputes 0.0.
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let means = x
            .axis_iter(Axis(1))
            .map(|column| {
                let observed: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
                if observed.is_empty() {
                    0.0
                } else {
                    observed.iter().sum::<f64>() / observed.len() as f64
                }
            })
            .collect();
        Self { means }
    }

    /// Number of columns the imputer was fitted on
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Return a copy of `x` with every non-finite value replaced.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        ensure!(
            x.ncols() == self.means.len(),
            "Expected {} features, got {}",
            self.means.len(),
            x.ncols()
        );

        let mut out = x.to_owned();
        for (mut column, &mean) in out.axis_iter_mut(Axis(1)).zip(&self.means) {
            column.mapv_inplace(|v| if v.is_finite() { v } else { mean });
        }
        Ok(out)
    }
}
