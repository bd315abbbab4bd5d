use crate::error::{Error, Result};
use crate::math::Matrix;

/// Standardizes features to zero mean and unit variance using statistics
/// captured once from training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub var: Vec<f64>,
    pub scale: Vec<f64>,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(features: &Matrix) -> Result<Self> {
        if features.rows == 0 {
            return Err(Error::EmptyDataset);
        }

        let n = features.rows as f64;
        let mean = features.mean_rows();
        let mut var = vec![0.0; features.cols];
        for row in 0..features.rows {
            for (col, val) in features.row(row).iter().enumerate() {
                let diff = val - mean[col];
                var[col] += diff * diff;
            }
        }
        for v in var.iter_mut() {
            *v /= n;
        }

        // Constant columns keep their values centred but unscaled.
        let scale = var
            .iter()
            .map(|v| {
                let s = v.sqrt();
                if s < 10.0 * f64::EPSILON {
                    1.0
                } else {
                    s
                }
            })
            .collect();

        Ok(StandardScaler {
            mean,
            var,
            scale,
            n_samples_seen: features.rows,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, features: &Matrix) -> Result<Matrix> {
        if features.cols != self.n_features() {
            return Err(Error::DimensionMismatch {
                expected: self.n_features(),
                found: features.cols,
            });
        }

        let mut res = features.clone();
        for row in 0..res.rows {
            for (col, val) in res.row_mut(row).iter_mut().enumerate() {
                *val = (*val - self.mean[col]) / self.scale[col];
            }
        }

        Ok(res)
    }

    pub fn fit_transform(features: &Matrix) -> Result<(Self, Matrix)> {
        let scaler = StandardScaler::fit(features)?;
        let scaled = scaler.transform(features)?;
        Ok((scaler, scaled))
    }
}
