use nalgebra::{DMatrix, DVector};

use crate::errors::{SamplerError, SamplerResult};
use crate::target::Target;

/// Multi-dimensional Rosenbrock ("banana") density, only defined on even
/// dimension: `f(x) = Σ_i [ s (x_{2i}² − x_{2i+1})² + (x_{2i} − a_i)² ]`.
/// Ported term-for-term from `original_source`'s `RosenbrockModel`,
/// including its Hessian-as-Fisher-information simplification (the true
/// expected Fisher information is intractable for this model).
pub struct RosenbrockModel {
    scale: f64,
    shift: DVector<f64>,
}

impl RosenbrockModel {
    pub fn new(scale: f64, shift: DVector<f64>) -> SamplerResult<Self> {
        if scale <= 0.0 {
            return Err(SamplerError::InvalidParameter {
                name: "scale".to_string(),
                reason: format!("must be positive, got {scale}"),
            });
        }
        Ok(Self { scale, shift })
    }

    pub fn dimension(&self) -> usize {
        self.shift.len() * 2
    }

    fn check_dimension(&self, x: &DVector<f64>) -> SamplerResult<()> {
        if x.len() != self.dimension() {
            return Err(SamplerError::InvalidParameter {
                name: "x".to_string(),
                reason: format!(
                    "expected dimension {}, got {}",
                    self.dimension(),
                    x.len()
                ),
            });
        }
        Ok(())
    }

    fn hessian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let n = x.len();
        let mut h = DMatrix::zeros(n, n);
        for i in 0..self.shift.len() {
            let x0 = x[2 * i];
            let x1 = x[2 * i + 1];
            h[(2 * i, 2 * i)] = self.scale * (1200.0 * x0 * x0 - 400.0 * x1 + 2.0);
            h[(2 * i + 1, 2 * i)] = self.scale * -400.0 * x0;
            h[(2 * i, 2 * i + 1)] = self.scale * -400.0 * x0;
            h[(2 * i + 1, 2 * i + 1)] = self.scale * 200.0;
        }
        h
    }
}

impl Target for RosenbrockModel {
    fn negative_log_likelihood(&self, x: &DVector<f64>) -> f64 {
        debug_assert!(self.check_dimension(x).is_ok());
        let mut result = 0.0;
        for i in 0..self.shift.len() {
            let x0 = x[2 * i];
            let x1 = x[2 * i + 1];
            let a = self.shift[i];
            result += self.scale * (100.0 * (x0 * x0 - x1).powi(2) + (x0 - a).powi(2));
        }
        result
    }

    fn gradient_log_likelihood(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        let mut gradient = DVector::zeros(x.len());
        for i in 0..self.shift.len() {
            let x0 = x[2 * i];
            let x1 = x[2 * i + 1];
            let a = self.shift[i];
            gradient[2 * i] = self.scale * (400.0 * x0 * (x1 - x0 * x0) + 2.0 * (a - x0));
            gradient[2 * i + 1] = self.scale * 200.0 * (x0 * x0 - x1);
        }
        Some(gradient)
    }

    fn expected_fisher_information(&self, x: &DVector<f64>) -> Option<DMatrix<f64>> {
        Some(self.hessian(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_log_likelihood_is_zero_at_the_minimum() {
        let model = RosenbrockModel::new(1.0, DVector::from_vec(vec![1.0])).unwrap();
        let x = DVector::from_vec(vec![1.0, 1.0]);
        assert!(model.negative_log_likelihood(&x).abs() < 1e-12);
    }

    #[test]
    fn requires_even_dimension_inputs() {
        let model = RosenbrockModel::new(1.0, DVector::from_vec(vec![1.0, 2.0])).unwrap();
        assert_eq!(model.dimension(), 4);
    }
}
