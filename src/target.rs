use nalgebra::{DMatrix, DVector};

/// A target density, specified at minimum by its negative log-likelihood.
/// Model-aware proposals (truncated-Gaussian, CSmMALA) additionally need the
/// gradient of the log-density and the expected Fisher information; kernels
/// that don't need them default to `None`, matching "optional" in the data
/// model rather than forcing every target to implement dead methods.
pub trait Target {
    /// `-log π(x)`, unnormalized is fine — only differences are ever used.
    fn negative_log_likelihood(&self, x: &DVector<f64>) -> f64;

    /// `∇ log π(x)`, needed by CSmMALA/Billiard-MALA.
    fn gradient_log_likelihood(&self, _x: &DVector<f64>) -> Option<DVector<f64>> {
        None
    }

    /// `I(x) = E[-∇² log π(x)]`, needed by CSmMALA's Fisher-weighted metric.
    fn expected_fisher_information(&self, _x: &DVector<f64>) -> Option<DMatrix<f64>> {
        None
    }
}

/// Scales a target's negative log-likelihood by `β ∈ [0, 1]`: `β = 1` is the
/// full target, `β = 0` is uniform over the polytope. Used by parallel
/// tempering to build the ladder of intermediate distributions.
pub struct Coldness<'a, T: Target> {
    pub inner: &'a T,
    pub beta: f64,
}

impl<'a, T: Target> Coldness<'a, T> {
    pub fn new(inner: &'a T, beta: f64) -> Self {
        Self { inner, beta }
    }
}

impl<'a, T: Target> Target for Coldness<'a, T> {
    fn negative_log_likelihood(&self, x: &DVector<f64>) -> f64 {
        self.beta * self.inner.negative_log_likelihood(x)
    }

    fn gradient_log_likelihood(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        self.inner
            .gradient_log_likelihood(x)
            .map(|g| g * self.beta)
    }

    fn expected_fisher_information(&self, x: &DVector<f64>) -> Option<DMatrix<f64>> {
        self.inner
            .expected_fisher_information(x)
            .map(|fi| fi * self.beta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantTarget(f64);
    impl Target for ConstantTarget {
        fn negative_log_likelihood(&self, _x: &DVector<f64>) -> f64 {
            self.0
        }
    }

    #[test]
    fn coldness_scales_negative_log_likelihood() {
        let t = ConstantTarget(4.0);
        let cold = Coldness::new(&t, 0.5);
        let x = DVector::from_vec(vec![0.0]);
        assert_eq!(cold.negative_log_likelihood(&x), 2.0);
    }

    #[test]
    fn zero_coldness_is_uniform() {
        let t = ConstantTarget(10.0);
        let cold = Coldness::new(&t, 0.0);
        let x = DVector::from_vec(vec![0.0]);
        assert_eq!(cold.negative_log_likelihood(&x), 0.0);
    }
}
