//! Adds a target's log-likelihood to a proposal's log-correction for
//! kernels that don't already know about a target (the symmetric and
//! Dikin-style walks). Ported from `original_source`'s `ModelMixin`, which
//! caches the state's negative log-likelihood across draws so it is
//! recomputed once per proposal rather than twice.
//!
//! Model-aware kernels (`TruncatedGaussianProposal`, `CSmMALA`) must not be
//! wrapped here: their `log_correction` already folds in the target, and
//! adding it again would double count it. `ModelAware::new` only wraps
//! kernels that report `is_model_aware() == false`.

use nalgebra::DVector;
use rand::RngCore;

use crate::errors::{SamplerError, SamplerResult};
use crate::proposal::{Proposal, ProposalParameter};
use crate::target::Target;

pub struct ModelAware<P: Proposal, M: Target> {
    inner: P,
    model: M,
    state_negative_log_likelihood: f64,
    proposal_negative_log_likelihood: f64,
}

impl<P: Proposal, M: Target> ModelAware<P, M> {
    pub fn new(inner: P, model: M) -> SamplerResult<Self> {
        if inner.is_model_aware() {
            return Err(SamplerError::InvalidParameter {
                name: "inner".to_string(),
                reason: "proposal is already model-aware; wrapping it again would double count the target".to_string(),
            });
        }
        let state_negative_log_likelihood = model.negative_log_likelihood(inner.state());
        Ok(Self {
            inner,
            model,
            state_negative_log_likelihood,
            proposal_negative_log_likelihood: 0.0,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn negative_log_likelihood_of_current_state(&self) -> f64 {
        self.state_negative_log_likelihood
    }
}

impl<P: Proposal, M: Target> Proposal for ModelAware<P, M> {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let (candidate, mut log_correction) = self.inner.propose(rng)?;
        self.proposal_negative_log_likelihood = self.model.negative_log_likelihood(&candidate);
        log_correction += self.state_negative_log_likelihood - self.proposal_negative_log_likelihood;
        Ok((candidate, log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        let state = self.inner.accept();
        self.state_negative_log_likelihood = self.proposal_negative_log_likelihood;
        state
    }

    fn set_state(&mut self, x: DVector<f64>) -> SamplerResult<()> {
        self.inner.set_state(x)?;
        self.state_negative_log_likelihood = self.model.negative_log_likelihood(self.inner.state());
        Ok(())
    }

    fn state(&self) -> &DVector<f64> {
        self.inner.state()
    }

    fn proposal(&self) -> Option<&DVector<f64>> {
        self.inner.proposal()
    }

    fn step_size(&self) -> Option<f64> {
        self.inner.step_size()
    }

    fn set_step_size(&mut self, value: f64) -> SamplerResult<()> {
        self.inner.set_step_size(value)
    }

    fn parameter(&self, name: ProposalParameter) -> Option<f64> {
        self.inner.parameter(name)
    }

    fn set_parameter(&mut self, name: ProposalParameter, value: f64) -> SamplerResult<()> {
        self.inner.set_parameter(name, value)
    }

    fn is_model_aware(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultivariateGaussianModel;
    use crate::proposal::gaussian::GaussianProposal;
    use crate::rng::seeded;
    use convex_geometry::{Polytope, PolytopeMatrix};
    use nalgebra::DMatrix;
    use std::sync::Arc;

    fn wide_square() -> Arc<Polytope> {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![50.0, 50.0, 50.0, 50.0]);
        Arc::new(Polytope::new(PolytopeMatrix::Dense(a), b).unwrap())
    }

    #[test]
    fn rejects_wrapping_an_already_model_aware_kernel() {
        use crate::proposal::truncated_gaussian::TruncatedGaussianProposal;
        let polytope = wide_square();
        let model = MultivariateGaussianModel::new(
            DVector::from_vec(vec![0.0, 0.0]),
            DMatrix::identity(2, 2),
        )
        .unwrap();
        let inner = TruncatedGaussianProposal::new(
            polytope.clone(),
            DVector::from_vec(vec![0.0, 0.0]),
            model,
        )
        .unwrap();
        let outer_model = MultivariateGaussianModel::new(
            DVector::from_vec(vec![0.0, 0.0]),
            DMatrix::identity(2, 2),
        )
        .unwrap();
        assert!(ModelAware::new(inner, outer_model).is_err());
    }

    #[test]
    fn folds_target_density_difference_into_log_correction() {
        let polytope = wide_square();
        let walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.3).unwrap();
        let model = MultivariateGaussianModel::new(
            DVector::from_vec(vec![0.0, 0.0]),
            DMatrix::identity(2, 2),
        )
        .unwrap();
        let mut wrapped = ModelAware::new(walk, model).unwrap();
        let mut rng = seeded(29);
        for _ in 0..20 {
            let (_, log_correction) = wrapped.propose(&mut rng).unwrap();
            assert!(log_correction.is_finite() || log_correction == f64::NEG_INFINITY);
            wrapped.accept();
        }
    }

    #[test]
    fn caches_current_state_negative_log_likelihood_across_accepted_draws() {
        let polytope = wide_square();
        let walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.1).unwrap();
        let model = MultivariateGaussianModel::new(
            DVector::from_vec(vec![0.0, 0.0]),
            DMatrix::identity(2, 2),
        )
        .unwrap();
        let mut wrapped = ModelAware::new(walk, model).unwrap();
        let initial = wrapped.negative_log_likelihood_of_current_state();
        let mut rng = seeded(31);
        wrapped.propose(&mut rng).unwrap();
        wrapped.accept();
        assert_ne!(initial, f64::NAN);
    }
}
