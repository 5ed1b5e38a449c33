//! Truncated-Gaussian proposal: whitens the polytope by the target Gaussian's
//! covariance, proposes one whitened coordinate at a time from a truncated
//! normal over the chord, then un-whitens. Model-aware: its log-correction
//! already is the target log-density difference.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rand::RngCore;

use convex_geometry::linalg::solve;
use convex_geometry::Polytope;

use crate::errors::SamplerResult;
use crate::models::MultivariateGaussianModel;
use crate::proposal::chord::{ChordStepDistribution, GaussianStepDistribution};
use crate::proposal::{Proposal, ProposalParameter};
use crate::target::Target;

pub struct TruncatedGaussianProposal {
    polytope: Arc<Polytope>,
    model: MultivariateGaussianModel,
    state: DVector<f64>,
    proposal: Option<DVector<f64>>,
    chord_step_distribution: GaussianStepDistribution,
}

impl TruncatedGaussianProposal {
    pub fn new(
        polytope: Arc<Polytope>,
        state: DVector<f64>,
        model: MultivariateGaussianModel,
    ) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        Ok(Self {
            polytope,
            model,
            state,
            proposal: None,
            chord_step_distribution: GaussianStepDistribution::new(1.0),
        })
    }
}

impl Proposal for TruncatedGaussianProposal {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let n = self.polytope.dimension();
        let cholesky = self.model.cholesky_covariance()?;
        let mean = self.model.mean();

        let shifted_state = &self.state - mean;
        let mut white = solve(&cholesky, &shifted_state)?;

        let whitened_a: DMatrix<f64> = self.polytope.a().to_dense() * &cholesky;
        let whitened_b = self.polytope.b() - self.polytope.a().mul_vec(mean);

        for i in 0..n {
            let slacks = &whitened_b - &whitened_a * &white;
            let column = whitened_a.column(i);
            let inverse_distances: Vec<f64> = column
                .iter()
                .zip(slacks.iter())
                .map(|(&a_ij, &s_i)| a_ij / s_i)
                .collect();
            let max_inv = inverse_distances.iter().cloned().fold(f64::MIN, f64::max);
            let min_inv = inverse_distances.iter().cloned().fold(f64::MAX, f64::min);

            let mut forward = 1.0 / max_inv;
            if forward < 0.0 {
                forward = f64::INFINITY;
            }
            let mut backward = 1.0 / min_inv;
            if backward > 0.0 {
                backward = f64::NEG_INFINITY;
            }

            let step = self.chord_step_distribution.draw(rng, backward, forward)?;
            white[i] += step;
        }

        let candidate = &cholesky * &white + mean;

        let log_correction =
            self.model.negative_log_likelihood(&self.state) - self.model.negative_log_likelihood(&candidate);

        self.proposal = Some(candidate.clone());
        Ok((candidate, log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        self.state = self.proposal.take().expect("propose must precede accept");
        self.state.clone()
    }

    fn set_state(&mut self, x: DVector<f64>) -> SamplerResult<()> {
        self.polytope.check_starting_point(&x)?;
        self.state = x;
        Ok(())
    }

    fn state(&self) -> &DVector<f64> {
        &self.state
    }

    fn proposal(&self) -> Option<&DVector<f64>> {
        self.proposal.as_ref()
    }

    fn parameter(&self, _name: ProposalParameter) -> Option<f64> {
        None
    }

    fn is_model_aware(&self) -> bool {
        true
    }
}
