//! Gaussian proposal: candidates are `x + sigma * N(0, I)`, rejected outright
//! (`-inf`) when they fall outside the polytope.

use std::sync::Arc;

use nalgebra::DVector;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use convex_geometry::Polytope;

use crate::errors::{validate_positive, SamplerResult};
use crate::proposal::{Proposal, ProposalParameter};

pub struct GaussianProposal {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    proposal: Option<DVector<f64>>,
    sigma: f64,
}

impl GaussianProposal {
    pub fn new(polytope: Arc<Polytope>, state: DVector<f64>, sigma: f64) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        validate_positive(sigma, "sigma")?;
        Ok(Self {
            polytope,
            state,
            proposal: None,
            sigma,
        })
    }
}

impl Proposal for GaussianProposal {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let n = self.polytope.dimension();
        let noise: Vec<f64> = (0..n).map(|_| StandardNormal.sample(rng)).collect();
        let candidate = &self.state + DVector::from_vec(noise) * self.sigma;
        let log_correction = if self.polytope.contains(&candidate) {
            0.0
        } else {
            f64::NEG_INFINITY
        };
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

    fn step_size(&self) -> Option<f64> {
        Some(self.sigma)
    }

    fn set_step_size(&mut self, value: f64) -> SamplerResult<()> {
        self.sigma = validate_positive(value, "sigma")?;
        Ok(())
    }

    fn parameter(&self, name: ProposalParameter) -> Option<f64> {
        match name {
            ProposalParameter::StepSize => Some(self.sigma),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ProposalParameter, value: f64) -> SamplerResult<()> {
        match name {
            ProposalParameter::StepSize => self.set_step_size(value),
            _ => Ok(()),
        }
    }
}
