//! Ball walk: candidates are drawn uniformly from a ball of radius
//! `step_size` centered on the current state.

use std::sync::Arc;

use nalgebra::DVector;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};

use convex_geometry::Polytope;

use crate::errors::{validate_positive, SamplerResult};
use crate::proposal::{Proposal, ProposalParameter};

pub struct BallWalk {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    proposal: Option<DVector<f64>>,
    step_size: f64,
}

impl BallWalk {
    pub fn new(polytope: Arc<Polytope>, state: DVector<f64>, step_size: f64) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        validate_positive(step_size, "step_size")?;
        Ok(Self {
            polytope,
            state,
            proposal: None,
            step_size,
        })
    }

    /// A point uniform in the `n`-ball of radius `r`: normalize a Gaussian
    /// vector, then rescale by `r * u^(1/n)` for `u` uniform on `[0, 1]`.
    fn sample_in_ball(&self, rng: &mut dyn RngCore) -> DVector<f64> {
        let n = self.polytope.dimension();
        let raw: Vec<f64> = (0..n).map(|_| StandardNormal.sample(rng)).collect();
        let direction = DVector::from_vec(raw);
        let direction = &direction / direction.norm();
        let u: f64 = rng.gen_range(0.0..1.0);
        let radius = self.step_size * u.powf(1.0 / n as f64);
        direction * radius
    }
}

impl Proposal for BallWalk {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let candidate = &self.state + self.sample_in_ball(rng);
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
        Some(self.step_size)
    }

    fn set_step_size(&mut self, value: f64) -> SamplerResult<()> {
        self.step_size = validate_positive(value, "step_size")?;
        Ok(())
    }

    fn parameter(&self, name: ProposalParameter) -> Option<f64> {
        match name {
            ProposalParameter::StepSize => Some(self.step_size),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;
    use convex_geometry::PolytopeMatrix;
    use nalgebra::DMatrix;

    fn unit_square() -> Arc<Polytope> {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        Arc::new(Polytope::new(PolytopeMatrix::Dense(a), b).unwrap())
    }

    #[test]
    fn far_candidate_outside_polytope_is_rejected_via_neg_infinity() {
        let polytope = unit_square();
        let mut rng = seeded(23);
        let mut walk =
            BallWalk::new(polytope, DVector::from_vec(vec![0.99, 0.0]), 1.0).unwrap();
        let mut saw_rejection = false;
        for _ in 0..200 {
            let (_, log_correction) = walk.propose(&mut rng).unwrap();
            if log_correction == f64::NEG_INFINITY {
                saw_rejection = true;
                break;
            }
        }
        assert!(saw_rejection);
    }

    #[test]
    fn step_size_round_trips() {
        let polytope = unit_square();
        let mut walk =
            BallWalk::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.1).unwrap();
        walk.set_step_size(0.5).unwrap();
        assert_eq!(walk.step_size(), Some(0.5));
    }
}
