//! Billiard walk: a long straight-line jump bounced back into the polytope
//! by the elastic billiard reflector, rather than a short local step.

use std::sync::Arc;

use nalgebra::DVector;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};

use convex_geometry::{Polytope, Reflector};

use crate::errors::{validate_positive, SamplerResult};
use crate::proposal::{Proposal, ProposalParameter};

pub struct BilliardWalk {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    proposal: Option<DVector<f64>>,
    step_size: f64,
    max_reflections: u64,
}

impl BilliardWalk {
    pub fn new(
        polytope: Arc<Polytope>,
        state: DVector<f64>,
        step_size: f64,
        max_reflections: u64,
    ) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        validate_positive(step_size, "step_size")?;
        Ok(Self {
            polytope,
            state,
            proposal: None,
            step_size,
            max_reflections,
        })
    }
}

impl Proposal for BilliardWalk {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let n = self.polytope.dimension();
        let raw: Vec<f64> = (0..n).map(|_| StandardNormal.sample(rng)).collect();
        let direction = DVector::from_vec(raw);
        let direction = &direction / direction.norm();

        let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
        let length = -self.step_size * u.ln();
        let tentative_end = &self.state + &direction * length;

        let outcome = Reflector::reflect_into_polytope(
            &self.polytope,
            &self.state,
            &tentative_end,
            self.max_reflections,
        );

        let log_correction = if outcome.converged && self.polytope.contains(&outcome.point) {
            0.0
        } else {
            f64::NEG_INFINITY
        };

        self.proposal = Some(outcome.point.clone());
        Ok((outcome.point, log_correction))
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
            ProposalParameter::MaxReflections => Some(self.max_reflections as f64),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ProposalParameter, value: f64) -> SamplerResult<()> {
        match name {
            ProposalParameter::StepSize => self.set_step_size(value),
            ProposalParameter::MaxReflections => {
                self.max_reflections = validate_positive(value, "max_reflections")? as u64;
                Ok(())
            }
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

    #[test]
    fn candidates_always_land_inside_the_polytope() {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        let polytope = Arc::new(Polytope::new(PolytopeMatrix::Dense(a), b).unwrap());
        let mut rng = seeded(37);
        let mut walk =
            BilliardWalk::new(polytope.clone(), DVector::from_vec(vec![0.0, 0.0]), 0.5, 50).unwrap();
        for _ in 0..100 {
            let (candidate, log_correction) = walk.propose(&mut rng).unwrap();
            if log_correction == 0.0 {
                assert!(polytope.contains(&candidate));
            }
            walk.accept();
        }
    }
}
