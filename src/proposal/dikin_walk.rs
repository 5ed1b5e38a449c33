//! Dikin walk: proposes along the local ellipsoidal (Dikin) metric
//! `H(x) = A^T diag(1/s^2) A`, which flattens out as the state nears the
//! polytope boundary.

use std::sync::Arc;

use nalgebra::DVector;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use convex_geometry::linalg::{cholesky_lower, log_determinant_spd};
use convex_geometry::Polytope;

use crate::errors::{validate_positive, SamplerError, SamplerResult};
use crate::proposal::{Proposal, ProposalParameter};

pub struct DikinWalk {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    slacks: DVector<f64>,
    proposal: Option<DVector<f64>>,
    proposal_slacks: Option<DVector<f64>>,
    sigma: f64,
}

impl DikinWalk {
    pub fn new(polytope: Arc<Polytope>, state: DVector<f64>, sigma: f64) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        validate_positive(sigma, "sigma")?;
        let slacks = polytope.slacks(&state);
        Ok(Self {
            polytope,
            state,
            slacks,
            proposal: None,
            proposal_slacks: None,
            sigma,
        })
    }

}

impl Proposal for DikinWalk {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let n = self.polytope.dimension();
        let h_x = self.polytope.dikin_metric(&self.state);
        let l_x = cholesky_lower(&h_x)?;
        let l_x_inv = l_x.clone().try_inverse().ok_or_else(|| SamplerError::NumericFailure {
            operation: "dikin_walk::propose".to_string(),
            detail: "Dikin metric Cholesky factor is not invertible at the current state".to_string(),
        })?;

        let noise: Vec<f64> = (0..n).map(|_| StandardNormal.sample(rng)).collect();
        let xi = DVector::from_vec(noise);
        let candidate = &self.state + (self.sigma / (n as f64).sqrt()) * (l_x_inv.transpose() * &xi);

        if !self.polytope.contains(&candidate) {
            self.proposal = Some(candidate.clone());
            self.proposal_slacks = None;
            return Ok((candidate, f64::NEG_INFINITY));
        }

        let candidate_slacks = self.polytope.slacks(&candidate);
        let h_y = self.polytope.dikin_metric(&candidate);
        let log_correction = match cholesky_lower(&h_y) {
            Err(_) => f64::NEG_INFINITY,
            Ok(_) => {
                let log_det_hx = log_determinant_spd(&h_x)?;
                let log_det_hy = log_determinant_spd(&h_y)?;
                let diff = &self.state - &candidate;
                let quad_x = (diff.transpose() * &h_x * &diff)[(0, 0)];
                let quad_y = (diff.transpose() * &h_y * &diff)[(0, 0)];
                0.5 * log_det_hy - 0.5 * log_det_hx
                    + (n as f64 / (2.0 * self.sigma * self.sigma)) * (quad_x - quad_y)
            }
        };

        self.proposal = Some(candidate.clone());
        self.proposal_slacks = Some(candidate_slacks);
        Ok((candidate, log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        self.state = self.proposal.take().expect("propose must precede accept");
        self.slacks = self
            .proposal_slacks
            .take()
            .unwrap_or_else(|| self.polytope.slacks(&self.state));
        self.state.clone()
    }

    fn set_state(&mut self, x: DVector<f64>) -> SamplerResult<()> {
        self.polytope.check_starting_point(&x)?;
        self.slacks = self.polytope.slacks(&x);
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
    fn candidates_stay_inside_polytope() {
        let polytope = unit_square();
        let mut rng = seeded(31);
        let mut walk = DikinWalk::new(polytope.clone(), DVector::from_vec(vec![0.0, 0.0]), 0.3).unwrap();
        for _ in 0..100 {
            let (candidate, log_correction) = walk.propose(&mut rng).unwrap();
            if log_correction.is_finite() {
                assert!(polytope.contains(&candidate));
            }
            walk.accept();
        }
    }

    #[test]
    fn metric_near_center_is_well_conditioned_identity_like() {
        let polytope = unit_square();
        let origin = DVector::from_vec(vec![0.0, 0.0]);
        let h = polytope.dikin_metric(&origin);
        assert!((h[(0, 0)] - 2.0).abs() < 1e-9);
        assert!(h[(0, 1)].abs() < 1e-9);
    }
}
