//! Adaptive Metropolis (Haario et al., 2001): warms up with the
//! maximum-volume-ellipsoid covariance, then switches to a running estimate
//! of the accepted-state covariance, regularized by a small multiple of the
//! ellipsoid to keep the chain irreducible.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use convex_geometry::linalg::cholesky_lower;
use convex_geometry::{MaximumVolumeEllipsoid, Polytope};

use crate::errors::{validate_positive, SamplerError, SamplerResult};
use crate::proposal::{Proposal, ProposalParameter};

struct CachedCovariance {
    covariance: DMatrix<f64>,
    cholesky: DMatrix<f64>,
    log_sqrt_determinant: f64,
}

impl CachedCovariance {
    fn from_covariance(covariance: DMatrix<f64>) -> SamplerResult<Self> {
        let cholesky = cholesky_lower(&covariance)?;
        let log_sqrt_determinant = cholesky.diagonal().iter().map(|d| d.ln()).sum();
        Ok(Self {
            covariance,
            cholesky,
            log_sqrt_determinant,
        })
    }

    fn mahalanobis_squared(&self, diff: &DVector<f64>) -> SamplerResult<f64> {
        let solved = self.cholesky.clone().try_inverse().ok_or_else(|| {
            SamplerError::NumericFailure {
                operation: "adaptive_metropolis::mahalanobis_squared".to_string(),
                detail: "covariance Cholesky factor is not invertible".to_string(),
            }
        })? * diff;
        Ok(solved.norm_squared())
    }
}

pub struct AdaptiveMetropolis {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    proposal: Option<DVector<f64>>,
    state_mean: DVector<f64>,
    state_covariance: CachedCovariance,
    proposal_covariance: Option<CachedCovariance>,
    maximum_volume_ellipsoid: DMatrix<f64>,
    mve_cholesky_inv: DMatrix<f64>,
    t: u64,
    warm_up: u64,
    epsilon: f64,
    step_size: f64,
}

impl AdaptiveMetropolis {
    pub fn new(
        polytope: Arc<Polytope>,
        state: DVector<f64>,
        step_size: f64,
        epsilon: f64,
        warm_up: u64,
    ) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        validate_positive(step_size, "step_size")?;
        let n = polytope.dimension();

        let mve = MaximumVolumeEllipsoid::construct(
            &polytope.a().to_dense(),
            polytope.b(),
            10_000,
            &state,
            1e-10,
        )?;
        let maximum_volume_ellipsoid = mve.ellipsoid.clone();
        let mve_cholesky_inv = mve.rounding_transformation.clone().try_inverse().ok_or_else(|| {
            SamplerError::NumericFailure {
                operation: "adaptive_metropolis::new".to_string(),
                detail: "maximum-volume-ellipsoid Cholesky factor is not invertible".to_string(),
            }
        })?;

        let state_covariance = CachedCovariance::from_covariance(maximum_volume_ellipsoid.clone())?;

        Ok(Self {
            polytope,
            state: state.clone(),
            proposal: None,
            state_mean: state,
            state_covariance,
            proposal_covariance: None,
            maximum_volume_ellipsoid,
            mve_cholesky_inv,
            t: 0,
            warm_up,
            // scaled down with dimension, per Roberts & Rosenthal (2001).
            epsilon: epsilon / n as f64,
            step_size,
        })
    }

    fn update_covariance(
        &self,
        covariance: &DMatrix<f64>,
        mean: &DVector<f64>,
        new_state: &DVector<f64>,
    ) -> DMatrix<f64> {
        let t = self.t as f64;
        let new_mean = (mean * t + new_state) / (t + 1.0);
        ((covariance * (t - 1.0))
            + (mean * mean.transpose()) * t
            - (&new_mean * new_mean.transpose()) * (t + 1.0)
            + new_state * new_state.transpose()
            + &self.maximum_volume_ellipsoid * self.epsilon)
            / t
    }
}

impl Proposal for AdaptiveMetropolis {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let n = self.polytope.dimension();

        self.state_mean = (&self.state_mean * self.t as f64 + &self.state) / (self.t as f64 + 1.0);

        let noise: Vec<f64> = (0..n)
            .map(|_| self.step_size * StandardNormal.sample(rng) as f64)
            .collect();
        let xi = DVector::from_vec(noise);

        let candidate = if self.t > self.warm_up {
            &self.state + &self.state_covariance.cholesky * &xi
        } else {
            &self.state + self.epsilon * (&self.mve_cholesky_inv * &xi)
        };
        self.t += 1;

        if !self.polytope.contains(&candidate) {
            self.proposal = Some(candidate.clone());
            self.proposal_covariance = None;
            return Ok((candidate, f64::NEG_INFINITY));
        }

        let proposal_covariance_matrix =
            self.update_covariance(&self.state_covariance.covariance, &self.state_mean, &candidate);

        let log_correction = match CachedCovariance::from_covariance(proposal_covariance_matrix) {
            Err(_) => {
                self.proposal_covariance = None;
                f64::NEG_INFINITY
            }
            Ok(proposal_cov) => {
                let diff = &candidate - &self.state;
                let alpha = if self.t > self.warm_up {
                    let proposal_quad = proposal_cov.mahalanobis_squared(&diff)?;
                    let state_quad = self.state_covariance.mahalanobis_squared(&diff)?;
                    self.state_covariance.log_sqrt_determinant - proposal_cov.log_sqrt_determinant
                        - 0.5 * (proposal_quad - state_quad)
                } else {
                    0.0
                };
                self.proposal_covariance = Some(proposal_cov);
                alpha
            }
        };

        self.proposal = Some(candidate.clone());
        Ok((candidate, log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        self.state = self.proposal.take().expect("propose must precede accept");
        if let Some(cov) = self.proposal_covariance.take() {
            self.state_covariance = cov;
        }
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
            ProposalParameter::Epsilon => Some(self.epsilon),
            ProposalParameter::WarmUp => Some(self.warm_up as f64),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ProposalParameter, value: f64) -> SamplerResult<()> {
        match name {
            ProposalParameter::StepSize => self.set_step_size(value),
            ProposalParameter::Epsilon => {
                self.epsilon = validate_positive(value, "epsilon")?;
                Ok(())
            }
            ProposalParameter::WarmUp => {
                self.warm_up = value as u64;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
