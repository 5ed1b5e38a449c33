//! Hit-and-Run: samples a uniform direction on the unit sphere, then a 1-D
//! step along that direction from the chord distribution.

use std::sync::Arc;

use nalgebra::DVector;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use convex_geometry::Polytope;

use crate::errors::{SamplerError, SamplerResult};
use crate::proposal::chord::ChordStepDistribution;
use crate::proposal::{Proposal, ProposalParameter};

pub struct HitAndRun<D: ChordStepDistribution> {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    slacks: DVector<f64>,
    proposal: Option<DVector<f64>>,
    pending: Option<(DVector<f64>, f64)>,
    step_distribution: D,
    /// Recompute `s = b - A x` on acceptance instead of updating
    /// incrementally, rejecting if any slack has drifted negative.
    precise: bool,
}

impl<D: ChordStepDistribution> HitAndRun<D> {
    pub fn new(
        polytope: Arc<Polytope>,
        state: DVector<f64>,
        step_distribution: D,
        precise: bool,
    ) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        let slacks = polytope.slacks(&state);
        Ok(Self {
            polytope,
            state,
            slacks,
            proposal: None,
            pending: None,
            step_distribution,
            precise,
        })
    }

    fn sample_direction(&self, rng: &mut dyn RngCore) -> DVector<f64> {
        let n = self.polytope.dimension();
        let raw: Vec<f64> = (0..n).map(|_| StandardNormal.sample(rng)).collect();
        let v = DVector::from_vec(raw);
        let norm = v.norm();
        v / norm
    }

    fn chord_bounds(&self, direction: &DVector<f64>, slacks: &DVector<f64>) -> (f64, f64) {
        let a_dir = self.polytope.a().mul_vec(direction);
        let ratios: Vec<f64> = a_dir
            .iter()
            .zip(slacks.iter())
            .map(|(&a_i, &s_i)| a_i / s_i)
            .collect();
        let max_ratio = ratios.iter().cloned().fold(f64::MIN, f64::max);
        let min_ratio = ratios.iter().cloned().fold(f64::MAX, f64::min);
        (1.0 / min_ratio, 1.0 / max_ratio)
    }
}

impl<D: ChordStepDistribution> Proposal for HitAndRun<D> {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let direction = self.sample_direction(rng);
        let (backward, forward) = self.chord_bounds(&direction, &self.slacks);
        let t = self.step_distribution.draw(rng, backward, forward)?;

        let candidate = &self.state + &direction * t;
        let candidate_slacks = self.polytope.slacks(&candidate);

        self.pending = Some((direction.clone(), t));
        self.proposal = Some(candidate.clone());

        // Precise mode's floating-point-drift guard: a recomputed slack that
        // has gone negative means the candidate is no longer inside the
        // polytope, and must be rejected rather than silently committed.
        if self.precise && candidate_slacks.iter().any(|&s| s < 0.0) {
            return Ok((candidate, f64::NEG_INFINITY));
        }

        let (backward_at_candidate, forward_at_candidate) =
            self.chord_bounds(&(-&direction), &candidate_slacks);
        let log_correction = self.step_distribution.log_correction(
            backward,
            forward,
            backward_at_candidate,
            forward_at_candidate,
        );

        Ok((candidate, log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        let (direction, t) = self.pending.take().expect("propose must precede accept");
        let candidate = &self.state + &direction * t;
        if self.precise {
            self.slacks = self.polytope.slacks(&candidate);
        } else {
            self.slacks -= self.polytope.a().mul_vec(&direction) * t;
        }
        self.state = candidate;
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

    fn set_parameter(&mut self, name: ProposalParameter, _value: f64) -> SamplerResult<()> {
        Err(SamplerError::InvalidParameter {
            name: format!("{name:?}"),
            reason: "not supported by HitAndRun".to_string(),
        })
    }
}
