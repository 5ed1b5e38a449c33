//! Coordinate Hit-and-Run: cycles through axes round-robin, sampling a 1-D
//! step along the current coordinate from the chord's feasible interval.

use std::sync::Arc;

use nalgebra::DVector;
use rand::RngCore;

use convex_geometry::Polytope;

use crate::errors::{SamplerError, SamplerResult};
use crate::proposal::chord::ChordStepDistribution;
use crate::proposal::{Proposal, ProposalParameter};

pub struct CoordinateHitAndRun<D: ChordStepDistribution> {
    polytope: Arc<Polytope>,
    state: DVector<f64>,
    slacks: DVector<f64>,
    proposal: Option<DVector<f64>>,
    next_axis: usize,
    pending: Option<(usize, f64)>,
    step_distribution: D,
}

impl<D: ChordStepDistribution> CoordinateHitAndRun<D> {
    pub fn new(polytope: Arc<Polytope>, state: DVector<f64>, step_distribution: D) -> SamplerResult<Self> {
        polytope.check_starting_point(&state)?;
        let slacks = polytope.slacks(&state);
        Ok(Self {
            polytope,
            state,
            slacks,
            proposal: None,
            next_axis: 0,
            pending: None,
            step_distribution,
        })
    }

    /// `(backward, forward)` admissible interval along axis `i` at the
    /// current slacks: `forward = 1 / max(A[:,i] / s)`,
    /// `backward = 1 / min(A[:,i] / s)`.
    fn chord_bounds(&self, axis: usize, slacks: &DVector<f64>) -> (f64, f64) {
        let column = self.polytope.a().column(axis);
        let ratios: Vec<f64> = column
            .iter()
            .zip(slacks.iter())
            .map(|(&a_ij, &s_i)| a_ij / s_i)
            .collect();
        let max_ratio = ratios.iter().cloned().fold(f64::MIN, f64::max);
        let min_ratio = ratios.iter().cloned().fold(f64::MAX, f64::min);
        (1.0 / min_ratio, 1.0 / max_ratio)
    }
}

impl<D: ChordStepDistribution> Proposal for CoordinateHitAndRun<D> {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let axis = self.next_axis;
        let (backward, forward) = self.chord_bounds(axis, &self.slacks);
        let t = self.step_distribution.draw(rng, backward, forward)?;

        let mut candidate = self.state.clone();
        candidate[axis] += t;

        let candidate_slacks = &self.slacks - self.polytope.a().column(axis) * t;
        let (backward_at_candidate, forward_at_candidate) =
            self.chord_bounds(axis, &candidate_slacks);
        let log_correction =
            self.step_distribution
                .log_correction(backward, forward, backward_at_candidate, forward_at_candidate);

        self.pending = Some((axis, t));
        self.proposal = Some(candidate.clone());
        Ok((candidate, log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        let (axis, t) = self.pending.take().expect("propose must precede accept");
        self.state[axis] += t;
        self.slacks -= self.polytope.a().column(axis) * t;
        self.next_axis = (axis + 1) % self.polytope.dimension();
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

    fn parameter(&self, name: ProposalParameter) -> Option<f64> {
        match name {
            ProposalParameter::StepSize => self.step_size(),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ProposalParameter, value: f64) -> SamplerResult<()> {
        match name {
            ProposalParameter::StepSize => self.set_step_size(value),
            _ => Err(SamplerError::InvalidParameter {
                name: format!("{name:?}"),
                reason: "not supported by CoordinateHitAndRun".to_string(),
            }),
        }
    }
}
