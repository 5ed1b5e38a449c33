//! Metropolis-Hastings acceptance filter: wraps any [`Proposal`] and turns
//! its raw `(candidate, log_correction)` pair into an accept/reject decision
//! by comparing `log(u)` against the log-acceptance probability. Ported from
//! `original_source`'s `MetropolisHastingsFilter`, which layers this same
//! decision on top of whatever proposer it wraps via inheritance; here the
//! wrapping is composition over the `Proposal` trait instead.

use nalgebra::DVector;
use rand::Rng;
use rand::RngCore;

use crate::errors::SamplerResult;
use crate::proposal::{Proposal, ProposalParameter};

pub struct MetropolisHastingsFilter<P: Proposal> {
    inner: P,
    num_proposals: u64,
    num_accepted: u64,
    last_log_acceptance_probability: f64,
}

impl<P: Proposal> MetropolisHastingsFilter<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            num_proposals: 0,
            num_accepted: 0,
            last_log_acceptance_probability: f64::NEG_INFINITY,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    pub fn num_proposals(&self) -> u64 {
        self.num_proposals
    }

    pub fn num_accepted(&self) -> u64 {
        self.num_accepted
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.num_proposals == 0 {
            0.0
        } else {
            self.num_accepted as f64 / self.num_proposals as f64
        }
    }

    pub fn clear_records(&mut self) {
        self.num_proposals = 0;
        self.num_accepted = 0;
    }

    pub fn last_log_acceptance_probability(&self) -> f64 {
        self.last_log_acceptance_probability
    }

    /// Draws a candidate, makes the accept/reject decision and returns
    /// `(state, accepted)`. This is the counterpart of the original's
    /// combined `draw`; a chain driver that wants only the raw MH decision
    /// without the rest of the `Proposal` plumbing can call this directly.
    pub fn draw(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, bool)> {
        let (_candidate, log_correction) = self.inner.propose(rng)?;
        self.num_proposals += 1;
        self.last_log_acceptance_probability = log_correction;

        let log_acceptance_chance: f64 = rng.gen::<f64>().ln();
        if log_acceptance_chance < log_correction {
            let state = self.inner.accept();
            self.num_accepted += 1;
            Ok((state, true))
        } else {
            Ok((self.inner.state().clone(), false))
        }
    }
}

impl<P: Proposal> Proposal for MetropolisHastingsFilter<P> {
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        self.inner.propose(rng)
    }

    fn accept(&mut self) -> DVector<f64> {
        self.inner.accept()
    }

    fn set_state(&mut self, x: DVector<f64>) -> SamplerResult<()> {
        self.inner.set_state(x)
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
        self.inner.is_model_aware()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::gaussian::GaussianProposal;
    use crate::rng::seeded;
    use convex_geometry::{Polytope, PolytopeMatrix};
    use nalgebra::DMatrix;
    use std::sync::Arc;

    fn unit_square() -> Arc<Polytope> {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        Arc::new(Polytope::new(PolytopeMatrix::Dense(a), b).unwrap())
    }

    #[test]
    fn acceptance_rate_is_between_zero_and_one_after_many_draws() {
        let polytope = unit_square();
        let walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.4).unwrap();
        let mut filter = MetropolisHastingsFilter::new(walk);
        let mut rng = seeded(7);
        for _ in 0..200 {
            filter.draw(&mut rng).unwrap();
        }
        let rate = filter.acceptance_rate();
        assert!((0.0..=1.0).contains(&rate));
        assert!(rate > 0.0);
    }

    #[test]
    fn always_rejecting_proposal_never_moves_the_state() {
        let polytope = unit_square();
        // A huge step size pushes candidates outside the unit square almost
        // always, so the state should rarely if ever move.
        let walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 50.0).unwrap();
        let mut filter = MetropolisHastingsFilter::new(walk);
        let mut rng = seeded(11);
        let mut accepted_any = false;
        for _ in 0..50 {
            let (_, accepted) = filter.draw(&mut rng).unwrap();
            accepted_any |= accepted;
        }
        assert!(!accepted_any);
        assert_eq!(filter.acceptance_rate(), 0.0);
    }

    #[test]
    fn clear_records_resets_acceptance_rate_bookkeeping() {
        let polytope = unit_square();
        let walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.4).unwrap();
        let mut filter = MetropolisHastingsFilter::new(walk);
        let mut rng = seeded(13);
        for _ in 0..20 {
            filter.draw(&mut rng).unwrap();
        }
        filter.clear_records();
        assert_eq!(filter.acceptance_rate(), 0.0);
    }
}
