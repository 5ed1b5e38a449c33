//! Proposal kernels: the `Proposal` trait every Markov-chain move implements,
//! the stable `ProposalParameter` dictionary keys, and the chord-sampling
//! building block shared by the coordinate-wise kernels.

pub mod chord;
pub mod coordinate_hit_and_run;
pub mod hit_and_run;
pub mod ball_walk;
pub mod gaussian;
pub mod dikin_walk;
pub mod adaptive_metropolis;
pub mod truncated_gaussian;
pub mod billiard_walk;
pub mod csmmala;
pub mod mh_filter;
pub mod model_aware;
pub mod state_transform;
pub mod reversible_jump;

use nalgebra::DVector;
use rand::RngCore;

use crate::errors::SamplerResult;

/// Stable, externally-visible names for the tunable knobs a kernel may
/// expose through [`Proposal::parameter`]/[`Proposal::set_parameter`].
/// Mirrors spec §4.1's parameter dictionary one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalParameter {
    StepSize,
    FisherWeight,
    BoundaryCushion,
    Epsilon,
    WarmUp,
    MaxReflections,
    ModelJumpProbability,
    ActivationProbability,
    DeactivationProbability,
    Coldness,
}

/// Every Markov-chain move: propose a candidate with its MH log-correction,
/// commit or discard it, and expose state for the filter/chain driver that
/// wraps it. `log_correction` is `log q(x | x') - log q(x' | x)`, 0 for
/// symmetric kernels; a model-aware kernel folds the target log-density
/// difference into this value directly (see `ModelAware`).
pub trait Proposal {
    /// Draws a candidate and returns `(candidate, log_correction)`. Does not
    /// mutate the kernel's committed state — call [`Proposal::accept`] to
    /// commit, or simply drop the candidate to reject.
    fn propose(&mut self, rng: &mut dyn RngCore) -> SamplerResult<(DVector<f64>, f64)>;

    /// Commits the most recently proposed candidate as the new state and
    /// returns it. Panics if called without a prior `propose` — the chain
    /// driver is the only caller and always pairs the two.
    fn accept(&mut self) -> DVector<f64>;

    fn set_state(&mut self, x: DVector<f64>) -> SamplerResult<()>;
    fn state(&self) -> &DVector<f64>;

    /// The last proposed (not necessarily accepted) candidate, if any.
    fn proposal(&self) -> Option<&DVector<f64>>;

    fn step_size(&self) -> Option<f64> {
        None
    }
    fn set_step_size(&mut self, _value: f64) -> SamplerResult<()> {
        Ok(())
    }

    fn parameter(&self, _name: ProposalParameter) -> Option<f64> {
        None
    }
    fn set_parameter(&mut self, _name: ProposalParameter, _value: f64) -> SamplerResult<()> {
        Ok(())
    }

    /// Whether this kernel's `log_correction` already folds in a target's
    /// log-density difference, so the MH filter must not add it again.
    fn is_model_aware(&self) -> bool {
        false
    }
}
