//! Grid-search step-size tuning against expected squared jump distance.
//! Ported from `original_source`'s `SimpleExpectedSquaredJumpDistanceTuner`:
//! evaluate a fixed grid of candidate step sizes, run each for a fixed
//! number of draws, and keep whichever yields the largest ESJD.

use rand::RngCore;

use crate::diagnostics::esjd::expected_squared_jump_distance;
use crate::errors::{validate_ordered, validate_positive, SamplerError, SamplerResult};
use crate::proposal::Proposal;

#[derive(Debug, Clone, Copy)]
pub struct EsjdTunerParameters {
    pub iterations_to_test_step_size: u64,
    pub step_size_grid_size: u64,
    pub step_size_lower_bound: f64,
    pub step_size_upper_bound: f64,
    /// When set, a candidate's score is its ESJD divided by its step size,
    /// penalizing large steps the way a wall-clock-aware search would
    /// penalize proposals that cost more per draw.
    pub consider_time_cost: bool,
}

impl EsjdTunerParameters {
    pub fn new(
        iterations_to_test_step_size: u64,
        step_size_grid_size: u64,
        step_size_lower_bound: f64,
        step_size_upper_bound: f64,
        consider_time_cost: bool,
    ) -> SamplerResult<Self> {
        validate_ordered(
            step_size_lower_bound,
            step_size_upper_bound,
            "step_size_lower_bound",
            "step_size_upper_bound",
        )?;
        validate_positive(step_size_lower_bound, "step_size_lower_bound")?;
        if step_size_grid_size < 2 {
            return Err(SamplerError::InvalidParameter {
                name: "step_size_grid_size".to_string(),
                reason: "must be at least 2 to bracket the search interval".to_string(),
            });
        }
        if iterations_to_test_step_size < 2 {
            return Err(SamplerError::InvalidParameter {
                name: "iterations_to_test_step_size".to_string(),
                reason: "must be at least 2 to form a single jump".to_string(),
            });
        }
        Ok(Self {
            iterations_to_test_step_size,
            step_size_grid_size,
            step_size_lower_bound,
            step_size_upper_bound,
            consider_time_cost,
        })
    }
}

pub struct EsjdTuningOutcome {
    pub step_size: f64,
    pub expected_squared_jump_distance: f64,
}

/// Evaluates every candidate step size in the grid and leaves `proposal` set
/// to whichever scored highest.
pub fn tune<P: Proposal>(
    proposal: &mut P,
    rng: &mut dyn RngCore,
    parameters: &EsjdTunerParameters,
) -> SamplerResult<EsjdTuningOutcome> {
    let grid = step_size_grid(parameters);

    let mut best_step_size = grid[0];
    let mut best_score = f64::NEG_INFINITY;
    let mut best_esjd = 0.0;

    for step_size in grid {
        proposal.set_step_size(step_size)?;
        let esjd = measure_esjd(proposal, rng, parameters.iterations_to_test_step_size)?;
        let score = if parameters.consider_time_cost {
            esjd / step_size
        } else {
            esjd
        };
        if score > best_score {
            best_score = score;
            best_step_size = step_size;
            best_esjd = esjd;
        }
    }

    proposal.set_step_size(best_step_size)?;
    Ok(EsjdTuningOutcome {
        step_size: best_step_size,
        expected_squared_jump_distance: best_esjd,
    })
}

fn step_size_grid(parameters: &EsjdTunerParameters) -> Vec<f64> {
    let n = parameters.step_size_grid_size;
    let lower = parameters.step_size_lower_bound;
    let upper = parameters.step_size_upper_bound;
    (0..n)
        .map(|i| lower + (upper - lower) * i as f64 / (n - 1) as f64)
        .collect()
}

fn measure_esjd<P: Proposal>(
    proposal: &mut P,
    rng: &mut dyn RngCore,
    iterations: u64,
) -> SamplerResult<f64> {
    let mut draws = Vec::with_capacity(iterations as usize);
    draws.push(proposal.state().clone());
    for _ in 0..iterations {
        let (_, log_correction) = proposal.propose(rng)?;
        let log_acceptance_chance: f64 = rand::Rng::gen::<f64>(rng).ln();
        if log_acceptance_chance < log_correction {
            proposal.accept();
        }
        draws.push(proposal.state().clone());
    }
    Ok(expected_squared_jump_distance(&draws))
}
