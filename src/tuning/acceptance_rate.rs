//! Nested-interval step-size tuning against a target acceptance-rate band.
//! Ported from `original_source`'s `AcceptanceRateTuner`: repeatedly measures
//! the acceptance rate over a fixed number of draws, halves the bracketing
//! interval toward whichever side the measured rate missed on, and stops
//! once the rate lands in band or a total iteration budget is exhausted.

use rand::RngCore;

use crate::errors::{validate_ordered, validate_positive, SamplerError, SamplerResult};
use crate::proposal::Proposal;

#[derive(Debug, Clone, Copy)]
pub struct AcceptanceRateTunerParameters {
    pub lower_limit_acceptance_rate: f64,
    pub upper_limit_acceptance_rate: f64,
    pub lower_limit_step_size: f64,
    pub upper_limit_step_size: f64,
    pub iterations_to_test_step_size: u64,
    pub maximum_total_iterations: u64,
}

impl AcceptanceRateTunerParameters {
    pub fn new(
        lower_limit_acceptance_rate: f64,
        upper_limit_acceptance_rate: f64,
        lower_limit_step_size: f64,
        upper_limit_step_size: f64,
        iterations_to_test_step_size: u64,
        maximum_total_iterations: u64,
    ) -> SamplerResult<Self> {
        validate_ordered(
            lower_limit_acceptance_rate,
            upper_limit_acceptance_rate,
            "lower_limit_acceptance_rate",
            "upper_limit_acceptance_rate",
        )?;
        validate_ordered(
            lower_limit_step_size,
            upper_limit_step_size,
            "lower_limit_step_size",
            "upper_limit_step_size",
        )?;
        validate_positive(lower_limit_step_size, "lower_limit_step_size")?;
        if iterations_to_test_step_size == 0 {
            return Err(SamplerError::InvalidParameter {
                name: "iterations_to_test_step_size".to_string(),
                reason: "must be nonzero".to_string(),
            });
        }
        Ok(Self {
            lower_limit_acceptance_rate,
            upper_limit_acceptance_rate,
            lower_limit_step_size,
            upper_limit_step_size,
            iterations_to_test_step_size,
            maximum_total_iterations,
        })
    }
}

enum Case {
    TooLow,
    TooHigh,
    Good,
}

fn classify(rate: f64, parameters: &AcceptanceRateTunerParameters) -> Case {
    if rate < parameters.lower_limit_acceptance_rate {
        Case::TooLow
    } else if rate > parameters.upper_limit_acceptance_rate {
        Case::TooHigh
    } else {
        Case::Good
    }
}

fn next_step_size(
    current: f64,
    measured_rate: f64,
    bracket: &mut (f64, f64),
    parameters: &AcceptanceRateTunerParameters,
) -> f64 {
    match classify(measured_rate, parameters) {
        Case::TooHigh => {
            if current > bracket.0 {
                bracket.0 = current;
            }
            if bracket.1.is_infinite() {
                current * 2.0
            } else {
                (current + bracket.1) / 2.0
            }
        }
        Case::TooLow => {
            if current < bracket.1 {
                bracket.1 = current;
            }
            (current + bracket.0) / 2.0
        }
        Case::Good => current,
    }
}

/// Result of a tuning run: the step size settled on and the acceptance rate
/// measured with it. `converged` is `false` when the iteration budget ran
/// out before the rate landed inside the target band (the step size is
/// still the last one tried, same as the reference implementation leaving
/// it in place on an unconverged return).
pub struct TuningOutcome {
    pub step_size: f64,
    pub acceptance_rate: f64,
    pub converged: bool,
}

/// Tunes `proposal`'s step size by nested-interval search so that its
/// measured acceptance rate lands within
/// `[lower_limit_acceptance_rate, upper_limit_acceptance_rate]`.
pub fn tune<P: Proposal>(
    proposal: &mut P,
    rng: &mut dyn RngCore,
    parameters: &AcceptanceRateTunerParameters,
) -> SamplerResult<TuningOutcome> {
    let mut step_size = proposal
        .step_size()
        .unwrap_or(parameters.lower_limit_step_size);
    let mut bracket = (parameters.lower_limit_step_size, parameters.upper_limit_step_size);

    let mut current_acceptance_rate = 0.0;
    let mut iterations_count: u64 = 0;

    while !matches!(classify(current_acceptance_rate, parameters), Case::Good) {
        if iterations_count > parameters.maximum_total_iterations {
            return Ok(TuningOutcome {
                step_size,
                acceptance_rate: current_acceptance_rate,
                converged: false,
            });
        }

        proposal.set_step_size(step_size)?;
        current_acceptance_rate = measure_acceptance_rate(proposal, rng, parameters.iterations_to_test_step_size)?;
        iterations_count += parameters.iterations_to_test_step_size;
        step_size = next_step_size(step_size, current_acceptance_rate, &mut bracket, parameters);
    }

    Ok(TuningOutcome {
        step_size,
        acceptance_rate: current_acceptance_rate,
        converged: true,
    })
}

/// Draws `iterations` times from `proposal`, applying the Metropolis-Hastings
/// accept/reject decision inline (a `MetropolisHastingsFilter` would need to
/// take ownership of `proposal`, which a tuner borrowing it can't give up),
/// and returns the fraction accepted.
fn measure_acceptance_rate<P: Proposal>(
    proposal: &mut P,
    rng: &mut dyn RngCore,
    iterations: u64,
) -> SamplerResult<f64> {
    let mut accepted = 0u64;
    for _ in 0..iterations {
        let (_, log_correction) = proposal.propose(rng)?;
        let log_acceptance_chance: f64 = rand::Rng::gen::<f64>(rng).ln();
        if log_acceptance_chance < log_correction {
            proposal.accept();
            accepted += 1;
        }
    }
    Ok(accepted as f64 / iterations as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::gaussian::GaussianProposal;
    use crate::rng::seeded;
    use convex_geometry::{Polytope, PolytopeMatrix};
    use nalgebra::{DMatrix, DVector};
    use std::sync::Arc;

    fn unit_square() -> Arc<Polytope> {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        Arc::new(Polytope::new(PolytopeMatrix::Dense(a), b).unwrap())
    }

    #[test]
    fn tunes_step_size_into_the_target_band() {
        let polytope = unit_square();
        let mut walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 2.0).unwrap();
        let parameters =
            AcceptanceRateTunerParameters::new(0.2, 0.3, 1e-4, 10.0, 200, 10_000).unwrap();
        let mut rng = seeded(23);
        let outcome = tune(&mut walk, &mut rng, &parameters).unwrap();
        assert!(outcome.converged);
        assert!((parameters.lower_limit_acceptance_rate..=parameters.upper_limit_acceptance_rate)
            .contains(&outcome.acceptance_rate));
    }

    #[test]
    fn rejects_inverted_acceptance_rate_band() {
        assert!(AcceptanceRateTunerParameters::new(0.5, 0.2, 1e-4, 10.0, 200, 10_000).is_err());
    }
}
