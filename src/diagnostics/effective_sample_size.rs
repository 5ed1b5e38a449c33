//! Multi-chain effective sample size, ported from `original_source`'s
//! `computeEffectiveSampleSize`: within/between chain variance feed a
//! Geyer-style initial monotone sequence estimator for the integrated
//! autocorrelation time (Vehtari et al. 2020), capped at `N log10(N)`.

use nalgebra::DVector;

use crate::diagnostics::autocorrelation::compute_autocorrelations;
use crate::errors::{SamplerError, SamplerResult};

/// Effective sample size of coordinate `dimension` pooled across `chains`,
/// each chain a vector of equal-length draws.
pub fn compute_effective_sample_size(chains: &[Vec<DVector<f64>>], dimension: usize) -> SamplerResult<f64> {
    let num_chains = chains.len();
    if num_chains == 0 {
        return Err(SamplerError::InvalidParameter {
            name: "chains".to_string(),
            reason: "no chains supplied".to_string(),
        });
    }
    let num_draws = chains[0].len();
    if num_draws == 0 {
        return Err(SamplerError::InvalidParameter {
            name: "chains".to_string(),
            reason: "no draws in chains".to_string(),
        });
    }

    let mut intra_chain_expectations = vec![0.0; num_chains];
    let mut inter_chain_expectation = 0.0;
    for (m, chain) in chains.iter().enumerate() {
        for draw in chain {
            intra_chain_expectations[m] += draw[dimension];
        }
        inter_chain_expectation += intra_chain_expectations[m];
        intra_chain_expectations[m] /= num_draws as f64;
    }
    inter_chain_expectation /= (num_chains * num_draws) as f64;

    let mut between_chain_variance = 0.0;
    let mut sample_variances = vec![0.0; num_chains];
    let mut within_chain_variance = 0.0;
    for (m, chain) in chains.iter().enumerate() {
        between_chain_variance += (intra_chain_expectations[m] - inter_chain_expectation).powi(2);
        for draw in chain {
            sample_variances[m] += (draw[dimension] - intra_chain_expectations[m]).powi(2);
        }
        within_chain_variance += sample_variances[m];
        sample_variances[m] /= (num_draws - 1) as f64;
    }

    if num_chains > 1 {
        between_chain_variance *= num_draws as f64;
        between_chain_variance /= (num_chains - 1) as f64;
    } else {
        between_chain_variance = 0.0;
    }
    within_chain_variance /= ((num_draws - 1) * num_chains) as f64;
    let variance_estimate =
        ((num_draws - 1) as f64 * within_chain_variance + between_chain_variance) / num_draws as f64;

    let autocorrelations: Vec<Vec<f64>> = chains
        .iter()
        .map(|chain| compute_autocorrelations(chain, dimension))
        .collect();

    let mut rho_hat: Vec<f64> = Vec::new();
    let mut rho_hat_even = 1.0;
    for t in 0..num_draws / 2 {
        let mut autocovariance = 0.0;
        for m in 0..num_chains {
            autocovariance += (num_draws - 1) as f64 * sample_variances[m] * autocorrelations[m][2 * t];
        }
        autocovariance /= (num_chains * num_draws) as f64;
        rho_hat_even = if t == 0 {
            1.0
        } else {
            1.0 - (within_chain_variance - autocovariance) / variance_estimate
        };

        let mut autocovariance = 0.0;
        for m in 0..num_chains {
            autocovariance += (num_draws - 1) as f64 * sample_variances[m] * autocorrelations[m][2 * t + 1];
        }
        autocovariance /= (num_chains * num_draws) as f64;
        let rho_hat_odd = 1.0 - (within_chain_variance - autocovariance) / variance_estimate;

        if rho_hat_even + rho_hat_odd <= 0.0 {
            break;
        }
        rho_hat.push(rho_hat_even);
        rho_hat.push(rho_hat_odd);
    }
    if rho_hat_even > 0.0 {
        rho_hat.push(rho_hat_even);
    }

    // Turn the initial positive sequence into an initial monotone sequence.
    if rho_hat.len() >= 4 {
        for t in 1..(rho_hat.len() - 2) / 2 {
            if rho_hat[2 * t] + rho_hat[2 * t + 1] > rho_hat[2 * t - 2] + rho_hat[2 * t - 1] {
                let averaged = (rho_hat[2 * t - 2] + rho_hat[2 * t - 1]) / 2.0;
                rho_hat[2 * t] = averaged;
                rho_hat[2 * t + 1] = averaged;
            }
        }
    }

    let mut tau_hat = -1.0;
    for t in 0..rho_hat.len() / 2 {
        tau_hat += 2.0 * (rho_hat[2 * t] + rho_hat[2 * t + 1]);
    }
    if rho_hat.len() % 2 == 1 {
        tau_hat += rho_hat[rho_hat.len() - 1];
    }

    let total_draws = (num_draws * num_chains) as f64;
    Ok((total_draws / tau_hat).min(total_draws * total_draws.log10()))
}
