//! Potential scale reduction factor (Gelman-Rubin R-hat), built from the same
//! within/between-chain variance decomposition `original_source`'s
//! `EffectiveSampleSize.hpp` computes before estimating the integrated
//! autocorrelation time.

use nalgebra::DVector;

use crate::errors::{SamplerError, SamplerResult};

/// `sqrt(varianceEstimate / withinChainVariance)` for coordinate `dimension`,
/// pooled across `chains`. Values near `1.0` indicate the chains agree on the
/// marginal's scale; values well above it indicate they have not mixed.
pub fn potential_scale_reduction_factor(chains: &[Vec<DVector<f64>>], dimension: usize) -> SamplerResult<f64> {
    let num_chains = chains.len();
    if num_chains < 2 {
        return Err(SamplerError::InvalidParameter {
            name: "chains".to_string(),
            reason: "at least two chains are required to estimate between-chain variance".to_string(),
        });
    }
    let num_draws = chains[0].len();
    if num_draws < 2 {
        return Err(SamplerError::InvalidParameter {
            name: "chains".to_string(),
            reason: "each chain needs at least two draws".to_string(),
        });
    }

    let mut chain_means = vec![0.0; num_chains];
    let mut grand_mean = 0.0;
    for (m, chain) in chains.iter().enumerate() {
        for draw in chain {
            chain_means[m] += draw[dimension];
        }
        grand_mean += chain_means[m];
        chain_means[m] /= num_draws as f64;
    }
    grand_mean /= (num_chains * num_draws) as f64;

    let mut between_chain_variance = 0.0;
    let mut within_chain_variance = 0.0;
    for (m, chain) in chains.iter().enumerate() {
        between_chain_variance += (chain_means[m] - grand_mean).powi(2);
        let mut sample_variance = 0.0;
        for draw in chain {
            sample_variance += (draw[dimension] - chain_means[m]).powi(2);
        }
        within_chain_variance += sample_variance / (num_draws - 1) as f64;
    }
    between_chain_variance *= num_draws as f64 / (num_chains - 1) as f64;
    within_chain_variance /= num_chains as f64;

    let variance_estimate =
        ((num_draws - 1) as f64 * within_chain_variance + between_chain_variance) / num_draws as f64;

    Ok((variance_estimate / within_chain_variance).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;
    use rand::Rng;

    fn chain_from(mean: f64, seed: u64, length: usize) -> Vec<DVector<f64>> {
        let mut rng = seeded(seed);
        (0..length)
            .map(|_| DVector::from_vec(vec![mean + rng.gen::<f64>() - 0.5]))
            .collect()
    }

    #[test]
    fn agreeing_chains_have_a_psrf_close_to_one() {
        let chains = vec![chain_from(0.0, 1, 400), chain_from(0.0, 2, 400)];
        let psrf = potential_scale_reduction_factor(&chains, 0).unwrap();
        assert!((psrf - 1.0).abs() < 0.1);
    }

    #[test]
    fn disagreeing_chains_have_a_psrf_well_above_one() {
        let chains = vec![chain_from(-10.0, 1, 200), chain_from(10.0, 2, 200)];
        let psrf = potential_scale_reduction_factor(&chains, 0).unwrap();
        assert!(psrf > 2.0);
    }

    #[test]
    fn rejects_a_single_chain() {
        let chains = vec![chain_from(0.0, 1, 100)];
        assert!(potential_scale_reduction_factor(&chains, 0).is_err());
    }
}
