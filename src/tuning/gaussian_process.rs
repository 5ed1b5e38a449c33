//! Gaussian-process Thompson-sampling tuner: models expected squared jump
//! distance as a function of step size with a squared-exponential-kernel GP,
//! and at each round draws a posterior sample over a candidate grid and
//! evaluates the step size the draw favors. Ported from `original_source`'s
//! `GaussianProcess`/`SquaredExponentialKernel`, restricted to the scalar
//! (step-size) input this tuner needs.

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use crate::diagnostics::esjd::expected_squared_jump_distance;
use crate::errors::{validate_ordered, validate_positive, SamplerError, SamplerResult};
use crate::proposal::Proposal;

#[derive(Debug, Clone, Copy)]
pub struct SquaredExponentialKernel {
    pub sigma: f64,
    pub length_scale: f64,
}

impl SquaredExponentialKernel {
    pub fn new(sigma: f64, length_scale: f64) -> Self {
        Self { sigma, length_scale }
    }

    fn covariance(&self, a: f64, b: f64) -> f64 {
        let squared_distance = (a - b) * (a - b);
        self.sigma * self.sigma * (-0.5 * squared_distance / (self.length_scale * self.length_scale)).exp()
    }

    fn matrix(&self, xs: &[f64], ys: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(xs.len(), ys.len(), |i, j| self.covariance(xs[i], ys[j]))
    }
}

/// A scalar-input Gaussian process over observed `(step_size, esjd)` pairs,
/// with a zero prior mean.
pub struct GaussianProcess {
    kernel: SquaredExponentialKernel,
    observed_inputs: Vec<f64>,
    observed_values: DVector<f64>,
    observation_noise: f64,
}

impl GaussianProcess {
    pub fn new(kernel: SquaredExponentialKernel, observation_noise: f64) -> Self {
        Self {
            kernel,
            observed_inputs: Vec::new(),
            observed_values: DVector::from_vec(Vec::new()),
            observation_noise,
        }
    }

    pub fn add_observation(&mut self, x: f64, y: f64) {
        self.observed_inputs.push(x);
        let mut values: Vec<f64> = self.observed_values.iter().copied().collect();
        values.push(y);
        self.observed_values = DVector::from_vec(values);
    }

    /// Posterior mean and covariance at `inputs`, given everything observed
    /// so far. Falls back to the prior (zero mean, kernel covariance) when
    /// nothing has been observed yet.
    fn posterior(&self, inputs: &[f64]) -> SamplerResult<(DVector<f64>, DMatrix<f64>)> {
        let prior_covariance = self.kernel.matrix(inputs, inputs);
        if self.observed_inputs.is_empty() {
            return Ok((DVector::zeros(inputs.len()), prior_covariance));
        }

        let mut observed_covariance = self.kernel.matrix(&self.observed_inputs, &self.observed_inputs);
        for i in 0..observed_covariance.nrows() {
            observed_covariance[(i, i)] += self.observation_noise;
        }
        let cholesky = Cholesky::new(observed_covariance).ok_or_else(|| SamplerError::NumericFailure {
            operation: "GaussianProcess::posterior".to_string(),
            detail: "observed covariance is not positive definite".to_string(),
        })?;

        let cross_covariance = self.kernel.matrix(&self.observed_inputs, inputs);
        let alpha = cholesky.solve(&self.observed_values);
        let posterior_mean = cross_covariance.transpose() * alpha;

        let solved_cross = cholesky.solve(&cross_covariance);
        let posterior_covariance = prior_covariance - cross_covariance.transpose() * solved_cross;

        Ok((posterior_mean, posterior_covariance))
    }

    /// Draws one joint sample of the posterior at `inputs`.
    fn sample(&self, inputs: &[f64], rng: &mut dyn RngCore) -> SamplerResult<DVector<f64>> {
        let (mean, covariance) = self.posterior(inputs)?;
        let jittered = covariance + DMatrix::identity(inputs.len(), inputs.len()) * 1e-9;
        let cholesky = Cholesky::new(jittered).ok_or_else(|| SamplerError::NumericFailure {
            operation: "GaussianProcess::sample".to_string(),
            detail: "posterior covariance is not positive definite".to_string(),
        })?;
        let noise: Vec<f64> = (0..inputs.len()).map(|_| StandardNormal.sample(rng)).collect();
        Ok(mean + cholesky.l() * DVector::from_vec(noise))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GaussianProcessTunerParameters {
    pub num_rounds: u64,
    pub iterations_to_test_step_size: u64,
    pub candidate_grid_size: u64,
    pub step_size_lower_bound: f64,
    pub step_size_upper_bound: f64,
}

impl GaussianProcessTunerParameters {
    pub fn new(
        num_rounds: u64,
        iterations_to_test_step_size: u64,
        candidate_grid_size: u64,
        step_size_lower_bound: f64,
        step_size_upper_bound: f64,
    ) -> SamplerResult<Self> {
        validate_ordered(
            step_size_lower_bound,
            step_size_upper_bound,
            "step_size_lower_bound",
            "step_size_upper_bound",
        )?;
        validate_positive(step_size_lower_bound, "step_size_lower_bound")?;
        if candidate_grid_size < 2 {
            return Err(SamplerError::InvalidParameter {
                name: "candidate_grid_size".to_string(),
                reason: "must be at least 2 to bracket the search interval".to_string(),
            });
        }
        if num_rounds == 0 {
            return Err(SamplerError::InvalidParameter {
                name: "num_rounds".to_string(),
                reason: "must be nonzero".to_string(),
            });
        }
        Ok(Self {
            num_rounds,
            iterations_to_test_step_size,
            candidate_grid_size,
            step_size_lower_bound,
            step_size_upper_bound,
        })
    }

    fn candidate_grid(&self) -> Vec<f64> {
        let n = self.candidate_grid_size;
        (0..n)
            .map(|i| {
                self.step_size_lower_bound
                    + (self.step_size_upper_bound - self.step_size_lower_bound) * i as f64
                        / (n - 1) as f64
            })
            .collect()
    }
}

pub struct GaussianProcessTuningOutcome {
    pub step_size: f64,
    pub expected_squared_jump_distance: f64,
}

/// Thompson-sampling loop: each round draws a posterior sample over the
/// candidate grid, evaluates the step size it favors most, and folds the
/// observation back into the process. Returns the best step size observed
/// across all rounds.
pub fn tune<P: Proposal>(
    proposal: &mut P,
    rng: &mut dyn RngCore,
    parameters: &GaussianProcessTunerParameters,
) -> SamplerResult<GaussianProcessTuningOutcome> {
    let grid = parameters.candidate_grid();
    let mut process = GaussianProcess::new(SquaredExponentialKernel::new(1.0, grid_length_scale(&grid)), 1e-6);

    let mut best_step_size = grid[0];
    let mut best_esjd = f64::NEG_INFINITY;

    for _ in 0..parameters.num_rounds {
        let sampled = process.sample(&grid, rng)?;
        let (favored_index, _) = sampled
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .expect("grid is non-empty");
        let candidate = grid[favored_index];

        proposal.set_step_size(candidate)?;
        let esjd = measure_esjd(proposal, rng, parameters.iterations_to_test_step_size)?;
        process.add_observation(candidate, esjd);

        if esjd > best_esjd {
            best_esjd = esjd;
            best_step_size = candidate;
        }
    }

    proposal.set_step_size(best_step_size)?;
    Ok(GaussianProcessTuningOutcome {
        step_size: best_step_size,
        expected_squared_jump_distance: best_esjd,
    })
}

fn grid_length_scale(grid: &[f64]) -> f64 {
    let span = grid.last().unwrap() - grid.first().unwrap();
    (span / grid.len() as f64).max(1e-6)
}

fn measure_esjd<P: Proposal>(
    proposal: &mut P,
    rng: &mut dyn RngCore,
    iterations: u64,
) -> SamplerResult<f64> {
    let mut draws = Vec::with_capacity(iterations as usize + 1);
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
