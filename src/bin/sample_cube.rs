//! Demonstration: ball-walk sampling, uniform over a cube, tuned to a target
//! acceptance band and summarized with the diagnostics module.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use convex_geometry::{Polytope, PolytopeMatrix};
use hops_mcmc::diagnostics::autocorrelation::compute_autocorrelations;
use hops_mcmc::diagnostics::effective_sample_size::compute_effective_sample_size;
use hops_mcmc::proposal::ball_walk::BallWalk;
use hops_mcmc::rng::seeded;
use hops_mcmc::tuning::acceptance_rate::{tune, AcceptanceRateTunerParameters};
use hops_mcmc::Chain;

fn cube(dimension: usize, half_width: f64) -> Arc<Polytope> {
    let mut rows = Vec::with_capacity(2 * dimension);
    let mut b = Vec::with_capacity(2 * dimension);
    for d in 0..dimension {
        let mut positive = vec![0.0; dimension];
        positive[d] = 1.0;
        rows.push(positive);
        b.push(half_width);

        let mut negative = vec![0.0; dimension];
        negative[d] = -1.0;
        rows.push(negative);
        b.push(half_width);
    }
    let flattened: Vec<f64> = rows.into_iter().flatten().collect();
    let a = DMatrix::from_row_slice(2 * dimension, dimension, &flattened);
    Arc::new(Polytope::new(PolytopeMatrix::Dense(a), DVector::from_vec(b)).unwrap())
}

fn main() {
    tracing_subscriber::fmt::init();

    let dimension = 4;
    let polytope = cube(dimension, 1.0);
    let start = DVector::zeros(dimension);
    let mut walk = BallWalk::new(polytope, start, 0.5).unwrap();

    let mut rng = seeded(42);
    let tuner_parameters = AcceptanceRateTunerParameters::new(0.2, 0.3, 1e-3, 20.0, 200, 20_000).unwrap();
    let outcome = tune(&mut walk, &mut rng, &tuner_parameters).unwrap();
    tracing::info!(
        step_size = outcome.step_size,
        acceptance_rate = outcome.acceptance_rate,
        converged = outcome.converged,
        "tuned ball walk"
    );

    let mut chain = Chain::new(walk, 2).unwrap();
    let record = chain.run(&mut rng, 4000).unwrap();
    println!(
        "drew {} thinned states, acceptance rate {:.3}",
        record.draws.len(),
        record.acceptance_rate()
    );

    let autocorrelations = compute_autocorrelations(&record.draws, 0);
    println!("autocorrelation at lag 1 (coordinate 0): {:.4}", autocorrelations[1]);

    let ess = compute_effective_sample_size(std::slice::from_ref(&record.draws), 0).unwrap();
    println!("effective sample size (coordinate 0): {:.1}", ess);
}
