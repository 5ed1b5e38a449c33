//! Demonstration: parallel tempering against a bimodal-looking, box-truncated
//! Gaussian target, reporting per-rung acceptance rates and the exchange
//! rate between adjacent rungs.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use convex_geometry::{Polytope, PolytopeMatrix};
use hops_mcmc::models::MultivariateGaussianModel;
use hops_mcmc::proposal::gaussian::GaussianProposal;
use hops_mcmc::rng::seeded;
use hops_mcmc::ParallelTemperingEnsemble;

fn box_polytope(dimension: usize, half_width: f64) -> Arc<Polytope> {
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

    let dimension = 2;
    let polytope = box_polytope(dimension, 8.0);
    let model = MultivariateGaussianModel::new(
        DVector::from_vec(vec![3.0, -3.0]),
        DMatrix::identity(dimension, dimension) * 0.25,
    )
    .unwrap();

    let num_rungs = 5;
    let chains: Vec<_> = (0..num_rungs)
        .map(|_| GaussianProposal::new(polytope.clone(), DVector::zeros(dimension), 1.0).unwrap())
        .collect();
    let mut ensemble = ParallelTemperingEnsemble::new(model, chains, 0.3).unwrap();

    let mut rng = seeded(7);
    for _ in 0..10_000 {
        ensemble.draw(&mut rng).unwrap();
    }

    for rung in 0..ensemble.num_chains() {
        tracing::info!(
            rung,
            beta = ensemble.beta(rung),
            acceptance_rate = ensemble.acceptance_rate(rung),
            "rung summary"
        );
    }
    println!("exchange rate: {:.3}", ensemble.exchange_rate());
    println!("coldest rung state: {:?}", ensemble.coldest_chain_state());
}
