//! End-to-end scenarios and cross-cutting invariants for the sampling core:
//! geometric containment, reflection known-answers, model-aware moment
//! recovery, and diagnostic sanity checks.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use convex_geometry::{Polytope, PolytopeMatrix, Reflector};
use hops_mcmc::diagnostics::effective_sample_size::compute_effective_sample_size;
use hops_mcmc::models::MultivariateGaussianModel;
use hops_mcmc::proposal::ball_walk::BallWalk;
use hops_mcmc::proposal::chord::UniformStepDistribution;
use hops_mcmc::proposal::coordinate_hit_and_run::CoordinateHitAndRun;
use hops_mcmc::proposal::gaussian::GaussianProposal;
use hops_mcmc::proposal::mh_filter::MetropolisHastingsFilter;
use hops_mcmc::proposal::model_aware::ModelAware;
use hops_mcmc::proposal::reversible_jump::ReversibleJump;
use hops_mcmc::proposal::truncated_gaussian::TruncatedGaussianProposal;
use hops_mcmc::proposal::ProposalParameter;
use hops_mcmc::rng::seeded;
use hops_mcmc::{Chain, Proposal};

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

/// E1: after 100 coordinate hit-and-run proposals in the unit cube (`n=4`),
/// every recorded state stays within the cube up to a tiny numerical slack.
#[test]
fn e1_cube_uniform_coordinate_hit_and_run_stays_inside() {
    let polytope = cube(4, 1.0);
    let walk = CoordinateHitAndRun::new(polytope.clone(), DVector::zeros(4), UniformStepDistribution)
        .unwrap();
    let mut chain = Chain::new(walk, 1).unwrap();
    let mut rng = seeded(1);
    let record = chain.run(&mut rng, 100).unwrap();
    for state in &record.draws {
        assert!(state.amax() <= 1.0 + 1e-10);
    }
}

/// E2: a single reflection off `x <= 0` from `1` to `-9` lands exactly at `9`.
#[test]
fn e2_reflection_known_answer() {
    let a = DMatrix::from_row_slice(1, 1, &[-1.0]);
    let b = DVector::from_vec(vec![0.0]);
    let polytope = Polytope::new(PolytopeMatrix::Dense(a), b).unwrap();
    let start = DVector::from_vec(vec![1.0]);
    let end = DVector::from_vec(vec![-9.0]);
    let outcome = Reflector::reflect_into_polytope(&polytope, &start, &end, 200);
    assert!(outcome.converged);
    assert_eq!(outcome.num_reflections, 1);
    assert!((outcome.point[0] - 9.0).abs() < 1e-9);
}

/// E3: a trajectory bounced off two simplex faces lands back at the origin.
#[test]
fn e3_reflection_into_simplex() {
    let a = DMatrix::from_row_slice(3, 2, &[-1.0, 0.0, 0.0, -1.0, 1.0, 1.0]);
    let b = DVector::from_vec(vec![0.0, 0.0, 1.0]);
    let polytope = Polytope::new(PolytopeMatrix::Dense(a), b).unwrap();
    let start = DVector::from_vec(vec![0.25, 0.25]);
    let end = DVector::from_vec(vec![1.0, 1.0]);
    let outcome = Reflector::reflect_into_polytope(&polytope, &start, &end, 10);
    assert!(outcome.converged);
    assert_eq!(outcome.num_reflections, 2);
    assert!(outcome.point[0].abs() < 1e-9);
    assert!(outcome.point[1].abs() < 1e-9);
}

/// E4: a truncated standard normal recovers mean 0 and standard deviation 1.
#[test]
fn e4_truncated_gaussian_standard_normal_moments() {
    let polytope = cube(1, 1000.0);
    let model = MultivariateGaussianModel::new(
        DVector::from_vec(vec![0.0]),
        DMatrix::identity(1, 1),
    )
    .unwrap();
    let proposal =
        TruncatedGaussianProposal::new(polytope, DVector::from_vec(vec![0.0]), model).unwrap();
    let mut filter = MetropolisHastingsFilter::new(proposal);
    let mut rng = seeded(3);

    let num_draws = 50_000;
    let mut draws = Vec::with_capacity(num_draws);
    for _ in 0..num_draws {
        let (state, _) = filter.draw(&mut rng).unwrap();
        draws.push(state);
    }

    let mean: f64 = draws.iter().map(|d| d[0]).sum::<f64>() / num_draws as f64;
    let variance: f64 =
        draws.iter().map(|d| (d[0] - mean).powi(2)).sum::<f64>() / (num_draws - 1) as f64;

    let ess = compute_effective_sample_size(std::slice::from_ref(&draws), 0).unwrap();
    assert!(mean.abs() < 2.0 / ess.sqrt());
    assert!((variance.sqrt() - 1.0).abs() < 0.01);
}

/// E5: a truncated `N(5, 0.3)` recovers standard deviation `sqrt(0.3)`.
#[test]
fn e5_shifted_truncated_gaussian_standard_deviation() {
    let polytope = cube(1, 1000.0);
    let model = MultivariateGaussianModel::new(
        DVector::from_vec(vec![5.0]),
        DMatrix::from_row_slice(1, 1, &[0.3]),
    )
    .unwrap();
    let proposal =
        TruncatedGaussianProposal::new(polytope, DVector::from_vec(vec![5.0]), model).unwrap();
    let mut filter = MetropolisHastingsFilter::new(proposal);
    let mut rng = seeded(5);

    let num_draws = 50_000;
    let mut draws = Vec::with_capacity(num_draws);
    for _ in 0..num_draws {
        let (state, _) = filter.draw(&mut rng).unwrap();
        draws.push(state);
    }

    let mean: f64 = draws.iter().map(|d| d[0]).sum::<f64>() / num_draws as f64;
    let variance: f64 =
        draws.iter().map(|d| (d[0] - mean).powi(2)).sum::<f64>() / (num_draws - 1) as f64;
    assert!((variance.sqrt() - 0.3_f64.sqrt()).abs() / 0.3_f64.sqrt() < 0.01);
}

/// E6: the effective sample size of a fixed 8-draw sequence matches the
/// known reference value within 0.01%.
#[test]
fn e6_effective_sample_size_of_a_fixed_sequence() {
    let draws: Vec<DVector<f64>> = [0.0, 1.0, 3.0, 2.0, 4.0, 2.0, 1.0, 6.0]
        .iter()
        .map(|&x| DVector::from_vec(vec![x]))
        .collect();
    let ess = compute_effective_sample_size(std::slice::from_ref(&draws), 0).unwrap();
    let expected = 7.22472;
    assert!((ess - expected).abs() / expected < 1e-4);
}

/// Invariant 1/2: accepted states satisfy `A x <= b` and the slacks cache
/// tracks `b - A x` exactly for a ball-walk run in a wide cube.
#[test]
fn invariant_accepted_states_satisfy_constraints_and_slacks_track_them() {
    let polytope = cube(3, 2.0);
    let walk = BallWalk::new(polytope.clone(), DVector::zeros(3), 0.3).unwrap();
    let mut filter = MetropolisHastingsFilter::new(walk);
    let mut rng = seeded(9);
    for _ in 0..500 {
        let (state, _) = filter.draw(&mut rng).unwrap();
        assert!(polytope.contains(&state));
        let slacks = polytope.slacks(&state);
        let recomputed = polytope.b() - polytope.a().mul_vec(&state);
        assert!((slacks - recomputed).amax() < 1e-10);
    }
}

/// Invariant 3: the reflector reports `converged = false` and returns the
/// unaltered end point when the reflection budget is too small.
#[test]
fn invariant_reflector_reports_failure_when_budget_is_exhausted() {
    let a = DMatrix::from_row_slice(3, 2, &[-1.0, 0.0, 0.0, -1.0, 1.0, 1.0]);
    let b = DVector::from_vec(vec![0.0, 0.0, 1.0]);
    let polytope = Polytope::new(PolytopeMatrix::Dense(a), b).unwrap();
    let start = DVector::from_vec(vec![0.25, 0.25]);
    let end = DVector::from_vec(vec![1.0, 1.0]);
    let outcome = Reflector::reflect_into_polytope(&polytope, &start, &end, 1);
    assert!(!outcome.converged);
    assert_eq!(outcome.point, end);
}

/// Invariant 4: symmetric kernels report `log_correction = 0` for any
/// in-bounds candidate.
#[test]
fn invariant_symmetric_kernels_report_zero_log_correction() {
    let polytope = cube(2, 5.0);
    let mut gaussian = GaussianProposal::new(polytope.clone(), DVector::zeros(2), 0.2).unwrap();
    let mut rng = seeded(13);
    for _ in 0..200 {
        let (_, log_correction) = gaussian.propose(&mut rng).unwrap();
        assert!(log_correction == 0.0 || log_correction == f64::NEG_INFINITY);
    }

    let mut chrr = CoordinateHitAndRun::new(polytope, DVector::zeros(2), UniformStepDistribution).unwrap();
    for _ in 0..200 {
        let (_, log_correction) = chrr.propose(&mut rng).unwrap();
        assert_eq!(log_correction, 0.0);
    }
}

/// Invariant 5: the Gaussian proposal wrapped with `ModelAware` against
/// `N(0, I)` in a wide cube recovers the target's moments.
#[test]
fn invariant_model_aware_gaussian_recovers_standard_normal_moments() {
    let polytope = cube(1, 1000.0);
    let model = MultivariateGaussianModel::new(
        DVector::from_vec(vec![0.0]),
        DMatrix::identity(1, 1),
    )
    .unwrap();
    let walk = GaussianProposal::new(polytope, DVector::from_vec(vec![0.0]), 1.0).unwrap();
    let wrapped = ModelAware::new(walk, model).unwrap();
    let mut filter = MetropolisHastingsFilter::new(wrapped);
    let mut rng = seeded(21);

    let num_draws = 50_000;
    let mut draws = Vec::with_capacity(num_draws);
    for _ in 0..num_draws {
        let (state, _) = filter.draw(&mut rng).unwrap();
        draws.push(state);
    }

    let mean: f64 = draws.iter().map(|d| d[0]).sum::<f64>() / num_draws as f64;
    let variance: f64 =
        draws.iter().map(|d| (d[0] - mean).powi(2)).sum::<f64>() / (num_draws - 1) as f64;
    let ess = compute_effective_sample_size(std::slice::from_ref(&draws), 0).unwrap();
    assert!(mean.abs() < 2.0 / ess.sqrt());
    assert!((variance.sqrt() - 1.0).abs() < 0.05);
}

/// Invariant 7/8: autocorrelations are bounded by 1 at lag 0, and effective
/// sample size stays within `(0, num_draws]`.
#[test]
fn invariant_autocorrelation_and_ess_are_well_formed() {
    let polytope = cube(1, 5.0);
    let walk = BallWalk::new(polytope, DVector::from_vec(vec![0.0]), 0.5).unwrap();
    let mut filter = MetropolisHastingsFilter::new(walk);
    let mut rng = seeded(27);
    let num_draws = 2000;
    let mut draws = Vec::with_capacity(num_draws);
    for _ in 0..num_draws {
        let (state, _) = filter.draw(&mut rng).unwrap();
        draws.push(state);
    }

    let rho = hops_mcmc::diagnostics::autocorrelation::compute_autocorrelations(&draws, 0);
    assert!((rho[0] - 1.0).abs() < 1e-9);
    assert!(rho.iter().all(|&r| r.abs() <= 1.0 + 1e-9));

    let ess = compute_effective_sample_size(std::slice::from_ref(&draws), 0).unwrap();
    assert!(ess > 0.0);
    assert!(ess <= num_draws as f64);
}

/// Invariant 9: reversible jump rejects model-jump/activation/deactivation
/// probabilities at or above 1.
#[test]
fn invariant_reversible_jump_rejects_out_of_range_jump_probabilities() {
    let polytope = cube(3, 1.0);
    let chrr = CoordinateHitAndRun::new(polytope.clone(), DVector::zeros(3), UniformStepDistribution)
        .unwrap();
    let model = MultivariateGaussianModel::new(
        DVector::from_vec(vec![0.0, 0.0, 0.0]),
        DMatrix::identity(3, 3),
    )
    .unwrap();
    let mut rj = ReversibleJump::new(polytope, chrr, model, vec![2], DVector::from_vec(vec![0.0]))
        .unwrap();

    assert!(rj.set_parameter(ProposalParameter::ModelJumpProbability, 1.0).is_err());
    assert!(rj.set_parameter(ProposalParameter::ActivationProbability, 1.0).is_err());
    assert!(rj.set_parameter(ProposalParameter::DeactivationProbability, 1.0).is_err());
}
