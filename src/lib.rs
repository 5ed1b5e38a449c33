//! Markov chain Monte Carlo sampling on convex polytopes `{x : A x <= b}`.
//!
//! Geometry (the polytope itself, slacks, the billiard reflector, the
//! maximum-volume-ellipsoid routine) lives in the `convex_geometry` crate;
//! this crate builds the sampling core on top of it: proposal kernels, the
//! Metropolis-Hastings filter, model-aware wrapping, state transformation,
//! parallel tempering, reversible jump, step-size tuners, diagnostics, and
//! the chain orchestrator that drives them.

pub mod chain;
pub mod diagnostics;
pub mod errors;
pub mod models;
pub mod parallel_tempering;
pub mod proposal;
pub mod rng;
pub mod target;
pub mod tuning;

pub use chain::{run_chains, Chain, ChainRecord};
pub use errors::{SamplerError, SamplerResult};
pub use parallel_tempering::ParallelTemperingEnsemble;
pub use proposal::{Proposal, ProposalParameter};
pub use target::{Coldness, Target};
