//! The chain orchestrator: drives a [`Proposal`] through a fixed number of
//! Metropolis-Hastings draws, thinning the recorded trajectory, and (for
//! multi-chain runs) fanning independent chains out across OS threads. One
//! thread per chain, each owning its RNG, proposal and record exclusively,
//! matching spec.md §5's concurrency model; `convex_geometry`'s `Polytope`
//! and any derived caches are the only state shared across threads, and they
//! are `Arc`-wrapped read-only already.

use nalgebra::DVector;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{SamplerError, SamplerResult};
use crate::proposal::mh_filter::MetropolisHastingsFilter;
use crate::proposal::Proposal;
use crate::rng::seeded;

/// A completed (or in-progress) chain's thinned trajectory plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRecord {
    pub draws: Vec<DVector<f64>>,
    pub num_proposals: u64,
    pub num_accepted: u64,
}

impl ChainRecord {
    pub fn acceptance_rate(&self) -> f64 {
        if self.num_proposals == 0 {
            0.0
        } else {
            self.num_accepted as f64 / self.num_proposals as f64
        }
    }
}

/// Drives a single [`Proposal`] through a run, keeping every `thinning`-th
/// draw.
pub struct Chain<P: Proposal> {
    filter: MetropolisHastingsFilter<P>,
    thinning: u64,
}

impl<P: Proposal> Chain<P> {
    pub fn new(proposal: P, thinning: u64) -> SamplerResult<Self> {
        if thinning == 0 {
            return Err(SamplerError::InvalidParameter {
                name: "thinning".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            filter: MetropolisHastingsFilter::new(proposal),
            thinning,
        })
    }

    pub fn filter(&self) -> &MetropolisHastingsFilter<P> {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut MetropolisHastingsFilter<P> {
        &mut self.filter
    }

    /// Runs `num_draws` Metropolis-Hastings steps, recording every
    /// `thinning`-th resulting state.
    pub fn run(&mut self, rng: &mut dyn RngCore, num_draws: u64) -> SamplerResult<ChainRecord> {
        let mut draws = Vec::with_capacity((num_draws / self.thinning) as usize);
        for i in 0..num_draws {
            let (state, accepted) = self.filter.draw(rng)?;
            tracing::trace!(step = i, accepted, "chain step");
            if (i + 1) % self.thinning == 0 {
                draws.push(state);
            }
        }
        tracing::debug!(
            num_proposals = self.filter.num_proposals(),
            acceptance_rate = self.filter.acceptance_rate(),
            "chain run complete"
        );
        Ok(ChainRecord {
            draws,
            num_proposals: self.filter.num_proposals(),
            num_accepted: self.filter.num_accepted(),
        })
    }
}

/// Runs one independent chain per seed in `seeds`, each on its own OS thread.
/// `make_proposal` builds a fresh, unshared `Proposal` for a given seed (the
/// polytope and any immutable derived caches it closes over may be
/// `Arc`-shared; the proposal's own mutable state must not be).
pub fn run_chains<P>(
    make_proposal: impl Fn(u64) -> SamplerResult<P> + Sync,
    seeds: &[u64],
    num_draws: u64,
    thinning: u64,
) -> SamplerResult<Vec<ChainRecord>>
where
    P: Proposal + Send,
{
    let mut records = Vec::with_capacity(seeds.len());
    let mut first_error = None;

    std::thread::scope(|scope| {
        let handles: Vec<_> = seeds
            .iter()
            .map(|&seed| {
                let make_proposal = &make_proposal;
                scope.spawn(move || -> SamplerResult<ChainRecord> {
                    let proposal = make_proposal(seed)?;
                    let mut chain = Chain::new(proposal, thinning)?;
                    let mut rng = seeded(seed);
                    chain.run(&mut rng, num_draws)
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(err)) => {
                    tracing::error!(?err, "chain worker failed");
                    first_error.get_or_insert(err);
                }
                Err(_) => {
                    let err = SamplerError::NumericFailure {
                        operation: "run_chains".to_string(),
                        detail: "worker thread panicked".to_string(),
                    };
                    tracing::error!("chain worker thread panicked");
                    first_error.get_or_insert(err);
                }
            }
        }
    });

    if let Some(err) = first_error {
        return Err(err);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::ball_walk::BallWalk;
    use convex_geometry::{Polytope, PolytopeMatrix};
    use nalgebra::DMatrix;
    use std::sync::Arc;

    fn unit_square() -> Arc<Polytope> {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        Arc::new(Polytope::new(PolytopeMatrix::Dense(a), b).unwrap())
    }

    #[test]
    fn thinning_keeps_only_every_kth_draw() {
        let polytope = unit_square();
        let walk = BallWalk::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.2).unwrap();
        let mut chain = Chain::new(walk, 4).unwrap();
        let mut rng = seeded(5);
        let record = chain.run(&mut rng, 40).unwrap();
        assert_eq!(record.draws.len(), 10);
        assert_eq!(record.num_proposals, 40);
    }

    #[test]
    fn rejects_zero_thinning() {
        let polytope = unit_square();
        let walk = BallWalk::new(polytope, DVector::from_vec(vec![0.0, 0.0]), 0.2).unwrap();
        assert!(Chain::new(walk, 0).is_err());
    }

    #[test]
    fn run_chains_produces_one_record_per_seed() {
        let polytope = unit_square();
        let records = run_chains(
            move |_seed| BallWalk::new(polytope.clone(), DVector::from_vec(vec![0.0, 0.0]), 0.3),
            &[1, 2, 3],
            50,
            5,
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.draws.len(), 10);
        }
    }
}
