//! Expected squared jump distance, incrementally updatable as new batches of
//! draws arrive. Ported from `original_source`'s
//! `computeExpectedSquaredJumpDistance`: `ESJD = mean_n ||theta_n - theta_{n+1}||^2`,
//! recombined across an old and a new batch by an exposure-weighted average
//! `eta`.

use nalgebra::DVector;

/// Non-incremental expected squared jump distance over every draw in `draws`.
pub fn expected_squared_jump_distance(draws: &[DVector<f64>]) -> f64 {
    let mut accumulator = EsjdAccumulator::new();
    accumulator.update(draws);
    accumulator.value()
}

/// Running expected squared jump distance over a chain fed in batches.
/// Each `update` call only looks at the newly-seen tail, recombining its
/// local ESJD into the running estimate by the seen/unseen draw-count ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsjdAccumulator {
    esjd: f64,
    num_seen: u64,
    /// Last draw of the most recently updated batch, carried across calls so
    /// the jump straddling two batches is not silently dropped.
    last_of_previous_batch: Option<DVector<f64>>,
}

impl EsjdAccumulator {
    pub fn new() -> Self {
        Self {
            esjd: 0.0,
            num_seen: 0,
            last_of_previous_batch: None,
        }
    }

    pub fn value(&self) -> f64 {
        self.esjd
    }

    pub fn num_seen(&self) -> u64 {
        self.num_seen
    }

    /// Folds a fresh batch of consecutive draws into the running estimate.
    /// `batch` must be consecutive draws of the same chain immediately
    /// following whatever was last passed to `update`.
    pub fn update(&mut self, batch: &[DVector<f64>]) {
        if batch.is_empty() {
            return;
        }

        let mut jumps: Vec<DVector<f64>> = Vec::with_capacity(batch.len() + 1);
        if let Some(previous_last) = &self.last_of_previous_batch {
            jumps.push(previous_last.clone());
        }
        jumps.extend(batch.iter().cloned());

        let num_unseen = batch.len() as u64;
        let term_count = jumps.len() as u64 - 1;
        if term_count == 0 {
            self.last_of_previous_batch = batch.last().cloned();
            return;
        }

        let mut batch_esjd = 0.0;
        for window in jumps.windows(2) {
            let diff = &window[1] - &window[0];
            batch_esjd += diff.dot(&diff);
        }
        batch_esjd /= term_count as f64;

        let num_seen = if self.num_seen == 0 { 1 } else { self.num_seen };
        let eta = (num_seen - 1) as f64 / (num_seen + num_unseen - 1) as f64;
        self.esjd = eta * self.esjd + (1.0 - eta) * batch_esjd;
        self.num_seen += batch.len() as u64;
        self.last_of_previous_batch = batch.last().cloned();
    }
}

/// Non-incremental expected squared jump distance for coordinate `dimension`
/// of every chain in `chains`.
pub fn expected_squared_jump_distance_per_chain(chains: &[Vec<DVector<f64>>]) -> Vec<f64> {
    chains
        .iter()
        .map(|chain| expected_squared_jump_distance(chain))
        .collect()
}
