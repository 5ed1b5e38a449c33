//! Parallel tempering: a coldness ladder of chains at `beta_i = 1 - i/(n-1)`
//! targeting the same model at different temperatures, with periodic
//! exchange proposals between adjacent rungs. Ported from
//! `original_source`'s `ParallelTempering` mixin, which runs one chain per
//! MPI rank and exchanges states over `MPI_Sendrecv_replace`; this ensemble
//! runs every rung in-process instead; and to keep every rung free to pick
//! its own proposal kernel it computes the tempered Metropolis-Hastings
//! acceptance itself rather than asking a pre-tempered kernel for it, so
//! `chains` must hold structural kernels (not already model-aware ones).

use nalgebra::DVector;
use rand::{Rng, RngCore};

use crate::errors::{validate_unit_interval_closed, SamplerError, SamplerResult};
use crate::proposal::Proposal;
use crate::target::Target;

pub struct ParallelTemperingEnsemble<P: Proposal, M: Target> {
    model: M,
    betas: Vec<f64>,
    chains: Vec<P>,
    num_proposals: Vec<u64>,
    num_accepted: Vec<u64>,
    num_exchange_attempts: u64,
    num_exchanges: u64,
    exchange_attempt_probability: f64,
}

impl<P: Proposal, M: Target> ParallelTemperingEnsemble<P, M> {
    pub fn new(
        model: M,
        chains: Vec<P>,
        exchange_attempt_probability: f64,
    ) -> SamplerResult<Self> {
        if chains.is_empty() {
            return Err(SamplerError::InvalidParameter {
                name: "chains".to_string(),
                reason: "ensemble must contain at least one chain".to_string(),
            });
        }
        validate_unit_interval_closed(exchange_attempt_probability, "exchange_attempt_probability")?;

        let n = chains.len();
        let largest_index = if n == 1 { 1 } else { n - 1 };
        let betas: Vec<f64> = (0..n).map(|i| 1.0 - i as f64 / largest_index as f64).collect();

        Ok(Self {
            model,
            num_proposals: vec![0; n],
            num_accepted: vec![0; n],
            betas,
            chains,
            num_exchange_attempts: 0,
            num_exchanges: 0,
            exchange_attempt_probability,
        })
    }

    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn beta(&self, chain_index: usize) -> f64 {
        self.betas[chain_index]
    }

    pub fn state(&self, chain_index: usize) -> &DVector<f64> {
        self.chains[chain_index].state()
    }

    /// The unit-coldness (`beta = 1`) chain, by convention rung 0, is the
    /// one whose draws are reported to the caller.
    pub fn coldest_chain_state(&self) -> &DVector<f64> {
        self.chains[0].state()
    }

    pub fn acceptance_rate(&self, chain_index: usize) -> f64 {
        if self.num_proposals[chain_index] == 0 {
            0.0
        } else {
            self.num_accepted[chain_index] as f64 / self.num_proposals[chain_index] as f64
        }
    }

    pub fn exchange_rate(&self) -> f64 {
        if self.num_exchange_attempts == 0 {
            0.0
        } else {
            self.num_exchanges as f64 / self.num_exchange_attempts as f64
        }
    }

    /// Advances every rung by one within-chain move, then attempts one
    /// cross-rung exchange. Returns whether an exchange occurred.
    pub fn draw(&mut self, rng: &mut dyn RngCore) -> SamplerResult<bool> {
        for i in 0..self.chains.len() {
            self.draw_one_chain(i, rng)?;
        }
        self.attempt_exchange(rng)
    }

    fn draw_one_chain(&mut self, chain_index: usize, rng: &mut dyn RngCore) -> SamplerResult<()> {
        let beta = self.betas[chain_index];
        let chain = &mut self.chains[chain_index];
        let state_nll = self.model.negative_log_likelihood(chain.state());
        let (candidate, proposal_log_correction) = chain.propose(rng)?;
        let candidate_nll = self.model.negative_log_likelihood(&candidate);

        let log_acceptance_probability =
            proposal_log_correction + beta * (state_nll - candidate_nll);
        self.num_proposals[chain_index] += 1;

        let log_acceptance_chance: f64 = rng.gen::<f64>().ln();
        if log_acceptance_chance < log_acceptance_probability {
            chain.accept();
            self.num_accepted[chain_index] += 1;
        }
        Ok(())
    }

    /// With probability `exchange_attempt_probability`, picks an adjacent
    /// rung pair uniformly and swaps their states with probability
    /// `exp((beta_i - beta_j) * (nll_i - nll_j))`. A draw is always consumed
    /// for the "should we attempt" decision regardless of outcome, mirroring
    /// the reference implementation's RNG-stream alignment across ranks
    /// that never participate in a given exchange.
    fn attempt_exchange(&mut self, rng: &mut dyn RngCore) -> SamplerResult<bool> {
        if self.chains.len() < 2 {
            return Ok(false);
        }
        if rng.gen::<f64>() >= self.exchange_attempt_probability {
            return Ok(false);
        }
        self.num_exchange_attempts += 1;

        let i = rng.gen_range(0..self.chains.len() - 1);
        let j = i + 1;

        let nll_i = self.model.negative_log_likelihood(self.chains[i].state());
        let nll_j = self.model.negative_log_likelihood(self.chains[j].state());
        let diff_beta = self.betas[i] - self.betas[j];
        let diff_nll = nll_i - nll_j;
        let acceptance_probability = (diff_beta * diff_nll).exp();

        let chance: f64 = rng.gen();
        if chance <= acceptance_probability {
            let state_i = self.chains[i].state().clone();
            let state_j = self.chains[j].state().clone();
            self.chains[i].set_state(state_j)?;
            self.chains[j].set_state(state_i)?;
            self.num_exchanges += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
