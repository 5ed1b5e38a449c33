//! Convergence and mixing diagnostics computed from completed chains:
//! FFT-based autocorrelation, effective sample size, expected squared jump
//! distance, and the potential scale reduction factor.

pub mod autocorrelation;
pub mod effective_sample_size;
pub mod esjd;
pub mod psrf;
