//! Step-size tuners: nested-interval search on the acceptance rate, and the
//! expected-squared-jump-distance criterion, either grid-searched or
//! optimized by a Gaussian-process Thompson-sampling loop.

pub mod acceptance_rate;
pub mod esjd;
pub mod gaussian_process;
