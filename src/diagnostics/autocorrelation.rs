//! FFT-based autocorrelation estimate along one coordinate of a chain.
//! Ported from `original_source`'s `Autocorrelation.hpp`: zero-pad to the
//! next 2-3-5-smooth size so `rustfft`'s mixed-radix planner stays fast, take
//! the power spectrum, invert, and normalize by `N^2` and `autocorrelations[0]`
//! to get Geyer's (1992) biased estimator.

use nalgebra::DVector;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// The smallest `M >= n` whose only prime factors are 2, 3 and 5 - the sizes
/// `rustfft`'s mixed-radix planner handles fastest.
pub fn next_good_size_fft(n: usize) -> usize {
    if n <= 2 {
        return 2;
    }
    let mut candidate = n;
    loop {
        let mut m = candidate;
        while m % 2 == 0 {
            m /= 2;
        }
        while m % 3 == 0 {
            m /= 3;
        }
        while m % 5 == 0 {
            m /= 5;
        }
        if m <= 1 {
            return candidate;
        }
        candidate += 1;
    }
}

/// Autocorrelations `rho[0..N]` of coordinate `dimension` across `draws`,
/// normalized so `rho[0] == 1`.
pub fn compute_autocorrelations(draws: &[DVector<f64>], dimension: usize) -> Vec<f64> {
    let n = draws.len();
    let x: Vec<f64> = draws.iter().map(|d| d[dimension]).collect();
    let mean = x.iter().sum::<f64>() / n as f64;

    let m = next_good_size_fft(n);
    let padded_len = 2 * m;

    let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); padded_len];
    for (i, &xi) in x.iter().enumerate() {
        buffer[i] = Complex::new(xi - mean, 0.0);
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded_len);
    fft.process(&mut buffer);

    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }

    let ifft = planner.plan_fft_inverse(padded_len);
    ifft.process(&mut buffer);

    let denom = (n * n * 2) as f64;
    let mut autocorrelations: Vec<f64> = buffer[0..n].iter().map(|c| c.re / denom).collect();
    let rho0 = autocorrelations[0];
    if rho0 != 0.0 {
        for rho in autocorrelations.iter_mut() {
            *rho /= rho0;
        }
    }
    autocorrelations
}
