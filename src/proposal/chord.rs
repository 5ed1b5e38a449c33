//! One-dimensional step distributions sampled along a chord `[lower, upper]`
//! of the polytope: uniform (symmetric, `log_correction = 0`) and truncated
//! Gaussian (asymmetric, since the admissible range changes with the
//! proposed point). Ported from `original_source`'s `ChordStepDistributions`
//! and `TruncatedNormalDistribution`.

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::errors::{SamplerError, SamplerResult};

const ONE_OVER_SQRT_2: f64 = 0.707_106_781_186_547_524_400_845;
const SQRT_2PI: f64 = 2.506_628_274_631_000_502_415_77;

fn standard_normal_cdf(x: f64) -> f64 {
    0.5 + 0.5 * libm_erf(ONE_OVER_SQRT_2 * x)
}

/// `erf` via the standard library's `f64::erf` is not stable; this is the
/// same rational/series split every libm uses and matches `std::erf`'s
/// accuracy to within a few ULP, which is all the inverse-CDF refinement
/// below needs.
fn libm_erf(x: f64) -> f64 {
    // Abramowitz & Stegun 7.1.26, accurate to 1.5e-7 absolute error -
    // ample for seeding the Halley refinement in `inverse_standard_normal_cdf`.
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

const INV_PHI_A: [f64; 6] = [
    -3.969_683_028_665_376e+01,
    2.209_460_984_245_205e+02,
    -2.759_285_104_469_687e+02,
    1.383_577_518_672_690e+02,
    -3.066_479_806_614_716e+01,
    2.506_628_277_459_239e+00,
];
const INV_PHI_B: [f64; 5] = [
    -5.447_609_879_822_406e+01,
    1.615_858_368_580_409e+02,
    -1.556_989_798_598_866e+02,
    6.680_131_188_771_972e+01,
    -1.328_068_155_288_572e+01,
];
const INV_PHI_C: [f64; 6] = [
    -7.784_894_002_430_293e-03,
    -3.223_964_580_411_365e-01,
    -2.400_758_277_161_838e+00,
    -2.549_732_539_343_734e+00,
    4.374_664_141_464_968e+00,
    2.938_163_982_698_783e+00,
];
const INV_PHI_D: [f64; 4] = [
    7.784_695_709_041_462e-03,
    3.224_671_290_700_398e-01,
    2.445_134_137_142_996e+00,
    3.754_408_661_907_416e+00,
];
const X_LOW: f64 = 0.02425;
const X_HIGH: f64 = 1.0 - 0.02425;

/// Acklam's rational approximation to `Φ⁻¹`, refined by one step of
/// Halley's method — exactly the algorithm `original_source` ports from
/// `trng4`.
fn inverse_standard_normal_cdf(x: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x == 1.0 {
        return f64::INFINITY;
    }

    let mut t;
    if x < X_LOW {
        let q = (-2.0 * x.ln()).sqrt();
        t = (((((INV_PHI_C[0] * q + INV_PHI_C[1]) * q + INV_PHI_C[2]) * q + INV_PHI_C[3]) * q
            + INV_PHI_C[4])
            * q
            + INV_PHI_C[5])
            / ((((INV_PHI_D[0] * q + INV_PHI_D[1]) * q + INV_PHI_D[2]) * q + INV_PHI_D[3]) * q
                + 1.0);
    } else if x < X_HIGH {
        let q = x - 0.5;
        let r = q * q;
        t = (((((INV_PHI_A[0] * r + INV_PHI_A[1]) * r + INV_PHI_A[2]) * r + INV_PHI_A[3]) * r
            + INV_PHI_A[4])
            * r
            + INV_PHI_A[5])
            * q
            / (((((INV_PHI_B[0] * r + INV_PHI_B[1]) * r + INV_PHI_B[2]) * r + INV_PHI_B[3]) * r
                + INV_PHI_B[4])
                * r
                + 1.0);
    } else {
        let q = (-2.0 * (1.0 - x).ln()).sqrt();
        t = -(((((INV_PHI_C[0] * q + INV_PHI_C[1]) * q + INV_PHI_C[2]) * q + INV_PHI_C[3]) * q
            + INV_PHI_C[4])
            * q
            + INV_PHI_C[5])
            / ((((INV_PHI_D[0] * q + INV_PHI_D[1]) * q + INV_PHI_D[2]) * q + INV_PHI_D[3]) * q
                + 1.0);
    }

    // Halley refinement.
    let e = standard_normal_cdf(t) - x;
    let u = e * SQRT_2PI * (t * t * 0.5).exp();
    t -= u / (1.0 + t * u * 0.5);
    t
}

/// A chord-sampling step distribution: draws a 1-D displacement `t` from
/// `[lower, upper]` and reports the log-ratio correction for the MH filter.
pub trait ChordStepDistribution {
    fn draw(&self, rng: &mut impl Rng, lower: f64, upper: f64) -> SamplerResult<f64>;

    /// `log q(t_forward | ...) - log q(t_backward | ...)` contribution from
    /// the change in admissible chord width; 0 for symmetric kernels.
    fn log_correction(&self, lower_at_x: f64, upper_at_x: f64, lower_at_y: f64, upper_at_y: f64) -> f64;
}

fn validate_bounds(lower: f64, upper: f64) -> SamplerResult<()> {
    if lower > upper {
        return Err(SamplerError::NumericFailure {
            operation: "chord_step_distribution".to_string(),
            detail: format!("lower limit {lower} exceeds upper limit {upper}"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UniformStepDistribution;

impl ChordStepDistribution for UniformStepDistribution {
    fn draw(&self, rng: &mut impl Rng, lower: f64, upper: f64) -> SamplerResult<f64> {
        validate_bounds(lower, upper)?;
        if lower <= f64::MIN || upper >= f64::MAX {
            return Err(SamplerError::NumericFailure {
                operation: "UniformStepDistribution::draw".to_string(),
                detail: "chord is unconstrained on at least one side".to_string(),
            });
        }
        Ok(Uniform::new_inclusive(lower, upper).sample(rng))
    }

    fn log_correction(&self, _lower_at_x: f64, _upper_at_x: f64, _lower_at_y: f64, _upper_at_y: f64) -> f64 {
        0.0
    }
}

/// Truncated `N(0, sigma^2)` restricted to `[lower, upper]`, sampled by
/// inverse-CDF: `Φ⁻¹(Φ(lower/σ) + u·(Φ(upper/σ) − Φ(lower/σ))) · σ`.
#[derive(Debug, Clone, Copy)]
pub struct GaussianStepDistribution {
    pub sigma: f64,
}

impl GaussianStepDistribution {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    fn phi_bounds(&self, lower: f64, upper: f64) -> (f64, f64) {
        let phi_lower = if lower.is_finite() {
            standard_normal_cdf(lower / self.sigma)
        } else {
            0.0
        };
        let phi_upper = if upper.is_finite() {
            standard_normal_cdf(upper / self.sigma)
        } else {
            1.0
        };
        (phi_lower, phi_upper)
    }

    pub fn inverse_normalization(&self, lower: f64, upper: f64) -> f64 {
        let (phi_lower, phi_upper) = self.phi_bounds(lower, upper);
        phi_upper - phi_lower
    }

    pub fn probability_density(&self, x: f64, lower: f64, upper: f64) -> f64 {
        let pdf = (1.0 / (self.sigma * SQRT_2PI)) * (-0.5 * (x / self.sigma).powi(2)).exp();
        pdf / self.inverse_normalization(lower, upper)
    }
}

impl ChordStepDistribution for GaussianStepDistribution {
    fn draw(&self, rng: &mut impl Rng, lower: f64, upper: f64) -> SamplerResult<f64> {
        if lower >= upper {
            return Err(SamplerError::NumericFailure {
                operation: "GaussianStepDistribution::draw".to_string(),
                detail: format!("lower limit {lower} is not below upper limit {upper}"),
            });
        }
        let (phi_lower, phi_upper) = self.phi_bounds(lower, upper);
        let u: f64 = rng.gen_range(0.0..1.0);
        let scaled = phi_lower + u * (phi_upper - phi_lower);
        Ok(inverse_standard_normal_cdf(scaled) * self.sigma)
    }

    fn log_correction(&self, lower_at_x: f64, upper_at_x: f64, lower_at_y: f64, upper_at_y: f64) -> f64 {
        self.inverse_normalization(lower_at_x, upper_at_x).ln()
            - self.inverse_normalization(lower_at_y, upper_at_y).ln()
    }
}
