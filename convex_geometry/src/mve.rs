//! Maximum-volume inscribed ellipsoid for a polytope, computed by the
//! Khachiyan-style primal-dual interior-point method.

use nalgebra::{DMatrix, DVector};

use crate::errors::{GeometryError, GeometryResult};
use crate::linalg::{cholesky_lower, solve_robust};

/// The inscribed ellipsoid `{x : (x-center)^T E^-1 (x-center) <= 1}` of
/// maximal volume contained in `{x : A x <= b}`, together with the lower
/// Cholesky factor of `E` used as a rounding (unrounding) transformation.
#[derive(Debug, Clone)]
pub struct MaximumVolumeEllipsoid {
    pub ellipsoid: DMatrix<f64>,
    pub rounding_transformation: DMatrix<f64>,
    pub center: DVector<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub current_error: f64,
}

impl MaximumVolumeEllipsoid {
    /// `tolerance` controls both the primal-dual residual and the
    /// complementarity gap threshold used for the convergence check.
    pub fn construct(
        a_in: &DMatrix<f64>,
        b_in: &DVector<f64>,
        maximum_number_of_iterations: usize,
        starting_point: &DVector<f64>,
        tolerance: f64,
    ) -> GeometryResult<Self> {
        let m = a_in.nrows();
        let n = a_in.ncols();

        let residual0 = a_in * starting_point - b_in;
        if residual0.iter().any(|&v| v > f64::EPSILON) {
            return Err(GeometryError::StartingPointOutsidePolytope {
                constraint_index: residual0
                    .iter()
                    .position(|&v| v > f64::EPSILON)
                    .unwrap_or(0),
                slack: -residual0.iter().cloned().fold(f64::MIN, f64::max),
            });
        }

        const MIN_MU: f64 = 1e-8;
        const TAU0: f64 = 0.75;

        let bnrm = b_in.norm();
        let rank = a_in.clone().svd(false, false).rank(1e-12);
        if rank < n {
            return Err(GeometryError::NumericFailure {
                operation: "maximum_volume_ellipsoid".to_string(),
                detail: "A must have full column rank".to_string(),
            });
        }

        let b_minus_a_x0 = b_in - a_in * starting_point;
        let mut a_scaled = a_in.clone();
        for i in 0..m {
            let scale = 1.0 / b_minus_a_x0[i];
            for j in 0..n {
                a_scaled[(i, j)] *= scale;
            }
        }

        let mut x = DVector::zeros(n);
        let mut y = DVector::from_element(m, 1.0);
        let mut bm_ax = DVector::from_element(m, 1.0);

        let mut t;
        let mut z = DVector::zeros(m);
        let mut e2 = DMatrix::zeros(n, n);

        let mut res = 1.0_f64;
        let mut converged = false;
        let mut iterations = 0usize;

        while iterations < maximum_number_of_iterations {
            iterations += 1;

            let mut y_diag = DMatrix::zeros(m, m);
            for i in 0..m {
                y_diag[(i, i)] = y[i];
            }

            let aty_a = a_scaled.transpose() * &y_diag * &a_scaled;
            e2 = aty_a.try_inverse().ok_or_else(|| GeometryError::NumericFailure {
                operation: "maximum_volume_ellipsoid".to_string(),
                detail: "A^T Y A is singular".to_string(),
            })?;
            let mut q = &a_scaled * &e2 * a_scaled.transpose();

            let mut h = DVector::from_iterator(m, q.diagonal().iter().map(|v| v.max(0.0).sqrt()));

            if iterations == 1 {
                t = (0..m)
                    .map(|i| bm_ax[i] / h[i])
                    .fold(f64::MAX, f64::min);
                let t2 = t * t;
                y /= t2;
                h *= t;
                z = DVector::from_iterator(m, (0..m).map(|i| (bm_ax[i] - h[i]).max(1e-1)));
                q *= t2;
                for i in 0..m {
                    y_diag[(i, i)] /= t2;
                }
            }

            let yz: DVector<f64> = y.component_mul(&z);
            let yh: DVector<f64> = y.component_mul(&h);

            let gap = yz.sum() / m as f64;
            let rmu = (0.5_f64.min(gap) * gap).max(MIN_MU);

            let r1 = -a_scaled.transpose() * &yh;
            let r2 = &bm_ax - &h - &z;
            let r3 = DVector::from_iterator(m, (0..m).map(|i| rmu - yz[i]));

            let inf_norm = |v: &DVector<f64>| v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
            let (r1n, r2n, r3n) = (inf_norm(&r1), inf_norm(&r2), inf_norm(&r3));
            res = r1n.max(r2n).max(r3n);

            if res < tolerance * (1.0 + bnrm) && rmu <= MIN_MU {
                converged = true;
                x += starting_point;
                break;
            }

            let y_q = &y_diag * &q;
            let yqqy = y_q.component_mul(&y_q.transpose());

            let y2h: DVector<f64> = 2.0 * &yh;
            let y_a = &y_diag * &a_scaled;

            let temp_prod: DVector<f64> = y2h.component_mul(&z);
            let temp_g = DVector::from_iterator(m, temp_prod.iter().map(|v| v.max(1e-12)));
            let mut temp_g_diag = DMatrix::zeros(m, m);
            for i in 0..m {
                temp_g_diag[(i, i)] = temp_g[i];
            }
            let g = yqqy + temp_g_diag;

            let hz: DVector<f64> = &h + &z;
            let mut hz_diag = DMatrix::zeros(m, m);
            for i in 0..m {
                hz_diag[(i, i)] = hz[i];
            }
            let temp_hz_ya = hz_diag * &y_a;

            let big_t = solve_robust(&g, &temp_hz_ya)?;
            let mut y2h_diag = DMatrix::zeros(m, m);
            for i in 0..m {
                y2h_diag[(i, i)] = y2h[i];
            }
            let atp = (y2h_diag * &big_t - &y_a).transpose();

            let r3_dy: DVector<f64> = DVector::from_iterator(m, (0..m).map(|i| r3[i] / y[i]));
            let r23: DVector<f64> = &r2 - &r3_dy;

            let temp_dx_r = &r1 + &atp * &r23;
            let temp_dx_l = &atp * &a_scaled;
            let dx = solve_robust(&temp_dx_l, &DMatrix::from_column_slice(n, 1, temp_dx_r.as_slice()))?
                .column(0)
                .into_owned();

            let a_dx = &a_scaled * &dx;
            let rhs_dy: DVector<f64> = y2h.component_mul(&(&a_dx - &r23));
            let dy_dy = solve_robust(&g, &DMatrix::from_column_slice(m, 1, rhs_dy.as_slice()))?
                .column(0)
                .into_owned();

            let dy: DVector<f64> = y.component_mul(&dy_dy);
            let dz: DVector<f64> = &r3_dy - z.component_mul(&dy_dy);

            let mut min_a = 1.0_f64;
            let temp_min = -0.5_f64;

            let neg_adx_bmax_min = (0..m)
                .map(|i| -a_dx[i] * bm_ax[i])
                .fold(f64::MAX, f64::min);
            let ax = -1.0 / temp_min.min(neg_adx_bmax_min);
            if ax <= min_a {
                min_a = ax;
            }

            let dy_dy_min = dy_dy.iter().cloned().fold(f64::MAX, f64::min);
            let ay = -1.0 / temp_min.min(dy_dy_min);
            if ay <= min_a {
                min_a = ay;
            }

            let dz_over_z_min = (0..m).map(|i| dz[i] / z[i]).fold(f64::MAX, f64::min);
            let az = -1.0 / temp_min.min(dz_over_z_min);
            if az <= min_a {
                min_a = az;
            }

            let tau = TAU0.max(1.0 - res);
            let astep = tau * min_a;

            x += astep * &dx;
            y += astep * &dy;
            z += astep * &dz;
            bm_ax -= astep * &a_dx;
        }

        let l = cholesky_lower(&e2)?;
        Ok(Self {
            ellipsoid: e2,
            rounding_transformation: l,
            center: x,
            converged,
            iterations,
            current_error: res,
        })
    }

    /// `det(roundingTransformation) * unit_ball_volume(n)`.
    pub fn volume(&self) -> f64 {
        let n = self.rounding_transformation.ncols();
        let half_dim = n as f64 * 0.5;
        std::f64::consts::PI.powf(half_dim) / gamma(half_dim + 1.0)
            * self.rounding_transformation.diagonal().iter().product::<f64>()
    }
}

/// Lanczos approximation of the gamma function, sufficient for the
/// small-to-moderate dimension volumes this crate reports diagnostically.
fn gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        std::f64::consts::PI / ((std::f64::consts::PI * x).sin() * gamma(1.0 - x))
    } else {
        let x = x - 1.0;
        let mut a = COEFFICIENTS[0];
        let t = x + G + 0.5;
        for (i, c) in COEFFICIENTS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        (2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> (DMatrix<f64>, DVector<f64>) {
        let a = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        (a, b)
    }

    #[test]
    fn mve_of_unit_square_is_centered_at_origin() {
        let (a, b) = unit_square();
        let start = DVector::from_vec(vec![0.0, 0.0]);
        let mve = MaximumVolumeEllipsoid::construct(&a, &b, 200, &start, 1e-10).unwrap();
        assert!(mve.converged);
        assert!(mve.center.norm() < 1e-4);
    }

    #[test]
    fn mve_rounding_transformation_is_lower_triangular() {
        let (a, b) = unit_square();
        let start = DVector::from_vec(vec![0.0, 0.0]);
        let mve = MaximumVolumeEllipsoid::construct(&a, &b, 200, &start, 1e-10).unwrap();
        assert!(mve.rounding_transformation[(0, 1)].abs() < 1e-9);
    }
}
