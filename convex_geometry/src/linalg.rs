//! Small wrappers around `nalgebra` factorizations shared by the metric-based
//! proposals (Dikin, CSmMALA) and by the maximum-volume-ellipsoid routine.

use nalgebra::{Cholesky, DMatrix, DVector, SVD};

use crate::errors::{GeometryError, GeometryResult};

/// Cholesky factor `L` of a symmetric positive-definite matrix, with a
/// descriptive error instead of a panic when the matrix is not SPD (this
/// happens in practice when a metric degenerates near a polytope corner).
pub fn cholesky_lower(matrix: &DMatrix<f64>) -> GeometryResult<DMatrix<f64>> {
    Cholesky::new(matrix.clone())
        .map(|c| c.l())
        .ok_or_else(|| GeometryError::NumericFailure {
            operation: "cholesky_lower".to_string(),
            detail: "matrix is not symmetric positive definite".to_string(),
        })
}

/// `log det(matrix)` via the Cholesky factor's diagonal, used by every
/// metric-based proposal's acceptance-ratio correction term.
pub fn log_determinant_spd(matrix: &DMatrix<f64>) -> GeometryResult<f64> {
    let l = cholesky_lower(matrix)?;
    Ok(2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>())
}

/// Symmetric square root of an SPD matrix's inverse, `M^{-1/2}`, built from
/// an SVD (`original_source` uses `M.jacobiSvd()` for the same purpose in
/// `CSmMALAProposal`, since plain Cholesky can be numerically fragile right
/// at the boundary of the feasible region).
pub fn sqrt_inv_spd(matrix: &DMatrix<f64>) -> GeometryResult<DMatrix<f64>> {
    Ok(sqrt_inv_spd_with_log_sqrt_determinant(matrix)?.0)
}

/// Same as [`sqrt_inv_spd`], but also returns `½ log det(matrix)` computed
/// from the same SVD call (`CSmMALAProposalDetails::computeMetricInfoForCSmMALAWithSvd`
/// in `original_source` derives both quantities from one decomposition rather
/// than factorizing twice).
pub fn sqrt_inv_spd_with_log_sqrt_determinant(
    matrix: &DMatrix<f64>,
) -> GeometryResult<(DMatrix<f64>, f64)> {
    let svd = SVD::new(matrix.clone(), true, true);
    let u = svd.u.ok_or_else(|| GeometryError::NumericFailure {
        operation: "sqrt_inv_spd".to_string(),
        detail: "SVD did not produce U".to_string(),
    })?;
    let singular_values = svd.singular_values;
    let n = singular_values.len();
    let mut inv_sqrt_diag = DMatrix::zeros(n, n);
    let mut log_sqrt_determinant = 0.0;
    for i in 0..n {
        let sv = singular_values[i];
        if sv <= f64::EPSILON {
            return Err(GeometryError::NumericFailure {
                operation: "sqrt_inv_spd".to_string(),
                detail: format!("singular value {i} is numerically zero"),
            });
        }
        inv_sqrt_diag[(i, i)] = 1.0 / sv.sqrt();
        log_sqrt_determinant += 0.5 * sv.ln();
    }
    Ok((&u * inv_sqrt_diag * u.transpose(), log_sqrt_determinant))
}

/// Solve `A x = b` via LU with partial pivoting, returning a `NumericFailure`
/// instead of `None` when `A` is singular.
pub fn solve(a: &DMatrix<f64>, b: &DVector<f64>) -> GeometryResult<DVector<f64>> {
    a.clone()
        .lu()
        .solve(b)
        .ok_or_else(|| GeometryError::NumericFailure {
            operation: "solve".to_string(),
            detail: "matrix is singular to working precision".to_string(),
        })
}

/// Solve `A X = B` for a (possibly multi-column) right-hand side via SVD.
/// `original_source`'s interior-point routines solve with Eigen's
/// `fullPivHouseholderQr`, chosen there for robustness rather than speed;
/// nalgebra has no equivalent decomposition, so an SVD-based solve is used
/// instead — at least as robust, just slower, which is an acceptable
/// trade-off for an algorithm that runs a few dozen times per polytope.
pub fn solve_robust(a: &DMatrix<f64>, b: &DMatrix<f64>) -> GeometryResult<DMatrix<f64>> {
    let svd = SVD::new(a.clone(), true, true);
    svd.solve(b, f64::EPSILON * 1e3)
        .map_err(|detail| GeometryError::NumericFailure {
            operation: "solve_robust".to_string(),
            detail: detail.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cholesky_recovers_identity() {
        let m = DMatrix::<f64>::identity(3, 3);
        let l = cholesky_lower(&m).unwrap();
        assert!((l - DMatrix::<f64>::identity(3, 3)).norm() < 1e-12);
    }

    #[test]
    fn log_determinant_of_scaled_identity() {
        let m = DMatrix::<f64>::identity(2, 2) * 4.0;
        let ld = log_determinant_spd(&m).unwrap();
        assert!((ld - (4.0_f64.ln() * 2.0)).abs() < 1e-9);
    }

    #[test]
    fn sqrt_inv_of_identity_is_identity() {
        let m = DMatrix::<f64>::identity(3, 3);
        let s = sqrt_inv_spd(&m).unwrap();
        assert!((s - DMatrix::<f64>::identity(3, 3)).norm() < 1e-9);
    }
}
