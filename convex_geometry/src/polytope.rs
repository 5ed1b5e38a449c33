use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;

use crate::errors::{GeometryError, GeometryResult};

/// `A` is accepted either as a dense matrix or a sparse CSR matrix, matching
/// callers that build up constraints from dense linear-algebra code and
/// callers (SBML-derived stoichiometry, mostly) that never would.
#[derive(Debug, Clone)]
pub enum PolytopeMatrix {
    Dense(DMatrix<f64>),
    Sparse(CsrMatrix<f64>),
}

impl PolytopeMatrix {
    pub fn nrows(&self) -> usize {
        match self {
            PolytopeMatrix::Dense(m) => m.nrows(),
            PolytopeMatrix::Sparse(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            PolytopeMatrix::Dense(m) => m.ncols(),
            PolytopeMatrix::Sparse(m) => m.ncols(),
        }
    }

    /// `A * v`
    pub fn mul_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        match self {
            PolytopeMatrix::Dense(m) => m * v,
            PolytopeMatrix::Sparse(m) => m * v,
        }
    }

    /// Row `i` of `A`, materialized densely — used by the reflector's
    /// per-constraint reflection formula and by coordinate-wise proposals.
    pub fn row(&self, i: usize) -> DVector<f64> {
        match self {
            PolytopeMatrix::Dense(m) => m.row(i).transpose().into_owned(),
            PolytopeMatrix::Sparse(m) => {
                let mut out = DVector::zeros(m.ncols());
                let row = m.row(i);
                for (col, &val) in row.col_indices().iter().zip(row.values()) {
                    out[*col] = val;
                }
                out
            }
        }
    }

    pub fn row_squared_norm(&self, i: usize) -> f64 {
        self.row(i).norm_squared()
    }

    /// Column `j` of `A`, materialized densely — used by coordinate-wise
    /// proposals to compute the chord endpoints along a single axis.
    pub fn column(&self, j: usize) -> DVector<f64> {
        match self {
            PolytopeMatrix::Dense(m) => m.column(j).into_owned(),
            PolytopeMatrix::Sparse(m) => {
                let mut out = DVector::zeros(m.nrows());
                let csc = nalgebra_sparse::CscMatrix::from(m);
                let col = csc.col(j);
                for (row, &val) in col.row_indices().iter().zip(col.values()) {
                    out[*row] = val;
                }
                out
            }
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            PolytopeMatrix::Dense(m) => m.clone(),
            PolytopeMatrix::Sparse(m) => DMatrix::from(m),
        }
    }

    pub fn transpose_mul_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        match self {
            PolytopeMatrix::Dense(m) => m.transpose() * v,
            PolytopeMatrix::Sparse(m) => m.transpose() * v,
        }
    }
}

/// A convex polytope `{x : A x <= b}` together with cached slack bookkeeping.
#[derive(Debug, Clone)]
pub struct Polytope {
    a: PolytopeMatrix,
    b: DVector<f64>,
    dimension: usize,
}

impl Polytope {
    pub fn new(a: PolytopeMatrix, b: DVector<f64>) -> GeometryResult<Self> {
        if a.nrows() != b.len() {
            return Err(GeometryError::InvalidPolytope(format!(
                "A has {} rows but b has {} entries",
                a.nrows(),
                b.len()
            )));
        }
        if a.ncols() == 0 {
            return Err(GeometryError::InvalidPolytope(
                "A must have at least one column".to_string(),
            ));
        }
        let dimension = a.ncols();
        Ok(Self { a, b, dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }

    pub fn a(&self) -> &PolytopeMatrix {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    /// `b - A x`
    pub fn slacks(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.b - self.a.mul_vec(x)
    }

    /// A point is strictly inside when every slack is positive.
    pub fn contains(&self, x: &DVector<f64>) -> bool {
        self.slacks(x).iter().all(|&s| s > 0.0)
    }

    /// Checks the starting-point precondition and reports the first
    /// violated constraint, as required for a `StartingPointOutsidePolytope`
    /// error at the caller boundary.
    pub fn check_starting_point(&self, x: &DVector<f64>) -> GeometryResult<()> {
        let slacks = self.slacks(x);
        for (i, &s) in slacks.iter().enumerate() {
            if !(s > 0.0) {
                return Err(GeometryError::StartingPointOutsidePolytope {
                    constraint_index: i,
                    slack: s,
                });
            }
        }
        Ok(())
    }

    /// The Dikin metric `H(x) = A^T diag(1/s^2) A` at `x`, shared by the
    /// Dikin walk and CSmMALA's position-dependent metric (`original_source`
    /// composes both proposals out of a single `DikinEllipsoidCalculator`
    /// rather than duplicating this accumulation).
    pub fn dikin_metric(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let slacks = self.slacks(x);
        let mut h = DMatrix::zeros(self.dimension, self.dimension);
        for i in 0..self.num_constraints() {
            let row = self.a.row(i);
            let weight = 1.0 / (slacks[i] * slacks[i]);
            h += &row * row.transpose() * weight;
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube(dim: usize) -> Polytope {
        let mut rows = Vec::new();
        let mut b = Vec::new();
        for i in 0..dim {
            let mut pos = vec![0.0; dim];
            pos[i] = 1.0;
            rows.push(pos.clone());
            b.push(1.0);
            let mut neg = vec![0.0; dim];
            neg[i] = -1.0;
            rows.push(neg);
            b.push(1.0);
        }
        let a = DMatrix::from_row_slice(
            rows.len(),
            dim,
            &rows.into_iter().flatten().collect::<Vec<_>>(),
        );
        Polytope::new(PolytopeMatrix::Dense(a), DVector::from_vec(b)).unwrap()
    }

    #[test]
    fn origin_is_inside_unit_cube() {
        let p = unit_cube(3);
        let x = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        assert!(p.contains(&x));
        assert!(p.check_starting_point(&x).is_ok());
    }

    #[test]
    fn boundary_point_is_rejected() {
        let p = unit_cube(2);
        let x = DVector::from_vec(vec![1.0, 0.0]);
        assert!(p.check_starting_point(&x).is_err());
    }

    #[test]
    fn slacks_match_definition() {
        let p = unit_cube(1);
        let x = DVector::from_vec(vec![0.25]);
        let slacks = p.slacks(&x);
        assert!((slacks[0] - 0.75).abs() < 1e-12);
        assert!((slacks[1] - 1.25).abs() < 1e-12);
    }
}
