//! The Chebyshev-center linear-program solver boundary.
//!
//! Computing a default starting point, pruning redundant constraints, and
//! finding unconstrained dimensions all require an LP solver. That solver is
//! an external collaborator (spec.md §1, §6 exclude "linear-program solver
//! wrappers" from the core): this module only names the interface a caller's
//! solver must satisfy, plus the plain-data shapes it exchanges with the
//! core. No solver implementation ships here.

use nalgebra::DVector;

use crate::errors::GeometryResult;
use crate::polytope::Polytope;

/// Outcome of a single LP solve, mirroring the status vocabulary most LP
/// backends (GLPK, Clp, HiGHS) already expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Undefined,
    Error,
}

/// `(objective_value, x*, status)` — the return shape spec.md §6 specifies
/// for the external solver's `solve(c)`.
#[derive(Debug, Clone)]
pub struct LpSolution {
    pub objective_value: f64,
    pub x: DVector<f64>,
    pub status: LpStatus,
}

/// The boundary a caller-supplied LP solver must satisfy to be used for
/// computing a Chebyshev-center starting point or for polytope preprocessing.
/// `convex_geometry` never implements this trait itself; a chain constructed
/// without one must be given an explicit, already-interior starting point.
pub trait ChebyshevSolver {
    /// Solve `max c^T x` (or `min`, at the implementation's convention)
    /// subject to the solver's currently configured constraint set.
    fn solve(&mut self, c: &DVector<f64>) -> GeometryResult<LpSolution>;

    /// Maximize `r` subject to `A x + r ||a_i|| <= b_i` for every row `i`,
    /// returning the center `x*` and inradius `r*` as `x`/`objective_value`
    /// of the returned solution.
    fn chebyshev_center(&mut self, polytope: &Polytope) -> GeometryResult<LpSolution>;

    /// Drop constraints that are implied by the others, to the given
    /// numerical tolerance. Returns the indices of rows removed.
    fn remove_redundant_constraints(&mut self, polytope: &Polytope, tol: f64) -> GeometryResult<Vec<usize>>;

    /// Coordinates along which no finite constraint binds in either
    /// direction, i.e. the polytope is unbounded along that axis.
    fn unconstrained_dimensions(&mut self, polytope: &Polytope) -> GeometryResult<Vec<usize>>;

    /// Extend the solver's constraint set with `lb <= x <= ub` box bounds.
    fn add_box_constraints(&mut self, lb: &DVector<f64>, ub: &DVector<f64>) -> GeometryResult<()>;
}
