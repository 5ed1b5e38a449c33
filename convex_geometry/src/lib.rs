//! Polytope representation and the geometric primitives shared by every
//! proposal kernel: slack bookkeeping, billiard reflection, and the
//! maximum-volume-ellipsoid used to build a well-conditioned Dikin metric.

pub mod chebyshev;
pub mod errors;
pub mod linalg;
pub mod mve;
pub mod polytope;
pub mod reflector;

pub use chebyshev::{ChebyshevSolver, LpSolution, LpStatus};
pub use errors::{GeometryError, GeometryResult};
pub use mve::MaximumVolumeEllipsoid;
pub use polytope::{Polytope, PolytopeMatrix};
pub use reflector::{Reflector, ReflectionOutcome};
