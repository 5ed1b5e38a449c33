//! Undoes an affine transformation (typically polytope rounding) on the
//! state a proposal reports, without the proposal itself knowing it is
//! operating in rounded coordinates. Ported from `original_source`'s
//! `Transformation`/`StateTransformation`.

use nalgebra::{DMatrix, DVector};

use crate::errors::{SamplerError, SamplerResult};
use crate::proposal::Proposal;

/// `x_unrounded = matrix * x_rounded + shift`. `apply_inverse` takes the
/// lower-triangular fast path when `matrix` is lower triangular (rounding
/// transformations always are, since they come from an ellipsoid's Cholesky
/// factor), falling back to a general solve otherwise.
#[derive(Debug, Clone)]
pub struct AffineTransformation {
    pub matrix: DMatrix<f64>,
    pub shift: DVector<f64>,
    lower_triangular: bool,
}

impl AffineTransformation {
    pub fn new(matrix: DMatrix<f64>, shift: DVector<f64>) -> Self {
        let lower_triangular = is_lower_triangular(&matrix);
        Self {
            matrix,
            shift,
            lower_triangular,
        }
    }

    pub fn identity(dimension: usize) -> Self {
        Self::new(DMatrix::identity(dimension, dimension), DVector::zeros(dimension))
    }

    pub fn apply(&self, vector: &DVector<f64>) -> DVector<f64> {
        &self.matrix * vector + &self.shift
    }

    pub fn apply_inverse(&self, vector: &DVector<f64>) -> SamplerResult<DVector<f64>> {
        let shifted = vector - &self.shift;
        if self.lower_triangular {
            convex_geometry::linalg::solve(&self.matrix, &shifted).map_err(SamplerError::from)
        } else {
            self.matrix
                .clone()
                .try_inverse()
                .map(|inv| inv * shifted)
                .ok_or_else(|| SamplerError::NumericFailure {
                    operation: "AffineTransformation::apply_inverse".to_string(),
                    detail: "transformation matrix is not invertible".to_string(),
                })
        }
    }
}

fn is_lower_triangular(matrix: &DMatrix<f64>) -> bool {
    for i in 0..matrix.nrows() {
        for j in (i + 1)..matrix.ncols() {
            if matrix[(i, j)].abs() > 1e-12 {
                return false;
            }
        }
    }
    true
}

/// Wraps a proposal so that every state it reports is expressed in the
/// unrounded (original) coordinate system, while the proposal itself keeps
/// operating in rounded coordinates, where its geometry-aware kernels (Dikin,
/// CSmMALA, billiard reflections) numerically behave best.
pub struct StateTransformed<P: Proposal> {
    inner: P,
    transformation: AffineTransformation,
}

impl<P: Proposal> StateTransformed<P> {
    pub fn new(inner: P, transformation: AffineTransformation) -> Self {
        Self {
            inner,
            transformation,
        }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    /// The current state, expressed in unrounded coordinates.
    pub fn unrounded_state(&self) -> DVector<f64> {
        self.transformation.apply(self.inner.state())
    }
}

impl<P: Proposal> Proposal for StateTransformed<P> {
    fn propose(&mut self, rng: &mut dyn rand::RngCore) -> SamplerResult<(DVector<f64>, f64)> {
        let (candidate, log_correction) = self.inner.propose(rng)?;
        Ok((self.transformation.apply(&candidate), log_correction))
    }

    fn accept(&mut self) -> DVector<f64> {
        let rounded = self.inner.accept();
        self.transformation.apply(&rounded)
    }

    fn set_state(&mut self, x: DVector<f64>) -> SamplerResult<()> {
        let rounded = self.transformation.apply_inverse(&x)?;
        self.inner.set_state(rounded)
    }

    fn state(&self) -> &DVector<f64> {
        self.inner.state()
    }

    fn proposal(&self) -> Option<&DVector<f64>> {
        self.inner.proposal()
    }

    fn step_size(&self) -> Option<f64> {
        self.inner.step_size()
    }

    fn set_step_size(&mut self, value: f64) -> SamplerResult<()> {
        self.inner.set_step_size(value)
    }

    fn parameter(&self, name: crate::proposal::ProposalParameter) -> Option<f64> {
        self.inner.parameter(name)
    }

    fn set_parameter(&mut self, name: crate::proposal::ProposalParameter, value: f64) -> SamplerResult<()> {
        self.inner.set_parameter(name, value)
    }

    fn is_model_aware(&self) -> bool {
        self.inner.is_model_aware()
    }
}
