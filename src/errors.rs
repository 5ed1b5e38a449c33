// Error types for the sampling core: one thiserror variant per failure kind
// plus small validation helpers used at every proposal/tuner boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("invalid polytope: {0}")]
    InvalidPolytope(String),

    #[error("starting point violates constraint {constraint_index}: slack {slack} <= 0")]
    StartingPointOutsidePolytope { constraint_index: usize, slack: f64 },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("numeric failure in {operation}: {detail}")]
    NumericFailure { operation: String, detail: String },

    #[error("external solver unavailable: {0}")]
    ExternalSolverUnavailable(String),

    #[error("reflector exceeded {max_reflections} reflections")]
    ReflectionExceeded { max_reflections: u64 },

    #[error("parallel tempering transport failure: {0}")]
    MpiTransportFailure(String),
}

pub type SamplerResult<T> = Result<T, SamplerError>;

pub fn validate_finite(value: f64, name: &str) -> SamplerResult<f64> {
    if !value.is_finite() {
        return Err(SamplerError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be finite, got {value}"),
        });
    }
    Ok(value)
}

pub fn validate_positive(value: f64, name: &str) -> SamplerResult<f64> {
    validate_finite(value, name)?;
    if value <= 0.0 {
        return Err(SamplerError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(value)
}

pub fn validate_unit_interval_half_open(value: f64, name: &str) -> SamplerResult<f64> {
    validate_finite(value, name)?;
    if !(0.0..1.0).contains(&value) {
        return Err(SamplerError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must lie in [0, 1), got {value}"),
        });
    }
    Ok(value)
}

pub fn validate_unit_interval_closed(value: f64, name: &str) -> SamplerResult<f64> {
    validate_finite(value, name)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SamplerError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must lie in [0, 1], got {value}"),
        });
    }
    Ok(value)
}

pub fn validate_ordered(lo: f64, hi: f64, lo_name: &str, hi_name: &str) -> SamplerResult<()> {
    validate_finite(lo, lo_name)?;
    if !(lo < hi) {
        return Err(SamplerError::InvalidParameter {
            name: format!("{lo_name}/{hi_name}"),
            reason: format!("expected {lo_name} < {hi_name}, got {lo} >= {hi}"),
        });
    }
    Ok(())
}

impl From<convex_geometry::GeometryError> for SamplerError {
    fn from(err: convex_geometry::GeometryError) -> Self {
        use convex_geometry::GeometryError as G;
        match err {
            G::InvalidPolytope(msg) => SamplerError::InvalidPolytope(msg),
            G::StartingPointOutsidePolytope {
                constraint_index,
                slack,
            } => SamplerError::StartingPointOutsidePolytope {
                constraint_index,
                slack,
            },
            G::NumericFailure { operation, detail } => {
                SamplerError::NumericFailure { operation, detail }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_parameters() {
        assert!(validate_positive(f64::NAN, "step_size").is_err());
        assert!(validate_positive(-1.0, "step_size").is_err());
        assert!(validate_positive(1.0, "step_size").is_ok());
    }

    #[test]
    fn half_open_interval_rejects_one() {
        assert!(validate_unit_interval_half_open(1.0, "p_model").is_err());
        assert!(validate_unit_interval_half_open(0.999, "p_model").is_ok());
    }
}
