use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("polytope is malformed: {0}")]
    InvalidPolytope(String),

    #[error("starting point violates constraint {constraint_index}: slack {slack} <= 0")]
    StartingPointOutsidePolytope { constraint_index: usize, slack: f64 },

    #[error("numeric failure while computing {operation}: {detail}")]
    NumericFailure { operation: String, detail: String },
}

pub type GeometryResult<T> = Result<T, GeometryError>;

pub fn validate_finite(value: f64, name: &str) -> GeometryResult<f64> {
    if !value.is_finite() {
        return Err(GeometryError::NumericFailure {
            operation: name.to_string(),
            detail: format!("value {value} is not finite"),
        });
    }
    Ok(value)
}
