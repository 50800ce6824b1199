//! Error types for mixture-model operations.

use std::fmt;

/// Result type for mixture-model operations.
pub type MixtureResult<T> = Result<T, MixtureError>;

/// Errors that can occur while fitting or evaluating a mixture model.
#[derive(Debug, Clone)]
pub enum MixtureError {
    /// Invalid parameter or input value.
    InvalidParameter { parameter: String, message: String },

    /// Input tensors have incompatible shapes.
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        context: String,
    },

    /// Covariance matrix could not be Cholesky-factored.
    NotPositiveDefinite {
        context: String,
        pivot: usize,
        value: f64,
    },

    /// Error from underlying numr operation.
    NumrError(String),
}

impl fmt::Display for MixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { parameter, message } => {
                write!(f, "Invalid parameter '{}': {}", parameter, message)
            }
            Self::ShapeMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Shape mismatch in {}: expected {:?}, got {:?}",
                    context, expected, actual
                )
            }
            Self::NotPositiveDefinite {
                context,
                pivot,
                value,
            } => {
                write!(
                    f,
                    "Matrix is not positive-definite in {}: pivot {} has value {}",
                    context, pivot, value
                )
            }
            Self::NumrError(msg) => {
                write!(f, "numr error: {}", msg)
            }
        }
    }
}

impl std::error::Error for MixtureError {}

impl From<numr::error::Error> for MixtureError {
    fn from(err: numr::error::Error) -> Self {
        Self::NumrError(err.to_string())
    }
}

impl MixtureError {
    pub(crate) fn invalid(parameter: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }
}
