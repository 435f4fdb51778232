//! Error types for the agreement core library.

#[cfg(feature = "python")]
use pyo3::exceptions::{PyIOError, PyKeyError, PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;

/// Top-level error enum for the agreement core library.
#[derive(Debug, thiserror::Error)]
pub enum AgreementError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Agreement is not completed: {0}")]
    NotCompleted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgreementError {
    /// Shorthand for a missing annotation, agreement, or vocabulary entry.
    pub fn not_found(kind: &str, name: &str) -> Self {
        AgreementError::NotFound(format!("{kind} '{name}'"))
    }
}

#[cfg(feature = "python")]
impl From<AgreementError> for PyErr {
    fn from(err: AgreementError) -> PyErr {
        match &err {
            AgreementError::NotFound(_) => PyKeyError::new_err(err.to_string()),
            AgreementError::NotCompleted(_) | AgreementError::InvalidInput(_) => {
                PyValueError::new_err(err.to_string())
            }
            AgreementError::Store(_) | AgreementError::Sqlite(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            AgreementError::Io(_) => PyIOError::new_err(err.to_string()),
            AgreementError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type AgreementResult<T> = Result<T, AgreementError>;
