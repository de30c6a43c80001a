use thiserror::Error;

use crate::store::StoreError;
use crate::validation::ValidationErrors;

pub type JourneyResult<T> = Result<T, JourneyError>;

/// Message returned to the losing writer of a concurrent update.
pub const CONCURRENT_MODIFICATION: &str = "Journey was modified concurrently; reload and retry";

#[derive(Error, Debug)]
pub enum JourneyError {
    /// Input failed the schema; carries every offending field.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A semantic check failed, e.g. publishing without a trigger step.
    #[error("{0}")]
    Precondition(String),

    #[error("journey {0} not found")]
    NotFound(String),

    /// The requested change is illegal in the journey's current status.
    #[error("{0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<ValidationErrors> for JourneyError {
    fn from(errors: ValidationErrors) -> Self {
        JourneyError::Validation(errors)
    }
}

impl From<StoreError> for JourneyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing(id) => JourneyError::NotFound(id.to_string()),
            StoreError::StaleRevision { .. } => {
                JourneyError::Conflict(CONCURRENT_MODIFICATION.to_string())
            }
            other => JourneyError::Store(other),
        }
    }
}
