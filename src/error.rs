//! Store error classification
//!
//! Every repository operation surfaces one of four error kinds so the
//! request layer can map them to responses without inspecting driver
//! internals:
//! - `NotFound`: a single-row lookup matched zero rows
//! - `Conflict`: a uniqueness constraint was violated
//! - `Validation`: caller-supplied data failed a field-level rule
//! - `Database`: any other driver or connection failure

use thiserror::Error;

/// Result alias used by every repository operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error kinds exposed by the persistence core.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A single-row lookup or targeted write matched zero rows.
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller-supplied data failed a field-level rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Any other database failure (connection loss, foreign key, ...).
    #[error("database failure: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

impl StoreError {
    /// True when the error is the zero-rows case rather than a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// True when a uniqueness constraint rejected the write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}
