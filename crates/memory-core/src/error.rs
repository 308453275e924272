//! Error taxonomy for the knowledge store
//!
//! A closed set of error kinds, each carrying a human message and a
//! retryable flag. Validation, not_found, conflict, and policy failures are
//! never retryable; dependency and internal failures are, since they stem
//! from a collaborator or invariant violation that may clear on its own.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Policy violation: {0}")]
    Policy(String),

    #[error("Dependency unavailable: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether a caller may reasonably retry the operation that produced
    /// this error.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Error::Dependency(_) | Error::Internal(_) | Error::Database(_) | Error::Pool(_)
        )
    }

    /// The closed error kind as a lowercase string, for the structured
    /// operation envelope (`{error: <kind>, message, retryable}`).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Policy(_) => "policy",
            Error::Dependency(_) => "dependency",
            Error::Internal(_) | Error::Database(_) | Error::Pool(_) | Error::Json(_) => {
                "internal"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
