// ================================================================
// File: loyalty-common/src/error.rs
// ================================================================

use thiserror::Error;
use uuid::Uuid;

/// SQLSTATE codes that mean a concurrent transaction got in the way.
/// Check violations are not among them: those point at bad input or a bug.
const CONFLICT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
    "23505", // unique_violation
];

#[derive(Debug, Error)]
pub enum Error {
    #[error("Code not found or inactive: {code}")]
    CodeNotFound { code: String },

    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: Uuid },

    #[error("Progress record not found, already redeemed, or not owned: {progress_record_id}")]
    ProgressNotFound { progress_record_id: Uuid },

    #[error("Catalog item not found or inactive: {item_id}")]
    ItemNotFound { item_id: Uuid },

    #[error("Redemption not found: {redemption_id}")]
    RedemptionNotFound { redemption_id: Uuid },

    #[error("Insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Catalog item out of stock: {item_id}")]
    OutOfStock { item_id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

/// The coarse failure classes a caller renders or retries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InsufficientPoints,
    OutOfStock,
    Conflict,
    InvalidInput,
    StorageFailure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CodeNotFound { .. }
            | Error::AccountNotFound { .. }
            | Error::ProgressNotFound { .. }
            | Error::ItemNotFound { .. }
            | Error::RedemptionNotFound { .. } => ErrorKind::NotFound,
            Error::InsufficientPoints { .. } => ErrorKind::InsufficientPoints,
            Error::OutOfStock { .. } => ErrorKind::OutOfStock,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Database(_)
            | Error::Migration(_)
            | Error::Timeout(_) => ErrorKind::StorageFailure,
        }
    }

    /// Only storage failures are worth an automatic retry. Business-rule
    /// rejections are final for the request.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageFailure
    }

    /// Points still missing for an `InsufficientPoints` rejection.
    pub fn points_needed(&self) -> Option<i64> {
        match self {
            Error::InsufficientPoints { required, available } => Some(required - available),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        let is_conflict = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| CONFLICT_SQLSTATES.contains(&code.as_ref()))
            .unwrap_or(false);

        if is_conflict {
            Error::Conflict(err.to_string())
        } else {
            Error::Database(err)
        }
    }
}
