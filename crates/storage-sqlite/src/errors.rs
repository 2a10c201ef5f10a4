//! Mapping between diesel failures and the core error taxonomy.

use chapterflow_core::errors::{DatabaseError, Error};
use diesel::result::DatabaseErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether this failure is a uniqueness-constraint conflict. Repositories
    /// use this to turn duplicate inserts into idempotent-success paths
    /// instead of surfacing errors.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Diesel(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Diesel(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::Diesel(e) => Error::Database(DatabaseError::Query(e.to_string())),
            StorageError::Pool(e) => Error::Database(DatabaseError::Pool(e.to_string())),
            StorageError::Migration(msg) => Error::Database(DatabaseError::Internal(msg)),
        }
    }
}

/// True when a raw diesel error is a uniqueness-constraint conflict.
pub fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
