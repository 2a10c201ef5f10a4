//! Error types shared across the lifecycle engine and its storage backends.

use thiserror::Error;

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Persistence-layer failures, surfaced by storage implementations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors produced by the lifecycle engine.
///
/// Duplicate check-ins are deliberately *not* represented here; idempotency
/// conflicts are normalized into the success path by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Participant, meeting, or pipeline record missing for the given tenant.
    /// Tenant scoping is mandatory, so an ID valid in another tenant still
    /// reports not-found here.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Too many check-in attempts inside the rolling window. Retryable after
    /// backoff; no state was mutated.
    #[error("Too many check-in attempts for participant '{participant_id}'")]
    RateLimited { participant_id: String },

    /// Participant status does not permit check-in (e.g. `declined`).
    /// Terminal until an admin intervenes; no state was mutated.
    #[error("Participant '{participant_id}' has status '{status}' and cannot check in")]
    InvalidStatus {
        participant_id: String,
        status: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Database(_))
    }
}
