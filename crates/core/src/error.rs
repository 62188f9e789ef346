use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Step mismatch: expected step '{expected}', got '{actual}'")]
    StepMismatch { expected: String, actual: String },

    #[error("Version conflict: {entity} {id} is no longer at version {expected_version}")]
    VersionConflict {
        entity: &'static str,
        id: DbId,
        expected_version: i64,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the caller should reload and reapply the operation.
    ///
    /// Only optimistic-concurrency failures qualify; every other error is
    /// deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::VersionConflict { .. })
    }
}
