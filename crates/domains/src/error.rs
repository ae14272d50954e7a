//! # DomainError
//!
//! Centralized error handling for the ad engine.
//! Maps domain-specific failures to actionable error types; adapters
//! translate these into HTTP statuses.

use thiserror::Error;

/// The primary error type for all domain and port operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or malformed input (e.g., no `room_id`, bad `view_type`)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (e.g., Ad)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Missing or wrong shared secret
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Lifecycle transition not allowed from the current status
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, statement rejected)
    #[error("repository error: {0}")]
    Repository(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn ad_not_found(id: impl ToString) -> Self {
        Self::NotFound("ad".to_string(), id.to_string())
    }
}

/// A specialized Result type for ad engine logic.
pub type Result<T> = std::result::Result<T, DomainError>;
