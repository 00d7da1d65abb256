//! Domain error model.

use thiserror::Error;

/// Result type used across the directory layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Argument and capability failures are raised before any store access.
/// Per-field patch conversion failures are *not* represented here; they are
/// collected in-band by the patch applicators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Malformed pagination or identifier input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency token mismatch on write.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The configured store lacks a capability the operation requires.
    #[error("{operation} requires store capability `{capability}`")]
    UnsupportedStoreCapability {
        operation: &'static str,
        capability: &'static str,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Backing store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn unsupported(operation: &'static str, capability: &'static str) -> Self {
        Self::UnsupportedStoreCapability {
            operation,
            capability,
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether a caller may retry after refetching.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}
