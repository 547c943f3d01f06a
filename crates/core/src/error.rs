//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
///
/// Client mapping: `InsufficientStock`, `InvalidTransition` and `Conflict`
/// are conflict outcomes; `Validation`/`InvalidId` are input errors;
/// `NotFound` is a missing resource; `InvariantViolation` is a server fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, currency mismatch).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (ledger counter would go negative).
    ///
    /// Should be unreachable given correct state-machine guards; treated as
    /// a fatal internal-consistency fault and never retried.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A reservation could not be satisfied from available stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// A lifecycle operation was attempted from a status that does not
    /// permit it. Indicates the caller's view of the rental is stale.
    #[error("operation '{operation}' is not valid from status '{from}'")]
    InvalidTransition { operation: String, from: String },
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

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_stock(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn invalid_transition(operation: impl Into<String>, from: impl Into<String>) -> Self {
        Self::InvalidTransition {
            operation: operation.into(),
            from: from.into(),
        }
    }
}
