//! Unified error taxonomy for the entity database.
//!
//! One `thiserror` enum carrying enough context to log usefully, plus
//! classification predicates so callers (and the boundary layer) can branch
//! on error *kind* without matching every variant.

use crate::EntityId;
use thiserror::Error;

/// The unified error type returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum EdbError {
    /// Bad input: missing id, malformed timestamp, wrong content type, etc.
    #[error("validation error: {reason}")]
    Validation {
        /// Human-readable reason.
        reason: String,
    },

    /// Entity absent, or absent at the requested time.
    #[error("entity not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: EntityId,
    },

    /// Illegal lifecycle transition, missing purge confirmation, id collision.
    #[error("conflict: {reason}")]
    Conflict {
        /// Human-readable reason.
        reason: String,
    },

    /// Missing RBAC permission. The core never raises this itself; it exists
    /// so a boundary layer can express permission denials in the same error
    /// family used for storage errors.
    #[error("permission denied: requires {permission}")]
    Permission {
        /// The permission tag that was required.
        permission: String,
    },

    /// Missing/invalid/expired session token. Same boundary-layer note as
    /// [`EdbError::Permission`].
    #[error("authentication required")]
    Authentication,

    /// I/O error, checksum mismatch, torn WAL frame, disk full.
    #[error("storage error: {reason}")]
    Storage {
        /// Human-readable reason.
        reason: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// A per-operation deadline expired.
    #[error("operation timed out")]
    Timeout,

    /// A metrics/retention path was skipped because the circuit breaker is open.
    /// Logged, never surfaced to clients.
    #[error("circuit open: {reason}")]
    CircuitOpen {
        /// Human-readable reason.
        reason: String,
    },
}

impl EdbError {
    /// Construct a [`EdbError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Construct a [`EdbError::NotFound`].
    pub fn not_found(id: EntityId) -> Self {
        Self::NotFound { id }
    }

    /// Construct a [`EdbError::Conflict`].
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Construct a [`EdbError::Storage`] with no underlying source.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
            source: None,
        }
    }

    /// Construct a [`EdbError::Storage`] wrapping an underlying error.
    pub fn storage_with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for errors that indicate the entity/record simply wasn't there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for errors arising from illegal state transitions or collisions.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True for malformed-input errors, never worth retrying as-is.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// True for on-disk/I-O failures.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// True when the caller might reasonably retry the same operation.
    ///
    /// Storage errors are retryable only at the caller's discretion (the
    /// core has already rolled back by the time this error surfaces);
    /// timeouts are retryable; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Timeout)
    }

    /// True for conditions serious enough to warrant paging/alerting rather
    /// than routine 4xx handling.
    pub fn is_serious(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<std::io::Error> for EdbError {
    fn from(e: std::io::Error) -> Self {
        Self::storage_with_source("I/O error", e)
    }
}

/// Convenience alias used throughout this crate's public API.
pub type EdbResult<T> = Result<T, EdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let e = EdbError::not_found(EntityId::new());
        assert!(e.is_not_found());
        assert!(!e.is_retryable());
    }

    #[test]
    fn storage_is_retryable_and_serious() {
        let e = EdbError::storage("disk full");
        assert!(e.is_retryable());
        assert!(e.is_serious());
        assert!(e.is_storage_error());
    }

    #[test]
    fn timeout_is_retryable_but_not_serious() {
        let e = EdbError::Timeout;
        assert!(e.is_retryable());
        assert!(!e.is_serious());
    }

    #[test]
    fn validation_is_not_retryable() {
        let e = EdbError::validation("missing id");
        assert!(e.is_validation_error());
        assert!(!e.is_retryable());
    }

    #[test]
    fn io_error_converts_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let e: EdbError = io.into();
        assert!(e.is_storage_error());
    }
}
