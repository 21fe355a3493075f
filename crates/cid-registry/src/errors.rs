//! # Error Types
//!
//! All error types for the CID registry chaincode.
//!
//! Every error aborts the transaction it occurs in. Nothing is retried
//! locally and a failed transaction leaves no writes and no event behind.

use thiserror::Error;

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors raised by the ledger world state itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The state backend failed to read or write.
    #[error("ledger backend error: {0}")]
    Backend(String),

    /// A lock guarding ledger state was poisoned by a panicking writer.
    #[error("ledger lock poisoned")]
    LockPoisoned,

    /// The key cannot be stored in the world state.
    #[error("invalid state key: {0:?}")]
    InvalidKey(String),
}

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors surfaced to transaction submitters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The operation needs an existing record and there is none.
    #[error("record {hash} does not exist")]
    NotFound {
        /// Hash that was looked up.
        hash: String,
    },

    /// The operation needs the hash to be unbound and a record is present.
    #[error("record {hash} already exists")]
    AlreadyExists {
        /// Hash that is already bound.
        hash: String,
    },

    /// The underlying ledger read or write failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] LedgerError),

    /// Stored or payload bytes do not parse as the expected structure.
    #[error("decode error: {0}")]
    Decode(String),

    /// The event could not be attached to the transaction.
    #[error("failed to emit {event} event: {reason}")]
    EmitFailure {
        /// Event name.
        event: String,
        /// Why it could not be built.
        reason: String,
    },

    /// A caller-supplied argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The invocation names a function the chaincode does not export.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The invocation carries the wrong number of arguments.
    #[error("{function} expects {expected} argument(s), got {actual}")]
    InvalidArity {
        /// Exported function name.
        function: &'static str,
        /// Arguments the function takes.
        expected: usize,
        /// Arguments supplied.
        actual: usize,
    },
}

impl RegistryError {
    /// Stable machine-readable code for responses and logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Decode(_) => "DECODE",
            Self::EmitFailure { .. } => "EMIT_FAILURE",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::UnknownFunction(_) => "UNKNOWN_FUNCTION",
            Self::InvalidArity { .. } => "INVALID_ARITY",
        }
    }

    /// Returns true if a lifecycle guard rejected the operation.
    #[must_use]
    pub fn is_guard_rejection(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AlreadyExists { .. })
    }

    pub(crate) fn not_found(hash: &str) -> Self {
        Self::NotFound {
            hash: hash.to_string(),
        }
    }

    pub(crate) fn already_exists(hash: &str) -> Self {
        Self::AlreadyExists {
            hash: hash.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::not_found("abc123");
        assert_eq!(err.to_string(), "record abc123 does not exist");

        let err = RegistryError::already_exists("abc123");
        assert_eq!(err.to_string(), "record abc123 already exists");

        let err = RegistryError::InvalidArity {
            function: "ConfirmCIDUpload",
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "ConfirmCIDUpload expects 2 argument(s), got 1"
        );
    }

    #[test]
    fn test_ledger_error_conversion() {
        let err: RegistryError = LedgerError::LockPoisoned.into();
        assert!(matches!(err, RegistryError::StoreUnavailable(_)));
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn test_guard_rejection() {
        assert!(RegistryError::not_found("h").is_guard_rejection());
        assert!(RegistryError::already_exists("h").is_guard_rejection());
        assert!(!RegistryError::Decode("bad".into()).is_guard_rejection());
    }

    #[test]
    fn test_serde_error_is_decode() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let err: RegistryError = err.into();
        assert_eq!(err.code(), "DECODE");
    }
}
