//! # Record Lifecycle
//!
//! The lifecycle of a hash is never stored. It is inferred from whether a
//! record exists under the hash, so the guards below only ever see two
//! observable states.
//!
//! ```text
//!                RegisterHash               ConfirmCIDUpload
//!  Unregistered ─────────────→ IntentEmitted ───────────────→ Bound
//!       ↑           (event)      (no trace)       (write)       │
//!       │                                                       │ RequestDeleteCIDRecord
//!       │                                                       │ (event, still Bound)
//!       │               DeleteCIDRecord                         ↓
//!       └──────────────── Deleted ←──────────────────────────── Bound
//!                                    (delete)
//! ```
//!
//! | Conceptual phase | Observable state |
//! |------------------|------------------|
//! | Unregistered, IntentEmitted, Deleted | `Unbound` |
//! | Bound, deletion requested | `Bound` |
//!
//! Because an emitted intent leaves nothing on the ledger, a hash whose
//! upload never completes is indistinguishable from one that was never
//! registered.

use crate::errors::RegistryError;
use crate::events::EventName;
use std::fmt;

/// Observable lifecycle state of a hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// No record is stored under the hash.
    Unbound,
    /// A record is stored under the hash.
    Bound,
}

impl RecordState {
    /// Derive the state from a store existence check.
    #[must_use]
    pub fn from_exists(exists: bool) -> Self {
        if exists {
            Self::Bound
        } else {
            Self::Unbound
        }
    }
}

/// What an operation requires of the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// Runs in any state.
    Any,
    /// Requires `Unbound`; violations are `AlreadyExists`.
    Unbound,
    /// Requires `Bound`; violations are `NotFound`.
    Bound,
}

/// The state-changing and event-emitting operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Announce a hash/vector pair for off-chain upload.
    RegisterHash,
    /// Bind the uploaded CID to the hash.
    ConfirmCidUpload,
    /// Ask the matching worker to authenticate a vector.
    AuthenticateFace,
    /// Hand the stored record to the off-chain deletion approver.
    RequestDelete,
    /// Remove the record after off-chain approval.
    DeleteRecord,
}

impl Transition {
    /// All transitions, in lifecycle order.
    pub const ALL: [Transition; 5] = [
        Transition::RegisterHash,
        Transition::ConfirmCidUpload,
        Transition::AuthenticateFace,
        Transition::RequestDelete,
        Transition::DeleteRecord,
    ];

    /// State required before the transition may run.
    #[must_use]
    pub fn precondition(self) -> Precondition {
        match self {
            Self::RegisterHash | Self::ConfirmCidUpload => Precondition::Unbound,
            Self::AuthenticateFace => Precondition::Any,
            Self::RequestDelete | Self::DeleteRecord => Precondition::Bound,
        }
    }

    /// Event handed to off-chain workers, if any.
    ///
    /// Confirmation and deletion are terminal and trigger nothing.
    #[must_use]
    pub fn emits(self) -> Option<EventName> {
        match self {
            Self::RegisterHash => Some(EventName::RegisterFace),
            Self::AuthenticateFace => Some(EventName::AuthenticateFace),
            Self::RequestDelete => Some(EventName::RequestDelete),
            Self::ConfirmCidUpload | Self::DeleteRecord => None,
        }
    }

    /// Reject the transition if `current` does not satisfy its precondition.
    pub fn guard(self, hash: &str, current: RecordState) -> Result<(), RegistryError> {
        match (self.precondition(), current) {
            (Precondition::Unbound, RecordState::Bound) => {
                Err(RegistryError::already_exists(hash))
            }
            (Precondition::Bound, RecordState::Unbound) => Err(RegistryError::not_found(hash)),
            _ => Ok(()),
        }
    }

    /// State after the transition commits.
    #[must_use]
    pub fn next_state(self, current: RecordState) -> RecordState {
        match self {
            Self::ConfirmCidUpload => RecordState::Bound,
            Self::DeleteRecord => RecordState::Unbound,
            Self::RegisterHash | Self::AuthenticateFace | Self::RequestDelete => current,
        }
    }

    /// Exported chaincode function name.
    #[must_use]
    pub fn function_name(self) -> &'static str {
        match self {
            Self::RegisterHash => "RegisterHash",
            Self::ConfirmCidUpload => "ConfirmCIDUpload",
            Self::AuthenticateFace => "AuthenticateFace",
            Self::RequestDelete => "RequestDeleteCIDRecord",
            Self::DeleteRecord => "DeleteCIDRecord",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_guards() {
        let state = RecordState::Unbound;
        assert!(Transition::RegisterHash.guard("h", state).is_ok());
        assert!(Transition::ConfirmCidUpload.guard("h", state).is_ok());
        assert!(Transition::AuthenticateFace.guard("h", state).is_ok());
        assert_eq!(
            Transition::RequestDelete.guard("h", state),
            Err(RegistryError::not_found("h"))
        );
        assert_eq!(
            Transition::DeleteRecord.guard("h", state),
            Err(RegistryError::not_found("h"))
        );
    }

    #[test]
    fn test_bound_guards() {
        let state = RecordState::Bound;
        assert_eq!(
            Transition::RegisterHash.guard("h", state),
            Err(RegistryError::already_exists("h"))
        );
        assert_eq!(
            Transition::ConfirmCidUpload.guard("h", state),
            Err(RegistryError::already_exists("h"))
        );
        assert!(Transition::AuthenticateFace.guard("h", state).is_ok());
        assert!(Transition::RequestDelete.guard("h", state).is_ok());
        assert!(Transition::DeleteRecord.guard("h", state).is_ok());
    }

    #[test]
    fn test_full_cycle() {
        let mut state = RecordState::Unbound;
        for t in [
            Transition::RegisterHash,
            Transition::ConfirmCidUpload,
            Transition::RequestDelete,
            Transition::DeleteRecord,
            // re-registration after deletion
            Transition::RegisterHash,
        ] {
            t.guard("h", state).unwrap();
            state = t.next_state(state);
        }
        assert_eq!(state, RecordState::Unbound);
    }

    #[test]
    fn test_terminal_transitions_emit_nothing() {
        let emitting: Vec<_> = Transition::ALL
            .iter()
            .filter_map(|t| t.emits().map(|e| (t.function_name(), e.as_str())))
            .collect();
        assert_eq!(
            emitting,
            vec![
                ("RegisterHash", "RegisterFace"),
                ("AuthenticateFace", "AuthenticateFace"),
                ("RequestDeleteCIDRecord", "RequestDelete"),
            ]
        );
    }
}
