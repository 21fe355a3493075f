//! # CID Registry - Biometric Hash to CID Chaincode
//!
//! Binds a biometric hash to the content identifier (CID) of a feature
//! vector stored off-chain. The ledger is the source of truth; off-chain
//! workers do the upload, matching and deletion approval, driven by events.
//!
//! ## Handoff Protocol
//!
//! ```text
//!  submitter            ledger                      off-chain workers
//!  ─────────            ──────                      ─────────────────
//!  RegisterHash ──────→ guard: unbound
//!                       emit RegisterFace ────────→ upload worker
//!                                                     │ upload vector
//!                       guard: unbound          ←─────┘ ConfirmCIDUpload
//!                       write {id, cid}
//!
//!  AuthenticateFace ──→ emit AuthenticateFace ───→ matching worker
//!
//!  RequestDelete... ──→ guard: bound
//!                       emit RequestDelete ──────→ deletion approver
//!                       guard: bound            ←─── DeleteCIDRecord
//!                       delete
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Write-once records | `domain/lifecycle.rs` - `Transition::guard()` |
//! | Atomic check-then-act | `adapters/ledger.rs` - `SerialLedger::submit()` |
//! | No effects from failed transactions | `adapters/ledger.rs` - overlay dropped on error |
//! | Events only after commit, in commit order | `service.rs` - `RegistryService::commit()` |
//! | Lenient enumeration | `store.rs` - `RecordScan` |
//!
//! ## Known Gap
//!
//! `RegisterHash` leaves nothing on the ledger. If the upload worker never
//! confirms, the intent is lost and the hash looks never registered. Two
//! intents for the same hash can both be emitted before either confirms;
//! the second confirmation is then rejected with `AlreadyExists`.
//!
//! ## Usage Example
//!
//! ```ignore
//! use cid_registry::prelude::*;
//!
//! let service = create_test_service();
//! service.confirm_cid_upload("abc123", "QmXyz").await?;
//! let record = service.read_cid_record("abc123").await?;
//! assert_eq!(record.cid, "QmXyz");
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod contract;
pub mod domain;
pub mod errors;
pub mod events;
pub mod invocation;
pub mod ports;
pub mod service;
pub mod store;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{validate_hash, CidRecord, COMPOSITE_KEY_NAMESPACE};
    pub use crate::domain::lifecycle::{Precondition, RecordState, Transition};

    // Events
    pub use crate::events::{
        names, AuthenticationRequest, ChaincodeEvent, DeletionRequest, EventName,
        RegistrationIntent,
    };

    // Ports
    pub use crate::ports::inbound::CidRegistryApi;
    pub use crate::ports::outbound::{
        Committed, Ledger, StateBackend, StateEntry, StateIter, TxOutcome, WorldState, WriteSet,
    };

    // Errors
    pub use crate::errors::{LedgerError, RegistryError};

    // Contract and routing
    pub use crate::contract::CidRecordContract;
    pub use crate::invocation::{Function, Invocation};
    pub use crate::store::{RecordScan, RecordStore};

    // Adapters
    pub use crate::adapters::{MemoryBackend, SerialLedger, TxState};

    // Service
    pub use crate::service::{create_test_service, RegistryService, ServiceConfig, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Chaincode name events are stamped with by default.
pub const CHAINCODE_NAME: &str = "cidrecord";

/// Channel the chaincode is deployed on by default.
pub const DEFAULT_CHANNEL: &str = "mychannel";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = ServiceConfig::default();
        let _ = CidRecordContract::default();
        assert_eq!(Function::SIGNATURES.len(), 9);
    }
}
