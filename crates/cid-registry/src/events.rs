//! # Handoff Events
//!
//! Payloads the chaincode hands to off-chain workers, and the helpers
//! those workers use to read them back.
//!
//! | Event | Emitted by | Payload | Consumer |
//! |-------|-----------|---------|----------|
//! | `RegisterFace` | `RegisterHash` | `{"hash", "vector"}` | upload worker |
//! | `AuthenticateFace` | `AuthenticateFace` | `{"vector"}` | matching worker |
//! | `RequestDelete` | `RequestDeleteCIDRecord` | stored record bytes, verbatim | deletion approver |
//!
//! An event is attached to exactly one transaction and only reaches the
//! bus after that transaction commits. The upload worker answers with
//! `ConfirmCIDUpload`, the deletion approver with `DeleteCIDRecord`,
//! correlated by hash alone.

use crate::domain::entities::CidRecord;
use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use shared_bus::LedgerEvent;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Protocol-fixed event names.
pub mod names {
    /// Registration intent for the upload worker.
    pub const REGISTER_FACE: &str = "RegisterFace";
    /// Matching request for the matching worker.
    pub const AUTHENTICATE_FACE: &str = "AuthenticateFace";
    /// Deletion request for the deletion approver.
    pub const REQUEST_DELETE: &str = "RequestDelete";
}

/// Name of an event emitted by the chaincode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventName {
    /// See [`names::REGISTER_FACE`].
    RegisterFace,
    /// See [`names::AUTHENTICATE_FACE`].
    AuthenticateFace,
    /// See [`names::REQUEST_DELETE`].
    RequestDelete,
}

impl EventName {
    /// Wire name of the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegisterFace => names::REGISTER_FACE,
            Self::AuthenticateFace => names::AUTHENTICATE_FACE,
            Self::RequestDelete => names::REQUEST_DELETE,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            names::REGISTER_FACE => Ok(Self::RegisterFace),
            names::AUTHENTICATE_FACE => Ok(Self::AuthenticateFace),
            names::REQUEST_DELETE => Ok(Self::RequestDelete),
            other => Err(RegistryError::Decode(format!("unknown event name {other:?}"))),
        }
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// A hash/vector pair proposed for registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationIntent {
    /// Biometric hash the upload will be bound to.
    pub hash: String,
    /// Feature vector to upload, as submitted.
    pub vector: String,
}

/// A feature vector to match against registered vectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    /// Feature vector to match, as submitted.
    pub vector: String,
}

/// Snapshot of a stored record, handed over for deletion approval.
///
/// Holds the stored bytes verbatim rather than a re-encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionRequest {
    /// Stored record bytes.
    pub raw: Vec<u8>,
}

impl RegistrationIntent {
    /// Read a `RegisterFace` payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, RegistryError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl AuthenticationRequest {
    /// Read an `AuthenticateFace` payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, RegistryError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl DeletionRequest {
    /// Wrap a `RequestDelete` payload.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            raw: payload.to_vec(),
        }
    }

    /// Decode the record the approver is asked to delete.
    pub fn record(&self) -> Result<CidRecord, RegistryError> {
        CidRecord::decode(&self.raw)
    }
}

// =============================================================================
// CHAINCODE EVENT
// =============================================================================

/// An event produced by a chaincode operation, not yet committed.
///
/// Operations return it alongside their result; the ledger attaches it to
/// the transaction and the service publishes it after commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaincodeEvent {
    /// Event name.
    pub name: EventName,
    /// Encoded payload.
    pub payload: Vec<u8>,
}

impl ChaincodeEvent {
    /// `RegisterFace` event for an intent.
    pub fn register_face(intent: &RegistrationIntent) -> Result<Self, RegistryError> {
        Self::encode(EventName::RegisterFace, intent)
    }

    /// `AuthenticateFace` event for a request.
    pub fn authenticate_face(request: &AuthenticationRequest) -> Result<Self, RegistryError> {
        Self::encode(EventName::AuthenticateFace, request)
    }

    /// `RequestDelete` event carrying the stored bytes.
    pub fn request_delete(request: DeletionRequest) -> Result<Self, RegistryError> {
        if request.raw.is_empty() {
            return Err(RegistryError::EmitFailure {
                event: EventName::RequestDelete.to_string(),
                reason: "empty record snapshot".to_string(),
            });
        }
        Ok(Self {
            name: EventName::RequestDelete,
            payload: request.raw,
        })
    }

    fn encode<T: Serialize>(name: EventName, payload: &T) -> Result<Self, RegistryError> {
        let payload = serde_json::to_vec(payload).map_err(|e| RegistryError::EmitFailure {
            event: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { name, payload })
    }

    /// Wrap for the bus once the transaction has committed.
    #[must_use]
    pub fn into_ledger_event(
        self,
        tx_id: Uuid,
        sequence: u64,
        channel: &str,
        chaincode: &str,
    ) -> LedgerEvent {
        LedgerEvent {
            tx_id,
            sequence,
            channel: channel.to_string(),
            chaincode: chaincode.to_string(),
            name: self.name.as_str().to_string(),
            payload: self.payload,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
