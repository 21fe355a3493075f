//! # Driving Ports (API - Inbound)
//!
//! The operations transaction submitters can invoke. Upload, matching and
//! deletion workers call the same API with their follow-up transactions.

use crate::domain::entities::CidRecord;
use crate::errors::RegistryError;
use async_trait::async_trait;

/// Chaincode API of the CID registry.
///
/// Mutating and event-emitting operations commit a transaction. The three
/// read operations are evaluated and never commit.
#[async_trait]
pub trait CidRegistryApi: Send + Sync {
    /// Bootstrap hook. Does nothing but commit.
    async fn init_ledger(&self) -> Result<(), RegistryError>;

    /// Emit `RegisterFace` for an unbound hash.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a record is bound to `hash`.
    async fn register_hash(&self, hash: &str, vector: &str) -> Result<(), RegistryError>;

    /// Bind `cid` to `hash` once the off-chain upload has completed.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a record is bound to `hash`, whatever its cid.
    async fn confirm_cid_upload(&self, hash: &str, cid: &str) -> Result<(), RegistryError>;

    /// Emit `AuthenticateFace` for off-chain matching.
    async fn authenticate_face(&self, vector: &str) -> Result<(), RegistryError>;

    /// Emit `RequestDelete` with the stored record bytes.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record is bound to `hash`.
    async fn request_delete_cid_record(&self, hash: &str) -> Result<(), RegistryError>;

    /// Remove the record after off-chain approval.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record is bound to `hash`.
    async fn delete_cid_record(&self, hash: &str) -> Result<(), RegistryError>;

    /// Read the record bound to `hash`.
    async fn read_cid_record(&self, hash: &str) -> Result<CidRecord, RegistryError>;

    /// Every decodable record, in storage order.
    async fn get_all_cid_records(&self) -> Result<Vec<CidRecord>, RegistryError>;

    /// Whether a record is bound to `hash`.
    async fn cid_record_exists(&self, hash: &str) -> Result<bool, RegistryError>;
}
