//! # Registry Service
//!
//! Runs chaincode operations against the ledger and publishes the events of
//! committed transactions to the bus.
//!
//! ## Commit, then publish
//!
//! ```text
//! invoke ──→ Ledger::submit ──ok──→ stats ──→ EventPublisher::publish
//!                  │
//!                  └──err──→ stats, no event
//! ```
//!
//! The commit and the publish of one transaction happen under the service's
//! ordering lock, so events reach the bus in commit-sequence order. Read
//! operations go through `Ledger::evaluate` and skip the lock.

use crate::adapters::{MemoryBackend, SerialLedger};
use crate::contract::CidRecordContract;
use crate::domain::entities::CidRecord;
use crate::errors::RegistryError;
use crate::invocation::{Function, Invocation};
use crate::ports::inbound::CidRegistryApi;
use crate::ports::outbound::{Ledger, TxOutcome, WorldState};
use crate::{CHAINCODE_NAME, DEFAULT_CHANNEL};

use async_trait::async_trait;
use serde_json::Value;
use shared_bus::{EventPublisher, InMemoryEventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, field, info, instrument, warn, Span};
use uuid::Uuid;

/// Registry service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Channel stamped on published events.
    pub channel: String,
    /// Chaincode name stamped on published events.
    pub chaincode: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            chaincode: CHAINCODE_NAME.to_string(),
        }
    }
}

/// Statistics for the registry service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions that failed and left no trace.
    pub transactions_rejected: u64,
    /// Read-only evaluations.
    pub queries_evaluated: u64,
    /// Events published after commit.
    pub events_emitted: u64,
    /// Published events no subscriber was listening for.
    pub events_undelivered: u64,
}

/// The CID registry service.
pub struct RegistryService<L: Ledger, P: EventPublisher> {
    config: ServiceConfig,
    contract: CidRecordContract,
    ledger: Arc<L>,
    publisher: Arc<P>,
    /// Held from submit to publish.
    commit_order: Mutex<()>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl<L: Ledger, P: EventPublisher> RegistryService<L, P> {
    /// Create a service over `ledger` publishing to `publisher`.
    pub fn new(ledger: Arc<L>, publisher: Arc<P>, config: ServiceConfig) -> Self {
        Self {
            contract: CidRecordContract,
            config,
            ledger,
            publisher,
            commit_order: Mutex::new(()),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The ledger transactions run against.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Route and run a raw invocation.
    ///
    /// Queries are evaluated; everything else is committed. Void operations
    /// return `null`.
    pub async fn submit(&self, invocation: Invocation) -> Result<Value, RegistryError> {
        let function = Function::try_from(invocation).inspect_err(|err| {
            warn!(error = %err, "Rejected invocation");
        })?;

        if function.is_query() {
            self.query(function.name(), |contract, state| {
                contract.execute(state, &function)
            })
            .await
        } else {
            self.commit(function.name(), |contract, state| {
                contract.execute(state, &function)
            })
            .await
        }
    }

    /// Submit `work` as a transaction and publish its event once committed.
    #[instrument(skip(self, work), fields(tx_id = field::Empty))]
    async fn commit<T, F>(&self, function: &'static str, work: F) -> Result<T, RegistryError>
    where
        T: Send,
        F: FnOnce(&CidRecordContract, &mut dyn WorldState) -> Result<TxOutcome<T>, RegistryError>
            + Send,
    {
        let tx_id = Uuid::new_v4();
        Span::current().record("tx_id", field::display(tx_id));

        let _order = self.commit_order.lock().await;
        let contract = self.contract;

        let committed = match self.ledger.submit(tx_id, |state| work(&contract, state)) {
            Ok(committed) => committed,
            Err(err) => {
                self.stats.write().await.transactions_rejected += 1;
                if err.is_guard_rejection() {
                    info!(code = err.code(), error = %err, "Transaction rejected");
                } else {
                    warn!(code = err.code(), error = %err, "Transaction failed");
                }
                return Err(err);
            }
        };

        self.stats.write().await.transactions_committed += 1;

        if let Some(event) = committed.event {
            let name = event.name;
            let ledger_event = event.into_ledger_event(
                committed.tx_id,
                committed.sequence,
                &self.config.channel,
                &self.config.chaincode,
            );
            let delivered = self.publisher.publish(ledger_event).await;

            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
            if delivered == 0 {
                stats.events_undelivered += 1;
                debug!(event = %name, "No subscriber for event");
            }
            info!(
                sequence = committed.sequence,
                event = %name,
                delivered,
                "Transaction committed"
            );
        } else {
            info!(sequence = committed.sequence, "Transaction committed");
        }

        Ok(committed.value)
    }

    /// Evaluate `work` read-only.
    #[instrument(skip(self, work), level = "debug")]
    async fn query<T, F>(&self, function: &'static str, work: F) -> Result<T, RegistryError>
    where
        T: Send,
        F: FnOnce(&CidRecordContract, &mut dyn WorldState) -> Result<TxOutcome<T>, RegistryError>
            + Send,
    {
        let contract = self.contract;
        let result = self.ledger.evaluate(|state| work(&contract, state));
        self.stats.write().await.queries_evaluated += 1;
        result
    }
}

/// Service over an in-memory ledger and bus, for tests and local runs.
pub fn create_test_service() -> RegistryService<SerialLedger<MemoryBackend>, InMemoryEventBus> {
    RegistryService::new(
        Arc::new(SerialLedger::new(MemoryBackend::new())),
        Arc::new(InMemoryEventBus::new()),
        ServiceConfig::default(),
    )
}

// =============================================================================
// CidRegistryApi Implementation
// =============================================================================

#[async_trait]
impl<L: Ledger, P: EventPublisher> CidRegistryApi for RegistryService<L, P> {
    async fn init_ledger(&self) -> Result<(), RegistryError> {
        self.commit("InitLedger", |c, s| c.init_ledger(s)).await
    }

    async fn register_hash(&self, hash: &str, vector: &str) -> Result<(), RegistryError> {
        self.commit("RegisterHash", |c, s| c.register_hash(s, hash, vector))
            .await
    }

    async fn confirm_cid_upload(&self, hash: &str, cid: &str) -> Result<(), RegistryError> {
        self.commit("ConfirmCIDUpload", |c, s| c.confirm_cid_upload(s, hash, cid))
            .await
    }

    async fn authenticate_face(&self, vector: &str) -> Result<(), RegistryError> {
        self.commit("AuthenticateFace", |c, s| c.authenticate_face(s, vector))
            .await
    }

    async fn request_delete_cid_record(&self, hash: &str) -> Result<(), RegistryError> {
        self.commit("RequestDeleteCIDRecord", |c, s| {
            c.request_delete_cid_record(s, hash)
        })
        .await
    }

    async fn delete_cid_record(&self, hash: &str) -> Result<(), RegistryError> {
        self.commit("DeleteCIDRecord", |c, s| c.delete_cid_record(s, hash))
            .await
    }

    async fn read_cid_record(&self, hash: &str) -> Result<CidRecord, RegistryError> {
        self.query("ReadCIDRecord", |c, s| c.read_cid_record(s, hash))
            .await
    }

    async fn get_all_cid_records(&self) -> Result<Vec<CidRecord>, RegistryError> {
        self.query("GetAllCIDRecords", |c, s| c.get_all_cid_records(s))
            .await
    }

    async fn cid_record_exists(&self, hash: &str) -> Result<bool, RegistryError> {
        self.query("CIDRecordExists", |c, s| c.cid_record_exists(s, hash))
            .await
    }
}

// =============================================================================
// TESTS
// =============================================================================
