//! # Registry Container
//!
//! ```text
//! StateBackend ──→ SerialLedger ──┐
//!                                 ├──→ RegistryService
//! InMemoryEventBus ───────────────┘
//! ```
//!
//! The backend is the only pluggable piece: in-memory by default, RocksDB
//! when the `rocksdb` feature is on and a data directory is configured.

use std::sync::Arc;

use cid_registry::adapters::SerialLedger;
use cid_registry::ports::outbound::StateBackend;
use cid_registry::service::RegistryService;
use shared_bus::InMemoryEventBus;
use tracing::info;

use crate::container::config::NodeConfig;

/// Registry service over a serialized ledger and the in-memory bus.
pub type RuntimeService<B> = RegistryService<SerialLedger<B>, InMemoryEventBus>;

/// Central container holding the wired registry.
pub struct RegistryContainer<B: StateBackend> {
    /// Node configuration.
    pub config: NodeConfig,
    /// Transactional ledger over the state backend.
    pub ledger: Arc<SerialLedger<B>>,
    /// Committed-event bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Registry service.
    pub service: Arc<RuntimeService<B>>,
}

impl<B: StateBackend> RegistryContainer<B> {
    /// Wire a registry over `backend`.
    pub fn new(config: NodeConfig, backend: B) -> Self {
        let ledger = Arc::new(SerialLedger::new(backend));
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus.capacity));
        let service = Arc::new(RegistryService::new(
            Arc::clone(&ledger),
            Arc::clone(&bus),
            config.registry.clone(),
        ));

        info!(
            channel = %config.registry.channel,
            chaincode = %config.registry.chaincode,
            bus_capacity = config.bus.capacity,
            "Registry container initialized"
        );

        Self {
            config,
            ledger,
            bus,
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid_registry::adapters::MemoryBackend;
    use cid_registry::ports::inbound::CidRegistryApi;
    use cid_registry::ports::outbound::Ledger;

    #[tokio::test]
    async fn test_container_wires_service_to_ledger() {
        let container = RegistryContainer::new(NodeConfig::default(), MemoryBackend::new());

        container
            .service
            .confirm_cid_upload("abc123", "QmXyz")
            .await
            .unwrap();

        assert_eq!(container.ledger.height().unwrap(), 1);
        assert_eq!(container.ledger.backend().len().unwrap(), 1);
        assert_eq!(container.bus.capacity(), 1000);
    }
}
