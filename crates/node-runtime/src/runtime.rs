//! # Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, then environment)
//! 2. Open the state backend
//! 3. Wire ledger, bus and service
//! 4. Commit `InitLedger`
//! 5. Start the event log handler
//! 6. Serve invocations

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cid_registry::adapters::SerialLedger;
use cid_registry::ports::inbound::CidRegistryApi;
use cid_registry::ports::outbound::StateBackend;
use shared_bus::{EventFilter, InMemoryEventBus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::container::{NodeConfig, RegistryContainer};
use crate::handlers::{EventLogHandler, EventLogSummary, InvocationHandler};

/// The node runtime around one registry.
pub struct NodeRuntime<B: StateBackend + 'static> {
    container: Arc<RegistryContainer<B>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    event_log: Option<JoinHandle<EventLogSummary>>,
}

impl<B: StateBackend + 'static> NodeRuntime<B> {
    /// Create a runtime over `backend`.
    pub fn new(config: NodeConfig, backend: B) -> Self {
        info!("Creating CID registry node runtime");
        let container = Arc::new(RegistryContainer::new(config, backend));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            container,
            shutdown_tx,
            shutdown_rx,
            event_log: None,
        }
    }

    /// Initialize the ledger and start background handlers.
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  CID Registry Node v{}", crate::VERSION);
        info!("===========================================");

        // Subscribe before the first commit so no event is missed
        let filter = EventFilter::all().for_chaincode(&self.container.config.registry.chaincode);
        let subscription = self.container.bus.subscribe(filter);
        let handler = EventLogHandler::new(subscription);
        self.event_log = Some(tokio::spawn(handler.run(self.shutdown_rx.clone())));

        self.container
            .service
            .init_ledger()
            .await
            .context("InitLedger failed")?;

        info!(
            channel = %self.container.config.registry.channel,
            chaincode = %self.container.config.registry.chaincode,
            "Registry ready"
        );
        Ok(())
    }

    /// Handler for line-protocol invocations.
    pub fn invocation_handler(&self) -> InvocationHandler<SerialLedger<B>, InMemoryEventBus> {
        InvocationHandler::new(Arc::clone(&self.container.service))
    }

    /// The wired container.
    pub fn container(&self) -> Arc<RegistryContainer<B>> {
        Arc::clone(&self.container)
    }

    /// Stop background handlers and wait for them to drain.
    pub async fn shutdown(&mut self) -> Option<EventLogSummary> {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let summary = match self.event_log.take() {
            Some(handle) => match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(summary)) => Some(summary),
                Ok(Err(e)) => {
                    error!("Event log handler failed: {}", e);
                    None
                }
                Err(_) => {
                    error!("Event log handler did not stop in time");
                    None
                }
            },
            None => None,
        };

        let stats = self.container.service.stats().await;
        info!(
            committed = stats.transactions_committed,
            rejected = stats.transactions_rejected,
            queries = stats.queries_evaluated,
            events = stats.events_emitted,
            "Shutdown complete"
        );
        summary
    }
}
