//! # CID Registry Node
//!
//! Runs the registry chaincode over a local ledger and serves invocations
//! as JSON lines on stdin, one response per line on stdout.
//!
//! ```text
//! stdin ──→ InvocationHandler ──→ RegistryService ──→ SerialLedger
//!                                        │
//!                                        └──→ Event Bus ──→ EventLogHandler
//! ```
//!
//! Stops at end of input or on Ctrl+C.

use anyhow::{Context, Result};
use cid_registry::adapters::MemoryBackend;
use cid_registry::ports::outbound::StateBackend;
use node_runtime::{NodeConfig, NodeRuntime};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Invalid configuration")?;

    // RUST_LOG wins over CID_LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match config.storage.data_dir.clone() {
        #[cfg(feature = "rocksdb")]
        Some(dir) => {
            use node_runtime::adapters::storage::{RocksDbBackend, RocksDbConfig};
            let rocks_config = RocksDbConfig {
                sync_writes: config.storage.sync_writes,
                ..RocksDbConfig::at(&dir)
            };
            let backend = RocksDbBackend::open(rocks_config).context("Failed to open state")?;
            serve(NodeRuntime::new(config, backend)).await
        }
        #[cfg(not(feature = "rocksdb"))]
        Some(dir) => {
            warn!(
                data_dir = %dir.display(),
                "Built without the rocksdb feature, keeping state in memory"
            );
            serve(NodeRuntime::new(config, MemoryBackend::new())).await
        }
        None => serve(NodeRuntime::new(config, MemoryBackend::new())).await,
    }
}

async fn serve<B: StateBackend + 'static>(mut runtime: NodeRuntime<B>) -> Result<()> {
    runtime.start().await?;
    let handler = runtime.invocation_handler();

    info!("Node is running. Reading invocations from stdin, Ctrl+C to stop.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => {
                    if let Some(response) = handler.handle_line(&line).await {
                        println!("{response}");
                    }
                }
                None => {
                    info!("End of input");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    runtime.shutdown().await;
    Ok(())
}
