//! # Invocation Handler
//!
//! Line protocol used by the binary: one JSON invocation per input line,
//! one JSON response per output line.
//!
//! ```text
//! → {"function":"ConfirmCIDUpload","Args":["abc123","QmXyz"]}
//! ← {"ok":null}
//! → {"function":"ReadCIDRecord","Args":["missing"]}
//! ← {"error":{"code":"NOT_FOUND","message":"record missing does not exist"}}
//! ```

use std::sync::Arc;

use cid_registry::errors::RegistryError;
use cid_registry::invocation::Invocation;
use cid_registry::ports::outbound::Ledger;
use cid_registry::service::RegistryService;
use serde_json::{json, Value};
use shared_bus::EventPublisher;
use tracing::debug;

/// Handler that routes line-protocol invocations to the registry service.
pub struct InvocationHandler<L: Ledger, P: EventPublisher> {
    service: Arc<RegistryService<L, P>>,
}

impl<L: Ledger, P: EventPublisher> InvocationHandler<L, P> {
    /// Create a handler over `service`.
    pub fn new(service: Arc<RegistryService<L, P>>) -> Self {
        Self { service }
    }

    /// Handle one input line. Blank lines produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let result = match Invocation::parse(line) {
            Ok(invocation) => {
                debug!(function = %invocation.function, "[cid] Invocation received");
                self.service.submit(invocation).await
            }
            Err(err) => Err(err),
        };
        Some(render(result))
    }
}

/// Render a service result as a response object.
pub fn render(result: Result<Value, RegistryError>) -> Value {
    match result {
        Ok(value) => json!({ "ok": value }),
        Err(err) => json!({
            "error": {
                "code": err.code(),
                "message": err.to_string(),
            }
        }),
    }
}
