//! # Event and Invocation Handlers
//!
//! - `event_log`: follows committed events on the bus and logs each once
//! - `invocation`: turns JSON-line invocations into service calls

pub mod event_log;
pub mod invocation;

pub use event_log::{EventLogHandler, EventLogSummary};
pub use invocation::InvocationHandler;
