//! Script-engine event bus.
//!
//! - [`EngineEventBus`] - in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, usable as the registry's
//!   [`EventSink`](scripthub_core::EventSink).
//! - [`log_events`] - drains a subscription into structured log lines.

pub mod bus;

pub use bus::{log_events, EngineEventBus};
