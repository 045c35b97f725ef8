//! Observability subsystem for flashsafe
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Counters-only metrics, one registry per engine context
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here can fail a storage operation.
//!
//! # Usage
//!
//! ```ignore
//! use flashsafe::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::PairRecovered, &[("original", "0"), ("backup", "8")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
