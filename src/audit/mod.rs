//! Security audit trail: event types and sinks.
//!
//! The middleware in [`crate::middleware`] builds [`SecurityEvent`]s and hands
//! them to [`emit`], which counts them and forwards them to the configured
//! [`AuditSink`].

pub mod event;
pub mod sink;

pub use event::{SecurityEvent, Severity};
pub use sink::{AuditSink, DEFAULT_MEMORY_SINK_CAPACITY, FanoutSink, MemorySink, TracingSink};

use crate::metrics;

/// Record an event on `sink` and bump its counter.
pub fn emit(sink: &dyn AuditSink, event: SecurityEvent) {
    metrics::record_security_event(event.kind());
    sink.record(&event);
}
