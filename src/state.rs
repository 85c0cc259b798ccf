//! Shared application state for Axum handlers.
//!
//! Holds the read-only configuration and the audit sink the security
//! pipeline reports to. Everything is behind `Arc`, so cloning per request
//! is cheap and no locking happens on the request path.

use std::sync::Arc;
use std::time::Instant;

use crate::audit::{AuditSink, FanoutSink, MemorySink, TracingSink};
use crate::config::Config;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Where the security pipeline sends audit events
    pub audit_sink: Arc<dyn AuditSink>,
    /// Recent audit events, when the in-memory buffer is enabled
    pub recent_events: Option<Arc<MemorySink>>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create state with the default sinks: `tracing`, plus an in-memory
    /// buffer of `config.audit_buffer_size` events when enabled.
    pub fn new(config: Config) -> Self {
        let recent_events = config
            .audit_buffer_enabled()
            .then(|| Arc::new(MemorySink::new(config.audit_buffer_size)));

        let mut fanout = FanoutSink::default().with(Arc::new(TracingSink));
        if let Some(buffer) = &recent_events {
            fanout = fanout.with(buffer.clone());
        }

        Self {
            config: Arc::new(config),
            audit_sink: Arc::new(fanout),
            recent_events,
            started_at: Instant::now(),
        }
    }

    /// Create state reporting to a caller-supplied sink only.
    pub fn with_sink(config: Config, audit_sink: Arc<dyn AuditSink>) -> Self {
        Self {
            config: Arc::new(config),
            audit_sink,
            recent_events: None,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
