//! Destinations for security audit events.
//!
//! The pipeline only needs "record this event"; where it ends up is the
//! sink's business. Recording is infallible and synchronous, so a slow sink
//! applies backpressure to the request that produced the event and a broken
//! sink can never change a response.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use super::event::{SecurityEvent, Severity};

/// Default number of events retained by [`MemorySink`].
pub const DEFAULT_MEMORY_SINK_CAPACITY: usize = 10_000;

/// Something that accepts security audit events.
pub trait AuditSink: Send + Sync {
    /// Record a single event.
    fn record(&self, event: &SecurityEvent);
}

/// Emit a `tracing` event under the `security_audit` target at the level
/// given by a [`Severity`].
///
/// `tracing` levels must be known at the callsite, so each severity gets its
/// own macro invocation.
macro_rules! audit_log {
    ($severity:expr, $($rest:tt)+) => {
        match $severity {
            Severity::Warn => warn!(target: "security_audit", $($rest)+),
            Severity::Info => info!(target: "security_audit", $($rest)+),
        }
    };
}

/// Sink that writes events to `tracing` under the `security_audit` target.
///
/// The level comes from [`SecurityEvent::severity`]. Each event field becomes
/// a structured tracing field, so JSON log output carries them as top-level
/// keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, event: &SecurityEvent) {
        let severity = event.severity();
        let message = event.message();

        match event {
            SecurityEvent::MissingCredential => {
                audit_log!(severity, "{message}");
            }
            SecurityEvent::InvalidCredential { provided_key } => {
                audit_log!(severity, provided_key = %provided_key, "{message}");
            }
            SecurityEvent::AddressNotAllowed { ip } => {
                audit_log!(severity, ip = %ip, "{message}");
            }
            SecurityEvent::RequestReceived {
                ip,
                api_key,
                method,
                path,
                user_agent,
                timestamp,
            } => {
                audit_log!(
                    severity,
                    ip = %ip,
                    api_key = %api_key,
                    method = %method,
                    path = %path,
                    user_agent = %user_agent,
                    timestamp = %timestamp.to_rfc3339(),
                    "{message}"
                );
            }
            SecurityEvent::ResponseSent {
                ip,
                status,
                duration_ms,
                timestamp,
            } => {
                audit_log!(
                    severity,
                    ip = %ip,
                    status,
                    duration_ms,
                    timestamp = %timestamp.to_rfc3339(),
                    "{message}"
                );
            }
            SecurityEvent::SuspiciousActivity {
                ip,
                status,
                method,
                path,
                user_agent,
                timestamp,
            } => {
                audit_log!(
                    severity,
                    ip = %ip,
                    status,
                    method = %method,
                    path = %path,
                    user_agent = %user_agent,
                    timestamp = %timestamp.to_rfc3339(),
                    "{message}"
                );
            }
            SecurityEvent::AuthAttempt {
                ip,
                api_key,
                timestamp,
            } => {
                audit_log!(
                    severity,
                    ip = %ip,
                    api_key = %api_key,
                    timestamp = %timestamp.to_rfc3339(),
                    "{message}"
                );
            }
            SecurityEvent::AuthFailure {
                ip,
                timestamp,
                duration_ms,
            } => {
                audit_log!(
                    severity,
                    ip = %ip,
                    timestamp = %timestamp.to_rfc3339(),
                    duration_ms,
                    "{message}"
                );
            }
        }
    }
}

/// Bounded in-memory ring buffer of events.
///
/// When full, the oldest event is dropped to make room.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    events: Mutex<VecDeque<SecurityEvent>>,
}

impl MemorySink {
    /// Create a sink retaining at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Snapshot of retained events, oldest first.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all retained events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the deque inconsistent,
    // so a poisoned lock is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SecurityEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SINK_CAPACITY)
    }
}

impl AuditSink for MemorySink {
    fn record(&self, event: &SecurityEvent) {
        if self.capacity == 0 {
            return;
        }

        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Forwards every event to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutSink {
    /// Add another destination.
    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for FanoutSink {
    fn record(&self, event: &SecurityEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use chrono::Utc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    /// Records the level and target of every `tracing` event it sees.
    #[derive(Clone, Default)]
    struct CapturedLogs {
        records: Arc<Mutex<Vec<(Level, String)>>>,
    }

    impl<S: Subscriber> Layer<S> for CapturedLogs {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let meta = event.metadata();
            self.records
                .lock()
                .unwrap()
                .push((*meta.level(), meta.target().to_string()));
        }
    }

    fn logged_level(event: &SecurityEvent) -> Level {
        let logs = CapturedLogs::default();
        let subscriber = Registry::default().with(logs.clone());

        tracing::subscriber::with_default(subscriber, || TracingSink.record(event));

        let records = logs.records.lock().unwrap();
        assert_eq!(records.len(), 1, "one log line per event: {event:?}");
        assert_eq!(records[0].1, "security_audit");
        records[0].0
    }

    fn every_event() -> Vec<(SecurityEvent, Level)> {
        let now = Utc::now();
        let ip = || "10.0.0.1".to_string();

        vec![
            (SecurityEvent::MissingCredential, Level::WARN),
            (
                SecurityEvent::InvalidCredential {
                    provided_key: "***".to_string(),
                },
                Level::WARN,
            ),
            (SecurityEvent::AddressNotAllowed { ip: ip() }, Level::WARN),
            (
                SecurityEvent::RequestReceived {
                    ip: ip(),
                    api_key: "rela...0001".to_string(),
                    method: "GET".to_string(),
                    path: "/relay".to_string(),
                    user_agent: String::new(),
                    timestamp: now,
                },
                Level::INFO,
            ),
            (
                SecurityEvent::ResponseSent {
                    ip: ip(),
                    status: 200,
                    duration_ms: 3,
                    timestamp: now,
                },
                Level::INFO,
            ),
            (
                SecurityEvent::SuspiciousActivity {
                    ip: ip(),
                    status: 404,
                    method: "GET".to_string(),
                    path: "/nope".to_string(),
                    user_agent: String::new(),
                    timestamp: now,
                },
                Level::WARN,
            ),
            (
                SecurityEvent::AuthAttempt {
                    ip: ip(),
                    api_key: "***".to_string(),
                    timestamp: now,
                },
                Level::INFO,
            ),
            (
                SecurityEvent::AuthFailure {
                    ip: ip(),
                    timestamp: now,
                    duration_ms: 1,
                },
                Level::WARN,
            ),
        ]
    }

    #[test]
    fn test_tracing_sink_logs_at_event_severity() {
        for (event, expected) in every_event() {
            assert_eq!(logged_level(&event), expected, "{event:?}");

            let severity = if expected == Level::WARN {
                Severity::Warn
            } else {
                Severity::Info
            };
            assert_eq!(event.severity(), severity, "{event:?}");
        }
    }

    fn not_allowed(ip: &str) -> SecurityEvent {
        SecurityEvent::AddressNotAllowed { ip: ip.to_string() }
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new(8);
        sink.record(&SecurityEvent::MissingCredential);
        sink.record(&not_allowed("1.1.1.1"));

        assert_eq!(
            sink.events(),
            vec![SecurityEvent::MissingCredential, not_allowed("1.1.1.1")]
        );
    }

    #[test]
    fn test_memory_sink_drops_oldest_when_full() {
        let sink = MemorySink::new(2);
        sink.record(&not_allowed("1.1.1.1"));
        sink.record(&not_allowed("2.2.2.2"));
        sink.record(&not_allowed("3.3.3.3"));

        assert_eq!(
            sink.events(),
            vec![not_allowed("2.2.2.2"), not_allowed("3.3.3.3")]
        );
    }

    #[test]
    fn test_memory_sink_zero_capacity_retains_nothing() {
        let sink = MemorySink::new(0);
        sink.record(&SecurityEvent::MissingCredential);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_memory_sink_clear() {
        let sink = MemorySink::default();
        sink.record(&SecurityEvent::MissingCredential);
        assert_eq!(sink.len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_fanout_forwards_to_every_sink() {
        let first = Arc::new(MemorySink::default());
        let second = Arc::new(MemorySink::default());
        let fanout = FanoutSink::default()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingSink));

        fanout.record(&SecurityEvent::MissingCredential);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
