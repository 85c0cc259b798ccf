use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audit::SecurityEvent;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy")
    pub status: String,
    /// Service version
    pub version: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Identity the security pipeline established for the caller.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    /// Client address that matched the allow-list
    pub client_ip: String,
    /// Presented credential, masked
    pub api_key: String,
}

/// Recent audit events from the in-memory buffer, oldest first.
#[derive(Debug, Serialize)]
pub struct AuditEventsResponse {
    /// Number of events returned
    pub count: usize,
    /// The events
    pub events: Vec<SecurityEvent>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&response).expect("Serialization should succeed");
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }

    #[test]
    fn test_audit_events_response_tags_events() {
        let response = AuditEventsResponse {
            count: 1,
            events: vec![SecurityEvent::AddressNotAllowed {
                ip: "8.8.8.8".to_string(),
            }],
        };

        let json = serde_json::to_value(&response).expect("Serialization should succeed");
        assert_eq!(json["events"][0]["event"], "address_not_allowed");
        assert_eq!(json["events"][0]["ip"], "8.8.8.8");
    }
}
