//! Typed security audit events.
//!
//! Every event the pipeline can emit is a variant of [`SecurityEvent`]. The
//! variant fixes the severity, the human-readable message and the set of
//! structured fields, so classification cannot drift between emit sites.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity level an event is logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
}

/// A security-relevant occurrence on the request path.
///
/// Credentials carried by events are always masked before construction
/// (see [`crate::middleware::mask_credential`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// No `X-API-Key` header was presented.
    MissingCredential,

    /// The presented key did not match the configured secret.
    InvalidCredential { provided_key: String },

    /// The key was valid but the client address is not allow-listed.
    AddressNotAllowed { ip: String },

    /// An authenticated request is about to reach the application.
    RequestReceived {
        ip: String,
        api_key: String,
        method: String,
        path: String,
        user_agent: String,
        timestamp: DateTime<Utc>,
    },

    /// The application produced a response.
    ResponseSent {
        ip: String,
        status: u16,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The response status was in the 4xx or 5xx class.
    SuspiciousActivity {
        ip: String,
        status: u16,
        method: String,
        path: String,
        user_agent: String,
        timestamp: DateTime<Utc>,
    },

    /// A request entered the auth-attempt auditor.
    AuthAttempt {
        ip: String,
        api_key: String,
        timestamp: DateTime<Utc>,
    },

    /// The request ended with exactly 401.
    AuthFailure {
        ip: String,
        timestamp: DateTime<Utc>,
        duration_ms: u64,
    },
}

impl SecurityEvent {
    /// Level this event must be logged at.
    pub fn severity(&self) -> Severity {
        match self {
            SecurityEvent::RequestReceived { .. }
            | SecurityEvent::ResponseSent { .. }
            | SecurityEvent::AuthAttempt { .. } => Severity::Info,
            SecurityEvent::MissingCredential
            | SecurityEvent::InvalidCredential { .. }
            | SecurityEvent::AddressNotAllowed { .. }
            | SecurityEvent::SuspiciousActivity { .. }
            | SecurityEvent::AuthFailure { .. } => Severity::Warn,
        }
    }

    /// Log message for this event.
    pub fn message(&self) -> &'static str {
        match self {
            SecurityEvent::MissingCredential => "Missing API key",
            SecurityEvent::InvalidCredential { .. } => "Invalid API key",
            SecurityEvent::AddressNotAllowed { .. } => "IP not whitelisted",
            SecurityEvent::RequestReceived { .. } => "Security event - Request received",
            SecurityEvent::ResponseSent { .. } => "Security event - Response sent",
            SecurityEvent::SuspiciousActivity { .. } => "Security event - Suspicious activity",
            SecurityEvent::AuthAttempt { .. } => "Security event - Auth attempt",
            SecurityEvent::AuthFailure { .. } => "Security event - Auth failure",
        }
    }

    /// Stable snake_case name, used as the serde tag and as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            SecurityEvent::MissingCredential => "missing_credential",
            SecurityEvent::InvalidCredential { .. } => "invalid_credential",
            SecurityEvent::AddressNotAllowed { .. } => "address_not_allowed",
            SecurityEvent::RequestReceived { .. } => "request_received",
            SecurityEvent::ResponseSent { .. } => "response_sent",
            SecurityEvent::SuspiciousActivity { .. } => "suspicious_activity",
            SecurityEvent::AuthAttempt { .. } => "auth_attempt",
            SecurityEvent::AuthFailure { .. } => "auth_failure",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        let now = Utc::now();

        assert_eq!(SecurityEvent::MissingCredential.severity(), Severity::Warn);
        assert_eq!(
            SecurityEvent::AuthAttempt {
                ip: "1.2.3.4".to_string(),
                api_key: "***".to_string(),
                timestamp: now,
            }
            .severity(),
            Severity::Info
        );
        assert_eq!(
            SecurityEvent::SuspiciousActivity {
                ip: "1.2.3.4".to_string(),
                status: 404,
                method: "GET".to_string(),
                path: "/".to_string(),
                user_agent: String::new(),
                timestamp: now,
            }
            .severity(),
            Severity::Warn
        );
    }

    #[test]
    fn test_missing_credential_serializes_tag_only() {
        let value = serde_json::to_value(SecurityEvent::MissingCredential).unwrap();
        assert_eq!(value, serde_json::json!({ "event": "missing_credential" }));
    }

    #[test]
    fn test_response_sent_serialization() {
        let event = SecurityEvent::ResponseSent {
            ip: "10.0.0.1".to_string(),
            status: 503,
            duration_ms: 12,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["ip"].as_str(), Some("10.0.0.1"));
        assert_eq!(value["status"].as_u64(), Some(503));
        assert_eq!(value["duration_ms"].as_u64(), Some(12));
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_serialized_tag_matches_kind() {
        let event = SecurityEvent::AddressNotAllowed {
            ip: "8.8.8.8".to_string(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"].as_str(), Some(event.kind()));
    }
}
