//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────────┐
//! │       Tracing        │ ← HTTP request/response spans
//! └──────────┬───────────┘
//!            │            /health answered here, outside the pipeline
//!            ▼
//! ┌──────────────────────┐
//! │  Auth attempt audit  │ ← AuthAttempt, AuthFailure on 401 (if enabled)
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │    Authenticator     │ ← 401 bad/missing key, 403 address not allowed
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ Security event audit │ ← RequestReceived, ResponseSent, SuspiciousActivity
//! └──────────┬───────────┘
//!            ▼
//!         Handler
//! ```
//!
//! # Route Groups
//!
//! - `/health` - Liveness probe (public)
//! - `/whoami` - Identity established by the pipeline
//! - `/audit/events` - Recent audit events from the in-memory buffer
//! - anything else - 404, audited as suspicious

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{Authenticator, SecurityAuditor};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// Layers added with `Router::layer` only wrap routes (and the fallback)
/// registered before the call, which is how `/health` stays public.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let auditor = SecurityAuditor::new(state.audit_sink.clone());
    let authenticator = Authenticator::new(config.auth_config(), state.audit_sink.clone());

    info!(
        allowed_ips = authenticator.config().allowed_ip_count(),
        "API key authentication enabled"
    );

    // =========================================================================
    // Protected routes (order matters - applied bottom to top)
    // =========================================================================
    let mut router = Router::new()
        .route("/whoami", get(handlers::whoami))
        .route("/audit/events", get(handlers::recent_events))
        .fallback(not_found);

    // 1. Request/response audit (needs the identity inserted by 2.)
    router = router.layer(auditor.security_events());

    // 2. Authentication
    router = router.layer(authenticator);

    // 3. Auth attempt audit (if enabled) - sees every request, including rejected ones
    if config.audit_auth_attempts {
        info!("Authentication attempt auditing enabled");
        router = router.layer(auditor.auth_events());
    } else {
        info!("Authentication attempt auditing disabled (AUDIT_AUTH_ATTEMPTS=false)");
    }

    // =========================================================================
    // Public routes
    // =========================================================================
    router = router.route("/health", get(handlers::health_check));

    // 4. Tracing
    router = router.layer(TraceLayer::new_for_http());

    router.with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::audit::{MemorySink, SecurityEvent};
    use crate::config::Config;

    const KEY: &str = "relayer-api-key-0001";

    fn router(audit_auth_attempts: bool) -> (Router, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let config = Config {
            api_key: KEY.to_string(),
            allowed_ips: vec!["10.0.0.1".to_string()],
            audit_auth_attempts,
            ..Config::default()
        };
        (build_router(AppState::with_sink(config, sink.clone())), sink)
    }

    #[tokio::test]
    async fn test_health_is_public_and_unaudited() {
        let (app, sink) = router(true);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_is_protected() {
        let (app, sink) = router(false);

        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(sink.events(), vec![SecurityEvent::MissingCredential]);
    }

    #[tokio::test]
    async fn test_unknown_route_authenticated_is_suspicious() {
        let (app, sink) = router(false);

        let response = app
            .oneshot(
                Request::get("/nope")
                    .header("x-api-key", KEY)
                    .header("x-forwarded-for", "10.0.0.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let kinds: Vec<_> = sink.events().iter().map(SecurityEvent::kind).collect();
        assert_eq!(
            kinds,
            vec!["request_received", "response_sent", "suspicious_activity"]
        );
    }

    #[tokio::test]
    async fn test_auth_attempt_audit_wraps_authenticator() {
        let (app, sink) = router(true);

        let response = app
            .oneshot(
                Request::get("/whoami")
                    .header("x-api-key", "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let kinds: Vec<_> = sink.events().iter().map(SecurityEvent::kind).collect();
        assert_eq!(
            kinds,
            vec!["auth_attempt", "invalid_credential", "auth_failure"]
        );
    }

    #[tokio::test]
    async fn test_audit_events_disabled_buffer_is_404() {
        let (app, _sink) = router(false);

        let response = app
            .oneshot(
                Request::get("/audit/events")
                    .header("x-api-key", KEY)
                    .header("x-forwarded-for", "10.0.0.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
