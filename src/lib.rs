//! # Relayer Guard
//!
//! Security pipeline for the relayer's HTTP surface, built as Tower layers
//! for Axum:
//!
//! - **Authentication**: `X-API-Key` checked in constant time against one
//!   shared secret, then the client address checked against an allow-list
//! - **Audit trail**: structured events for every request, response,
//!   error-class outcome and authentication attempt
//! - **Observability**: `tracing` logs (pretty or JSON) and Prometheus counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Trace → AuthEvents → Authenticator → SecurityEvents        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, whoami, audit events)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuditSink (tracing, in-memory buffer)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Using the layers directly
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum::{Router, routing::get};
//! use relayer_guard::audit::TracingSink;
//! use relayer_guard::middleware::{AuthConfig, Authenticator, SecurityAuditor};
//!
//! let sink = Arc::new(TracingSink);
//! let auditor = SecurityAuditor::new(sink.clone());
//! let auth = Authenticator::new(AuthConfig::new("a-long-shared-secret", ["10.0.0.1"]), sink);
//!
//! let app: Router = Router::new()
//!     .route("/relay", get(|| async { "ok" }))
//!     .layer(auditor.security_events())
//!     .layer(auth)
//!     .layer(auditor.auth_events());
//! ```
//!
//! The authenticator resolves the peer address from `ConnectInfo`, so serve
//! with `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod audit;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
