//! Security audit middleware.
//!
//! [`SecurityAuditor`] hands out two independent layers:
//!
//! - [`SecurityEventsLayer`]: request/response audit for authenticated
//!   traffic. Must sit *inside* the [`Authenticator`](super::Authenticator)
//!   because it reads the [`RequestIdentity`] the authenticator inserts.
//! - [`AuthEventsLayer`]: authentication-attempt audit. Derives everything
//!   from the raw request, so it may sit anywhere, including outside the
//!   authenticator.
//!
//! # Events per request
//!
//! ```text
//! SecurityEventsLayer                       AuthEventsLayer
//! ───────────────────                       ───────────────
//! RequestReceived   (before inner)          AuthAttempt  (before inner)
//! ResponseSent      (after inner)           AuthFailure  (after inner, status == 401)
//! SuspiciousActivity(after inner, >= 400)
//! ```
//!
//! The response is passed through untouched; only its status is inspected.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use tower::{Layer, Service};

use super::auth::API_KEY_HEADER;
use super::identity::RequestIdentityExt;
use super::ip::resolve_client_ip;
use super::mask::mask_credential;
use crate::audit::{self, AuditSink, SecurityEvent};
use crate::metrics;

/// Factory for the audit layers, sharing one sink.
#[derive(Clone)]
pub struct SecurityAuditor {
    sink: Arc<dyn AuditSink>,
}

impl SecurityAuditor {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Request/response audit layer for authenticated traffic.
    pub fn security_events(&self) -> SecurityEventsLayer {
        SecurityEventsLayer {
            sink: self.sink.clone(),
        }
    }

    /// Authentication attempt audit layer.
    pub fn auth_events(&self) -> AuthEventsLayer {
        AuthEventsLayer {
            sink: self.sink.clone(),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn user_agent<B>(req: &Request<B>) -> String {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Request / response audit
// =============================================================================

/// Layer producing [`SecurityEventsService`].
#[derive(Clone)]
pub struct SecurityEventsLayer {
    sink: Arc<dyn AuditSink>,
}

impl<S> Layer<S> for SecurityEventsLayer {
    type Service = SecurityEventsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityEventsService {
            inner,
            sink: self.sink.clone(),
        }
    }
}

/// Logs receipt, completion and error-class outcomes of authenticated requests.
#[derive(Clone)]
pub struct SecurityEventsService<S> {
    inner: S,
    sink: Arc<dyn AuditSink>,
}

impl<S> Service<Request<Body>> for SecurityEventsService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let sink = self.sink.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let start = Instant::now();

            let (client_ip, masked_key) = match req.require_identity() {
                Ok(identity) => (identity.client_ip.clone(), identity.masked_api_key()),
                Err(e) => return Ok(e.into_response()),
            };
            let method = req.method().to_string();
            let path = req.uri().path().to_string();
            let user_agent = user_agent(&req);

            audit::emit(
                sink.as_ref(),
                SecurityEvent::RequestReceived {
                    ip: client_ip.clone(),
                    api_key: masked_key,
                    method: method.clone(),
                    path: path.clone(),
                    user_agent: user_agent.clone(),
                    timestamp: Utc::now(),
                },
            );

            let response = inner.call(req).await?;

            let status = response.status();
            let elapsed = start.elapsed();
            metrics::record_request_duration(&method, status.as_u16(), elapsed.as_secs_f64());

            audit::emit(
                sink.as_ref(),
                SecurityEvent::ResponseSent {
                    ip: client_ip.clone(),
                    status: status.as_u16(),
                    duration_ms: elapsed_ms(start),
                    timestamp: Utc::now(),
                },
            );

            if status.as_u16() >= StatusCode::BAD_REQUEST.as_u16() {
                audit::emit(
                    sink.as_ref(),
                    SecurityEvent::SuspiciousActivity {
                        ip: client_ip,
                        status: status.as_u16(),
                        method,
                        path,
                        user_agent,
                        timestamp: Utc::now(),
                    },
                );
            }

            Ok(response)
        })
    }
}

// =============================================================================
// Authentication attempt audit
// =============================================================================

/// Layer producing [`AuthEventsService`].
#[derive(Clone)]
pub struct AuthEventsLayer {
    sink: Arc<dyn AuditSink>,
}

impl<S> Layer<S> for AuthEventsLayer {
    type Service = AuthEventsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthEventsService {
            inner,
            sink: self.sink.clone(),
        }
    }
}

/// Logs every authentication attempt and every 401 outcome.
#[derive(Clone)]
pub struct AuthEventsService<S> {
    inner: S,
    sink: Arc<dyn AuditSink>,
}

impl<S> Service<Request<Body>> for AuthEventsService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let sink = self.sink.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let start = Instant::now();

            let presented = req
                .headers()
                .get(API_KEY_HEADER)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_default();
            let client_ip = resolve_client_ip(&req).into_owned();

            audit::emit(
                sink.as_ref(),
                SecurityEvent::AuthAttempt {
                    ip: client_ip.clone(),
                    api_key: mask_credential(&presented),
                    timestamp: Utc::now(),
                },
            );

            let response = inner.call(req).await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                audit::emit(
                    sink.as_ref(),
                    SecurityEvent::AuthFailure {
                        ip: client_ip,
                        timestamp: Utc::now(),
                        duration_ms: elapsed_ms(start),
                    },
                );
            }

            Ok(response)
        })
    }
}
