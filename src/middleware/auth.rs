//! API key authentication and IP allow-list middleware.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: Prevents timing attacks on API key validation
//! - **IP allow-list**: Exact-match membership, no CIDR or prefix logic
//! - **Masked logging**: Rejected keys are only ever logged in masked form
//!
//! # Checks (in order)
//!
//! ```text
//! X-API-Key present? ──no──▶ 401 Unauthorized  (MissingCredential)
//!        │yes
//! key == secret?     ──no──▶ 401 Unauthorized  (InvalidCredential)
//!        │yes
//! client IP allowed? ──no──▶ 403 Forbidden     (AddressNotAllowed)
//!        │yes
//! insert RequestIdentity, call inner service
//! ```
//!
//! Every rejection is terminal: the inner service is not called and the
//! client is not told which check failed beyond the status code.
//!
//! # Usage
//!
//! ```bash
//! API_KEY=your-secret-key ALLOWED_IPS=127.0.0.1 cargo run
//! curl -H "X-API-Key: your-secret-key" http://localhost:3000/whoami
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::debug;

use super::identity::RequestIdentity;
use super::ip::resolve_client_ip;
use super::mask::mask_credential;
use crate::audit::{self, AuditSink, SecurityEvent};
use crate::error::AppError;
use crate::metrics;

/// Header name for API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Immutable authentication settings, built once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    api_key: String,
    allowed_ips: HashSet<String>,
}

impl AuthConfig {
    /// Create the config from the shared secret and the allowed addresses.
    pub fn new<I, T>(api_key: impl Into<String>, allowed_ips: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            api_key: api_key.into(),
            allowed_ips: allowed_ips.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `ip` is on the allow-list (exact string match).
    pub fn is_ip_allowed(&self, ip: &str) -> bool {
        self.allowed_ips.contains(ip)
    }

    /// Constant-time check of a presented key against the secret.
    pub fn verify_api_key(&self, presented: &[u8]) -> bool {
        constant_time_eq(presented, self.api_key.as_bytes())
    }

    /// Number of allow-listed addresses.
    pub fn allowed_ip_count(&self) -> usize {
        self.allowed_ips.len()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &mask_credential(&self.api_key))
            .field("allowed_ips", &self.allowed_ips)
            .finish()
    }
}

/// Why a request was turned away.
#[derive(Debug, PartialEq, Eq)]
enum Rejection {
    MissingCredential,
    InvalidCredential { masked_key: String },
    AddressNotAllowed { ip: String },
}

impl Rejection {
    fn event(&self) -> SecurityEvent {
        match self {
            Rejection::MissingCredential => SecurityEvent::MissingCredential,
            Rejection::InvalidCredential { masked_key } => SecurityEvent::InvalidCredential {
                provided_key: masked_key.clone(),
            },
            Rejection::AddressNotAllowed { ip } => {
                SecurityEvent::AddressNotAllowed { ip: ip.clone() }
            }
        }
    }

    fn error(&self) -> AppError {
        match self {
            Rejection::MissingCredential | Rejection::InvalidCredential { .. } => {
                AppError::Unauthorized
            }
            Rejection::AddressNotAllowed { .. } => AppError::Forbidden,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Rejection::MissingCredential => "missing_credential",
            Rejection::InvalidCredential { .. } => "invalid_credential",
            Rejection::AddressNotAllowed { .. } => "address_not_allowed",
        }
    }
}

/// Run the three checks against a request.
fn authenticate<B>(config: &AuthConfig, req: &Request<B>) -> Result<RequestIdentity, Rejection> {
    let presented = extract_api_key(req).ok_or(Rejection::MissingCredential)?;

    if !config.verify_api_key(presented) {
        return Err(Rejection::InvalidCredential {
            masked_key: mask_credential(&String::from_utf8_lossy(presented)),
        });
    }

    let client_ip = resolve_client_ip(req);
    if !config.is_ip_allowed(&client_ip) {
        return Err(Rejection::AddressNotAllowed {
            ip: client_ip.into_owned(),
        });
    }

    // The key matched the configured String byte for byte, so it is UTF-8.
    let api_key = String::from_utf8_lossy(presented).into_owned();
    Ok(RequestIdentity::new(client_ip.into_owned(), api_key))
}

/// Authentication layer.
///
/// Wraps a service so that it only sees requests carrying the configured
/// API key from an allow-listed address.
#[derive(Clone)]
pub struct Authenticator {
    config: Arc<AuthConfig>,
    sink: Arc<dyn AuditSink>,
}

impl Authenticator {
    /// Create a new authentication layer reporting rejections to `sink`.
    pub fn new(config: AuthConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            config: Arc::new(config),
            sink,
        }
    }

    /// The settings this layer enforces.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl<S> Layer<S> for Authenticator {
    type Service = AuthenticatorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticatorService {
            inner,
            config: self.config.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// Authentication service wrapper.
#[derive(Clone)]
pub struct AuthenticatorService<S> {
    inner: S,
    config: Arc<AuthConfig>,
    sink: Arc<dyn AuditSink>,
}

impl<S> Service<Request<Body>> for AuthenticatorService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let sink = self.sink.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authenticate(&config, &req) {
                Ok(identity) => {
                    debug!(
                        client_ip = %identity.client_ip,
                        path = %req.uri().path(),
                        "API key authentication successful"
                    );
                    req.extensions_mut().insert(identity);
                    inner.call(req).await
                }
                Err(rejection) => {
                    metrics::record_auth_rejection(rejection.reason());
                    audit::emit(sink.as_ref(), rejection.event());
                    Ok(rejection.error().into_response())
                }
            }
        })
    }
}

/// Extract the API key header as raw bytes.
///
/// An empty header value counts as absent.
fn extract_api_key<B>(req: &Request<B>) -> Option<&[u8]> {
    req.headers()
        .get(API_KEY_HEADER)
        .map(|value| value.as_bytes())
        .filter(|bytes| !bytes.is_empty())
}

/// Perform constant-time comparison of two byte strings.
///
/// For equal-length inputs the running time does not depend on where (or
/// whether) the inputs differ. Inputs of different length are rejected
/// without inspecting their contents, which reveals only the length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
