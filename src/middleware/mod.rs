//! HTTP security middleware.
//!
//! This module provides the two stages of the security pipeline and the
//! helpers they share:
//!
//! - **Authentication**: API key check (constant-time) and IP allow-list
//! - **Security audit**: request/response and auth-attempt audit events
//! - **Client IP resolution**: `X-Forwarded-For` first, then the peer address
//! - **Credential masking**: one rule for every credential that reaches a log
//!
//! # Architecture
//!
//! ```text
//! Request → AuthEvents → Authenticator → SecurityEvents → Handler → Response
//!               ↓              ↓                ↓
//!         AuthAttempt    401 / 403       RequestReceived
//!         AuthFailure                    ResponseSent
//!                                        SuspiciousActivity
//! ```
//!
//! # Security Considerations
//!
//! - API key comparison uses constant-time equality to prevent timing attacks
//! - Credentials are masked before they reach any sink
//! - `X-Forwarded-For` is trusted; deploy behind a proxy that overwrites it
//! - The identity handed to downstream layers is a typed extension, so a
//!   missing authenticator is detected instead of misread

pub mod audit;
pub mod auth;
pub mod identity;
pub mod ip;
pub mod mask;

pub use audit::{AuthEventsLayer, SecurityAuditor, SecurityEventsLayer};
pub use auth::{API_KEY_HEADER, AuthConfig, Authenticator};
pub use identity::{RequestIdentity, RequestIdentityExt};
pub use ip::{FORWARDED_FOR_HEADER, UNKNOWN_IP, resolve_client_ip};
pub use mask::{MASKED_PLACEHOLDER, mask_credential};
