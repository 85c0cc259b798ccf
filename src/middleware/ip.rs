//! Client IP resolution shared by the authenticator and the auditors.
//!
//! # Resolution Order
//!
//! 1. `X-Forwarded-For` header: first comma-separated element, trimmed
//! 2. Transport peer address from Axum's `ConnectInfo<SocketAddr>` (host only)
//! 3. [`UNKNOWN_IP`]
//!
//! An `X-Forwarded-For` header whose first element is empty is ignored and
//! resolution falls through to the peer address.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **`X-Forwarded-For` is client-controlled.** The allow-list check is only as
//! strong as the proxy in front of this service. Deploy behind a reverse
//! proxy that overwrites (not appends to) the header:
//!
//! ```nginx
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! and block direct access to the service port.
//!
//! # Peer Address
//!
//! The peer fallback requires the server to be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`. Without it the
//! extension is absent and requests without a forwarded header resolve to
//! [`UNKNOWN_IP`], which no sane allow-list contains.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Header carrying the proxy chain, client first.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Fallback value when no client IP can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Where a client IP came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractedIp<'a> {
    /// First element of X-Forwarded-For.
    FromXff(&'a str),
    /// Transport-level peer address.
    FromPeer(IpAddr),
    /// Neither source available.
    NotFound,
}

#[inline]
fn extract_ip<B>(req: &Request<B>) -> ExtractedIp<'_> {
    // Format: "client, proxy1, proxy2" - we want the first (client) IP
    if let Some(forwarded) = req.headers().get(FORWARDED_FOR_HEADER)
        && let Ok(value) = forwarded.to_str()
        && let Some(first_ip) = value.split(',').next()
        && !first_ip.trim().is_empty()
    {
        return ExtractedIp::FromXff(first_ip.trim());
    }

    if let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return ExtractedIp::FromPeer(peer.ip());
    }

    ExtractedIp::NotFound
}

/// Resolve the client IP for a request.
///
/// # Returns
///
/// `Cow<'static, str>` - Borrowed for "unknown" (no allocation), owned for actual IPs.
///
/// # Example
///
/// ```ignore
/// // X-Forwarded-For: 1.2.3.4, 5.6.7.8
/// assert_eq!(resolve_client_ip(&req), "1.2.3.4");
/// ```
#[inline]
pub fn resolve_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    match extract_ip(req) {
        ExtractedIp::FromXff(ip) => Cow::Owned(ip.to_string()),
        ExtractedIp::FromPeer(ip) => Cow::Owned(ip.to_string()),
        ExtractedIp::NotFound => Cow::Borrowed(UNKNOWN_IP),
    }
}
