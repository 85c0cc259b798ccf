//! Verified caller identity carried in request extensions.
//!
//! The authenticator inserts a [`RequestIdentity`] after every successful
//! check; downstream layers and handlers read it back through
//! [`RequestIdentityExt`] or as an Axum extractor via
//! `Extension<RequestIdentity>`.

use std::fmt;

use axum::http::Request;

use super::mask::mask_credential;
use crate::error::{AppError, AppResult};

/// Facts established by the authenticator for one request.
///
/// Presence in the request extensions means the request passed both the
/// API key check and the IP allow-list check.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    /// Resolved client address that matched the allow-list.
    pub client_ip: String,
    /// Credential exactly as presented by the client.
    pub api_key: String,
}

impl RequestIdentity {
    pub fn new(client_ip: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            api_key: api_key.into(),
        }
    }

    /// The credential in its loggable form.
    pub fn masked_api_key(&self) -> String {
        mask_credential(&self.api_key)
    }
}

impl fmt::Debug for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdentity")
            .field("client_ip", &self.client_ip)
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

/// Extension trait to read the verified identity from requests.
pub trait RequestIdentityExt {
    /// The identity, if the authenticator has run.
    fn identity(&self) -> Option<&RequestIdentity>;

    /// The identity, or [`AppError::MissingIdentity`] if the authenticator
    /// was not layered in front of the caller.
    fn require_identity(&self) -> AppResult<&RequestIdentity> {
        self.identity().ok_or(AppError::MissingIdentity)
    }
}

impl<B> RequestIdentityExt for Request<B> {
    fn identity(&self) -> Option<&RequestIdentity> {
        self.extensions().get::<RequestIdentity>()
    }
}
