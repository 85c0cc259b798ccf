//! Caller identity endpoint.

use axum::Extension;
use axum::Json;

use crate::middleware::RequestIdentity;
use crate::models::WhoAmIResponse;

/// Echo back the identity the authenticator established.
///
/// Only reachable through the authenticator; without it the
/// `Extension` extractor rejects the request with a 500.
pub async fn whoami(Extension(identity): Extension<RequestIdentity>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        api_key: identity.masked_api_key(),
        client_ip: identity.client_ip,
    })
}
