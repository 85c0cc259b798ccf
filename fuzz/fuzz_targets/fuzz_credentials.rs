//! Fuzz testing for credential and client address handling.
//!
//! Every value here arrives straight from request headers, so none of these
//! functions may panic on any input:
//!
//! - `mask_credential`: arbitrary (including multi-byte) strings
//! - `AuthConfig::verify_api_key`: arbitrary header bytes
//! - `resolve_client_ip`: arbitrary `X-Forwarded-For` values
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the target
//! cargo +nightly fuzz run fuzz_credentials
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_credentials -- -max_total_time=60
//! ```

#![no_main]

use arbitrary::Arbitrary;
use axum::http::{HeaderValue, Request};
use libfuzzer_sys::fuzz_target;
use relayer_guard::middleware::{
    AuthConfig, FORWARDED_FOR_HEADER, MASKED_PLACEHOLDER, mask_credential, resolve_client_ip,
};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    presented_key: &'a [u8],
    forwarded_for: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    let lossy = String::from_utf8_lossy(input.presented_key);
    let masked = mask_credential(&lossy);
    if lossy.chars().count() <= 8 {
        assert_eq!(masked, MASKED_PLACEHOLDER);
    }

    let config = AuthConfig::new("relayer-api-key-0001", ["127.0.0.1"]);
    let accepted = config.verify_api_key(input.presented_key);
    assert_eq!(accepted, input.presented_key == b"relayer-api-key-0001");

    let mut request = Request::new(());
    if let Ok(value) = HeaderValue::from_bytes(input.forwarded_for) {
        request.headers_mut().insert(FORWARDED_FOR_HEADER, value);
    }
    let ip = resolve_client_ip(&request);
    assert!(!ip.is_empty());
});
