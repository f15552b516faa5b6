//! Inbound request handling.
//!
//! # Responsibilities
//! - Read the request id assigned by the request-id layer
//! - Build the header set forwarded to an upstream
//!
//! # Design Decisions
//! - `Host` and `Content-Length` are recomputed by the upstream client
//! - Hop-by-hop headers never cross the proxy

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::http::response::is_hop_by_hop;

/// Header carrying the request id, both inbound and upstream.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request id set by the request-id layer, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Headers to send upstream for an inbound request.
pub fn upstream_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 1);
    for (name, value) in inbound {
        if name == header::HOST || name == header::CONTENT_LENGTH || is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    headers
}
