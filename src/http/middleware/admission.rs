//! Admission middleware for protected routes.
//! Derives the client key, asks the gatekeeper, and short-circuits on reject.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::observability::metrics;
use crate::security::{Gatekeeper, API_KEY_HEADER};

/// State required for admission control.
#[derive(Clone)]
pub struct AdmissionState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub trust_proxy_headers: bool,
}

/// Key used to attribute a request to a client.
///
/// Prefers the forwarding headers only when they are trusted, then the peer
/// address. Requests with neither share the `"unknown"` bucket.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

pub async fn admission_middleware(
    State(state): State<AdmissionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, state.trust_proxy_headers);

    let presented = request.headers().get(API_KEY_HEADER).map(|v| v.as_bytes());

    match state.gatekeeper.admit(&key, presented) {
        Ok(()) => {
            metrics::record_admission("admitted");
            next.run(request).await
        }
        Err(rejection) => {
            tracing::warn!(client = %key, reason = rejection.as_str(), "Request rejected");
            metrics::record_admission(rejection.as_str());
            AppError::from(rejection).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:51000".parse().unwrap())
    }

    #[test]
    fn test_peer_address_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_key(&headers, peer(), false), "192.0.2.7");
    }

    #[test]
    fn test_forwarded_headers_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_key(&headers, peer(), true), "203.0.113.9");

        headers.remove("x-forwarded-for");
        assert_eq!(client_key(&headers, peer(), true), "198.51.100.1");

        headers.remove("x-real-ip");
        assert_eq!(client_key(&headers, peer(), true), "192.0.2.7");
    }

    #[test]
    fn test_unknown_without_address() {
        assert_eq!(client_key(&HeaderMap::new(), None, false), "unknown");
    }
}
