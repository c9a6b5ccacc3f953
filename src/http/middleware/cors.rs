//! Cross-origin headers.
//!
//! Allowed origins are reflected back (a credentialed response cannot use a
//! literal `*`). Preflight `OPTIONS` requests are answered here with 204 and
//! never reach rate limiting or authentication.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::CorsConfig;

const ALLOW_HEADERS: &str = "Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, \
     Authorization, accept, origin, Cache-Control, X-Requested-With, X-API-Key";
const ALLOW_METHODS: &str = "POST, OPTIONS, GET, PUT, DELETE";

/// Origin policy built once from configuration.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_any: bool,
    origins: HashSet<String>,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let origins: HashSet<String> = config
            .allowed_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Self {
            allow_any: origins.is_empty() || origins.contains("*"),
            origins,
        }
    }

    /// Value for `Access-Control-Allow-Origin`, if the origin is allowed.
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        match origin {
            Some(origin) if self.allow_any || self.origins.contains(origin) => {
                Some(origin.to_string())
            }
            None if self.allow_any => Some("*".to_string()),
            _ => None,
        }
    }
}

pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let preflight = request.method() == Method::OPTIONS;

    let mut response = if preflight {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        response
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Some(allowed) = policy.allow_origin(origin.as_deref()) {
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(origins: &[&str]) -> CorsPolicy {
        CorsPolicy::from_config(&CorsConfig {
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
        })
    }

    #[test]
    fn test_wildcard_reflects_origin() {
        let policy = policy(&["*"]);
        assert_eq!(
            policy.allow_origin(Some("https://app.example")).as_deref(),
            Some("https://app.example")
        );
        assert_eq!(policy.allow_origin(None).as_deref(), Some("*"));
    }

    #[test]
    fn test_allow_list() {
        let policy = policy(&["https://a.example", " https://b.example "]);
        assert!(policy.allow_origin(Some("https://b.example")).is_some());
        assert!(policy.allow_origin(Some("https://evil.example")).is_none());
        assert!(policy.allow_origin(None).is_none());
    }
}
