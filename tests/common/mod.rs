//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{extract::Query, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use recaptcha_gateway::assessment::{AssessmentError, AssessmentResult, Assessor};
use recaptcha_gateway::{GatewayConfig, HttpServer, Shutdown};

pub const API_KEY: &str = "test-api-key-12345";

/// Config with every required secret filled in.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.auth.api_key = API_KEY.into();
    config.recaptcha.api_key = "google-key".into();
    config.recaptcha.site_key = "site-key".into();
    config.recaptcha.project_id = "test-project".into();
    config.timeouts.shutdown_drain_secs = 1;
    config
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(config: GatewayConfig, assessor: Arc<dyn Assessor>) -> TestGateway {
    let server = HttpServer::new(config, assessor).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestGateway {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Assessor returning a fixed valid result.
pub struct StaticAssessor;

#[async_trait]
impl Assessor for StaticAssessor {
    async fn assess(&self, token: &str, action: &str) -> Result<AssessmentResult, AssessmentError> {
        if token.trim().is_empty() {
            return Err(AssessmentError::EmptyToken);
        }
        Ok(AssessmentResult {
            valid: true,
            score: 0.9,
            action: action.to_string(),
            ..Default::default()
        })
    }
}

/// A request the mock provider received.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub query: HashMap<String, String>,
    pub body: Value,
}

/// Start a mock assessments endpoint answering every call with `status`
/// and `body`. Returns its URL and the requests it has seen.
pub async fn start_mock_provider(
    status: StatusCode,
    body: Value,
) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let seen = captured.clone();

    let app = Router::new().route(
        "/v1/projects/test-project/assessments",
        post(move |Query(query): Query<HashMap<String, String>>, Json(request): Json<Value>| {
            let seen = seen.clone();
            let body = body.clone();
            async move {
                seen.lock().unwrap().push(CapturedRequest {
                    query,
                    body: request,
                });
                (status, Json(body))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (
        format!("http://{}/v1/projects/test-project/assessments", addr),
        captured,
    )
}
