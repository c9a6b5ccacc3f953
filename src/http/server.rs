//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit, CORS)
//! - Put protected routes behind admission control
//! - Bind server to listener and drain on shutdown

use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::assessment::Assessor;
use crate::config::GatewayConfig;
use crate::http::handlers::{health, ready, verify};
use crate::http::middleware::{admission_middleware, cors_middleware, AdmissionState, CorsPolicy};
use crate::lifecycle::shutdown::triggered;
use crate::lifecycle::startup::StartupError;
use crate::observability::metrics;
use crate::security::{AdmissionLimiter, CredentialGate, Gatekeeper, LimiterConfig};

const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub assessor: Arc<dyn Assessor>,
    pub started_at: Instant,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    gatekeeper: Arc<Gatekeeper>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Starts the rate limiter's reclamation task, so this must run inside
    /// a tokio runtime.
    pub fn new(config: GatewayConfig, assessor: Arc<dyn Assessor>) -> Result<Self, StartupError> {
        let limiter_config = LimiterConfig::from_config(&config.rate_limit)?;
        let credentials = CredentialGate::new(config.auth.api_key.clone())?;
        let gatekeeper = Arc::new(Gatekeeper::new(
            AdmissionLimiter::start(limiter_config),
            credentials,
        ));

        let state = AppState {
            assessor,
            started_at: Instant::now(),
        };
        let admission = AdmissionState {
            gatekeeper: gatekeeper.clone(),
            trust_proxy_headers: config.rate_limit.trust_proxy_headers,
        };

        let router = Self::build_router(&config, state, admission);
        Ok(Self {
            router,
            config,
            gatekeeper,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState, admission: AdmissionState) -> Router {
        let cors = Arc::new(CorsPolicy::from_config(&config.cors));
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        let api = Router::new()
            .route("/recaptcha/verify", post(verify))
            .route_layer(middleware::from_fn_with_state(admission, admission_middleware))
            .with_state(state.clone());

        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .with_state(state)
            .nest("/api/v1", api)
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(middleware::from_fn(track_metrics))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// Router with all layers applied, for driving the gateway in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gatekeeper(&self) -> &Arc<Gatekeeper> {
        &self.gatekeeper
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then give in-flight requests
    /// up to the configured drain time before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let drain = Duration::from_secs(self.config.timeouts.shutdown_drain_secs);
        let draining = Arc::new(Notify::new());
        let signal_draining = draining.clone();

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            triggered(shutdown).await;
            tracing::info!("Shutting down server...");
            signal_draining.notify_one();
        });

        let result = tokio::select! {
            result = serve.into_future() => result,
            _ = async {
                draining.notified().await;
                tokio::time::sleep(drain).await;
            } => {
                tracing::warn!(drain_secs = drain.as_secs(), "Server forced to shutdown");
                Ok(())
            }
        };

        self.gatekeeper.shutdown();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Record request count and latency for every response.
async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
