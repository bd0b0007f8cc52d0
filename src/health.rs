//! Health server for Kubernetes probes and Prometheus metrics.
//!
//! Provides:
//! - `/healthz` - Liveness probe (always returns 200 if server is running)
//! - `/readyz` - Readiness probe (returns 200 once the webhook listener is configured)
//! - `/metrics` - Prometheus metrics endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

use crate::webhooks::Decision;

/// Labels for admission metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DecisionLabels {
    pub decision: &'static str,
}

impl EncodeLabelSet for DecisionLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("decision", self.decision).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Label used for requests rejected before decoding (bad content type or body)
pub const DECISION_REJECTED_TRANSPORT: &str = "rejected_transport";

/// Shared metrics for the webhook
pub struct Metrics {
    /// Admission requests by decision
    pub admission_requests_total: Family<DecisionLabels, Counter>,
    /// Time spent deciding on a request
    pub admission_duration_seconds: Histogram,
    /// JSON Patch operations returned to the API server
    pub patch_operations_total: Counter,
    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let admission_requests_total = Family::<DecisionLabels, Counter>::default();
        registry.register(
            "conduit_webhook_admission_requests",
            "Total number of admission requests by decision",
            admission_requests_total.clone(),
        );

        let admission_duration_seconds = Histogram::new(exponential_buckets(0.0001, 2.0, 15));
        registry.register(
            "conduit_webhook_admission_duration_seconds",
            "Duration of admission decisions in seconds",
            admission_duration_seconds.clone(),
        );

        let patch_operations_total = Counter::default();
        registry.register(
            "conduit_webhook_patch_operations",
            "Total number of JSON Patch operations returned",
            patch_operations_total.clone(),
        );

        Self {
            admission_requests_total,
            admission_duration_seconds,
            patch_operations_total,
            registry,
        }
    }

    /// Record a completed admission decision
    pub fn record_decision(&self, decision: Decision, duration_secs: f64) {
        self.admission_requests_total
            .get_or_create(&DecisionLabels {
                decision: decision.as_str(),
            })
            .inc();
        self.admission_duration_seconds.observe(duration_secs);
        if let Decision::Patched { operations } = decision {
            self.patch_operations_total.inc_by(operations as u64);
        }
    }

    /// Record a request dropped before it reached the decision pipeline
    pub fn record_rejected_transport(&self) {
        self.admission_requests_total
            .get_or_create(&DecisionLabels {
                decision: DECISION_REJECTED_TRANSPORT,
            })
            .inc();
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the webhook listener is configured and serving
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the webhook as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the webhook is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness probe handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Returns 503 Service Unavailable until the TLS listener is configured.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server on plain HTTP
pub async fn run_health_server(
    state: Arc<HealthState>,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state);

    info!(addr = %addr, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
