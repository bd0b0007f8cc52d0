//! Admission webhook server.
//!
//! Mounts the admission handler on `POST /` and serves it over TLS. The
//! serving certificate is expected to be trusted by the API server through
//! the CA bundle of the MutatingWebhookConfiguration.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_server::tls_rustls::RustlsConfig;
use tracing::{info, warn};

use crate::config::InjectorConfig;
use crate::error::{Error, Result};
use crate::health::HealthState;
use crate::webhooks::handler::handle_admission;

/// Media type the API server uses for AdmissionReview bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub config: InjectorConfig,
    pub health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(config: InjectorConfig, health: Option<Arc<HealthState>>) -> Self {
        Self { config, health }
    }
}

/// Whether a Content-Type header value names JSON.
///
/// Looser than an exact `application/json` comparison: the media type is
/// matched case-insensitively and parameters such as `charset` are ignored.
pub fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|media_type| media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new().route("/", post(mutate)).with_state(state)
}

/// Admission webhook handler.
///
/// Transport problems (unreadable body, wrong content type) are logged and
/// answered with an empty 200 body; everything else gets an AdmissionReview.
async fn mutate(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Could not read request body");
            record_rejected(&state);
            return StatusCode::OK.into_response();
        }
    };

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !is_json_content_type(content_type) {
        warn!(content_type = %content_type, "Wrong content type");
        record_rejected(&state);
        return StatusCode::OK.into_response();
    }

    let started = Instant::now();
    let (decision, response) = handle_admission(&body, &state.config);
    if let Some(health) = &state.health {
        health
            .metrics
            .record_decision(decision, started.elapsed().as_secs_f64());
    }
    if decision.is_failure() {
        warn!(decision = %decision, "Admission request failed");
    }

    (StatusCode::OK, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], response).into_response()
}

fn record_rejected(state: &WebhookState) {
    if let Some(health) = &state.health {
        health.metrics.record_rejected_transport();
    }
}

/// Load the serving certificate and key (PEM).
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig> {
    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| Error::Tls(format!("{}: {}", cert_path.display(), e)))
}

/// Run the webhook server with TLS.
///
/// Marks the health state ready once the listener is configured.
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    addr: SocketAddr,
    tls: RustlsConfig,
) -> Result<()> {
    let app = create_webhook_router(state.clone());

    info!(addr = %addr, "Starting HTTPS webhook server");
    if let Some(health) = &state.health {
        health.set_ready(true).await;
    }

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
