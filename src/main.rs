//! conduit-webhook - mutating admission webhook for conduit proxy injection.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Parses configuration from flags and environment
//! - Starts the health server
//! - Optionally registers the MutatingWebhookConfiguration
//! - Serves admission reviews over TLS until shutdown

use std::sync::Arc;

use clap::Parser;
use kube::Client;
use tokio::signal;
use tracing::{error, info, warn};

use conduit_webhook::webhooks::WebhookTarget;
use conduit_webhook::{
    HealthState, ServerConfig, WebhookState, load_tls_config, register_webhook,
    run_health_server, run_webhook_server,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("conduit_webhook=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    let config = ServerConfig::parse();
    info!(
        addr = %config.addr,
        proxy_version = %config.proxy_version,
        "Starting conduit-webhook"
    );

    let health_state = Arc::new(HealthState::new());

    // Probes should answer even before the TLS listener is up
    let health_handle = {
        let health_state = health_state.clone();
        let addr = config.health_addr;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, addr).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // Requests only arrive once registration completes, so it runs alongside serving
    if config.register {
        let target = WebhookTarget::from(&config);
        let ca_bundle = config.ca_bundle.clone();
        tokio::spawn(async move {
            let result = match Client::try_default().await {
                Ok(client) => register_webhook(client, &target, &ca_bundle).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                error!(error = %e, "Webhook registration failed");
            }
        });
    } else {
        info!("Webhook registration disabled");
    }

    let tls = load_tls_config(&config.tls_cert, &config.tls_key).await?;
    let state = Arc::new(WebhookState::new(
        config.injector(),
        Some(health_state.clone()),
    ));
    let webhook_handle = tokio::spawn(run_webhook_server(state, config.addr, tls));

    tokio::select! {
        result = webhook_handle => {
            match result {
                Ok(Err(e)) => error!("Webhook server error: {}", e),
                Err(e) => error!("Webhook server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
            health_state.set_ready(false).await;
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
