//! conduit-webhook library crate
//!
//! A Kubernetes mutating admission webhook that annotates new Pods for
//! conduit proxy injection, plus its health server and self-registration.

pub mod config;
pub mod error;
pub mod health;
pub mod webhooks;

pub use config::{InjectorConfig, ServerConfig};
pub use error::{Error, Result};
pub use health::{HealthState, run_health_server};
pub use webhooks::{
    Decision, WebhookState, WebhookTarget, create_webhook_router, handle_admission,
    load_tls_config, register_webhook, run_webhook_server,
};
