//! Static configuration for the injector.
//!
//! Everything here is loaded once at startup and shared read-only between
//! requests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Proxy version stamped into injected annotations when none is configured
pub const DEFAULT_PROXY_VERSION: &str = "rmars/branch";

/// Annotation marking a Pod as injected
pub const INJECTED_ANNOTATION: &str = "conduit.io";
/// Annotation recording which component injected the Pod
pub const CREATED_BY_ANNOTATION: &str = "conduit.io/created-by";
/// Annotation recording the proxy version
pub const PROXY_VERSION_ANNOTATION: &str = "conduit.io/proxy-version";

/// The cluster's system namespace
pub const NAMESPACE_SYSTEM: &str = "kube-system";
/// The cluster's public namespace
pub const NAMESPACE_PUBLIC: &str = "kube-public";

/// Decision inputs for the admission handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectorConfig {
    /// Annotations every injected Pod must carry, applied in key order
    pub desired_annotations: BTreeMap<String, String>,
    /// Namespaces that are never injected (exact match)
    pub skip_namespaces: Vec<String>,
}

impl InjectorConfig {
    /// Build the injector configuration for a given proxy version.
    pub fn new(proxy_version: &str) -> Self {
        let mut desired_annotations = BTreeMap::new();
        desired_annotations.insert(
            INJECTED_ANNOTATION.to_string(),
            "hi-im-injected".to_string(),
        );
        desired_annotations.insert(
            CREATED_BY_ANNOTATION.to_string(),
            format!("conduit/webhook/{}", proxy_version),
        );
        desired_annotations.insert(
            PROXY_VERSION_ANNOTATION.to_string(),
            proxy_version.to_string(),
        );

        Self {
            desired_annotations,
            skip_namespaces: vec![NAMESPACE_SYSTEM.to_string(), NAMESPACE_PUBLIC.to_string()],
        }
    }
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_VERSION)
    }
}

/// Mutating admission webhook that annotates Pods for conduit proxy injection
#[derive(Parser, Debug, Clone)]
#[command(name = "conduit-webhook", version, about, long_about = None)]
pub struct ServerConfig {
    /// Address the HTTPS webhook listens on
    #[arg(long, env = "WEBHOOK_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Address of the plain-HTTP health and metrics server
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:9090")]
    pub health_addr: SocketAddr,

    /// Serving certificate (PEM)
    #[arg(long, env = "WEBHOOK_TLS_CERT", default_value = "/etc/webhook/certs/tls.crt")]
    pub tls_cert: PathBuf,

    /// Serving private key (PEM)
    #[arg(long, env = "WEBHOOK_TLS_KEY", default_value = "/etc/webhook/certs/tls.key")]
    pub tls_key: PathBuf,

    /// CA bundle the API server uses to verify the serving certificate (PEM)
    #[arg(long, env = "WEBHOOK_CA_BUNDLE", default_value = "/etc/webhook/certs/ca.crt")]
    pub ca_bundle: PathBuf,

    /// Proxy version recorded in the injected annotations
    #[arg(long, env = "CONDUIT_PROXY_VERSION", default_value = DEFAULT_PROXY_VERSION)]
    pub proxy_version: String,

    /// Register the MutatingWebhookConfiguration on startup
    #[arg(long, env = "WEBHOOK_REGISTER", default_value_t = false)]
    pub register: bool,

    /// Name of the MutatingWebhookConfiguration
    #[arg(long, env = "WEBHOOK_CONFIG_NAME", default_value = "conduit-proxy-injector")]
    pub webhook_name: String,

    /// Service fronting this webhook
    #[arg(long, env = "WEBHOOK_SERVICE_NAME", default_value = "conduit-webhook")]
    pub service_name: String,

    /// Namespace of the Service fronting this webhook
    #[arg(long, env = "POD_NAMESPACE", default_value = "default")]
    pub service_namespace: String,

    /// Port of the Service fronting this webhook
    #[arg(long, env = "WEBHOOK_SERVICE_PORT", default_value_t = 443)]
    pub service_port: i32,
}

impl ServerConfig {
    /// Injector configuration derived from the command line
    pub fn injector(&self) -> InjectorConfig {
        InjectorConfig::new(&self.proxy_version)
    }
}
