//! Self-registration of the MutatingWebhookConfiguration.
//!
//! The API server only routes Pod creations here once the configuration
//! exists, so serving does not wait for registration to finish.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::ByteString;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    WebhookClientConfig,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, Patch, PatchParams};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "conduit-webhook";

/// Seconds the API server waits for a decision before applying the failure policy
pub const WEBHOOK_TIMEOUT_SECONDS: i32 = 10;

/// Where the API server should send admission reviews
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookTarget {
    /// MutatingWebhookConfiguration name
    pub config_name: String,
    /// Service fronting the webhook
    pub service_name: String,
    /// Namespace of the service
    pub service_namespace: String,
    /// Service port
    pub service_port: i32,
}

impl From<&ServerConfig> for WebhookTarget {
    fn from(config: &ServerConfig) -> Self {
        Self {
            config_name: config.webhook_name.clone(),
            service_name: config.service_name.clone(),
            service_namespace: config.service_namespace.clone(),
            service_port: config.service_port,
        }
    }
}

impl WebhookTarget {
    /// Fully-qualified webhook name, as required by the API server
    pub fn webhook_name(&self) -> String {
        format!("{}.conduit.io", self.config_name)
    }
}

/// Build the MutatingWebhookConfiguration for `target`.
///
/// `ca_bundle` is the PEM CA certificate that signed the serving certificate.
pub fn webhook_configuration(
    target: &WebhookTarget,
    ca_bundle: Vec<u8>,
) -> MutatingWebhookConfiguration {
    let labels = BTreeMap::from([(
        "app.kubernetes.io/managed-by".to_string(),
        FIELD_MANAGER.to_string(),
    )]);

    MutatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(target.config_name.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        webhooks: Some(vec![MutatingWebhook {
            name: target.webhook_name(),
            admission_review_versions: vec!["v1".to_string(), "v1beta1".to_string()],
            client_config: WebhookClientConfig {
                ca_bundle: Some(ByteString(ca_bundle)),
                service: Some(ServiceReference {
                    name: target.service_name.clone(),
                    namespace: target.service_namespace.clone(),
                    path: Some("/".to_string()),
                    port: Some(target.service_port),
                }),
                url: None,
            },
            rules: Some(vec![RuleWithOperations {
                api_groups: Some(vec![String::new()]),
                api_versions: Some(vec!["v1".to_string()]),
                operations: Some(vec!["CREATE".to_string()]),
                resources: Some(vec!["pods".to_string()]),
                scope: None,
            }]),
            side_effects: "None".to_string(),
            failure_policy: Some("Ignore".to_string()),
            timeout_seconds: Some(WEBHOOK_TIMEOUT_SECONDS),
            ..Default::default()
        }]),
    }
}

/// Apply the webhook configuration with server-side apply.
pub async fn register_webhook(
    client: Client,
    target: &WebhookTarget,
    ca_bundle_path: &Path,
) -> Result<()> {
    let ca_bundle = tokio::fs::read(ca_bundle_path).await?;
    let configuration = webhook_configuration(target, ca_bundle);

    let api: Api<MutatingWebhookConfiguration> = Api::all(client);
    let params = PatchParams::apply(FIELD_MANAGER).force();
    api.patch(
        &target.config_name,
        &params,
        &Patch::Apply(&configuration),
    )
    .await?;

    info!(
        name = %target.config_name,
        service = %target.service_name,
        namespace = %target.service_namespace,
        "Registered MutatingWebhookConfiguration"
    );
    Ok(())
}
