//! Injection policy.
//!
//! Pods in the cluster's reserved namespaces are never injected: the webhook
//! fires for control-plane Pods too, and mutating those can break bootstrap.

use crate::config::InjectorConfig;

/// Decide whether Pods in `namespace` should be injected.
///
/// Returns false iff `namespace` exactly equals one of the configured skip
/// namespaces. There is no prefix or wildcard matching; the empty namespace
/// is injected.
pub fn should_inject(config: &InjectorConfig, namespace: &str) -> bool {
    !config.skip_namespaces.iter().any(|ns| ns == namespace)
}
