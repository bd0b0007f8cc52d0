//! Test fixtures and builder patterns for AdmissionReview bodies.

use std::collections::BTreeMap;

use base64::{Engine, prelude::BASE64_STANDARD};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{Value, json};

/// Builder for AdmissionReview request bodies wrapping a Pod.
///
/// # Example
/// ```
/// let body = PodReviewBuilder::new("web")
///     .namespace("default")
///     .annotation("team", "infra")
///     .build_body();
/// ```
#[derive(Clone, Debug)]
pub struct PodReviewBuilder {
    uid: String,
    name: String,
    namespace: Option<String>,
    request_namespace: Option<String>,
    annotations: Option<BTreeMap<String, String>>,
    api_version: String,
}

impl PodReviewBuilder {
    /// Create a new builder for a Pod with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uid: format!("uid-{}", name),
            name,
            namespace: None,
            request_namespace: None,
            annotations: None,
            api_version: "admission.k8s.io/v1".to_string(),
        }
    }

    /// Set the request UID.
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Set the namespace on both the Pod and the request.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = Some(namespace.clone());
        self.request_namespace = Some(namespace);
        self
    }

    /// Set only the request namespace, leaving the Pod's metadata empty.
    pub fn request_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.request_namespace = Some(namespace.into());
        self
    }

    /// Give the Pod an empty annotation map.
    pub fn empty_annotations(mut self) -> Self {
        self.annotations.get_or_insert_with(BTreeMap::new);
        self
    }

    /// Add an annotation to the Pod.
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Use the `admission.k8s.io/v1beta1` envelope.
    pub fn v1beta1(mut self) -> Self {
        self.api_version = "admission.k8s.io/v1beta1".to_string();
        self
    }

    /// Build the Pod.
    pub fn build_pod(&self) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: self.namespace.clone(),
                annotations: self.annotations.clone(),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: self.name.clone(),
                    image: Some("nginx:1.27".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: None,
        }
    }

    /// Build the AdmissionReview as JSON.
    pub fn build(&self) -> Value {
        review_with_object(
            &self.api_version,
            &self.uid,
            &self.name,
            self.request_namespace.as_deref(),
            serde_json::to_value(self.build_pod()).unwrap_or_default(),
        )
    }

    /// Build the AdmissionReview as a request body.
    pub fn build_body(&self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).unwrap_or_default()
    }
}

/// Wrap an arbitrary object in an AdmissionReview for a Pod CREATE.
pub fn review_with_object(
    api_version: &str,
    uid: &str,
    name: &str,
    namespace: Option<&str>,
    object: Value,
) -> Value {
    json!({
        "apiVersion": api_version,
        "kind": "AdmissionReview",
        "request": {
            "uid": uid,
            "kind": {"group": "", "version": "v1", "kind": "Pod"},
            "resource": {"group": "", "version": "v1", "resource": "pods"},
            "requestKind": {"group": "", "version": "v1", "kind": "Pod"},
            "requestResource": {"group": "", "version": "v1", "resource": "pods"},
            "name": name,
            "namespace": namespace,
            "operation": "CREATE",
            "userInfo": {
                "username": "system:serviceaccount:kube-system:replicaset-controller",
                "groups": ["system:serviceaccounts", "system:authenticated"]
            },
            "object": object,
            "oldObject": null,
            "dryRun": false,
            "options": {"kind": "CreateOptions", "apiVersion": "meta.k8s.io/v1"}
        }
    })
}

/// Extract the `response` object from an encoded response body.
pub fn response_of(body: &[u8]) -> Value {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|review| review.get("response").cloned())
        .unwrap_or_default()
}

/// Extract the decoded JSON Patch from an encoded response body.
pub fn response_patch(body: &[u8]) -> Option<Value> {
    let encoded = response_of(body).get("patch")?.as_str()?.to_string();
    let raw = BASE64_STANDARD.decode(encoded).ok()?;
    serde_json::from_slice(&raw).ok()
}
