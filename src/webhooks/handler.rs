//! Admission decision pipeline.
//!
//! Decodes the review, types the Pod, applies the injection policy and builds
//! the annotation patch. Everything here is synchronous and free of I/O so it
//! can be exercised without a listener.

use std::fmt;

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionResponse, AdmissionReview};
use tracing::{debug, error, info, warn};

use crate::config::InjectorConfig;
use crate::error::Error;
use crate::webhooks::codec::{PodReview, decode_pod, decode_review, encode_review};
use crate::webhooks::patch::{ExistingAnnotations, annotation_patch};
use crate::webhooks::policy::should_inject;

/// Outcome of a single admission review
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Pod is in a skipped namespace, allowed unmodified
    Skipped,
    /// Pod allowed with an annotation patch
    Patched {
        /// Number of JSON Patch operations in the response
        operations: usize,
    },
    /// Pod allowed unmodified because there was nothing to patch
    Allowed,
    /// Request body was not a valid AdmissionReview
    DecodeError,
    /// The embedded object was missing or not a valid Pod
    InvalidObject,
    /// The patch could not be serialized
    PatchError,
}

impl Decision {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Skipped => "skipped",
            Decision::Patched { .. } => "patched",
            Decision::Allowed => "allowed",
            Decision::DecodeError => "decode_error",
            Decision::InvalidObject => "invalid_object",
            Decision::PatchError => "patch_error",
        }
    }

    /// Whether the response carries an error message
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Decision::DecodeError | Decision::InvalidObject | Decision::PatchError
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide on a decoded admission request.
pub fn admission_decision(
    review: &PodReview,
    config: &InjectorConfig,
) -> (Decision, AdmissionResponse) {
    let request = &review.request;
    let uid = &request.uid;

    let pod = match decode_pod(review) {
        Ok(pod) => pod,
        Err(e) => {
            warn!(uid = %uid, error = %e, "Could not unmarshal raw object");
            return (
                Decision::InvalidObject,
                AdmissionResponse::from(request).deny(e.to_string()),
            );
        }
    };

    info!(
        uid = %uid,
        kind = %request.kind.kind,
        namespace = ?request.namespace,
        name = %request.name,
        operation = ?request.operation,
        user = ?request.user_info.username,
        "Processing admission review"
    );

    // The API server may leave the object's namespace empty on create; such
    // Pods are judged by the request namespace instead of the empty string.
    let namespace = pod
        .metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .or(request.namespace.as_deref())
        .unwrap_or_default();

    if !should_inject(config, namespace) {
        info!(uid = %uid, namespace = %namespace, name = %request.name, "Skipping injection");
        return (Decision::Skipped, AdmissionResponse::from(request));
    }

    let existing = ExistingAnnotations::from(pod.metadata.annotations.as_ref());
    let patch = annotation_patch(existing, &config.desired_annotations);
    let operations = patch.0.len();
    if operations == 0 {
        debug!(uid = %uid, "No annotations to inject");
        return (Decision::Allowed, AdmissionResponse::from(request));
    }

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => {
            info!(uid = %uid, namespace = %namespace, operations, "Injecting annotations");
            (Decision::Patched { operations }, response)
        }
        Err(e) => {
            let e = Error::from(e);
            error!(uid = %uid, error = %e, "Error creating annotation patch");
            (
                Decision::PatchError,
                AdmissionResponse::from(request).deny(e.to_string()),
            )
        }
    }
}

/// Run the full pipeline on a raw request body and return the response
/// envelope.
pub fn review_admission(
    body: &[u8],
    config: &InjectorConfig,
) -> (Decision, AdmissionReview<DynamicObject>) {
    match decode_review(body) {
        Ok(review) => {
            let (decision, response) = admission_decision(&review, config);
            (decision, response.into_review())
        }
        Err(e) => {
            warn!(error = %e, "Could not decode body");
            (
                Decision::DecodeError,
                AdmissionResponse::invalid(e).into_review(),
            )
        }
    }
}

/// Run the full pipeline on a raw request body and return the encoded
/// response body.
///
/// An encoding failure is logged and yields an empty body.
pub fn handle_admission(body: &[u8], config: &InjectorConfig) -> (Decision, Vec<u8>) {
    let (decision, review) = review_admission(body, config);
    match encode_review(&review) {
        Ok(bytes) => {
            debug!(decision = %decision, response = %String::from_utf8_lossy(&bytes), "Admission response");
            (decision, bytes)
        }
        Err(e) => {
            error!(decision = %decision, error = %e, "Error marshalling decision");
            (decision, Vec::new())
        }
    }
}
