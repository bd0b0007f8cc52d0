//! Mutating admission webhook for Pod annotation injection.
//!
//! Pipeline: [`codec`] decodes the AdmissionReview, [`policy`] decides
//! whether the Pod's namespace is injected, [`patch`] builds the JSON Patch,
//! and [`handler`] ties them together. [`server`] mounts the handler over
//! TLS and [`registration`] tells the API server where to find it.

pub mod codec;
pub mod handler;
pub mod patch;
pub mod policy;
pub mod registration;
mod server;

pub use codec::PodReview;
pub use handler::{Decision, admission_decision, handle_admission, review_admission};
pub use patch::{ExistingAnnotations, annotation_patch, build_annotation_patch};
pub use policy::should_inject;
pub use registration::{WebhookTarget, register_webhook, webhook_configuration};
pub use server::{
    JSON_CONTENT_TYPE, WebhookState, create_webhook_router, is_json_content_type,
    load_tls_config, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
