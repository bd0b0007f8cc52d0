//! Error types for the admission webhook.
//!
//! Request-path errors never stop the server: they are reported back to the
//! API server in the admission response's `status.message`.

use kube::core::admission::{ConvertAdmissionReviewError, SerializePatchError};
use thiserror::Error;

/// Error type for webhook operations
#[derive(Error, Debug)]
pub enum Error {
    /// The request body is not a valid AdmissionReview envelope
    #[error("could not decode admission review: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope decoded but carries no request
    #[error("admission review has no request")]
    MissingRequest(#[from] ConvertAdmissionReviewError),

    /// The admission request carries no object to inspect
    #[error("admission request {uid} has no object")]
    MissingObject { uid: String },

    /// The embedded object is not a valid Pod
    #[error("could not unmarshal raw object: {0}")]
    InvalidObject(#[source] serde_json::Error),

    /// The patch could not be serialized
    #[error("could not serialize patch: {0}")]
    PatchSerialization(#[from] SerializePatchError),

    /// The response envelope could not be serialized
    #[error("could not encode admission review: {0}")]
    Encode(#[source] serde_json::Error),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Filesystem error while reading certificate material
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// Result type alias for webhook operations
pub type Result<T> = std::result::Result<T, Error>;
