//! AdmissionReview wire codec.
//!
//! Thin wrappers over the kube-rs admission types so every decode/encode
//! failure is mapped onto [`Error`].

use base64::{Engine, prelude::BASE64_STANDARD};
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionReview};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// An admission request with its target object still in raw form.
///
/// `request.object` and `request.old_object` are always `None`; the target
/// object lives in `object` until [`decode_pod`] types it.
#[derive(Clone, Debug)]
pub struct PodReview {
    pub request: AdmissionRequest<DynamicObject>,
    pub object: Option<Value>,
}

/// Decode a request body into an admission request.
///
/// Both `admission.k8s.io/v1` and `v1beta1` envelopes are accepted; the
/// envelope's type information is kept on the request so the response can
/// echo it. The embedded objects are not interpreted here, so a malformed
/// Pod still yields a request with its UID.
pub fn decode_review(body: &[u8]) -> Result<PodReview> {
    let mut envelope: Value = serde_json::from_slice(body).map_err(Error::Decode)?;

    let mut object = None;
    if let Some(request) = envelope.get_mut("request").and_then(Value::as_object_mut) {
        object = request.remove("object").filter(|object| !object.is_null());
        request.remove("oldObject");
    }

    let review: AdmissionReview<DynamicObject> =
        serde_json::from_value(envelope).map_err(Error::Decode)?;
    Ok(PodReview {
        request: review.try_into()?,
        object,
    })
}

/// Unmarshal the request's object into a typed Pod.
pub fn decode_pod(review: &PodReview) -> Result<Pod> {
    let object = review.object.as_ref().ok_or_else(|| Error::MissingObject {
        uid: review.request.uid.clone(),
    })?;
    Pod::deserialize(object).map_err(Error::InvalidObject)
}

/// Encode a response envelope for the HTTP body.
///
/// The patch is written as a base64 string, the encoding the API server uses
/// for byte fields.
pub fn encode_review(review: &AdmissionReview<DynamicObject>) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(review).map_err(Error::Encode)?;
    let patch = review.response.as_ref().and_then(|r| r.patch.as_ref());
    if let (Some(patch), Some(response)) = (
        patch,
        value.get_mut("response").and_then(Value::as_object_mut),
    ) {
        response.insert(
            "patch".to_string(),
            Value::String(BASE64_STANDARD.encode(patch)),
        );
    }
    serde_json::to_vec(&value).map_err(Error::Encode)
}
