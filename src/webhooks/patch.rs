//! JSON Patch construction for Pod annotations.
//!
//! The patch describes the change; the Pod from the request is never
//! modified. Annotation keys are JSON Pointer tokens and get RFC 6901
//! escaping (`~` to `~0`, `/` to `~1`) through [`jsonptr`].

use std::collections::BTreeMap;

use json_patch::{AddOperation, Patch, PatchOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

/// Annotation state of the target object.
///
/// A Pod without an annotation map and a Pod with an empty one need
/// different patches: the first has no container to add keys into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExistingAnnotations<'a> {
    /// `metadata.annotations` is not set
    Absent,
    /// `metadata.annotations` is set, possibly empty
    Present(&'a BTreeMap<String, String>),
}

impl<'a> From<Option<&'a BTreeMap<String, String>>> for ExistingAnnotations<'a> {
    fn from(annotations: Option<&'a BTreeMap<String, String>>) -> Self {
        match annotations {
            Some(map) => ExistingAnnotations::Present(map),
            None => ExistingAnnotations::Absent,
        }
    }
}

fn annotations_path() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations"])
}

fn annotation_key_path(key: &str) -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations", key])
}

/// Build the operations that ensure every `desired` annotation is set.
///
/// With no annotation map a single `add` creates the whole map. Otherwise
/// each desired key gets its own op, in key order: `replace` when the
/// existing value is non-empty, `add` when it is missing or empty. An op is
/// emitted even when the value already matches.
pub fn build_annotation_patch(
    existing: ExistingAnnotations<'_>,
    desired: &BTreeMap<String, String>,
) -> Vec<PatchOperation> {
    if desired.is_empty() {
        return Vec::new();
    }

    match existing {
        ExistingAnnotations::Absent => {
            let value = desired
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect();
            vec![PatchOperation::Add(AddOperation {
                path: annotations_path(),
                value: Value::Object(value),
            })]
        }
        ExistingAnnotations::Present(current) => desired
            .iter()
            .map(|(key, value)| {
                let path = annotation_key_path(key);
                let value = Value::String(value.clone());
                // An empty existing value counts as missing.
                match current.get(key) {
                    Some(old) if !old.is_empty() => {
                        PatchOperation::Replace(ReplaceOperation { path, value })
                    }
                    _ => PatchOperation::Add(AddOperation { path, value }),
                }
            })
            .collect(),
    }
}

/// Same as [`build_annotation_patch`], wrapped as a [`Patch`].
pub fn annotation_patch(
    existing: ExistingAnnotations<'_>,
    desired: &BTreeMap<String, String>,
) -> Patch {
    Patch(build_annotation_patch(existing, desired))
}
