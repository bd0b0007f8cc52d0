// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for conduit-webhook.
//!
//! Uses proptest to generate random inputs and verify invariants.

use std::collections::BTreeMap;

use conduit_webhook::InjectorConfig;
use conduit_webhook::webhooks::{
    ExistingAnnotations, annotation_patch, build_annotation_patch, should_inject,
};
use json_patch::PatchOperation;
use proptest::prelude::*;
use serde_json::{Value, json};

/// Strategy for annotation keys, including the characters that need escaping.
fn annotation_key() -> impl Strategy<Value = String> {
    "[a-z~/.]{1,12}"
}

/// Strategy for annotation values (possibly empty).
fn annotation_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/.-]{0,12}"
}

fn annotation_map() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(annotation_key(), annotation_value(), 0..6)
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

proptest! {
    /// Property: only the two reserved namespaces are skipped.
    #[test]
    fn prop_policy_is_exact_match(namespace in "[a-z-]{0,20}") {
        let config = InjectorConfig::default();
        let expected = namespace != "kube-system" && namespace != "kube-public";
        prop_assert_eq!(should_inject(&config, &namespace), expected);
    }

    /// Property: per-key ops follow the desired key order with escaped paths.
    #[test]
    fn prop_present_paths_escaped_in_order(
        current in annotation_map(),
        desired in annotation_map(),
    ) {
        let ops = build_annotation_patch(ExistingAnnotations::Present(&current), &desired);
        prop_assert_eq!(ops.len(), desired.len());

        let ops = serde_json::to_value(&ops).unwrap();
        for (op, (key, value)) in ops.as_array().unwrap().iter().zip(&desired) {
            let path = format!("/metadata/annotations/{}", escape(key));
            prop_assert_eq!(op["path"].as_str().unwrap(), path.as_str());
            prop_assert_eq!(op["value"].as_str().unwrap(), value.as_str());

            let replace = current.get(key).is_some_and(|v| !v.is_empty());
            prop_assert_eq!(op["op"].as_str().unwrap(), if replace { "replace" } else { "add" });
        }
    }

    /// Property: applying the patch then recomputing yields value-preserving replaces.
    #[test]
    fn prop_reapplied_patch_is_noop(
        current in prop::option::of(annotation_map()),
        desired in prop::collection::btree_map(annotation_key(), "[a-z0-9]{1,8}", 1..5),
    ) {
        let mut pod = json!({"metadata": {"name": "web"}});
        if let Some(current) = &current {
            pod["metadata"]["annotations"] = serde_json::to_value(current).unwrap();
        }

        let first = annotation_patch(ExistingAnnotations::from(current.as_ref()), &desired);
        json_patch::patch(&mut pod, &first.0).unwrap();

        let applied: BTreeMap<String, String> =
            serde_json::from_value(pod["metadata"]["annotations"].clone()).unwrap();
        for (key, value) in &desired {
            prop_assert_eq!(applied.get(key), Some(value));
        }

        let second = annotation_patch(ExistingAnnotations::Present(&applied), &desired);
        for op in &second.0 {
            prop_assert!(matches!(op, PatchOperation::Replace(_)));
        }

        let before: Value = pod.clone();
        json_patch::patch(&mut pod, &second.0).unwrap();
        prop_assert_eq!(pod, before);
    }
}
