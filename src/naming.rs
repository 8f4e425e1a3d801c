// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deterministic names, labels and annotations for child resources.
//!
//! Every child of an `ArgoCD` instance is addressed by a name computed from the
//! instance name, its namespace and the component. Recomputing a name from the same
//! inputs always yields the same value, so reconcilers can look a resource up before
//! deciding to create it.
//!
//! Names longer than [`MAX_RESOURCE_NAME_LENGTH`] are truncated and suffixed with a
//! short SHA-256 digest of the full name to stay unique.

use crate::constants::{MAX_RESOURCE_NAME_LENGTH, NAME_HASH_LENGTH, PEER_INDEX_RESERVE};
use crate::labels::{
    INSTANCE_NAMESPACE_ANNOTATION, INSTANCE_NAME_ANNOTATION, K8S_COMPONENT, K8S_INSTANCE,
    K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF, MANAGED_BY_OPERATOR, PART_OF_ARGOCD,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Name unique per (instance, namespace, component), e.g. `demo-ns1-applicationset-controller`.
///
/// Used for components whose children may be bound cluster-wide, where the instance name
/// alone is not unique.
#[must_use]
pub fn unique_resource_name(instance_name: &str, instance_namespace: &str, component: &str) -> String {
    fit_name(&format!("{instance_name}-{instance_namespace}-{component}"))
}

/// Name of a namespaced child built from the instance name and a fixed suffix,
/// e.g. `demo-redis-ha`.
#[must_use]
pub fn name_with_suffix(instance_name: &str, suffix: &str) -> String {
    fit_name(&format!("{instance_name}-{suffix}"))
}

/// Base name of an indexed family, e.g. `demo-redis-ha-server`.
///
/// Leaves room for a `-<index>` suffix, so members named `<base>-<index>` by this crate or
/// by Kubernetes (stateful set pods) stay within the length limit without being hashed.
#[must_use]
pub fn peer_base_name(instance_name: &str, suffix: &str) -> String {
    fit_name_to(
        &format!("{instance_name}-{suffix}"),
        MAX_RESOURCE_NAME_LENGTH - PEER_INDEX_RESERVE,
    )
}

/// Name of the `index`-th member of a replicated peer set, e.g. `demo-redis-ha-announce-2`.
#[must_use]
pub fn indexed_name(base: &str, index: i32) -> String {
    fit_name(&format!("{base}-{index}"))
}

/// Shorten `name` to the store's length limit, keeping it unique with a digest suffix.
fn fit_name(name: &str) -> String {
    fit_name_to(name, MAX_RESOURCE_NAME_LENGTH)
}

fn fit_name_to(name: &str, limit: usize) -> String {
    if name.len() <= limit {
        return name.to_string();
    }

    let digest = Sha256::digest(name.as_bytes());
    let mut hash = String::with_capacity(NAME_HASH_LENGTH);
    for byte in digest.iter() {
        if hash.len() >= NAME_HASH_LENGTH {
            break;
        }
        let _ = write!(hash, "{byte:02x}");
    }
    hash.truncate(NAME_HASH_LENGTH);

    let keep = limit - NAME_HASH_LENGTH - 1;
    let prefix = name
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= keep)
        .map(|(_, c)| c)
        .collect::<String>();
    let prefix = prefix.trim_end_matches(|c: char| c == '-' || c == '.');

    format!("{prefix}-{hash}")
}

/// Base labels carried by every child resource.
///
/// `app.kubernetes.io/component` and `app.kubernetes.io/instance` double as the discovery
/// selector for a component's children.
#[must_use]
pub fn default_labels(name: &str, instance_name: &str, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), name.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_ARGOCD.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OPERATOR.into());
    labels.insert(K8S_INSTANCE.into(), instance_name.into());
    labels
}

/// Base annotations carried by every child resource.
#[must_use]
pub fn default_annotations(instance_name: &str, instance_namespace: &str) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(INSTANCE_NAME_ANNOTATION.into(), instance_name.into());
    annotations.insert(INSTANCE_NAMESPACE_ANNOTATION.into(), instance_namespace.into());
    annotations
}

/// Selector matching every child of one component of one instance.
#[must_use]
pub fn component_selector(instance_name: &str, component: &str) -> BTreeMap<String, String> {
    let mut selector = BTreeMap::new();
    selector.insert(K8S_COMPONENT.into(), component.into());
    selector.insert(K8S_INSTANCE.into(), instance_name.into());
    selector
}

/// Merge `overrides` on top of `defaults`; override values win on key collision.
#[must_use]
pub fn merge_maps(
    defaults: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = defaults.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
