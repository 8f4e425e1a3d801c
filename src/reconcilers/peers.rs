// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Replicated peer sets.
//!
//! A peer set is an indexed family of children `<base>-0 .. <base>-(N-1)`, one per
//! replica of a high-availability tier. Each index is converged on its own, so growing
//! the set only creates the missing indices and shrinking it only deletes the surplus;
//! existing members are never renumbered.
//!
//! Members carry the peer-set label and their index as a managed annotation. After
//! converging, the set is listed by label and every member whose name is not one of
//! `<base>-0 .. <base>-(N-1)` is deleted.

use super::component::ComponentScope;
use super::converge::{delete_child, remove_child, Outcome};
use super::toggles::Toggle;
use super::topology::Variant;
use crate::errors::{BuildError, ReconcileError, StoreOperation, TeardownFailure};
use crate::labels::{PEER_INDEX_ANNOTATION, PEER_SET_LABEL};
use crate::naming::{component_selector, indexed_name};
use crate::store::{ChildResource, ObjectStore};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Selector matching every member of the set `set_name`.
#[must_use]
pub fn peer_selector(instance_name: &str, component: &str, set_name: &str) -> BTreeMap<String, String> {
    let mut selector = component_selector(instance_name, component);
    selector.insert(PEER_SET_LABEL.to_string(), set_name.to_string());
    selector
}

/// Index recorded on a member, if it parses.
#[must_use]
pub fn member_index(meta: &ObjectMeta) -> Option<i32> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(PEER_INDEX_ANNOTATION))
        .and_then(|i| i.parse().ok())
        .filter(|i| *i >= 0)
}

fn tag_member(meta: &mut ObjectMeta, set_name: &str) {
    meta.labels
        .get_or_insert_with(BTreeMap::new)
        .insert(PEER_SET_LABEL.to_string(), set_name.to_string());
}

/// Index annotation of a member, repaired like any other toggle.
fn index_toggle(index: i32) -> Toggle {
    Toggle {
        key: PEER_INDEX_ANNOTATION,
        value: index.to_string(),
        enabled: true,
    }
}

/// Converge the peer set `base_name` to `count` members.
///
/// `template` builds the member for an index, given the index and the member's name.
///
/// # Errors
///
/// The first failing member aborts the remaining ones; members already converged stay.
pub async fn converge_peer_set<S, K, F>(
    scope: &ComponentScope<'_, S>,
    variant: Variant,
    base_name: &str,
    count: i32,
    template: F,
) -> Result<Vec<Outcome>, ReconcileError>
where
    S: ObjectStore,
    K: ChildResource,
    F: Fn(i32, &str) -> Result<K, BuildError> + Send + Sync,
{
    let wanted = scope.wants(variant);
    let count = if wanted { count.max(0) } else { 0 };
    let mut outcomes = Vec::new();
    let mut keep = BTreeSet::new();

    for index in 0..count {
        let name = indexed_name(base_name, index);
        let desired = template(index, &name).map(|mut member| {
            tag_member(member.meta_mut(), base_name);
            member
        });
        outcomes.push(
            scope
                .converge(variant, &name, desired, &[index_toggle(index)])
                .await?,
        );
        keep.insert(name);
    }

    let selector = peer_selector(&scope.instance_name, scope.component, base_name);
    let members: Vec<K> = scope
        .store
        .list(&scope.namespace, &selector)
        .await
        .map_err(|source| ReconcileError::Store {
            operation: StoreOperation::List,
            kind: K::kind(&()).to_string(),
            name: base_name.to_string(),
            namespace: scope.namespace.clone(),
            source,
        })?;

    for member in members {
        let name = member.name_any();
        if keep.contains(&name) {
            continue;
        }
        debug!(
            namespace = %scope.namespace,
            name = %name,
            set = %base_name,
            index = ?member_index(member.meta()),
            "Pruning peer set member"
        );
        let outcome = delete_child::<S, K>(scope.store, &name, &scope.namespace).await?;
        scope.record(outcome);
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Delete every member of a peer set, collecting failures.
pub async fn delete_members<S, K>(
    store: &S,
    instance_name: &str,
    component: &str,
    set_name: &str,
    namespace: &str,
) -> Vec<TeardownFailure>
where
    S: ObjectStore,
    K: ChildResource,
{
    let kind = K::kind(&()).to_string();
    let selector = peer_selector(instance_name, component, set_name);
    let members: Vec<K> = match store.list(namespace, &selector).await {
        Ok(members) => members,
        Err(error) => {
            return vec![TeardownFailure {
                kind,
                name: set_name.to_string(),
                namespace: namespace.to_string(),
                error,
            }]
        }
    };

    let mut failures = Vec::new();
    for member in members {
        let name = member.name_any();
        if let Err(error) = remove_child::<S, K>(store, &name, namespace).await {
            failures.push(TeardownFailure {
                kind: kind.clone(),
                name,
                namespace: namespace.to_string(),
                error,
            });
        }
    }
    failures
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod peers_tests;
