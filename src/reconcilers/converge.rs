// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Converge one child resource.
//!
//! For one desired object and the live store:
//!
//! 1. The desired object is built (pure, no I/O).
//! 2. The live object is looked up by name.
//! 3. Present: if unwanted it is deleted; otherwise the managed fields (toggle
//!    annotations) are compared and an update is written only when they differ.
//! 4. Absent: if unwanted nothing happens; otherwise the owner reference is attached
//!    (best effort) and the object is created.
//!
//! Store errors are returned as-is with the failing operation attached. Nothing is
//! retried here; the controller requeues the instance.
//!
//! Cluster-scoped children follow the same steps without the owner reference, which a
//! cluster-scoped object cannot carry towards a namespaced instance.

use super::owner::attach_owner_reference_best_effort;
use super::toggles::{apply_toggles, Toggle};
use crate::crd::ArgoCD;
use crate::errors::{BuildError, ReconcileError, StoreError, StoreOperation};
use crate::metrics;
use crate::store::{ChildResource, ClusterChildResource, ObjectStore, StoredResource};
use tracing::{debug, info};

/// What a convergence step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Present and matching, nothing written
    Unchanged,
    /// Was absent and has been created
    Created,
    /// Was present with drifted managed fields and has been updated
    Updated,
    /// Was present but unwanted and has been deleted
    Deleted,
    /// Absent and unwanted, nothing written
    Absent,
}

impl Outcome {
    /// Whether the step wrote to the store.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Deleted)
    }
}

pub(crate) fn store_error<K: StoredResource>(
    operation: StoreOperation,
    name: &str,
    namespace: &str,
) -> impl FnOnce(StoreError) -> ReconcileError {
    let name = name.to_string();
    let namespace = namespace.to_string();
    move |source| ReconcileError::Store {
        operation,
        kind: K::kind(&()).to_string(),
        name,
        namespace,
        source,
    }
}

/// Delete a child by name, returning whether it existed.
///
/// A not-found answer is treated as success.
///
/// # Errors
///
/// Returns the store error for any failure other than not-found.
pub async fn remove_child<S, K>(store: &S, name: &str, namespace: &str) -> Result<bool, StoreError>
where
    S: ObjectStore,
    K: ChildResource,
{
    let kind = K::kind(&());
    match store.delete::<K>(name, namespace).await {
        Ok(true) => {
            metrics::record_resource_deleted(&kind);
            info!("Deleted {} {}/{}", kind, namespace, name);
            Ok(true)
        }
        Ok(false) => Ok(false),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Delete a child by name as a convergence step.
///
/// # Errors
///
/// Returns [`ReconcileError::Store`] for any failure other than not-found.
pub async fn delete_child<S, K>(
    store: &S,
    name: &str,
    namespace: &str,
) -> Result<Outcome, ReconcileError>
where
    S: ObjectStore,
    K: ChildResource,
{
    match remove_child::<S, K>(store, name, namespace).await {
        Ok(true) => Ok(Outcome::Deleted),
        Ok(false) => Ok(Outcome::Absent),
        Err(e) => Err(store_error::<K>(StoreOperation::Delete, name, namespace)(e)),
    }
}

/// Converge the child `name` in `namespace` towards `desired`.
///
/// `wanted` says whether the resource should exist at all in this pass (feature enabled,
/// topology variant matches, namespace not terminating). `toggles` are the managed
/// annotations.
///
/// # Errors
///
/// Returns [`ReconcileError::Build`] if the desired object could not be built and
/// [`ReconcileError::Store`] if a store call fails.
pub async fn converge<S, K>(
    store: &S,
    owner: &ArgoCD,
    name: &str,
    namespace: &str,
    desired: Result<K, BuildError>,
    wanted: bool,
    toggles: &[Toggle],
) -> Result<Outcome, ReconcileError>
where
    S: ObjectStore,
    K: ChildResource,
{
    let kind = K::kind(&());

    let mut desired = desired.map_err(|source| ReconcileError::Build {
        kind: kind.to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
        source,
    })?;

    let live = store
        .get::<K>(name, namespace)
        .await
        .map_err(store_error::<K>(StoreOperation::Get, name, namespace))?;

    match live {
        Some(mut live) => {
            if !wanted {
                debug!(namespace = %namespace, name = %name, kind = %kind, "Resource no longer wanted, deleting");
                return delete_child::<S, K>(store, name, namespace).await;
            }

            if !apply_toggles(live.meta_mut(), toggles) {
                debug!(namespace = %namespace, name = %name, kind = %kind, "Resource up to date");
                return Ok(Outcome::Unchanged);
            }

            store
                .update(&live)
                .await
                .map_err(store_error::<K>(StoreOperation::Update, name, namespace))?;
            metrics::record_resource_updated(&kind);
            info!("Updated {} {}/{}", kind, namespace, name);
            Ok(Outcome::Updated)
        }
        None => {
            if !wanted {
                debug!(namespace = %namespace, name = %name, kind = %kind, "Resource absent and not wanted");
                return Ok(Outcome::Absent);
            }

            let _ = apply_toggles(desired.meta_mut(), toggles);
            attach_owner_reference_best_effort(owner, desired.meta_mut());

            store
                .create(&desired)
                .await
                .map_err(store_error::<K>(StoreOperation::Create, name, namespace))?;
            metrics::record_resource_created(&kind);
            info!("Created {} {}/{}", kind, namespace, name);
            Ok(Outcome::Created)
        }
    }
}

/// Delete a cluster-scoped child by name, returning whether it existed.
///
/// # Errors
///
/// Returns the store error for any failure other than not-found.
pub async fn remove_cluster_child<S, K>(store: &S, name: &str) -> Result<bool, StoreError>
where
    S: ObjectStore,
    K: ClusterChildResource,
{
    let kind = K::kind(&());
    match store.delete_cluster::<K>(name).await {
        Ok(true) => {
            metrics::record_resource_deleted(&kind);
            info!("Deleted {} {}", kind, name);
            Ok(true)
        }
        Ok(false) => Ok(false),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Converge the cluster-scoped child `name` towards `desired`.
///
/// `desired` is `None` when the instance has nothing to bind; the child is then
/// unwanted whatever `wanted` says.
///
/// # Errors
///
/// Returns [`ReconcileError::Build`] if the desired object could not be built and
/// [`ReconcileError::Store`] if a store call fails.
pub async fn converge_cluster<S, K>(
    store: &S,
    name: &str,
    desired: Option<Result<K, BuildError>>,
    wanted: bool,
    toggles: &[Toggle],
) -> Result<Outcome, ReconcileError>
where
    S: ObjectStore,
    K: ClusterChildResource,
{
    let kind = K::kind(&());

    let desired = desired
        .transpose()
        .map_err(|source| ReconcileError::Build {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: String::new(),
            source,
        })?;
    let wanted = wanted && desired.is_some();

    let live = store
        .get_cluster::<K>(name)
        .await
        .map_err(store_error::<K>(StoreOperation::Get, name, ""))?;

    match (live, desired) {
        (Some(_), _) if !wanted => {
            debug!(name = %name, kind = %kind, "Cluster resource no longer wanted, deleting");
            match remove_cluster_child::<S, K>(store, name).await {
                Ok(true) => Ok(Outcome::Deleted),
                Ok(false) => Ok(Outcome::Absent),
                Err(e) => Err(store_error::<K>(StoreOperation::Delete, name, "")(e)),
            }
        }
        (Some(mut live), _) => {
            if !apply_toggles(live.meta_mut(), toggles) {
                debug!(name = %name, kind = %kind, "Cluster resource up to date");
                return Ok(Outcome::Unchanged);
            }

            store
                .update_cluster(&live)
                .await
                .map_err(store_error::<K>(StoreOperation::Update, name, ""))?;
            metrics::record_resource_updated(&kind);
            info!("Updated {} {}", kind, name);
            Ok(Outcome::Updated)
        }
        (None, Some(mut desired)) if wanted => {
            let _ = apply_toggles(desired.meta_mut(), toggles);

            store
                .create_cluster(&desired)
                .await
                .map_err(store_error::<K>(StoreOperation::Create, name, ""))?;
            metrics::record_resource_created(&kind);
            info!("Created {} {}", kind, name);
            Ok(Outcome::Created)
        }
        (None, _) => {
            debug!(name = %name, kind = %kind, "Cluster resource absent and not wanted");
            Ok(Outcome::Absent)
        }
    }
}

#[cfg(test)]
#[path = "converge_tests.rs"]
mod converge_tests;
