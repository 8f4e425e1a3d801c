// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store abstraction used by the reconcilers.
//!
//! Reconcilers never talk to the Kubernetes API directly. They go through
//! [`ObjectStore`], which exposes the handful of calls the convergence algorithm needs
//! (get, create, update, delete, list) plus the instance-level calls of the driver
//! (namespace deletion marker, finalizers, status).
//!
//! - [`KubeStore`] is backed by a [`kube::Client`].
//! - `MemoryStore` keeps objects in memory; tests use it to count writes and inject
//!   failures. It is compiled for unit tests and behind the `test-util` feature.

pub mod cluster;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use cluster::KubeStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;

use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::errors::StoreError;
use async_trait::async_trait;
use kube::core::{ClusterResourceScope, NamespaceResourceScope};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Any object the store can hold, namespaced or not.
pub trait StoredResource:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredResource for K where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A namespaced Kubernetes object the operator manages on behalf of an instance.
pub trait ChildResource: StoredResource + Resource<Scope = NamespaceResourceScope> {}

impl<K> ChildResource for K where K: StoredResource + Resource<Scope = NamespaceResourceScope> {}

/// A cluster-scoped object the operator manages on behalf of an instance.
///
/// Cluster-scoped objects cannot carry an owner reference to a namespaced instance, so
/// they are found by label and deleted explicitly on teardown.
pub trait ClusterChildResource: StoredResource + Resource<Scope = ClusterResourceScope> {}

impl<K> ClusterChildResource for K where K: StoredResource + Resource<Scope = ClusterResourceScope> {}

/// Calls the reconcilers make against the cluster state.
///
/// Writes go through the store's optimistic concurrency: `update` sends the
/// `resourceVersion` it read and fails with [`StoreError::Conflict`] if the object moved
/// on. No call retries internally.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by name. Absence is `Ok(None)`, not an error.
    async fn get<K: ChildResource>(&self, name: &str, namespace: &str)
        -> Result<Option<K>, StoreError>;

    /// Create an object and return the stored version.
    async fn create<K: ChildResource>(&self, object: &K) -> Result<K, StoreError>;

    /// Replace an object and return the stored version.
    async fn update<K: ChildResource>(&self, object: &K) -> Result<K, StoreError>;

    /// Delete an object. Returns `Ok(false)` if it was already absent.
    async fn delete<K: ChildResource>(&self, name: &str, namespace: &str)
        -> Result<bool, StoreError>;

    /// List objects in a namespace whose labels contain every pair of `selector`.
    async fn list<K: ChildResource>(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError>;

    /// Fetch a cluster-scoped object by name. Absence is `Ok(None)`.
    async fn get_cluster<K: ClusterChildResource>(&self, name: &str) -> Result<Option<K>, StoreError>;

    /// Create a cluster-scoped object and return the stored version.
    async fn create_cluster<K: ClusterChildResource>(&self, object: &K) -> Result<K, StoreError>;

    /// Replace a cluster-scoped object and return the stored version.
    async fn update_cluster<K: ClusterChildResource>(&self, object: &K) -> Result<K, StoreError>;

    /// Delete a cluster-scoped object. Returns `Ok(false)` if it was already absent.
    async fn delete_cluster<K: ClusterChildResource>(&self, name: &str) -> Result<bool, StoreError>;

    /// List cluster-scoped objects whose labels contain every pair of `selector`.
    async fn list_cluster<K: ClusterChildResource>(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError>;

    /// Whether the namespace carries a deletion marker.
    async fn namespace_terminating(&self, namespace: &str) -> Result<bool, StoreError>;

    /// Replace the finalizer list of an instance.
    async fn set_instance_finalizers(
        &self,
        instance: &ArgoCD,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Write the status subresource of an instance.
    async fn patch_instance_status(
        &self,
        instance: &ArgoCD,
        status: &ArgoCDStatus,
    ) -> Result<(), StoreError>;
}

/// Render a label map as a Kubernetes label selector string (`k1=v1,k2=v2`).
#[must_use]
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
