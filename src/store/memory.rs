// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ObjectStore`].
//!
//! Objects are kept as JSON keyed by (kind, namespace, name). The store assigns a
//! monotonically increasing `resourceVersion` on every write and rejects updates that
//! carry a stale one, the same way the API server does. Every call is recorded so tests
//! can assert on the exact writes a reconciliation pass performed, and individual
//! operations can be made to fail.

use super::{ChildResource, ClusterChildResource, ObjectStore, StoredResource};
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::errors::{StoreError, StoreOperation};
use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

type ObjectKey = (String, String, String);

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl StoreCall {
    /// Whether the call changed stored state.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(
            self.operation,
            StoreOperation::Create
                | StoreOperation::Update
                | StoreOperation::Delete
                | StoreOperation::Patch
        )
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: StoreOperation,
    kind: String,
    name: Option<String>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    next_version: u64,
    calls: Vec<StoreCall>,
    failures: Vec<InjectedFailure>,
    terminating: BTreeSet<String>,
}

/// Store that keeps every object in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn key<K: Resource<DynamicType = ()>>(namespace: &str, name: &str) -> ObjectKey {
    (K::kind(&()).to_string(), namespace.to_string(), name.to_string())
}

fn resource_version(value: &Value) -> Option<&str> {
    value
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
}

fn labels_match(value: &Value, selector: &BTreeMap<String, String>) -> bool {
    let labels = value.pointer("/metadata/labels");
    selector.iter().all(|(k, v)| {
        labels
            .and_then(|l| l.get(k))
            .and_then(Value::as_str)
            .is_some_and(|actual| actual == v)
    })
}

impl State {
    fn record(&mut self, operation: StoreOperation, kind: &str, namespace: &str, name: &str) {
        self.calls.push(StoreCall {
            operation,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
    }

    fn injected(&self, operation: StoreOperation, kind: &str, name: &str) -> Option<StoreError> {
        self.failures
            .iter()
            .find(|f| {
                f.operation == operation
                    && f.kind == kind
                    && f.name.as_deref().is_none_or(|n| n == name)
            })
            .map(|f| {
                StoreError::Unavailable(format!("injected {} failure for {kind} {name}", f.operation))
            })
    }

    fn stamp(&mut self, value: &mut Value) -> Result<(), StoreError> {
        self.next_version += 1;
        let version = self.next_version;
        let metadata = value
            .pointer_mut("/metadata")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| StoreError::Unavailable("object has no metadata".to_string()))?;
        metadata.insert("resourceVersion".into(), Value::String(version.to_string()));
        if !metadata.contains_key("uid") {
            metadata.insert("uid".into(), Value::String(format!("uid-{version}")));
        }
        Ok(())
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an object without recording a call.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be serialized.
    pub fn insert<K: ChildResource>(&self, object: &K) -> Result<K, StoreError> {
        let namespace = object.namespace().unwrap_or_default();
        let mut value = serde_json::to_value(object)?;
        let mut state = self.lock();
        state.stamp(&mut value)?;
        let stored = serde_json::from_value(value.clone())?;
        state
            .objects
            .insert(key::<K>(&namespace, &object.name_any()), value);
        Ok(stored)
    }

    /// Read an object without recording a call.
    #[must_use]
    pub fn object<K: ChildResource>(&self, name: &str, namespace: &str) -> Option<K> {
        let state = self.lock();
        state
            .objects
            .get(&key::<K>(namespace, name))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Names of every stored object of kind `K` in `namespace`, sorted.
    #[must_use]
    pub fn names<K: ChildResource>(&self, namespace: &str) -> Vec<String> {
        let kind = K::kind(&()).to_string();
        let state = self.lock();
        state
            .objects
            .keys()
            .filter(|(k, ns, _)| *k == kind && ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    /// Read a cluster-scoped object without recording a call.
    #[must_use]
    pub fn cluster_object<K: ClusterChildResource>(&self, name: &str) -> Option<K> {
        let state = self.lock();
        state
            .objects
            .get(&key::<K>("", name))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Every write (create, update, delete, patch) recorded so far.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make every `operation` on objects of kind `K` fail. With `name`, only that object.
    pub fn fail_on<K: StoredResource>(&self, operation: StoreOperation, name: Option<&str>) {
        self.lock().failures.push(InjectedFailure {
            operation,
            kind: K::kind(&()).to_string(),
            name: name.map(ToString::to_string),
        });
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Mark a namespace as being deleted.
    pub fn mark_namespace_terminating(&self, namespace: &str) {
        self.lock().terminating.insert(namespace.to_string());
    }

    fn check(
        state: &mut State,
        operation: StoreOperation,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        state.record(operation, kind, namespace, name);
        match state.injected(operation, kind, name) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MemoryStore {
    fn get_in<K: StoredResource>(&self, name: &str, namespace: &str) -> Result<Option<K>, StoreError> {
        let mut state = self.lock();
        Self::check(&mut state, StoreOperation::Get, &K::kind(&()), namespace, name)?;
        match state.objects.get(&key::<K>(namespace, name)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn create_in<K: StoredResource>(&self, object: &K, namespace: &str) -> Result<K, StoreError> {
        let name = object.name_any();
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        Self::check(&mut state, StoreOperation::Create, &kind, namespace, &name)?;

        let key = key::<K>(namespace, &name);
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind,
                name,
                namespace: namespace.to_string(),
            });
        }

        let mut value = serde_json::to_value(object)?;
        state.stamp(&mut value)?;
        let stored = serde_json::from_value(value.clone())?;
        state.objects.insert(key, value);
        Ok(stored)
    }

    fn update_in<K: StoredResource>(&self, object: &K, namespace: &str) -> Result<K, StoreError> {
        let name = object.name_any();
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        Self::check(&mut state, StoreOperation::Update, &kind, namespace, &name)?;

        let key = key::<K>(namespace, &name);
        let Some(current) = state.objects.get(&key) else {
            return Err(StoreError::NotFound {
                kind,
                name,
                namespace: namespace.to_string(),
            });
        };

        let mut value = serde_json::to_value(object)?;
        if let Some(sent) = resource_version(&value) {
            if resource_version(current) != Some(sent) {
                return Err(StoreError::Conflict {
                    kind,
                    name,
                    namespace: namespace.to_string(),
                });
            }
        }
        if let (Some(uid), Some(metadata)) = (
            current.pointer("/metadata/uid").cloned(),
            value.pointer_mut("/metadata").and_then(Value::as_object_mut),
        ) {
            metadata.insert("uid".into(), uid);
        }

        state.stamp(&mut value)?;
        let stored = serde_json::from_value(value.clone())?;
        state.objects.insert(key, value);
        Ok(stored)
    }

    fn delete_in<K: StoredResource>(&self, name: &str, namespace: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        Self::check(&mut state, StoreOperation::Delete, &K::kind(&()), namespace, name)?;
        Ok(state.objects.remove(&key::<K>(namespace, name)).is_some())
    }

    fn list_in<K: StoredResource>(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        Self::check(&mut state, StoreOperation::List, &kind, namespace, "")?;
        state
            .objects
            .iter()
            .filter(|((k, ns, _), value)| *k == kind && ns == namespace && labels_match(value, selector))
            .map(|(_, value)| serde_json::from_value(value.clone()).map_err(StoreError::from))
            .collect()
    }
}

// Cluster-scoped objects are kept under the empty namespace.
#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: ChildResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, StoreError> {
        self.get_in(name, namespace)
    }

    async fn create<K: ChildResource>(&self, object: &K) -> Result<K, StoreError> {
        self.create_in(object, &object.namespace().unwrap_or_default())
    }

    async fn update<K: ChildResource>(&self, object: &K) -> Result<K, StoreError> {
        self.update_in(object, &object.namespace().unwrap_or_default())
    }

    async fn delete<K: ChildResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<bool, StoreError> {
        self.delete_in::<K>(name, namespace)
    }

    async fn list<K: ChildResource>(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        self.list_in(namespace, selector)
    }

    async fn get_cluster<K: ClusterChildResource>(&self, name: &str) -> Result<Option<K>, StoreError> {
        self.get_in(name, "")
    }

    async fn create_cluster<K: ClusterChildResource>(&self, object: &K) -> Result<K, StoreError> {
        self.create_in(object, "")
    }

    async fn update_cluster<K: ClusterChildResource>(&self, object: &K) -> Result<K, StoreError> {
        self.update_in(object, "")
    }

    async fn delete_cluster<K: ClusterChildResource>(&self, name: &str) -> Result<bool, StoreError> {
        self.delete_in::<K>(name, "")
    }

    async fn list_cluster<K: ClusterChildResource>(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        self.list_in("", selector)
    }

    async fn namespace_terminating(&self, namespace: &str) -> Result<bool, StoreError> {
        Ok(self.lock().terminating.contains(namespace))
    }

    async fn set_instance_finalizers(
        &self,
        instance: &ArgoCD,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        self.patch_instance(instance, "/metadata/finalizers", serde_json::to_value(finalizers)?)
    }

    async fn patch_instance_status(
        &self,
        instance: &ArgoCD,
        status: &ArgoCDStatus,
    ) -> Result<(), StoreError> {
        self.patch_instance(instance, "/status", serde_json::to_value(status)?)
    }
}

impl MemoryStore {
    fn patch_instance(&self, instance: &ArgoCD, pointer: &str, patch: Value) -> Result<(), StoreError> {
        let name = instance.name_any();
        let namespace = instance.namespace().unwrap_or_default();
        let kind = ArgoCD::kind(&()).to_string();
        let mut state = self.lock();
        Self::check(&mut state, StoreOperation::Patch, &kind, &namespace, &name)?;

        let key = key::<ArgoCD>(&namespace, &name);
        let Some(mut value) = state.objects.get(&key).cloned() else {
            return Err(StoreError::NotFound {
                kind,
                name,
                namespace,
            });
        };

        let (parent, field) = match pointer.rsplit_once('/') {
            Some((parent, field)) => (parent, field),
            None => ("", pointer),
        };
        let target = if parent.is_empty() {
            value.as_object_mut()
        } else {
            value.pointer_mut(parent).and_then(Value::as_object_mut)
        };
        let Some(target) = target else {
            return Err(StoreError::Unavailable(format!("cannot patch {pointer} of {name}")));
        };
        target.insert(field.to_string(), patch);

        state.stamp(&mut value)?;
        state.objects.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
