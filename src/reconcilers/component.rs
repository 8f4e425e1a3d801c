// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Component reconcilers.
//!
//! A component (repo server, cache tier, API server, application controller, ...) owns an
//! ordered list of child resources. [`ComponentReconciler::reconcile`] walks them in
//! dependency order: identity and permissions first, then the workload, then the
//! services in front of it. The first failing step ends the pass for that component;
//! steps already applied stay in place.
//!
//! [`ComponentReconciler::delete_resources`] walks the same resources in reverse,
//! tolerating absent objects and collecting failures instead of stopping at the first.
//!
//! Everything a step needs (names, labels, topology, namespace deletion marker) is
//! carried by [`ComponentScope`], built once per component per pass.

use super::converge::{converge, converge_cluster, remove_child, remove_cluster_child, Outcome};
use super::peers;
use super::toggles::Toggle;
use super::topology::{Topology, Variant};
use crate::builders::ResourceMeta;
use crate::crd::ArgoCD;
use crate::errors::{BuildError, ReconcileError, TeardownError, TeardownFailure};
use crate::naming::{default_annotations, default_labels};
use crate::store::{ChildResource, ClusterChildResource, ObjectStore};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, Role, RoleBinding};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Lifecycle state of a component after a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentState {
    /// The component is turned off and its resources are absent
    Disabled,
    /// The pass wrote to the store; another pass is expected to find nothing to do
    Converging,
    /// The pass found every resource matching and wrote nothing
    Converged,
    /// The instance or its namespace is being deleted
    DeletionPending,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "Disabled",
            Self::Converging => "Converging",
            Self::Converged => "Converged",
            Self::DeletionPending => "DeletionPending",
        };
        f.write_str(s)
    }
}

/// Settings that apply to every component of a pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSettings {
    /// The instance's namespace carries a deletion marker
    pub namespace_terminating: bool,
    /// Auto-TLS annotations are managed on this cluster
    pub auto_tls_managed: bool,
}

/// Per-pass context of one component.
pub struct ComponentScope<'a, S> {
    pub store: &'a S,
    pub instance: &'a ArgoCD,
    pub component: &'static str,
    pub instance_name: String,
    pub namespace: String,
    pub topology: Topology,
    pub settings: PassSettings,
    writes: AtomicUsize,
}

impl<'a, S: ObjectStore> ComponentScope<'a, S> {
    #[must_use]
    pub fn new(
        store: &'a S,
        instance: &'a ArgoCD,
        component: &'static str,
        topology: Topology,
        settings: PassSettings,
    ) -> Self {
        Self {
            store,
            instance,
            component,
            instance_name: instance.name_any(),
            namespace: instance.namespace().unwrap_or_default(),
            topology,
            settings,
            writes: AtomicUsize::new(0),
        }
    }

    /// Whether a resource of `variant` should exist in this pass.
    #[must_use]
    pub fn wants(&self, variant: Variant) -> bool {
        !self.settings.namespace_terminating && self.topology.wants(variant)
    }

    /// Default labels of a child named `name`.
    #[must_use]
    pub fn labels(&self, name: &str) -> BTreeMap<String, String> {
        default_labels(name, &self.instance_name, self.component)
    }

    /// Request metadata of a child named `name`, carrying the default labels and
    /// annotations.
    #[must_use]
    pub fn meta(&self, name: &str) -> ResourceMeta {
        ResourceMeta::new(name, self.namespace.clone())
            .with_labels(self.labels(name))
            .with_annotations(default_annotations(&self.instance_name, &self.namespace))
    }

    /// Auto-TLS toggle for a service, or none when the cluster cannot issue certificates.
    #[must_use]
    pub fn auto_tls(&self, secret_name: &str, wanted: bool) -> Vec<Toggle> {
        if self.settings.auto_tls_managed {
            vec![Toggle::auto_tls(secret_name, wanted)]
        } else {
            Vec::new()
        }
    }

    /// Converge one child belonging to `variant`.
    ///
    /// # Errors
    ///
    /// Propagates build and store errors of the step.
    pub async fn converge<K: ChildResource>(
        &self,
        variant: Variant,
        name: &str,
        desired: Result<K, BuildError>,
        toggles: &[Toggle],
    ) -> Result<Outcome, ReconcileError> {
        let outcome = converge(
            self.store,
            self.instance,
            name,
            &self.namespace,
            desired,
            self.wants(variant),
            toggles,
        )
        .await?;
        self.record(outcome);
        Ok(outcome)
    }

    /// Converge one cluster-scoped child belonging to `variant`.
    ///
    /// A `None` desired object means the instance has nothing to put there, so any live
    /// object is removed.
    ///
    /// # Errors
    ///
    /// Propagates build and store errors of the step.
    pub async fn converge_cluster<K: ClusterChildResource>(
        &self,
        variant: Variant,
        name: &str,
        desired: Option<Result<K, BuildError>>,
    ) -> Result<Outcome, ReconcileError> {
        let outcome = converge_cluster(self.store, name, desired, self.wants(variant), &[]).await?;
        self.record(outcome);
        Ok(outcome)
    }

    /// Count a step's outcome towards the component state.
    pub fn record(&self, outcome: Outcome) {
        if outcome.is_write() {
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of writes performed so far in this pass.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// State of the component after a successful pass.
    #[must_use]
    pub fn state(&self) -> ComponentState {
        if self.settings.namespace_terminating || self.instance.is_being_deleted() {
            ComponentState::DeletionPending
        } else if !self.topology.is_enabled() {
            ComponentState::Disabled
        } else if self.writes() > 0 {
            ComponentState::Converging
        } else {
            ComponentState::Converged
        }
    }
}

/// Kind of a child resource, used where the concrete type is not known statically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildKind {
    ServiceAccount,
    Role,
    RoleBinding,
    ConfigMap,
    Deployment,
    StatefulSet,
    Service,
    /// Cluster-scoped; the name is global
    ClusterRoleBinding,
    /// Every member of the peer set of services with this base name
    PeerServices,
}

/// A child resource of a component, addressed by kind and name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildRef {
    pub kind: ChildKind,
    pub name: String,
}

impl ChildRef {
    #[must_use]
    pub fn new(kind: ChildKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

async fn delete_one<S, K>(store: &S, name: &str, namespace: &str) -> Result<(), TeardownFailure>
where
    S: ObjectStore,
    K: ChildResource,
{
    remove_child::<S, K>(store, name, namespace)
        .await
        .map(|_| ())
        .map_err(|error| TeardownFailure {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            error,
        })
}

/// Delete one child; failures are returned rather than propagated.
async fn delete_ref<S: ObjectStore>(
    store: &S,
    instance_name: &str,
    component: &str,
    child: &ChildRef,
    namespace: &str,
) -> Vec<TeardownFailure> {
    let name = child.name.as_str();
    let result = match child.kind {
        ChildKind::ServiceAccount => delete_one::<S, ServiceAccount>(store, name, namespace).await,
        ChildKind::Role => delete_one::<S, Role>(store, name, namespace).await,
        ChildKind::RoleBinding => delete_one::<S, RoleBinding>(store, name, namespace).await,
        ChildKind::ConfigMap => delete_one::<S, ConfigMap>(store, name, namespace).await,
        ChildKind::Deployment => delete_one::<S, Deployment>(store, name, namespace).await,
        ChildKind::StatefulSet => delete_one::<S, StatefulSet>(store, name, namespace).await,
        ChildKind::Service => delete_one::<S, Service>(store, name, namespace).await,
        ChildKind::ClusterRoleBinding => remove_cluster_child::<S, ClusterRoleBinding>(store, name)
            .await
            .map(|_| ())
            .map_err(|error| TeardownFailure {
                kind: ClusterRoleBinding::kind(&()).to_string(),
                name: name.to_string(),
                namespace: String::new(),
                error,
            }),
        ChildKind::PeerServices => {
            return peers::delete_members::<S, Service>(store, instance_name, component, name, namespace)
                .await;
        }
    };
    result.err().into_iter().collect()
}

/// One logical component of an `ArgoCD` instance.
#[async_trait]
pub trait ComponentReconciler<S: ObjectStore>: Send + Sync {
    /// Component name, also the value of the component label.
    fn name(&self) -> &'static str;

    /// Topology of the component for this instance.
    fn topology(&self, instance: &ArgoCD) -> Topology;

    /// Every child the component may own, in creation order.
    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef>;

    /// Converge every child of the component, in dependency order.
    async fn reconcile(&self, scope: &ComponentScope<'_, S>) -> Result<(), ReconcileError>;

    /// Delete every child of the component, in reverse dependency order.
    ///
    /// Absent children are skipped. A failed delete does not stop the walk; all failures
    /// are returned together.
    async fn delete_resources(&self, store: &S, instance: &ArgoCD) -> Result<(), ReconcileError> {
        let namespace = instance.namespace().unwrap_or_default();
        let instance_name = instance.name_any();
        let mut failures = Vec::new();

        for child in self.resources(instance).iter().rev() {
            debug!(
                component = self.name(),
                kind = ?child.kind,
                name = %child.name,
                "Deleting component resource"
            );
            let mut failed = delete_ref(store, &instance_name, self.name(), child, &namespace).await;
            for failure in &failed {
                warn!(component = self.name(), error = %failure, "Failed to delete resource");
            }
            failures.append(&mut failed);
        }

        if failures.is_empty() {
            info!("Deleted resources of component {} for {}/{}", self.name(), namespace, instance_name);
            Ok(())
        } else {
            Err(TeardownError {
                component: self.name().to_string(),
                failures,
            }
            .into())
        }
    }
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod component_tests;
