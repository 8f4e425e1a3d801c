// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Application controller component.
//!
//! Enabled unless `spec.controller.enabled` is explicitly false. The component owns the
//! controller's service account, the metrics service scraped by Prometheus and, when
//! `spec.controller.clusterRole` is set, a cluster role binding that grants that role to
//! the service account across the cluster.
//!
//! The binding is cluster-scoped and carries no owner reference, so it is only ever
//! removed by this component: when the cluster role is cleared, when the component is
//! disabled, or on teardown.

use super::component::{ChildKind, ChildRef, ComponentReconciler, ComponentScope};
use super::topology::{Topology, Variant};
use crate::builders::networking::{PortRequest, ServiceRequest};
use crate::builders::permissions::{ClusterRoleBindingRequest, ServiceAccountRequest};
use crate::builders::workloads::selector_labels;
use crate::constants::{
    COMPONENT_APPLICATION_CONTROLLER, CONTROLLER_METRICS_PORT, SUFFIX_CONTROLLER_METRICS,
};
use crate::crd::ArgoCD;
use crate::errors::ReconcileError;
use crate::naming::{name_with_suffix, unique_resource_name};
use crate::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::ClusterRoleBinding;
use kube::ResourceExt;

/// Name of the controller's service account and pods, e.g. `demo-application-controller`.
#[must_use]
pub fn resource_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), COMPONENT_APPLICATION_CONTROLLER)
}

/// Name of the metrics service, e.g. `demo-metrics`.
#[must_use]
pub fn metrics_service_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_CONTROLLER_METRICS)
}

/// Name of the cluster role binding, unique across namespaces.
#[must_use]
pub fn cluster_binding_name(instance: &ArgoCD) -> String {
    unique_resource_name(
        &instance.name_any(),
        &instance.namespace().unwrap_or_default(),
        COMPONENT_APPLICATION_CONTROLLER,
    )
}

/// Application controller reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplicationControllerReconciler;

#[async_trait]
impl<S: ObjectStore> ComponentReconciler<S> for ApplicationControllerReconciler {
    fn name(&self) -> &'static str {
        COMPONENT_APPLICATION_CONTROLLER
    }

    fn topology(&self, instance: &ArgoCD) -> Topology {
        Topology::new(instance.spec.controller.is_enabled(), false)
    }

    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef> {
        vec![
            ChildRef::new(ChildKind::ServiceAccount, resource_name(instance)),
            ChildRef::new(ChildKind::ClusterRoleBinding, cluster_binding_name(instance)),
            ChildRef::new(ChildKind::Service, metrics_service_name(instance)),
        ]
    }

    async fn reconcile(&self, scope: &ComponentScope<'_, S>) -> Result<(), ReconcileError> {
        let instance = scope.instance;
        let name = resource_name(instance);

        scope
            .converge::<ServiceAccount>(
                Variant::Any,
                &name,
                ServiceAccountRequest { meta: scope.meta(&name) }.build(),
                &[],
            )
            .await?;

        let binding_name = cluster_binding_name(instance);
        let binding = instance.spec.controller.cluster_role.as_ref().map(|role| {
            ClusterRoleBindingRequest {
                meta: scope.meta(&binding_name),
                cluster_role_name: role.clone(),
                service_account_name: name.clone(),
            }
            .build()
        });
        scope
            .converge_cluster::<ClusterRoleBinding>(Variant::Any, &binding_name, binding)
            .await?;

        let metrics_name = metrics_service_name(instance);
        scope
            .converge::<Service>(
                Variant::Any,
                &metrics_name,
                ServiceRequest {
                    meta: scope.meta(&metrics_name),
                    selector: selector_labels(&name),
                    ports: vec![PortRequest::same("metrics", CONTROLLER_METRICS_PORT)],
                    ..Default::default()
                }
                .build(),
                &[],
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "application_controller_tests.rs"]
mod application_controller_tests;
