// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Grafana component.
//!
//! Enabled only when `spec.grafana.enabled` is true. The dashboard workload is deployed
//! outside the operator; the component keeps the service in front of it, so turning the
//! flag off removes the service and turning it back on recreates it.

use super::component::{ChildKind, ChildRef, ComponentReconciler, ComponentScope};
use super::topology::{Topology, Variant};
use crate::builders::networking::{PortRequest, ServiceRequest};
use crate::builders::workloads::selector_labels;
use crate::constants::{COMPONENT_GRAFANA, GRAFANA_CONTAINER_PORT, GRAFANA_SERVICE_PORT};
use crate::crd::ArgoCD;
use crate::errors::ReconcileError;
use crate::naming::name_with_suffix;
use crate::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;

/// Name of the Grafana service and pods, e.g. `demo-grafana`.
#[must_use]
pub fn resource_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), COMPONENT_GRAFANA)
}

/// Grafana reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrafanaReconciler;

#[async_trait]
impl<S: ObjectStore> ComponentReconciler<S> for GrafanaReconciler {
    fn name(&self) -> &'static str {
        COMPONENT_GRAFANA
    }

    fn topology(&self, instance: &ArgoCD) -> Topology {
        Topology::new(instance.spec.grafana.enabled, false)
    }

    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef> {
        vec![ChildRef::new(ChildKind::Service, resource_name(instance))]
    }

    async fn reconcile(&self, scope: &ComponentScope<'_, S>) -> Result<(), ReconcileError> {
        let name = resource_name(scope.instance);

        scope
            .converge::<Service>(
                Variant::Any,
                &name,
                ServiceRequest {
                    meta: scope.meta(&name),
                    selector: selector_labels(&name),
                    ports: vec![PortRequest::forward(
                        "http",
                        GRAFANA_SERVICE_PORT,
                        GRAFANA_CONTAINER_PORT,
                    )],
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
#[path = "grafana_tests.rs"]
mod grafana_tests;
