// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Repo server component.
//!
//! Enabled unless `spec.repo.enabled` is explicitly false. The repo server reads
//! repositories on behalf of the other components and needs no API permissions, so it
//! owns only a service account, a deployment and a service.

use super::component::{ChildKind, ChildRef, ComponentReconciler, ComponentScope};
use super::topology::{Topology, Variant};
use crate::builders::networking::{PortRequest, ServiceRequest};
use crate::builders::permissions::ServiceAccountRequest;
use crate::builders::workloads::{
    selector_labels, ContainerRequest, DeploymentRequest, PodRequest,
};
use crate::constants::{
    COMPONENT_REPO_SERVER, DEFAULT_REPLICAS, REDIS_PORT, REPO_SERVER_METRICS_PORT,
    REPO_SERVER_PORT, REPO_SERVER_TLS_SECRET,
};
use crate::crd::ArgoCD;
use crate::errors::{BuildError, ReconcileError};
use crate::naming::name_with_suffix;
use crate::reconcilers::redis;
use crate::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use kube::ResourceExt;

/// Name shared by every child of the component, e.g. `demo-repo-server`.
#[must_use]
pub fn resource_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), COMPONENT_REPO_SERVER)
}

fn deployment<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    name: &str,
) -> Result<Deployment, BuildError> {
    let spec = &scope.instance.spec.repo;
    let mut args = vec![
        "uid_entrypoint.sh".to_string(),
        "argocd-repo-server".to_string(),
        "--redis".to_string(),
        format!("{}:{}", redis::endpoint_name(scope.instance), REDIS_PORT),
    ];
    if let Some(level) = &spec.log_level {
        args.push("--loglevel".to_string());
        args.push(level.clone());
    }

    DeploymentRequest {
        meta: scope.meta(name),
        replicas: spec.replicas.unwrap_or(DEFAULT_REPLICAS),
        pod: PodRequest {
            service_account_name: name.to_string(),
            containers: vec![ContainerRequest {
                name: COMPONENT_REPO_SERVER.to_string(),
                image: scope
                    .instance
                    .argocd_image(spec.image.as_deref(), spec.version.as_deref()),
                args,
                ports: vec![
                    ("server".to_string(), REPO_SERVER_PORT),
                    ("metrics".to_string(), REPO_SERVER_METRICS_PORT),
                ],
                resources: spec.resources.clone(),
                ..Default::default()
            }],
            ..Default::default()
        },
    }
    .build()
}

/// Repo server reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct RepoServerReconciler;

#[async_trait]
impl<S: ObjectStore> ComponentReconciler<S> for RepoServerReconciler {
    fn name(&self) -> &'static str {
        COMPONENT_REPO_SERVER
    }

    fn topology(&self, instance: &ArgoCD) -> Topology {
        Topology::new(instance.spec.repo.is_enabled(), false)
    }

    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef> {
        let name = resource_name(instance);
        vec![
            ChildRef::new(ChildKind::ServiceAccount, name.clone()),
            ChildRef::new(ChildKind::Deployment, name.clone()),
            ChildRef::new(ChildKind::Service, name),
        ]
    }

    async fn reconcile(&self, scope: &ComponentScope<'_, S>) -> Result<(), ReconcileError> {
        let name = resource_name(scope.instance);

        scope
            .converge::<ServiceAccount>(
                Variant::Any,
                &name,
                ServiceAccountRequest { meta: scope.meta(&name) }.build(),
                &[],
            )
            .await?;

        scope
            .converge::<Deployment>(Variant::Any, &name, deployment(scope, &name), &[])
            .await?;

        let toggles = scope.auto_tls(
            REPO_SERVER_TLS_SECRET,
            scope.instance.spec.repo.wants_auto_tls(),
        );
        scope
            .converge::<Service>(
                Variant::Any,
                &name,
                ServiceRequest {
                    meta: scope.meta(&name),
                    selector: selector_labels(&name),
                    ports: vec![
                        PortRequest::same("server", REPO_SERVER_PORT),
                        PortRequest::same("metrics", REPO_SERVER_METRICS_PORT),
                    ],
                    ..Default::default()
                }
                .build(),
                &toggles,
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "repo_server_tests.rs"]
mod repo_server_tests;
