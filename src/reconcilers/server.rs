// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! API server component.
//!
//! Owns the server's identity, its namespace permissions, the deployment, the public
//! service (HTTP and HTTPS both forwarded to the container port) and a metrics service.
//! The public service requests a serving certificate when a re-encrypting route sits in
//! front of it.

use super::component::{ChildKind, ChildRef, ComponentReconciler, ComponentScope};
use super::topology::{Topology, Variant};
use crate::builders::networking::{PortRequest, ServiceRequest};
use crate::builders::permissions::{
    policy_rule, RoleBindingRequest, RoleRequest, ServiceAccountRequest,
};
use crate::builders::workloads::{
    selector_labels, ContainerRequest, DeploymentRequest, PodRequest,
};
use crate::constants::{
    API_GROUP, COMPONENT_SERVER, DEFAULT_REPLICAS, REDIS_PORT, REPO_SERVER_PORT,
    SERVER_CONTAINER_PORT, SERVER_METRICS_PORT, SERVER_TLS_SECRET, SUFFIX_SERVER_METRICS,
};
use crate::crd::ArgoCD;
use crate::errors::{BuildError, ReconcileError};
use crate::naming::name_with_suffix;
use crate::reconcilers::{redis, repo_server};
use crate::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding};
use kube::ResourceExt;

/// Name of the server's identity, workload and public service, e.g. `demo-server`.
#[must_use]
pub fn resource_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), COMPONENT_SERVER)
}

/// Name of the metrics service, e.g. `demo-server-metrics`.
#[must_use]
pub fn metrics_service_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_SERVER_METRICS)
}

/// Permissions of the API server inside the instance namespace.
#[must_use]
pub fn policy_rules() -> Vec<PolicyRule> {
    vec![
        policy_rule(
            API_GROUP,
            &["applications", "applicationsets", "appprojects"],
            &["create", "delete", "get", "list", "patch", "update", "watch"],
        ),
        policy_rule(
            "",
            &["configmaps", "secrets"],
            &["create", "delete", "get", "list", "patch", "update", "watch"],
        ),
        policy_rule("", &["events"], &["create", "list"]),
        policy_rule("", &["pods", "pods/log"], &["get"]),
    ]
}

fn deployment<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    name: &str,
) -> Result<Deployment, BuildError> {
    let spec = &scope.instance.spec.server;
    let mut args = vec![
        "argocd-server".to_string(),
        "--staticassets".to_string(),
        "/shared/app".to_string(),
        "--dex-server".to_string(),
        "https://localhost:5556".to_string(),
        "--repo-server".to_string(),
        format!("{}:{}", repo_server::resource_name(scope.instance), REPO_SERVER_PORT),
        "--redis".to_string(),
        format!("{}:{}", redis::endpoint_name(scope.instance), REDIS_PORT),
    ];
    if spec.insecure {
        args.push("--insecure".to_string());
    }
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
                name: COMPONENT_SERVER.to_string(),
                image: scope
                    .instance
                    .argocd_image(spec.image.as_deref(), spec.version.as_deref()),
                args,
                ports: vec![
                    ("server".to_string(), SERVER_CONTAINER_PORT),
                    ("metrics".to_string(), SERVER_METRICS_PORT),
                ],
                resources: spec.resources.clone(),
                ..Default::default()
            }],
            ..Default::default()
        },
    }
    .build()
}

/// API server reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerReconciler;

#[async_trait]
impl<S: ObjectStore> ComponentReconciler<S> for ServerReconciler {
    fn name(&self) -> &'static str {
        COMPONENT_SERVER
    }

    fn topology(&self, instance: &ArgoCD) -> Topology {
        Topology::new(instance.spec.server.is_enabled(), false)
    }

    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef> {
        let name = resource_name(instance);
        vec![
            ChildRef::new(ChildKind::ServiceAccount, name.clone()),
            ChildRef::new(ChildKind::Role, name.clone()),
            ChildRef::new(ChildKind::RoleBinding, name.clone()),
            ChildRef::new(ChildKind::Deployment, name.clone()),
            ChildRef::new(ChildKind::Service, name),
            ChildRef::new(ChildKind::Service, metrics_service_name(instance)),
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
            .converge::<Role>(
                Variant::Any,
                &name,
                RoleRequest {
                    meta: scope.meta(&name),
                    rules: policy_rules(),
                }
                .build(),
                &[],
            )
            .await?;

        scope
            .converge::<RoleBinding>(
                Variant::Any,
                &name,
                RoleBindingRequest {
                    meta: scope.meta(&name),
                    role_name: name.clone(),
                    service_account_name: name.clone(),
                }
                .build(),
                &[],
            )
            .await?;

        scope
            .converge::<Deployment>(Variant::Any, &name, deployment(scope, &name), &[])
            .await?;

        let toggles = scope.auto_tls(SERVER_TLS_SECRET, scope.instance.spec.server.wants_auto_tls());
        scope
            .converge::<Service>(
                Variant::Any,
                &name,
                ServiceRequest {
                    meta: scope.meta(&name),
                    selector: selector_labels(&name),
                    ports: vec![
                        PortRequest::forward("http", 80, SERVER_CONTAINER_PORT),
                        PortRequest::forward("https", 443, SERVER_CONTAINER_PORT),
                    ],
                    service_type: scope.instance.spec.server.service.type_.clone(),
                    ..Default::default()
                }
                .build(),
                &toggles,
            )
            .await?;

        let metrics_name = metrics_service_name(scope.instance);
        scope
            .converge::<Service>(
                Variant::Any,
                &metrics_name,
                ServiceRequest {
                    meta: scope.meta(&metrics_name),
                    selector: selector_labels(&name),
                    ports: vec![PortRequest::same("metrics", SERVER_METRICS_PORT)],
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
#[path = "server_tests.rs"]
mod server_tests;
