// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ApplicationSet controller component.
//!
//! Enabled only when `spec.applicationSet` is present. Every child shares one name,
//! unique per instance and namespace, so that cluster-scoped bindings of several
//! instances never collide.

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
    API_GROUP, APPLICATIONSET_METRICS_PORT, APPLICATIONSET_WEBHOOK_PORT, COMPONENT_APPLICATIONSET,
    DEFAULT_REPLICAS, REPO_SERVER_PORT,
};
use crate::crd::{ApplicationSetSpec, ArgoCD};
use crate::errors::{BuildError, ReconcileError};
use crate::naming::unique_resource_name;
use crate::reconcilers::repo_server;
use crate::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding};
use kube::ResourceExt;

/// Name shared by every child of the component.
#[must_use]
pub fn resource_name(instance: &ArgoCD) -> String {
    unique_resource_name(
        &instance.name_any(),
        &instance.namespace().unwrap_or_default(),
        COMPONENT_APPLICATIONSET,
    )
}

fn settings(instance: &ArgoCD) -> ApplicationSetSpec {
    instance.spec.application_set.clone().unwrap_or_default()
}

/// Permissions of the controller inside the instance namespace.
#[must_use]
pub fn policy_rules() -> Vec<PolicyRule> {
    vec![
        policy_rule(
            API_GROUP,
            &["applications", "applicationsets", "applicationsets/finalizers", "appprojects"],
            &["create", "delete", "get", "list", "patch", "update", "watch"],
        ),
        policy_rule(API_GROUP, &["applicationsets/status"], &["get", "patch", "update"]),
        policy_rule("", &["configmaps", "secrets"], &["get", "list", "watch"]),
        policy_rule("", &["events"], &["create", "get", "list", "patch", "watch"]),
        policy_rule("apps", &["deployments"], &["get", "list", "watch"]),
    ]
}

fn deployment<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    name: &str,
) -> Result<Deployment, BuildError> {
    let spec = settings(scope.instance);
    let repo_server = format!(
        "{}.{}.svc.cluster.local:{}",
        repo_server::resource_name(scope.instance),
        scope.namespace,
        REPO_SERVER_PORT
    );
    let mut args = vec![
        "entrypoint.sh".to_string(),
        "argocd-applicationset-controller".to_string(),
        "--argocd-repo-server".to_string(),
        repo_server,
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
                name: COMPONENT_APPLICATIONSET.to_string(),
                image: scope
                    .instance
                    .argocd_image(spec.image.as_deref(), spec.version.as_deref()),
                args,
                ports: vec![
                    ("webhook".to_string(), APPLICATIONSET_WEBHOOK_PORT),
                    ("metrics".to_string(), APPLICATIONSET_METRICS_PORT),
                ],
                env: vec![("NAMESPACE".to_string(), scope.namespace.clone())],
                resources: spec.resources.clone(),
                ..Default::default()
            }],
            ..Default::default()
        },
    }
    .build()
}

/// ApplicationSet controller reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplicationSetReconciler;

#[async_trait]
impl<S: ObjectStore> ComponentReconciler<S> for ApplicationSetReconciler {
    fn name(&self) -> &'static str {
        COMPONENT_APPLICATIONSET
    }

    fn topology(&self, instance: &ArgoCD) -> Topology {
        Topology::new(instance.spec.application_set.is_some(), false)
    }

    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef> {
        let name = resource_name(instance);
        vec![
            ChildRef::new(ChildKind::ServiceAccount, name.clone()),
            ChildRef::new(ChildKind::Role, name.clone()),
            ChildRef::new(ChildKind::RoleBinding, name.clone()),
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

        scope
            .converge::<Service>(
                Variant::Any,
                &name,
                ServiceRequest {
                    meta: scope.meta(&name),
                    selector: selector_labels(&name),
                    ports: vec![PortRequest::same("webhook", APPLICATIONSET_WEBHOOK_PORT)],
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
#[path = "applicationset_tests.rs"]
mod applicationset_tests;
