// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Identity and permission objects: service accounts, roles, role bindings and
//! cluster role bindings.

use super::ResourceMeta;
use crate::errors::BuildError;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Request for a `ServiceAccount`.
#[derive(Clone, Debug, Default)]
pub struct ServiceAccountRequest {
    pub meta: ResourceMeta,
}

impl ServiceAccountRequest {
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty.
    pub fn build(&self) -> Result<ServiceAccount, BuildError> {
        self.meta.validate("ServiceAccount")?;
        Ok(ServiceAccount {
            metadata: self.meta.object_meta(),
            ..Default::default()
        })
    }
}

/// Request for a namespaced `Role`.
#[derive(Clone, Debug, Default)]
pub struct RoleRequest {
    pub meta: ResourceMeta,
    pub rules: Vec<PolicyRule>,
}

impl RoleRequest {
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty.
    pub fn build(&self) -> Result<Role, BuildError> {
        self.meta.validate("Role")?;
        Ok(Role {
            metadata: self.meta.object_meta(),
            rules: Some(self.rules.clone()),
        })
    }
}

/// Request for a `RoleBinding` granting a role to a service account of the same namespace.
#[derive(Clone, Debug, Default)]
pub struct RoleBindingRequest {
    pub meta: ResourceMeta,
    pub role_name: String,
    pub service_account_name: String,
}

impl RoleBindingRequest {
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty, or if the role or
    /// service account name is empty.
    pub fn build(&self) -> Result<RoleBinding, BuildError> {
        self.meta.validate("RoleBinding")?;
        if self.role_name.is_empty() || self.service_account_name.is_empty() {
            return Err(BuildError::MissingName { kind: "RoleBinding" });
        }

        Ok(RoleBinding {
            metadata: self.meta.object_meta(),
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: "Role".to_string(),
                name: self.role_name.clone(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: self.service_account_name.clone(),
                namespace: Some(self.meta.namespace.clone()),
                ..Default::default()
            }]),
        })
    }
}

/// Request for a `ClusterRoleBinding` granting a cluster role to a service account.
///
/// The binding itself is cluster-scoped; `meta.namespace` is the namespace of the
/// service account it binds.
#[derive(Clone, Debug, Default)]
pub struct ClusterRoleBindingRequest {
    pub meta: ResourceMeta,
    pub cluster_role_name: String,
    pub service_account_name: String,
}

impl ClusterRoleBindingRequest {
    /// # Errors
    ///
    /// Returns an error if the name, the service account namespace, the cluster role or
    /// the service account name is empty.
    pub fn build(&self) -> Result<ClusterRoleBinding, BuildError> {
        self.meta.validate("ClusterRoleBinding")?;
        if self.cluster_role_name.is_empty() || self.service_account_name.is_empty() {
            return Err(BuildError::MissingName {
                kind: "ClusterRoleBinding",
            });
        }

        let mut metadata = self.meta.object_meta();
        metadata.namespace = None;

        Ok(ClusterRoleBinding {
            metadata,
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: "ClusterRole".to_string(),
                name: self.cluster_role_name.clone(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: self.service_account_name.clone(),
                namespace: Some(self.meta.namespace.clone()),
                ..Default::default()
            }]),
        })
    }
}

/// Shorthand for a policy rule over one API group.
#[must_use]
pub fn policy_rule(api_group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![api_group.to_string()]),
        resources: Some(resources.iter().map(ToString::to_string).collect()),
        verbs: verbs.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod permissions_tests;
