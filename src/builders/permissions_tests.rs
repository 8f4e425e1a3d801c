// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::builders::permissions::*;
    use crate::builders::ResourceMeta;
    use crate::errors::BuildError;

    #[test]
    fn test_build_service_account() {
        let sa = ServiceAccountRequest {
            meta: ResourceMeta::new("demo-redis", "ns1"),
        }
        .build()
        .unwrap();

        assert_eq!(sa.metadata.name.as_deref(), Some("demo-redis"));
        assert_eq!(sa.metadata.namespace.as_deref(), Some("ns1"));
    }

    #[test]
    fn test_build_role_copies_rules() {
        let role = RoleRequest {
            meta: ResourceMeta::new("demo-server", "ns1"),
            rules: vec![policy_rule("", &["secrets", "configmaps"], &["get", "list"])],
        }
        .build()
        .unwrap();

        let rules = role.rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].api_groups, Some(vec![String::new()]));
        assert_eq!(
            rules[0].resources,
            Some(vec!["secrets".to_string(), "configmaps".to_string()])
        );
        assert_eq!(rules[0].verbs, vec!["get", "list"]);
    }

    #[test]
    fn test_build_role_binding_targets_service_account() {
        let binding = RoleBindingRequest {
            meta: ResourceMeta::new("demo-server", "ns1"),
            role_name: "demo-server".to_string(),
            service_account_name: "demo-argocd-server".to_string(),
        }
        .build()
        .unwrap();

        assert_eq!(binding.role_ref.kind, "Role");
        assert_eq!(binding.role_ref.name, "demo-server");
        assert_eq!(binding.role_ref.api_group, "rbac.authorization.k8s.io");
        let subjects = binding.subjects.unwrap();
        assert_eq!(subjects[0].kind, "ServiceAccount");
        assert_eq!(subjects[0].name, "demo-argocd-server");
        assert_eq!(subjects[0].namespace.as_deref(), Some("ns1"));
    }

    #[test]
    fn test_build_role_binding_requires_role_name() {
        let result = RoleBindingRequest {
            meta: ResourceMeta::new("demo-server", "ns1"),
            role_name: String::new(),
            service_account_name: "demo-argocd-server".to_string(),
        }
        .build();

        assert_eq!(result.unwrap_err(), BuildError::MissingName { kind: "RoleBinding" });
    }

    #[test]
    fn test_build_cluster_role_binding_is_cluster_scoped() {
        let binding = ClusterRoleBindingRequest {
            meta: ResourceMeta::new("demo-ns1-application-controller", "ns1"),
            cluster_role_name: "cluster-admin".to_string(),
            service_account_name: "demo-application-controller".to_string(),
        }
        .build()
        .unwrap();

        assert_eq!(
            binding.metadata.name.as_deref(),
            Some("demo-ns1-application-controller")
        );
        assert_eq!(binding.metadata.namespace, None);
        assert_eq!(binding.role_ref.kind, "ClusterRole");
        assert_eq!(binding.role_ref.name, "cluster-admin");
        let subjects = binding.subjects.unwrap();
        assert_eq!(subjects[0].name, "demo-application-controller");
        assert_eq!(subjects[0].namespace.as_deref(), Some("ns1"));
    }

    #[test]
    fn test_build_cluster_role_binding_requires_subject_namespace() {
        let result = ClusterRoleBindingRequest {
            meta: ResourceMeta::new("demo-ns1-application-controller", ""),
            cluster_role_name: "cluster-admin".to_string(),
            service_account_name: "demo-application-controller".to_string(),
        }
        .build();

        assert!(matches!(result, Err(BuildError::MissingNamespace { .. })));

        let result = ClusterRoleBindingRequest {
            meta: ResourceMeta::new("demo-ns1-application-controller", "ns1"),
            cluster_role_name: String::new(),
            service_account_name: "demo-application-controller".to_string(),
        }
        .build();

        assert_eq!(
            result.unwrap_err(),
            BuildError::MissingName {
                kind: "ClusterRoleBinding"
            }
        );
    }
}
