// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::builders::networking::{PortRequest, ServiceRequest};
    use crate::builders::permissions::ClusterRoleBindingRequest;
    use crate::builders::ResourceMeta;
    use crate::crd::{ArgoCD, ArgoCDSpec};
    use crate::errors::{BuildError, ReconcileError, StoreOperation};
    use crate::labels::SERVING_CERT_SECRET_ANNOTATION;
    use crate::reconcilers::converge::*;
    use crate::reconcilers::toggles::Toggle;
    use crate::store::{MemoryStore, ObjectStore};
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::api::rbac::v1::ClusterRoleBinding;

    fn owner(uid: Option<&str>) -> ArgoCD {
        let mut instance = ArgoCD::new("demo", ArgoCDSpec::default());
        instance.metadata.namespace = Some("ns1".to_string());
        instance.metadata.uid = uid.map(ToString::to_string);
        instance
    }

    fn desired(name: &str) -> Result<Service, BuildError> {
        ServiceRequest {
            meta: ResourceMeta::new(name, "ns1"),
            ports: vec![PortRequest::same("server", 8081)],
            ..Default::default()
        }
        .build()
    }

    fn annotation(service: &Service) -> Option<String> {
        service
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(SERVING_CERT_SECRET_ANNOTATION).cloned())
    }

    #[tokio::test]
    async fn test_creates_absent_resource_with_owner() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));

        let outcome = converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &[])
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Created);
        let created: Service = store.object("demo-repo-server", "ns1").unwrap();
        let refs = created.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "uid-owner");
    }

    #[tokio::test]
    async fn test_second_pass_writes_nothing() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));
        let toggles = [Toggle::auto_tls("argocd-repo-server-tls", true)];

        converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &toggles)
            .await
            .unwrap();
        store.clear_calls();

        let outcome = converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &toggles)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Unchanged);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_owner_reference_failure_does_not_block_create() {
        let store = MemoryStore::new();
        let owner = owner(None);

        let outcome = converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &[])
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Created);
        let created: Service = store.object("demo-repo-server", "ns1").unwrap();
        assert!(created.metadata.owner_references.is_none());
    }

    #[tokio::test]
    async fn test_unwanted_present_resource_is_deleted() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));
        store.insert(&desired("demo-redis").unwrap()).unwrap();

        let outcome = converge(&store, &owner, "demo-redis", "ns1", desired("demo-redis"), false, &[])
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Deleted);
        assert!(store.object::<Service>("demo-redis", "ns1").is_none());
    }

    #[tokio::test]
    async fn test_unwanted_absent_resource_is_left_alone() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));

        let outcome = converge(&store, &owner, "demo-redis", "ns1", desired("demo-redis"), false, &[])
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Absent);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_drift_is_repaired() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));
        let on = [Toggle::auto_tls("argocd-repo-server-tls", true)];

        converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &on)
            .await
            .unwrap();

        // Remove the annotation out of band
        let mut live: Service = store.object("demo-repo-server", "ns1").unwrap();
        live.metadata.annotations = None;
        store.update(&live).await.unwrap();

        let outcome = converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &on)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Updated);
        let healed: Service = store.object("demo-repo-server", "ns1").unwrap();
        assert_eq!(annotation(&healed).as_deref(), Some("argocd-repo-server-tls"));

        let off = [Toggle::auto_tls("argocd-repo-server-tls", false)];
        let outcome = converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &off)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Updated);
        let cleared: Service = store.object("demo-repo-server", "ns1").unwrap();
        assert_eq!(annotation(&cleared), None);
    }

    #[tokio::test]
    async fn test_build_error_is_returned_before_any_store_call() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));

        let err = converge::<_, Service>(
            &store,
            &owner,
            "demo-repo-server",
            "ns1",
            Err(BuildError::NoPorts {
                kind: "Service",
                name: "demo-repo-server".to_string(),
            }),
            true,
            &[],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ReconcileError::Build { .. }));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_names_the_operation() {
        let store = MemoryStore::new();
        let owner = owner(Some("uid-owner"));
        store.fail_on::<Service>(StoreOperation::Create, None);

        let err = converge(&store, &owner, "demo-repo-server", "ns1", desired("demo-repo-server"), true, &[])
            .await
            .unwrap_err();

        match err {
            ReconcileError::Store { operation, kind, name, .. } => {
                assert_eq!(operation, StoreOperation::Create);
                assert_eq!(kind, "Service");
                assert_eq!(name, "demo-repo-server");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_child_tolerates_absence() {
        let store = MemoryStore::new();

        let outcome = delete_child::<_, Service>(&store, "missing", "ns1").await.unwrap();

        assert_eq!(outcome, Outcome::Absent);
    }

    fn binding() -> Option<Result<ClusterRoleBinding, BuildError>> {
        Some(
            ClusterRoleBindingRequest {
                meta: ResourceMeta::new("demo-ns1-application-controller", "ns1"),
                cluster_role_name: "cluster-admin".to_string(),
                service_account_name: "demo-application-controller".to_string(),
            }
            .build(),
        )
    }

    #[tokio::test]
    async fn test_cluster_child_created_then_left_alone() {
        let store = MemoryStore::new();

        let outcome = converge_cluster(&store, "demo-ns1-application-controller", binding(), true, &[])
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Created);
        assert!(store
            .cluster_object::<ClusterRoleBinding>("demo-ns1-application-controller")
            .is_some());

        store.clear_calls();
        let outcome = converge_cluster(&store, "demo-ns1-application-controller", binding(), true, &[])
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_cluster_child_without_desired_object_is_deleted() {
        let store = MemoryStore::new();
        converge_cluster(&store, "demo-ns1-application-controller", binding(), true, &[])
            .await
            .unwrap();

        let outcome = converge_cluster::<_, ClusterRoleBinding>(
            &store,
            "demo-ns1-application-controller",
            None,
            true,
            &[],
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Deleted);
        assert!(store
            .cluster_object::<ClusterRoleBinding>("demo-ns1-application-controller")
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_cluster_child_tolerates_absence() {
        let store = MemoryStore::new();

        let existed = remove_cluster_child::<_, ClusterRoleBinding>(&store, "missing")
            .await
            .unwrap();

        assert!(!existed);
    }
}
