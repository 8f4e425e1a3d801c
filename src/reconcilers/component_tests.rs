// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{ArgoCD, ArgoCDSpec};
    use crate::errors::{ReconcileError, StoreOperation};
    use crate::reconcilers::component::*;
    use crate::reconcilers::converge::Outcome;
    use crate::reconcilers::repo_server::RepoServerReconciler;
    use crate::reconcilers::topology::{Topology, Variant};
    use crate::store::{MemoryStore, ObjectStore};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{Service, ServiceAccount};

    fn instance() -> ArgoCD {
        let mut instance = ArgoCD::new("demo", ArgoCDSpec::default());
        instance.metadata.namespace = Some("ns1".to_string());
        instance.metadata.uid = Some("uid-demo".to_string());
        instance
    }

    fn deleted_instance() -> ArgoCD {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "argoproj.io/v1beta1",
            "kind": "ArgoCD",
            "metadata": {
                "name": "demo",
                "namespace": "ns1",
                "deletionTimestamp": "2025-01-01T00:00:00Z"
            },
            "spec": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_scope_threads_names_and_labels() {
        let store = MemoryStore::new();
        let instance = instance();
        let scope = ComponentScope::new(
            &store,
            &instance,
            "repo-server",
            Topology::Standalone,
            PassSettings::default(),
        );

        assert_eq!(scope.instance_name, "demo");
        assert_eq!(scope.namespace, "ns1");
        let meta = scope.meta("demo-repo-server");
        assert_eq!(meta.labels["app.kubernetes.io/component"], "repo-server");
        assert_eq!(meta.labels["app.kubernetes.io/instance"], "demo");
        assert_eq!(meta.annotations["argocds.argoproj.io/namespace"], "ns1");
    }

    #[test]
    fn test_scope_wants_nothing_while_namespace_terminates() {
        let store = MemoryStore::new();
        let instance = instance();
        let scope = ComponentScope::new(
            &store,
            &instance,
            "redis",
            Topology::HighAvailability,
            PassSettings {
                namespace_terminating: true,
                auto_tls_managed: false,
            },
        );

        assert!(!scope.wants(Variant::Any));
        assert!(!scope.wants(Variant::HighAvailability));
        assert_eq!(scope.state(), ComponentState::DeletionPending);
    }

    #[test]
    fn test_auto_tls_toggles_only_when_managed() {
        let store = MemoryStore::new();
        let instance = instance();
        let unmanaged = ComponentScope::new(
            &store,
            &instance,
            "server",
            Topology::Standalone,
            PassSettings::default(),
        );
        assert!(unmanaged.auto_tls("argocd-server-tls", true).is_empty());

        let managed = ComponentScope::new(
            &store,
            &instance,
            "server",
            Topology::Standalone,
            PassSettings {
                namespace_terminating: false,
                auto_tls_managed: true,
            },
        );
        let toggles = managed.auto_tls("argocd-server-tls", false);
        assert_eq!(toggles.len(), 1);
        assert!(!toggles[0].enabled);
    }

    #[test]
    fn test_state_transitions() {
        let store = MemoryStore::new();
        let instance = instance();

        let disabled = ComponentScope::new(&store, &instance, "server", Topology::Disabled, PassSettings::default());
        assert_eq!(disabled.state(), ComponentState::Disabled);

        let scope = ComponentScope::new(&store, &instance, "server", Topology::Standalone, PassSettings::default());
        assert_eq!(scope.state(), ComponentState::Converged);
        scope.record(Outcome::Unchanged);
        assert_eq!(scope.state(), ComponentState::Converged);
        scope.record(Outcome::Created);
        assert_eq!(scope.writes(), 1);
        assert_eq!(scope.state(), ComponentState::Converging);

        let deleted = deleted_instance();
        let deleting = ComponentScope::new(&store, &deleted, "server", Topology::Standalone, PassSettings::default());
        assert_eq!(deleting.state(), ComponentState::DeletionPending);
    }

    #[tokio::test]
    async fn test_delete_resources_tolerates_absent_children() {
        let store = MemoryStore::new();

        ComponentReconciler::<MemoryStore>::delete_resources(&RepoServerReconciler, &store, &instance())
            .await
            .unwrap();

        let deletes = store
            .calls()
            .into_iter()
            .filter(|c| c.operation == StoreOperation::Delete)
            .map(|c| c.kind)
            .collect::<Vec<_>>();
        assert_eq!(deletes, vec!["Service", "Deployment", "ServiceAccount"]);
    }

    #[tokio::test]
    async fn test_delete_resources_aggregates_only_failures() {
        let store = MemoryStore::new();
        let instance = instance();
        let reconciler = RepoServerReconciler;
        let scope = ComponentScope::new(&store, &instance, "repo-server", Topology::Standalone, PassSettings::default());
        reconciler.reconcile(&scope).await.unwrap();
        store.fail_on::<Deployment>(StoreOperation::Delete, None);

        let err = ComponentReconciler::<MemoryStore>::delete_resources(&reconciler, &store, &instance)
            .await
            .unwrap_err();

        let ReconcileError::Teardown(teardown) = err else {
            panic!("expected a teardown error");
        };
        assert_eq!(teardown.component, "repo-server");
        assert_eq!(teardown.failures.len(), 1);
        assert_eq!(teardown.failures[0].kind, "Deployment");
        assert_eq!(teardown.failures[0].name, "demo-repo-server");
        assert!(store.object::<Service>("demo-repo-server", "ns1").is_none());
        assert!(store.object::<ServiceAccount>("demo-repo-server", "ns1").is_none());
        assert!(store.object::<Deployment>("demo-repo-server", "ns1").is_some());
        assert!(!teardown.to_string().contains("ServiceAccount"));
    }

    #[tokio::test]
    async fn test_delete_resources_is_idempotent() {
        let store = MemoryStore::new();
        let instance = instance();
        let reconciler = RepoServerReconciler;
        let scope = ComponentScope::new(&store, &instance, "repo-server", Topology::Standalone, PassSettings::default());
        reconciler.reconcile(&scope).await.unwrap();

        ComponentReconciler::<MemoryStore>::delete_resources(&reconciler, &store, &instance)
            .await
            .unwrap();
        store.clear_calls();
        ComponentReconciler::<MemoryStore>::delete_resources(&reconciler, &store, &instance)
            .await
            .unwrap();

        // Deletes of absent objects are attempted but change nothing
        assert!(store.names::<Service>("ns1").is_empty());
        assert!(store.object::<ServiceAccount>("demo-repo-server", "ns1").is_none());
    }

    #[test]
    fn test_child_ref_new() {
        let child = ChildRef::new(ChildKind::Service, "demo-server");
        assert_eq!(child.kind, ChildKind::Service);
        assert_eq!(child.name, "demo-server");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ComponentState::DeletionPending.to_string(), "DeletionPending");
        assert_eq!(ComponentState::Converged.to_string(), "Converged");
    }

    #[tokio::test]
    async fn test_scope_converge_counts_writes() {
        let store = MemoryStore::new();
        let instance = instance();
        let scope = ComponentScope::new(&store, &instance, "repo-server", Topology::Standalone, PassSettings::default());

        let outcome = scope
            .converge::<ServiceAccount>(
                Variant::Standalone,
                "demo-repo-server",
                crate::builders::permissions::ServiceAccountRequest {
                    meta: scope.meta("demo-repo-server"),
                }
                .build(),
                &[],
            )
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Created);
        assert_eq!(scope.writes(), 1);
        let stored: Option<ServiceAccount> = store.get("demo-repo-server", "ns1").await.unwrap();
        assert!(stored.is_some());
    }
}
