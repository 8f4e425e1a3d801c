// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{ArgoCD, ArgoCDSpec, ArgoCDStatus};
    use crate::errors::{StoreError, StoreOperation};
    use crate::store::{MemoryStore, ObjectStore};
    use k8s_openapi::api::core::v1::{ConfigMap, Service};
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(name: &str, labels: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns1".to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();

        let created = store.create(&config_map("a", &[])).await.unwrap();
        let fetched: Option<ConfigMap> = store.get("a", "ns1").await.unwrap();

        assert!(created.metadata.resource_version.is_some());
        assert!(created.metadata.uid.is_some());
        assert_eq!(fetched.unwrap().metadata.resource_version, created.metadata.resource_version);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        let fetched: Option<ConfigMap> = store.get("missing", "ns1").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let store = MemoryStore::new();
        store.create(&config_map("a", &[])).await.unwrap();

        let service: Option<Service> = store.get("a", "ns1").await.unwrap();
        assert!(service.is_none());
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let store = MemoryStore::new();
        store.create(&config_map("a", &[])).await.unwrap();

        let err = store.create(&config_map("a", &[])).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let store = MemoryStore::new();
        let first = store.create(&config_map("a", &[])).await.unwrap();
        let second = store.update(&first).await.unwrap();
        assert_ne!(first.metadata.resource_version, second.metadata.resource_version);

        let err = store.update(&first).await.unwrap_err();
        assert!(err.is_conflict(), "stale resourceVersion must conflict, got {err}");
    }

    #[tokio::test]
    async fn test_update_keeps_uid() {
        let store = MemoryStore::new();
        let created = store.create(&config_map("a", &[])).await.unwrap();
        let mut changed = created.clone();
        changed.metadata.uid = None;

        let updated = store.update(&changed).await.unwrap();
        assert_eq!(updated.metadata.uid, created.metadata.uid);
    }

    #[tokio::test]
    async fn test_delete_missing_returns_false() {
        let store = MemoryStore::new();
        store.create(&config_map("a", &[])).await.unwrap();

        assert!(store.delete::<ConfigMap>("a", "ns1").await.unwrap());
        assert!(!store.delete::<ConfigMap>("a", "ns1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_by_selector() {
        let store = MemoryStore::new();
        store.create(&config_map("a", &[("app", "x"), ("tier", "1")])).await.unwrap();
        store.create(&config_map("b", &[("app", "x")])).await.unwrap();
        store.create(&config_map("c", &[("app", "y")])).await.unwrap();

        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "x".to_string());
        let listed: Vec<ConfigMap> = store.list("ns1", &selector).await.unwrap();

        let mut names: Vec<_> = listed.into_iter().filter_map(|c| c.metadata.name).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_injected_failure_only_hits_named_object() {
        let store = MemoryStore::new();
        store.create(&config_map("a", &[])).await.unwrap();
        store.create(&config_map("b", &[])).await.unwrap();
        store.fail_on::<ConfigMap>(StoreOperation::Delete, Some("a"));

        assert!(store.delete::<ConfigMap>("a", "ns1").await.is_err());
        assert!(store.delete::<ConfigMap>("b", "ns1").await.unwrap());

        store.clear_failures();
        assert!(store.delete::<ConfigMap>("a", "ns1").await.unwrap());
    }

    #[tokio::test]
    async fn test_writes_exclude_reads() {
        let store = MemoryStore::new();
        store.create(&config_map("a", &[])).await.unwrap();
        let _: Option<ConfigMap> = store.get("a", "ns1").await.unwrap();
        let _: Vec<ConfigMap> = store.list("ns1", &BTreeMap::new()).await.unwrap();

        assert_eq!(store.calls().len(), 3);
        assert_eq!(store.writes().len(), 1);

        store.clear_calls();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_instance_patches() {
        let store = MemoryStore::new();
        let mut instance = ArgoCD::new("demo", ArgoCDSpec::default());
        instance.metadata.namespace = Some("ns1".to_string());
        let instance = store.insert(&instance).unwrap();

        store
            .set_instance_finalizers(&instance, vec!["argoproj.io/finalizer".to_string()])
            .await
            .unwrap();
        let status = ArgoCDStatus {
            phase: Some("Available".to_string()),
            ..Default::default()
        };
        store.patch_instance_status(&instance, &status).await.unwrap();

        let stored: ArgoCD = store.object("demo", "ns1").unwrap();
        assert!(stored.has_deletion_finalizer());
        assert_eq!(stored.status, Some(status));
    }

    #[tokio::test]
    async fn test_namespace_terminating() {
        let store = MemoryStore::new();
        assert!(!store.namespace_terminating("ns1").await.unwrap());

        store.mark_namespace_terminating("ns1");
        assert!(store.namespace_terminating("ns1").await.unwrap());
        assert!(!store.namespace_terminating("ns2").await.unwrap());
    }
}
