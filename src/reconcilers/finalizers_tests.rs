// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::constants::FINALIZER_ARGOCD;
    use crate::crd::{ArgoCD, ArgoCDSpec};
    use crate::errors::{ReconcileError, StoreOperation};
    use crate::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
    use crate::store::MemoryStore;

    const TEST_NAMESPACE: &str = "test-namespace";
    const TEST_NAME: &str = "test-argocd";

    /// Helper to create a stored test instance
    fn create_test_instance(store: &MemoryStore, finalizers: &[&str]) -> ArgoCD {
        let mut instance = ArgoCD::new(TEST_NAME, ArgoCDSpec::default());
        instance.metadata.namespace = Some(TEST_NAMESPACE.to_string());
        if !finalizers.is_empty() {
            instance.metadata.finalizers =
                Some(finalizers.iter().map(ToString::to_string).collect());
        }
        store.insert(&instance).unwrap()
    }

    fn stored_finalizers(store: &MemoryStore) -> Vec<String> {
        store
            .object::<ArgoCD>(TEST_NAME, TEST_NAMESPACE)
            .unwrap()
            .metadata
            .finalizers
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_ensure_finalizer_adds_once() {
        let store = MemoryStore::new();
        let instance = create_test_instance(&store, &[]);

        assert!(ensure_finalizer(&store, &instance, FINALIZER_ARGOCD).await.unwrap());
        assert_eq!(stored_finalizers(&store), vec![FINALIZER_ARGOCD]);

        let updated = store.object::<ArgoCD>(TEST_NAME, TEST_NAMESPACE).unwrap();
        store.clear_calls();
        assert!(!ensure_finalizer(&store, &updated, FINALIZER_ARGOCD).await.unwrap());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_finalizer_keeps_foreign_finalizers() {
        let store = MemoryStore::new();
        let instance = create_test_instance(&store, &["example.com/other"]);

        ensure_finalizer(&store, &instance, FINALIZER_ARGOCD).await.unwrap();

        assert_eq!(
            stored_finalizers(&store),
            vec!["example.com/other", FINALIZER_ARGOCD]
        );
    }

    #[tokio::test]
    async fn test_remove_finalizer() {
        let store = MemoryStore::new();
        let instance = create_test_instance(&store, &["example.com/other", FINALIZER_ARGOCD]);

        assert!(remove_finalizer(&store, &instance, FINALIZER_ARGOCD).await.unwrap());
        assert_eq!(stored_finalizers(&store), vec!["example.com/other"]);
    }

    #[tokio::test]
    async fn test_remove_absent_finalizer_is_noop() {
        let store = MemoryStore::new();
        let instance = create_test_instance(&store, &[]);

        assert!(!remove_finalizer(&store, &instance, FINALIZER_ARGOCD).await.unwrap());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_patch_failure_is_reported() {
        let store = MemoryStore::new();
        let instance = create_test_instance(&store, &[]);
        store.fail_on::<ArgoCD>(StoreOperation::Patch, None);

        let err = ensure_finalizer(&store, &instance, FINALIZER_ARGOCD)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Store {
                operation: StoreOperation::Patch,
                ..
            }
        ));
    }
}
