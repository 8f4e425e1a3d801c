// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{ArgoCD, ArgoCDSpec, ArgoCDStatus};
    use crate::reconcilers::component::ComponentState;
    use crate::reconcilers::status::*;
    use crate::store::MemoryStore;

    fn stored_instance(store: &MemoryStore) -> ArgoCD {
        let mut instance = ArgoCD::new("demo", ArgoCDSpec::default());
        instance.metadata.namespace = Some("ns1".to_string());
        instance.metadata.generation = Some(4);
        store.insert(&instance).unwrap()
    }

    #[test]
    fn test_phase_available_when_settled() {
        let status = ArgoCDStatus {
            repo: Some("Converged".into()),
            redis: Some("Converged".into()),
            application_set_controller: Some("Disabled".into()),
            ..Default::default()
        };
        assert_eq!(phase(&status), PHASE_AVAILABLE);
    }

    #[test]
    fn test_phase_pending_while_converging_or_failed() {
        let converging = ArgoCDStatus {
            repo: Some("Converging".into()),
            ..Default::default()
        };
        assert_eq!(phase(&converging), PHASE_PENDING);

        let failed = ArgoCDStatus {
            server: Some(STATE_FAILED.into()),
            ..Default::default()
        };
        assert_eq!(phase(&failed), PHASE_PENDING);
    }

    #[test]
    fn test_updater_sets_component_fields() {
        let store = MemoryStore::new();
        let instance = stored_instance(&store);
        let mut updater = ArgoCDStatusUpdater::new(&instance);

        updater.set_state("repo-server", ComponentState::Converged);
        updater.set_state("applicationset-controller", ComponentState::Disabled);
        updater.set_failed("redis");
        updater.set_state("server", ComponentState::Converging);

        let status = updater.status();
        assert_eq!(status.repo.as_deref(), Some("Converged"));
        assert_eq!(status.application_set_controller.as_deref(), Some("Disabled"));
        assert_eq!(status.redis.as_deref(), Some("Failed"));
        assert_eq!(status.server.as_deref(), Some("Converging"));
        assert_eq!(status.phase.as_deref(), Some(PHASE_PENDING));
        assert_eq!(status.observed_generation, Some(4));
    }

    #[tokio::test]
    async fn test_apply_skips_unchanged_status() {
        let store = MemoryStore::new();
        let instance = stored_instance(&store);

        let mut updater = ArgoCDStatusUpdater::new(&instance);
        updater.set_state("repo-server", ComponentState::Converged);
        assert!(updater.apply(&store, &instance).await.unwrap());

        let refreshed = store.object::<ArgoCD>("demo", "ns1").unwrap();
        assert_eq!(
            refreshed.status.as_ref().and_then(|s| s.phase.as_deref()),
            Some(PHASE_AVAILABLE)
        );

        store.clear_calls();
        let mut again = ArgoCDStatusUpdater::new(&refreshed);
        again.set_state("repo-server", ComponentState::Converged);
        assert!(!again.has_changes());
        assert!(!again.apply(&store, &refreshed).await.unwrap());
        assert!(store.writes().is_empty());
    }
}
