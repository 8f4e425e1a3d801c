// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status computation for `ArgoCD` instances.
//!
//! Component results of a pass are collected in memory and written with a single patch
//! at the end of the pass. The patch is skipped when the computed status equals the one
//! already stored, so an idle pass writes nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut updater = ArgoCDStatusUpdater::new(&instance);
//! updater.set_component("repo-server", ComponentState::Converged.to_string());
//! updater.set_component("redis", STATE_FAILED.to_string());
//! updater.apply(&store).await?;
//! ```

use super::component::ComponentState;
use crate::constants::{
    COMPONENT_APPLICATIONSET, COMPONENT_APPLICATION_CONTROLLER, COMPONENT_GRAFANA,
    COMPONENT_REDIS, COMPONENT_REPO_SERVER, COMPONENT_SERVER, KIND_ARGOCD,
};
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::errors::{ReconcileError, StoreOperation};
use crate::store::ObjectStore;
use kube::ResourceExt;
use tracing::debug;

/// Component state reported when the component's pass returned an error
pub const STATE_FAILED: &str = "Failed";

/// Phase when every component is converged or disabled
pub const PHASE_AVAILABLE: &str = "Available";

/// Phase while any component is still converging, failed or being deleted
pub const PHASE_PENDING: &str = "Pending";

/// Collects the status of one pass and writes it in a single patch.
pub struct ArgoCDStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<ArgoCDStatus>,
    new_status: ArgoCDStatus,
}

impl ArgoCDStatusUpdater {
    /// Start from the instance's current status.
    #[must_use]
    pub fn new(instance: &ArgoCD) -> Self {
        let current_status = instance.status.clone();
        let mut new_status = current_status.clone().unwrap_or_default();
        new_status.observed_generation = instance.metadata.generation;

        Self {
            namespace: instance.namespace().unwrap_or_default(),
            name: instance.name_any(),
            current_status,
            new_status,
        }
    }

    /// Record the state of `component` (in-memory only, no API call).
    pub fn set_component(&mut self, component: &str, state: String) {
        let slot = match component {
            COMPONENT_APPLICATIONSET => &mut self.new_status.application_set_controller,
            COMPONENT_APPLICATION_CONTROLLER => &mut self.new_status.application_controller,
            COMPONENT_GRAFANA => &mut self.new_status.grafana,
            COMPONENT_REDIS => &mut self.new_status.redis,
            COMPONENT_REPO_SERVER => &mut self.new_status.repo,
            COMPONENT_SERVER => &mut self.new_status.server,
            other => {
                debug!(component = %other, "No status field for component");
                return;
            }
        };
        *slot = Some(state);
        self.new_status.phase = Some(phase(&self.new_status).to_string());
    }

    /// Record a component's state after a successful pass.
    pub fn set_state(&mut self, component: &str, state: ComponentState) {
        self.set_component(component, state.to_string());
    }

    /// Record that a component's pass failed.
    pub fn set_failed(&mut self, component: &str) {
        self.set_component(component, STATE_FAILED.to_string());
    }

    /// The status that would be written.
    #[must_use]
    pub fn status(&self) -> &ArgoCDStatus {
        &self.new_status
    }

    /// Whether the computed status differs from the stored one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.current_status.as_ref() != Some(&self.new_status)
    }

    /// Write the computed status if it changed (single API call).
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Store`] if the patch fails.
    pub async fn apply<S: ObjectStore>(
        &self,
        store: &S,
        instance: &ArgoCD,
    ) -> Result<bool, ReconcileError> {
        if !self.has_changes() {
            debug!(
                "ArgoCD {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(false);
        }

        store
            .patch_instance_status(instance, &self.new_status)
            .await
            .map_err(|source| ReconcileError::Store {
                operation: StoreOperation::Patch,
                kind: KIND_ARGOCD.to_string(),
                name: self.name.clone(),
                namespace: self.namespace.clone(),
                source,
            })?;

        debug!(
            "Updated ArgoCD {}/{} status: phase {}",
            self.namespace,
            self.name,
            self.new_status.phase.as_deref().unwrap_or_default()
        );
        Ok(true)
    }
}

/// Overall phase derived from the component states.
///
/// Components without a recorded state are ignored.
#[must_use]
pub fn phase(status: &ArgoCDStatus) -> &'static str {
    let settled = [
        &status.application_set_controller,
        &status.application_controller,
        &status.grafana,
        &status.redis,
        &status.repo,
        &status.server,
    ]
    .into_iter()
    .flatten()
    .all(|state| {
        state == &ComponentState::Converged.to_string()
            || state == &ComponentState::Disabled.to_string()
    });

    if settled {
        PHASE_AVAILABLE
    } else {
        PHASE_PENDING
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
