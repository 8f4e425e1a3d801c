// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `ArgoCD` controller.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - the object store all reconcilers read and write through
//! - the operator configuration (deadlines and requeue intervals)
//! - whether auto-TLS annotations are managed on this cluster
//!
//! The context also wraps each pass with its deadline and the pass-level metrics, so
//! `main` only maps the result onto the controller.

use crate::config::OperatorConfig;
use crate::constants::KIND_ARGOCD;
use crate::crd::ArgoCD;
use crate::errors::ReconcileError;
use crate::metrics;
use crate::reconcilers::reconcile_argocd;
use crate::store::{KubeStore, ObjectStore};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Shared context passed to the controller.
pub struct Context<S = KubeStore> {
    /// Store for all API operations
    pub store: S,

    /// Operator configuration
    pub config: OperatorConfig,

    /// Whether auto-TLS annotations are kept in sync on services
    pub auto_tls_managed: bool,
}

impl<S: ObjectStore> Context<S> {
    #[must_use]
    pub fn new(store: S, config: OperatorConfig, auto_tls_managed: bool) -> Self {
        Self {
            store,
            config,
            auto_tls_managed,
        }
    }

    /// Run one reconciliation pass for `instance` under the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns the pass error, or [`ReconcileError::Timeout`] when the deadline expired.
    pub async fn reconcile(&self, instance: &ArgoCD) -> Result<Action, ReconcileError> {
        let start = Instant::now();
        let result = with_deadline(
            self.config.reconcile_timeout(),
            instance,
            reconcile_argocd(&self.store, instance, self.auto_tls_managed),
        )
        .await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => {
                debug!(
                    namespace = ?instance.namespace(),
                    name = %instance.name_any(),
                    elapsed_ms = elapsed.as_millis(),
                    "Reconciliation pass finished"
                );
                metrics::record_reconciliation_success(KIND_ARGOCD, elapsed);
            }
            Err(e @ ReconcileError::Timeout { .. }) => {
                error!("{}", e);
                metrics::record_error(KIND_ARGOCD, e.category());
                metrics::record_reconciliation_timeout(KIND_ARGOCD, elapsed);
            }
            Err(_) => metrics::record_reconciliation_error(KIND_ARGOCD, elapsed),
        }

        result.map(|()| Action::requeue(self.config.requeue_interval()))
    }

    /// Requeue action after a failed pass.
    #[must_use]
    pub fn error_action(&self, _error: &ReconcileError) -> Action {
        Action::requeue(self.config.error_requeue_interval())
    }
}

/// Await `pass`, abandoning it once `deadline` has elapsed.
///
/// Dropping the pass future cancels whatever step it was waiting on; the next pass
/// starts again from the first step.
///
/// # Errors
///
/// Returns the error of `pass`, or [`ReconcileError::Timeout`] on expiry.
pub async fn with_deadline<F>(
    deadline: Duration,
    instance: &ArgoCD,
    pass: F,
) -> Result<(), ReconcileError>
where
    F: Future<Output = Result<(), ReconcileError>>,
{
    tokio::time::timeout(deadline, pass)
        .await
        .map_err(|_| ReconcileError::Timeout {
            name: instance.name_any(),
            namespace: instance.namespace().unwrap_or_default(),
            seconds: deadline.as_secs(),
        })?
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
