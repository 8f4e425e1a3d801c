// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instance-level reconciliation of `ArgoCD` resources.
//!
//! One pass over an instance:
//!
//! 1. A deleted instance is torn down: every component deletes its children and the
//!    finalizer is removed once all of them succeeded.
//! 2. Otherwise the finalizer is added and the namespace is checked once for a deletion
//!    marker. A terminating namespace turns every converge step into a delete.
//! 3. The components run in a fixed order. They are independent: a failing component
//!    is recorded as `Failed` and the next one still runs.
//! 4. The status is written if it changed, then the first component error is returned.

use super::application_controller::ApplicationControllerReconciler;
use super::applicationset::ApplicationSetReconciler;
use super::component::{ComponentReconciler, ComponentScope, PassSettings};
use super::finalizers::{ensure_finalizer, remove_finalizer};
use super::grafana::GrafanaReconciler;
use super::redis::RedisReconciler;
use super::repo_server::RepoServerReconciler;
use super::server::ServerReconciler;
use super::status::ArgoCDStatusUpdater;
use crate::constants::{FINALIZER_ARGOCD, KIND_ARGOCD};
use crate::crd::ArgoCD;
use crate::errors::{ReconcileError, StoreOperation};
use crate::metrics;
use crate::store::ObjectStore;
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

/// Every component of an instance, in reconciliation order.
#[must_use]
pub fn components<S: ObjectStore>() -> Vec<Box<dyn ComponentReconciler<S>>> {
    vec![
        Box::new(RepoServerReconciler),
        Box::new(RedisReconciler),
        Box::new(ServerReconciler),
        Box::new(ApplicationSetReconciler),
        Box::new(ApplicationControllerReconciler),
        Box::new(GrafanaReconciler),
    ]
}

/// Reconcile one `ArgoCD` instance.
///
/// `auto_tls_managed` says whether this cluster can issue serving certificates, in which
/// case the auto-TLS annotations are kept in sync.
///
/// # Errors
///
/// Returns the first component error of the pass, a teardown error when deleting, or
/// a store error from the finalizer, namespace or status calls.
pub async fn reconcile_argocd<S: ObjectStore>(
    store: &S,
    instance: &ArgoCD,
    auto_tls_managed: bool,
) -> Result<(), ReconcileError> {
    let namespace = instance.namespace().unwrap_or_default();
    let name = instance.name_any();

    if instance.is_being_deleted() {
        return delete_argocd(store, instance).await;
    }

    debug!(namespace = %namespace, name = %name, "Reconciling ArgoCD");

    ensure_finalizer(store, instance, FINALIZER_ARGOCD).await?;

    let namespace_terminating = store
        .namespace_terminating(&namespace)
        .await
        .map_err(|source| ReconcileError::Store {
            operation: StoreOperation::Get,
            kind: "Namespace".to_string(),
            name: namespace.clone(),
            namespace: String::new(),
            source,
        })?;
    if namespace_terminating {
        info!(
            "Namespace {} is terminating, deleting children of {}/{}",
            namespace, namespace, name
        );
    }

    let settings = PassSettings {
        namespace_terminating,
        auto_tls_managed,
    };
    let mut status = ArgoCDStatusUpdater::new(instance);
    let mut first_error = None;

    for component in components::<S>() {
        let scope = ComponentScope::new(
            store,
            instance,
            component.name(),
            component.topology(instance),
            settings,
        );
        debug!(
            namespace = %namespace,
            name = %name,
            component = component.name(),
            topology = %scope.topology,
            "Reconciling component"
        );

        match component.reconcile(&scope).await {
            Ok(()) => status.set_state(component.name(), scope.state()),
            Err(e) => {
                error!(
                    "Component {} of {}/{} failed: {}",
                    component.name(),
                    namespace,
                    name,
                    e
                );
                metrics::record_error(KIND_ARGOCD, e.category());
                status.set_failed(component.name());
                if first_error.is_none() {
                    first_error = Some(e.in_component(component.name()));
                }
            }
        }
    }

    if let Err(e) = status.apply(store, instance).await {
        // A component failure is the more useful error to surface
        match first_error {
            Some(_) => warn!("Failed to update status of {}/{}: {}", namespace, name, e),
            None => return Err(e),
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Tear down every component of a deleted instance, then release the finalizer.
///
/// All components are attempted even when one fails; the finalizer stays until a pass
/// finishes without failures.
///
/// # Errors
///
/// Returns the first component teardown error, or a store error if the finalizer patch
/// fails.
pub async fn delete_argocd<S: ObjectStore>(
    store: &S,
    instance: &ArgoCD,
) -> Result<(), ReconcileError> {
    let namespace = instance.namespace().unwrap_or_default();
    let name = instance.name_any();

    if !instance.has_deletion_finalizer() {
        debug!(namespace = %namespace, name = %name, "No finalizer, nothing to clean up");
        return Ok(());
    }

    info!("ArgoCD {}/{} is being deleted", namespace, name);

    let mut first_error = None;
    for component in components::<S>() {
        if let Err(e) = component.delete_resources(store, instance).await {
            error!(
                "Teardown of component {} for {}/{} failed: {}",
                component.name(),
                namespace,
                name,
                e
            );
            metrics::record_error(KIND_ARGOCD, e.category());
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    remove_finalizer(store, instance, FINALIZER_ARGOCD).await?;
    Ok(())
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod instance_tests;
