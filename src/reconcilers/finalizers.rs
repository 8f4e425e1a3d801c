// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for `ArgoCD` instances.
//!
//! The finalizer keeps a deleted instance around until every component has torn down
//! its children. It is added before the first child is converged and removed only
//! after a teardown pass finished without failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use argocd_operator::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//!
//! async fn reconcile<S: ObjectStore>(store: &S, instance: &ArgoCD) -> Result<(), ReconcileError> {
//!     if instance.is_being_deleted() {
//!         // tear down children, then
//!         return remove_finalizer(store, instance, FINALIZER_ARGOCD).await.map(|_| ());
//!     }
//!     ensure_finalizer(store, instance, FINALIZER_ARGOCD).await?;
//!     Ok(())
//! }
//! ```

use crate::constants::KIND_ARGOCD;
use crate::crd::ArgoCD;
use crate::errors::{ReconcileError, StoreError, StoreOperation};
use crate::store::ObjectStore;
use kube::ResourceExt;
use tracing::{debug, info};

fn patch_error(instance: &ArgoCD) -> impl FnOnce(StoreError) -> ReconcileError {
    let name = instance.name_any();
    let namespace = instance.namespace().unwrap_or_default();
    move |source| ReconcileError::Store {
        operation: StoreOperation::Patch,
        kind: KIND_ARGOCD.to_string(),
        name,
        namespace,
        source,
    }
}

/// Add `finalizer` to the instance if not already present.
///
/// Returns whether a patch was written.
///
/// # Errors
///
/// Returns [`ReconcileError::Store`] if the patch fails.
pub async fn ensure_finalizer<S: ObjectStore>(
    store: &S,
    instance: &ArgoCD,
    finalizer: &str,
) -> Result<bool, ReconcileError> {
    let mut finalizers = instance.finalizers().to_vec();
    if finalizers.iter().any(|f| f == finalizer) {
        debug!(
            namespace = %instance.namespace().unwrap_or_default(),
            name = %instance.name_any(),
            "Finalizer already present"
        );
        return Ok(false);
    }

    finalizers.push(finalizer.to_string());
    store
        .set_instance_finalizers(instance, finalizers)
        .await
        .map_err(patch_error(instance))?;

    info!(
        "Added finalizer {} to {}/{} {}",
        finalizer,
        instance.namespace().unwrap_or_default(),
        instance.name_any(),
        KIND_ARGOCD
    );
    Ok(true)
}

/// Remove `finalizer` from the instance if present.
///
/// Returns whether a patch was written.
///
/// # Errors
///
/// Returns [`ReconcileError::Store`] if the patch fails.
pub async fn remove_finalizer<S: ObjectStore>(
    store: &S,
    instance: &ArgoCD,
    finalizer: &str,
) -> Result<bool, ReconcileError> {
    let mut finalizers = instance.finalizers().to_vec();
    let before = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    if finalizers.len() == before {
        return Ok(false);
    }

    store
        .set_instance_finalizers(instance, finalizers)
        .await
        .map_err(patch_error(instance))?;

    info!(
        "Removed finalizer {} from {}/{} {}",
        finalizer,
        instance.namespace().unwrap_or_default(),
        instance.name_any(),
        KIND_ARGOCD
    );
    Ok(true)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
