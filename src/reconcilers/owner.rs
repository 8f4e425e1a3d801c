// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Owner references from child resources back to their `ArgoCD` instance.
//!
//! The owner reference lets the garbage collector cascade-delete children once the
//! instance is gone. Teardown does not rely on it alone: component teardown deletes
//! children explicitly.

use crate::crd::ArgoCD;
use crate::errors::OwnerReferenceError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use tracing::warn;

/// Controller owner reference pointing at `instance`.
///
/// # Errors
///
/// Returns [`OwnerReferenceError::MissingUid`] if the instance has not been persisted.
pub fn build_owner_reference(instance: &ArgoCD) -> Result<OwnerReference, OwnerReferenceError> {
    instance
        .controller_owner_ref(&())
        .ok_or_else(|| OwnerReferenceError::MissingUid {
            owner: instance.name_any(),
        })
}

/// Point `child` at `instance` as its controller owner.
///
/// An existing reference to the same owner is replaced; references to other owners are
/// kept.
///
/// # Errors
///
/// Fails if the child lives in another namespace than the instance, or if the instance
/// has no uid.
pub fn set_owner_reference(
    instance: &ArgoCD,
    child: &mut ObjectMeta,
) -> Result<(), OwnerReferenceError> {
    let owner_namespace = instance.namespace().unwrap_or_default();
    let child_namespace = child.namespace.clone().unwrap_or_default();
    if owner_namespace != child_namespace {
        return Err(OwnerReferenceError::CrossNamespace {
            owner_namespace,
            child: child.name.clone().unwrap_or_default(),
            child_namespace,
        });
    }

    let reference = build_owner_reference(instance)?;
    let references = child.owner_references.get_or_insert_with(Vec::new);
    references.retain(|r| r.uid != reference.uid);
    references.push(reference);
    Ok(())
}

/// Attach the owner reference, logging instead of failing.
///
/// A missing owner reference only degrades garbage collection; the child itself is
/// still usable, so the create goes ahead. Returns whether the reference was attached.
pub fn attach_owner_reference_best_effort(instance: &ArgoCD, child: &mut ObjectMeta) -> bool {
    match set_owner_reference(instance, child) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                owner = %instance.name_any(),
                child = %child.name.as_deref().unwrap_or_default(),
                error = %e,
                "Failed to set owner reference, continuing without it"
            );
            false
        }
    }
}

#[cfg(test)]
#[path = "owner_tests.rs"]
mod owner_tests;
