// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Argo CD operator.
//!
//! The taxonomy follows how each failure is treated by the reconcilers:
//!
//! - [`StoreError::NotFound`] is expected during lookups and deletes and is turned into a
//!   non-error by the branch that receives it.
//! - Conflicts and other store failures are propagated unchanged; the controller's requeue
//!   drives the retry.
//! - [`BuildError`] means a desired object could not be constructed. It is wrapped with the
//!   resource it was building and propagated.
//! - [`OwnerReferenceError`] is only ever logged (see
//!   [`crate::reconcilers::owner::attach_owner_reference_best_effort`]).
//! - [`TeardownError`] aggregates every failed delete of a component teardown.

use std::fmt;
use thiserror::Error;

/// Store operation that failed, attached to [`ReconcileError::Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Get,
    List,
    Create,
    Update,
    Delete,
    Patch,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Patch => "patch",
        };
        f.write_str(op)
    }
}

/// Errors returned by an [`crate::store::ObjectStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The object does not exist (HTTP 404)
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    /// An object with the same name already exists (HTTP 409 on create)
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        name: String,
        namespace: String,
    },

    /// The object was modified since it was read (HTTP 409 on update)
    ///
    /// Surfaced to the controller, which requeues the instance.
    #[error("conflict writing {kind} {namespace}/{name}: object has been modified")]
    Conflict {
        kind: String,
        name: String,
        namespace: String,
    },

    /// Any other Kubernetes API failure
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// An object could not be converted to or from its wire representation
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store could not be reached or refused the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means the object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }

    /// Whether this error is an optimistic-concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Kube(kube::Error::Api(ae)) => ae.code == 409,
            _ => false,
        }
    }
}

/// A desired object could not be constructed from its request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Every child needs a name
    #[error("{kind} request has an empty name")]
    MissingName { kind: &'static str },

    /// Every child is namespaced
    #[error("{kind} {name} request has an empty namespace")]
    MissingNamespace { kind: &'static str, name: String },

    /// Workloads need a container image
    #[error("{kind} {name} request has no container image")]
    MissingImage { kind: &'static str, name: String },

    /// Services need at least one port
    #[error("{kind} {name} request has no ports")]
    NoPorts { kind: &'static str, name: String },

    /// The object could not be assembled
    #[error("{kind} {name} request is invalid: {reason}")]
    Invalid {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// Replica counts are positive
    #[error("{kind} {name} request has invalid replica count {replicas}")]
    InvalidReplicas {
        kind: &'static str,
        name: String,
        replicas: i32,
    },
}

/// An owner reference could not be attached to a child object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnerReferenceError {
    /// Namespaced owners can only own objects in their own namespace
    #[error("cross-namespace owner reference: owner in {owner_namespace}, {child} in {child_namespace}")]
    CrossNamespace {
        owner_namespace: String,
        child: String,
        child_namespace: String,
    },

    /// The owner has not been persisted yet (no uid) or has no name
    #[error("owner {owner} has no uid")]
    MissingUid { owner: String },
}

/// One failed delete inside a component teardown.
#[derive(Debug)]
pub struct TeardownFailure {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub error: StoreError,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}: {}", self.kind, self.name, self.error)
        } else {
            write!(
                f,
                "{} {}/{}: {}",
                self.kind, self.namespace, self.name, self.error
            )
        }
    }
}

/// Aggregated failures of a component teardown.
///
/// Only resources whose delete failed are listed; resources that were already absent or
/// deleted successfully do not appear.
#[derive(Error, Debug)]
#[error("teardown of component {component} failed for {} resource(s): {}", .failures.len(), join_failures(.failures))]
pub struct TeardownError {
    pub component: String,
    pub failures: Vec<TeardownFailure>,
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by a reconciliation pass.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The desired object could not be built
    #[error("failed to build {kind} {namespace}/{name}: {source}")]
    Build {
        kind: String,
        name: String,
        namespace: String,
        #[source]
        source: BuildError,
    },

    /// A store call failed
    #[error("failed to {operation} {kind} {namespace}/{name}: {source}")]
    Store {
        operation: StoreOperation,
        kind: String,
        name: String,
        namespace: String,
        #[source]
        source: StoreError,
    },

    /// A component teardown left resources behind
    #[error(transparent)]
    Teardown(#[from] TeardownError),

    /// A component failed; carries the component name for status and logs
    #[error("component {component} failed: {source}")]
    Component {
        component: String,
        #[source]
        source: Box<ReconcileError>,
    },

    /// The pass did not finish before its deadline; remaining steps were abandoned
    #[error("reconciliation of {namespace}/{name} timed out after {seconds}s")]
    Timeout {
        name: String,
        namespace: String,
        seconds: u64,
    },
}

impl ReconcileError {
    /// Short category label used for metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Build { .. } => "build_error",
            Self::Store { source, .. } if source.is_conflict() => "conflict",
            Self::Store { .. } => "store_error",
            Self::Teardown(_) => "teardown_error",
            Self::Component { source, .. } => source.category(),
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Wrap this error with the component it came from.
    #[must_use]
    pub fn in_component(self, component: &str) -> Self {
        Self::Component {
            component: component.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
