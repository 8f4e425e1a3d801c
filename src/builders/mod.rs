// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pure builders for the child resources of an `ArgoCD` instance.
//!
//! Each builder turns a typed request into the desired in-memory object. Builders do no
//! I/O and never attach owner references; the convergence step does that right before
//! a create.
//!
//! # Example
//!
//! ```rust
//! use argocd_operator::builders::{permissions::ServiceAccountRequest, ResourceMeta};
//!
//! let request = ServiceAccountRequest {
//!     meta: ResourceMeta::new("demo-redis", "ns1"),
//! };
//! let sa = request.build().unwrap();
//! assert_eq!(sa.metadata.name.as_deref(), Some("demo-redis"));
//! ```

pub mod networking;
pub mod permissions;
pub mod workloads;

use crate::errors::BuildError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Name, namespace, labels and annotations shared by every request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceMeta {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ResourceMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Reject requests that cannot be addressed in the store.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingName`] or [`BuildError::MissingNamespace`].
    pub fn validate(&self, kind: &'static str) -> Result<(), BuildError> {
        if self.name.is_empty() {
            return Err(BuildError::MissingName { kind });
        }
        if self.namespace.is_empty() {
            return Err(BuildError::MissingNamespace {
                kind,
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Object metadata; empty label or annotation maps are left unset.
    #[must_use]
    pub fn object_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: (!self.labels.is_empty()).then(|| self.labels.clone()),
            annotations: (!self.annotations.is_empty()).then(|| self.annotations.clone()),
            ..Default::default()
        }
    }
}
