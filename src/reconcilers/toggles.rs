// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Toggle annotations.
//!
//! A toggle annotation encodes a boolean feature through its presence on a child
//! resource. Toggles are reconciled on every pass: a toggle removed by hand comes back on
//! the next pass, and one left behind after the feature is turned off is removed.
//!
//! The only toggle managed today is the OpenShift serving-certificate annotation that
//! requests automatic TLS for a service.

use crate::labels::SERVING_CERT_SECRET_ANNOTATION;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Desired state of one toggle annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toggle {
    pub key: &'static str,
    pub value: String,
    pub enabled: bool,
}

impl Toggle {
    /// Serving-certificate toggle writing the certificate into `secret_name`.
    #[must_use]
    pub fn auto_tls(secret_name: &str, enabled: bool) -> Self {
        Self {
            key: SERVING_CERT_SECRET_ANNOTATION,
            value: secret_name.to_string(),
            enabled,
        }
    }
}

/// Add or remove one annotation on the in-memory object.
///
/// Returns whether the object changed:
/// - enabled and the key is absent or holds another value: the value is set
/// - disabled and the key is present: the key is removed
#[must_use]
pub fn apply_toggle(meta: &mut ObjectMeta, key: &str, value: &str, enabled: bool) -> bool {
    if enabled {
        let annotations = meta.annotations.get_or_insert_with(Default::default);
        if annotations.get(key).map(String::as_str) == Some(value) {
            return false;
        }
        annotations.insert(key.to_string(), value.to_string());
        true
    } else {
        meta.annotations
            .as_mut()
            .is_some_and(|annotations| annotations.remove(key).is_some())
    }
}

/// Apply every toggle; returns whether any of them changed the object.
#[must_use]
pub fn apply_toggles(meta: &mut ObjectMeta, toggles: &[Toggle]) -> bool {
    toggles.iter().fold(false, |changed, toggle| {
        apply_toggle(meta, toggle.key, &toggle.value, toggle.enabled) || changed
    })
}

#[cfg(test)]
#[path = "toggles_tests.rs"]
mod toggles_tests;
