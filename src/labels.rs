// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "repo-server")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the resource (the deterministic child name)
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Label set by the `StatefulSet` controller on each pod with the pod's name
pub const STATEFULSET_POD_NAME: &str = "statefulset.kubernetes.io/pod-name";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_ARGOCD: &str = "argocd";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_OPERATOR: &str = "argocd-operator";

// ============================================================================
// Operator-Specific Labels
// ============================================================================

/// Label naming the replicated peer set a child belongs to
pub const PEER_SET_LABEL: &str = "argocd.argoproj.io/peer-set";

// ============================================================================
// Operator-Specific Annotations
// ============================================================================

/// Annotation naming the owning `ArgoCD` instance
pub const INSTANCE_NAME_ANNOTATION: &str = "argocds.argoproj.io/name";

/// Annotation naming the namespace of the owning `ArgoCD` instance
pub const INSTANCE_NAMESPACE_ANNOTATION: &str = "argocds.argoproj.io/namespace";

/// Annotation carrying the stable index of a peer set member
pub const PEER_INDEX_ANNOTATION: &str = "argocd.argoproj.io/peer-index";

/// OpenShift annotation requesting a service-serving certificate in the named secret
pub const SERVING_CERT_SECRET_ANNOTATION: &str = "service.beta.openshift.io/serving-cert-secret-name";

/// Annotation keeping endpoints of unready pods published (HA announce services)
pub const TOLERATE_UNREADY_ENDPOINTS_ANNOTATION: &str =
    "service.alpha.kubernetes.io/tolerate-unready-endpoints";
