// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # argocd-operator - Argo CD Operator for Kubernetes
//!
//! A Kubernetes operator written in Rust that keeps the components of an Argo CD
//! installation in their desired state, driven by the `ArgoCD` custom resource.
//!
//! ## Overview
//!
//! Each `ArgoCD` instance owns a set of child resources per component (service
//! accounts, roles, deployments, stateful sets, services and config maps). Every
//! reconciliation pass converges those children towards the desired set:
//!
//! - missing children are created with an owner reference to the instance
//! - drifted toggle annotations are repaired with a single update
//! - children of disabled components are deleted
//! - a terminating namespace turns every step into a delete
//!
//! ## Modules
//!
//! - [`crd`] - The `ArgoCD` custom resource and its component sub-specs
//! - [`naming`] - Deterministic child names and discovery labels
//! - [`builders`] - Resource requests rendered into Kubernetes objects
//! - [`store`] - Object store interface and its Kubernetes implementation
//! - [`reconcilers`] - Converge algorithm, component reconcilers and the instance driver
//! - [`errors`] - Error taxonomy
//! - [`config`] - Command-line configuration
//! - [`context`] - Shared controller context
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use argocd_operator::crd::{ArgoCD, ArgoCDSpec, HaSpec};
//!
//! let instance = ArgoCD::new(
//!     "example-argocd",
//!     ArgoCDSpec {
//!         ha: HaSpec {
//!             enabled: true,
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     },
//! );
//! ```

pub mod builders;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod naming;
pub mod reconcilers;
pub mod store;
