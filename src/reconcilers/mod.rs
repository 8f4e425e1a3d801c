// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of `ArgoCD` instances and their child resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern, layered as:
//!
//! 1. **Instance** - [`reconcile_argocd`] owns the finalizer, checks the namespace for a
//!    deletion marker and runs each component in turn, then writes the status
//! 2. **Component** - each [`ComponentReconciler`] converges its children in dependency
//!    order and knows how to delete them in reverse order
//! 3. **Resource** - [`converge::converge`] compares one desired child with the live
//!    object and creates, updates or deletes it
//!
//! # Available Components
//!
//! - [`RepoServerReconciler`] - repository server
//! - [`RedisReconciler`] - cache tier, standalone or high availability
//! - [`ServerReconciler`] - API server
//! - [`ApplicationSetReconciler`] - ApplicationSet controller
//! - [`ApplicationControllerReconciler`] - application controller identity, cluster
//!   binding and metrics service
//! - [`GrafanaReconciler`] - Grafana service, toggled by `spec.grafana.enabled`
//!
//! # Example: Reconciling an Instance
//!
//! ```rust,no_run
//! use argocd_operator::crd::ArgoCD;
//! use argocd_operator::reconcilers::reconcile_argocd;
//! use argocd_operator::store::KubeStore;
//! use kube::Client;
//!
//! async fn reconcile(client: Client, instance: ArgoCD) -> anyhow::Result<()> {
//!     let store = KubeStore::new(client);
//!     reconcile_argocd(&store, &instance, false).await?;
//!     Ok(())
//! }
//! ```

pub mod application_controller;
pub mod applicationset;
pub mod component;
pub mod converge;
pub mod finalizers;
pub mod grafana;
pub mod instance;
pub mod owner;
pub mod peers;
pub mod redis;
pub mod repo_server;
pub mod server;
pub mod status;
pub mod toggles;
pub mod topology;

pub use application_controller::ApplicationControllerReconciler;
pub use applicationset::ApplicationSetReconciler;
pub use component::{ComponentReconciler, ComponentScope, ComponentState, PassSettings};
pub use grafana::GrafanaReconciler;
pub use instance::{delete_argocd, reconcile_argocd};
pub use redis::RedisReconciler;
pub use repo_server::RepoServerReconciler;
pub use server::ServerReconciler;
