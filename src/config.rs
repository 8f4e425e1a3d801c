// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every setting is a command-line flag with an environment variable fallback, so the
//! operator can be configured from a Deployment manifest without rebuilding the image.

use crate::constants::{
    DEFAULT_ERROR_REQUEUE_SECS, DEFAULT_METRICS_ADDR, DEFAULT_RECONCILE_TIMEOUT_SECS,
    DEFAULT_REQUEUE_SECS, OPENSHIFT_ROUTE_API_GROUP,
};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Whether auto-TLS annotations are managed on services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AutoTls {
    /// Probe the API server for the route API group at startup
    #[default]
    Auto,
    /// Always manage auto-TLS annotations
    Enabled,
    /// Never manage auto-TLS annotations
    Disabled,
}

impl AutoTls {
    /// Decide whether auto-TLS is managed, given the API groups the cluster serves.
    #[must_use]
    pub fn resolve<'a>(self, mut api_groups: impl Iterator<Item = &'a str>) -> bool {
        match self {
            Self::Enabled => true,
            Self::Disabled => false,
            Self::Auto => api_groups.any(|group| group == OPENSHIFT_ROUTE_API_GROUP),
        }
    }
}

/// Command-line configuration of the operator binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "argocd-operator", about = "Argo CD Operator for Kubernetes", version)]
pub struct OperatorConfig {
    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Address the Prometheus metrics endpoint listens on
    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Only watch `ArgoCD` instances in this namespace (all namespaces when empty)
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub watch_namespace: String,

    /// Deadline for one reconciliation pass, in seconds
    #[arg(long, env = "RECONCILE_TIMEOUT_SECS", default_value_t = DEFAULT_RECONCILE_TIMEOUT_SECS)]
    pub reconcile_timeout_secs: u64,

    /// Requeue interval after a successful pass, in seconds
    #[arg(long, env = "REQUEUE_SECS", default_value_t = DEFAULT_REQUEUE_SECS)]
    pub requeue_secs: u64,

    /// Requeue interval after a failed pass, in seconds
    #[arg(long, env = "ERROR_REQUEUE_SECS", default_value_t = DEFAULT_ERROR_REQUEUE_SECS)]
    pub error_requeue_secs: u64,

    /// Whether auto-TLS annotations are managed
    #[arg(long, env = "AUTO_TLS", value_enum, default_value_t = AutoTls::Auto)]
    pub auto_tls: AutoTls,
}

impl OperatorConfig {
    /// The namespace to watch, or `None` for all namespaces.
    #[must_use]
    pub fn watch_namespace(&self) -> Option<&str> {
        Some(self.watch_namespace.as_str()).filter(|ns| !ns.is_empty())
    }

    #[must_use]
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    #[must_use]
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    #[must_use]
    pub fn error_requeue_interval(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
