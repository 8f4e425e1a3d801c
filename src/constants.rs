// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Argo CD operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `ArgoCD` custom resource
pub const API_GROUP: &str = "argoproj.io";

/// Kind name for the `ArgoCD` resource
pub const KIND_ARGOCD: &str = "ArgoCD";

/// Field manager used for status patches and finalizer patches
pub const FIELD_MANAGER: &str = "argocd-operator";

/// Finalizer that guards child-resource teardown of an `ArgoCD` instance
pub const FINALIZER_ARGOCD: &str = "argoproj.io/finalizer";

/// API group whose presence signals that OpenShift service-serving certificates are available
pub const OPENSHIFT_ROUTE_API_GROUP: &str = "route.openshift.io";

// ============================================================================
// Naming Constants
// ============================================================================

/// Maximum length of a name that must be a valid DNS-1035 label (Services)
pub const MAX_RESOURCE_NAME_LENGTH: usize = 63;

/// Number of hex characters of the SHA-256 digest appended to shortened names
pub const NAME_HASH_LENGTH: usize = 8;

/// Room kept after a peer set base name for a `-<index>` suffix (indices up to 999)
pub const PEER_INDEX_RESERVE: usize = 4;

/// Component name of the ApplicationSet controller
pub const COMPONENT_APPLICATIONSET: &str = "applicationset-controller";

/// Component name of the repo server
pub const COMPONENT_REPO_SERVER: &str = "repo-server";

/// Component name of the API server
pub const COMPONENT_SERVER: &str = "server";

/// Component name of the cache tier
pub const COMPONENT_REDIS: &str = "redis";

/// Component name of the application controller
pub const COMPONENT_APPLICATION_CONTROLLER: &str = "application-controller";

/// Component name of the Grafana dashboard
pub const COMPONENT_GRAFANA: &str = "grafana";

/// Suffix of the application controller metrics service
pub const SUFFIX_CONTROLLER_METRICS: &str = "metrics";

/// Suffix of the API server metrics service
pub const SUFFIX_SERVER_METRICS: &str = "server-metrics";

/// Suffix of the single-instance cache service and deployment
pub const SUFFIX_REDIS: &str = "redis";

/// Suffix of the HA aggregator service
pub const SUFFIX_REDIS_HA: &str = "redis-ha";

/// Suffix of the HA proxy service and deployment
pub const SUFFIX_REDIS_HA_PROXY: &str = "redis-ha-haproxy";

/// Suffix of the HA server stateful set
pub const SUFFIX_REDIS_HA_SERVER: &str = "redis-ha-server";

/// Prefix (after the instance name) of the HA announce peer services
pub const SUFFIX_REDIS_HA_ANNOUNCE: &str = "redis-ha-announce";

/// Suffix of the HA configuration `ConfigMap`
pub const SUFFIX_REDIS_HA_CONFIG: &str = "redis-ha-configmap";

/// Suffix of the HA health-check `ConfigMap`
pub const SUFFIX_REDIS_HA_HEALTH_CONFIG: &str = "redis-ha-health-configmap";

// ============================================================================
// Image Constants
// ============================================================================

/// Argo CD image used when neither the instance nor the component overrides it
pub const DEFAULT_ARGOCD_IMAGE: &str = "quay.io/argoproj/argocd";

/// Argo CD image tag used when not specified
pub const DEFAULT_ARGOCD_VERSION: &str = "v2.10.0";

/// Redis image used when not specified
pub const DEFAULT_REDIS_IMAGE: &str = "redis";

/// Redis image tag used when not specified
pub const DEFAULT_REDIS_VERSION: &str = "7.0.14-alpine";

/// HAProxy image used in front of the HA cache tier when not specified
pub const DEFAULT_REDIS_HA_PROXY_IMAGE: &str = "haproxy";

/// HAProxy image tag used when not specified
pub const DEFAULT_REDIS_HA_PROXY_VERSION: &str = "2.6.14-alpine";

// ============================================================================
// Port Constants
// ============================================================================

/// Redis server port
pub const REDIS_PORT: i32 = 6379;

/// Redis sentinel port
pub const REDIS_SENTINEL_PORT: i32 = 26379;

/// Repo server gRPC port
pub const REPO_SERVER_PORT: i32 = 8081;

/// Repo server metrics port
pub const REPO_SERVER_METRICS_PORT: i32 = 8084;

/// API server container port (serves both HTTP and HTTPS)
pub const SERVER_CONTAINER_PORT: i32 = 8080;

/// API server metrics port
pub const SERVER_METRICS_PORT: i32 = 8083;

/// ApplicationSet controller webhook port
pub const APPLICATIONSET_WEBHOOK_PORT: i32 = 7000;

/// ApplicationSet controller metrics port
pub const APPLICATIONSET_METRICS_PORT: i32 = 8080;

/// Application controller metrics port
pub const CONTROLLER_METRICS_PORT: i32 = 8082;

/// Grafana service port
pub const GRAFANA_SERVICE_PORT: i32 = 80;

/// Grafana container port
pub const GRAFANA_CONTAINER_PORT: i32 = 3000;

// ============================================================================
// Replica Constants
// ============================================================================

/// Default size of the HA cache peer set
pub const DEFAULT_REDIS_HA_REPLICAS: i32 = 3;

/// Default replica count of stateless workloads
pub const DEFAULT_REPLICAS: i32 = 1;

// ============================================================================
// Auto-TLS Constants
// ============================================================================

/// Value of `autotls` that requests OpenShift service-serving certificates
pub const AUTO_TLS_PROVIDER_OPENSHIFT: &str = "openshift";

/// Route TLS termination policy that implies auto-TLS on the API server service
pub const ROUTE_TLS_TERMINATION_REENCRYPT: &str = "reencrypt";

/// Secret holding the repo server's serving certificate
pub const REPO_SERVER_TLS_SECRET: &str = "argocd-repo-server-tls";

/// Secret holding the API server's serving certificate
pub const SERVER_TLS_SECRET: &str = "argocd-server-tls";

/// Secret holding the cache tier's serving certificate
pub const REDIS_TLS_SECRET: &str = "argocd-redis-tls";

// ============================================================================
// Controller Constants
// ============================================================================

/// Default deadline for one reconciliation pass
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;

/// Requeue interval after a successful pass
pub const DEFAULT_REQUEUE_SECS: u64 = 300;

/// Requeue interval after a failed pass
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 30;

/// Default bind address of the metrics endpoint
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8383";

/// Path of the metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
