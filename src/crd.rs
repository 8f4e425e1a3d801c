// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for Argo CD instances.
//!
//! A single namespaced [`ArgoCD`] object describes one Argo CD installation. Each
//! component (repo server, API server, cache tier, ApplicationSet controller) has its
//! own sub-spec; the operator derives every child resource from these sub-specs.
//!
//! # Example
//!
//! ```rust,no_run
//! use argocd_operator::crd::{ArgoCDSpec, HaSpec};
//!
//! let spec = ArgoCDSpec {
//!     ha: HaSpec {
//!         enabled: true,
//!         replicas: Some(3),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(spec.ha.enabled);
//! ```

use crate::constants::{
    AUTO_TLS_PROVIDER_OPENSHIFT, DEFAULT_ARGOCD_IMAGE, DEFAULT_ARGOCD_VERSION,
    DEFAULT_REDIS_HA_PROXY_IMAGE, DEFAULT_REDIS_HA_PROXY_VERSION, DEFAULT_REDIS_HA_REPLICAS,
    DEFAULT_REDIS_IMAGE, DEFAULT_REDIS_VERSION, FINALIZER_ARGOCD, ROUTE_TLS_TERMINATION_REENCRYPT,
};
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ArgoCD` describes one Argo CD installation and the child resources the operator
/// keeps converged for it.
///
/// # Example
///
/// ```yaml
/// apiVersion: argoproj.io/v1beta1
/// kind: ArgoCD
/// metadata:
///   name: demo
///   namespace: ns1
/// spec:
///   ha:
///     enabled: true
///     replicas: 3
///   repo:
///     autotls: openshift
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "argoproj.io",
    version = "v1beta1",
    kind = "ArgoCD",
    namespaced,
    shortname = "argocd",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#,
    doc = "ArgoCD describes an Argo CD installation. The operator converges the service accounts, roles, workloads and services of every enabled component."
)]
#[kube(status = "ArgoCDStatus")]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSpec {
    /// Default Argo CD container image for all Argo CD components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Default Argo CD image tag for all Argo CD components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// ApplicationSet controller. The component is enabled when this field is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_set: Option<ApplicationSetSpec>,

    /// High-availability options for the cache tier.
    #[serde(default)]
    pub ha: HaSpec,

    /// Cache tier (Redis) options.
    #[serde(default)]
    pub redis: RedisSpec,

    /// Repo server options.
    #[serde(default)]
    pub repo: RepoSpec,

    /// API server options.
    #[serde(default)]
    pub server: ServerSpec,

    /// Application controller options.
    #[serde(default)]
    pub controller: ControllerSpec,

    /// Grafana dashboard options.
    #[serde(default)]
    pub grafana: GrafanaSpec,
}

/// Application controller options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSpec {
    /// Disable the application controller when explicitly set to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Cluster role granted to the controller's service account across the cluster.
    /// Without it the controller only manages its own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_role: Option<String>,
}

impl ControllerSpec {
    /// Implicit-enabled: only an explicit `false` disables the component.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Grafana dashboard options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaSpec {
    /// Toggle Grafana support for the instance.
    #[serde(default)]
    pub enabled: bool,
}

/// ApplicationSet controller options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSetSpec {
    /// Container image override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image tag override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Container compute resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Log level passed to the controller (debug, info, warn, error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Number of controller replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 100))]
    pub replicas: Option<i32>,
}

/// High-availability options for the cache tier.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HaSpec {
    /// Run the cache tier as a replicated peer set behind a proxy.
    #[serde(default)]
    pub enabled: bool,

    /// Size of the replicated peer set. Defaults to 3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 15))]
    pub replicas: Option<i32>,

    /// HAProxy image override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_proxy_image: Option<String>,

    /// HAProxy image tag override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_proxy_version: Option<String>,

    /// Compute resources of the HA proxy container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl HaSpec {
    /// Configured peer set size, falling back to the default.
    #[must_use]
    pub fn peer_count(&self) -> i32 {
        self.replicas.unwrap_or(DEFAULT_REDIS_HA_REPLICAS)
    }
}

/// Cache tier (Redis) options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    /// Container image override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image tag override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Container compute resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Automatic TLS provider. Only `openshift` is supported.
    #[serde(default, rename = "autotls", skip_serializing_if = "Option::is_none")]
    pub auto_tls: Option<String>,

    /// Skip TLS verification between Argo CD components and the cache tier.
    #[serde(default, rename = "disableTLSVerification")]
    pub disable_tls_verification: bool,
}

impl RedisSpec {
    /// Whether the cache tier services should request a serving certificate.
    #[must_use]
    pub fn wants_auto_tls(&self) -> bool {
        self.auto_tls.as_deref() == Some(AUTO_TLS_PROVIDER_OPENSHIFT)
    }
}

/// Repo server options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoSpec {
    /// Disable the repo server when explicitly set to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Container image override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image tag override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of repo server replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 100))]
    pub replicas: Option<i32>,

    /// Container compute resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Log level passed to the repo server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Automatic TLS provider. Only `openshift` is supported.
    #[serde(default, rename = "autotls", skip_serializing_if = "Option::is_none")]
    pub auto_tls: Option<String>,
}

impl RepoSpec {
    /// Whether the repo server service should request a serving certificate.
    #[must_use]
    pub fn wants_auto_tls(&self) -> bool {
        self.auto_tls.as_deref() == Some(AUTO_TLS_PROVIDER_OPENSHIFT)
    }

    /// Implicit-enabled: only an explicit `false` disables the component.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// API server options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// Disable the API server when explicitly set to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Container image override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image tag override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of API server replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 100))]
    pub replicas: Option<i32>,

    /// Container compute resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Log level passed to the API server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Serve plain HTTP (TLS is terminated elsewhere).
    #[serde(default)]
    pub insecure: bool,

    /// OpenShift route options.
    #[serde(default)]
    pub route: RouteSpec,

    /// Service options.
    #[serde(default)]
    pub service: ServerServiceSpec,
}

impl ServerSpec {
    /// A re-encrypting route needs a serving certificate on the service behind it.
    #[must_use]
    pub fn wants_auto_tls(&self) -> bool {
        self.route
            .tls
            .as_ref()
            .is_some_and(|tls| tls.termination.eq_ignore_ascii_case(ROUTE_TLS_TERMINATION_REENCRYPT))
    }

    /// Implicit-enabled: only an explicit `false` disables the component.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// OpenShift route options of the API server.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Expose the API server through a route.
    #[serde(default)]
    pub enabled: bool,

    /// Route TLS settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTls>,
}

/// Route TLS settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTls {
    /// Termination policy: edge, passthrough or reencrypt.
    pub termination: String,
}

/// API server service options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerServiceSpec {
    /// Service type (ClusterIP, NodePort, LoadBalancer). Defaults to ClusterIP.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

/// Observed state of an `ArgoCD` instance, one entry per component.
///
/// Component values are one of `Disabled`, `Converging`, `Converged`,
/// `DeletionPending` or `Failed`. A pass that writes children reports `Converging`; the
/// pass triggered by those children's watch events finds nothing to do and reports
/// `Converged`, so a spec change settles after two status writes.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDStatus {
    /// Overall phase: `Available` when every component is converged or disabled, `Pending` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// ApplicationSet controller state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_set_controller: Option<String>,

    /// Cache tier state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<String>,

    /// Repo server state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Application controller state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_controller: Option<String>,

    /// Grafana state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana: Option<String>,

    /// API server state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Generation of the spec the status was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl ArgoCD {
    /// Whether the teardown finalizer is present on the instance.
    #[must_use]
    pub fn has_deletion_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|finalizers| finalizers.iter().any(|f| f == FINALIZER_ARGOCD))
    }

    /// Whether the instance has been marked for deletion.
    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Argo CD image reference for a component.
    ///
    /// The component override wins over the instance-wide image and version, which win
    /// over the defaults.
    #[must_use]
    pub fn argocd_image(&self, image: Option<&str>, version: Option<&str>) -> String {
        let image = image
            .or(self.spec.image.as_deref())
            .unwrap_or(DEFAULT_ARGOCD_IMAGE);
        let version = version
            .or(self.spec.version.as_deref())
            .unwrap_or(DEFAULT_ARGOCD_VERSION);
        image_reference(image, version)
    }

    /// Image reference of the cache tier servers.
    #[must_use]
    pub fn redis_image(&self) -> String {
        image_reference(
            self.spec.redis.image.as_deref().unwrap_or(DEFAULT_REDIS_IMAGE),
            self.spec.redis.version.as_deref().unwrap_or(DEFAULT_REDIS_VERSION),
        )
    }

    /// Image reference of the HA proxy in front of the cache tier.
    #[must_use]
    pub fn redis_proxy_image(&self) -> String {
        image_reference(
            self.spec
                .ha
                .redis_proxy_image
                .as_deref()
                .unwrap_or(DEFAULT_REDIS_HA_PROXY_IMAGE),
            self.spec
                .ha
                .redis_proxy_version
                .as_deref()
                .unwrap_or(DEFAULT_REDIS_HA_PROXY_VERSION),
        )
    }
}

/// `image:tag`, or `image@digest` when the version is a digest.
fn image_reference(image: &str, version: &str) -> String {
    if version.contains(':') {
        format!("{image}@{version}")
    } else {
        format!("{image}:{version}")
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
