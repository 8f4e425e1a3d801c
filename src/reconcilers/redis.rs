// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cache tier (Redis) component.
//!
//! The cache tier is always present and runs in one of two topologies:
//!
//! - **Standalone**: one deployment and one service, both named `<instance>-redis`.
//! - **High availability**: a stateful set of Redis servers with sentinels, one
//!   announce service per server (the peer set), an aggregator service over all servers,
//!   and an HAProxy deployment and service that always route to the current master.
//!
//! Both topologies share the service account, role and role binding. Switching
//! topology deletes the resources of the old variant in the same pass.

use super::component::{ChildKind, ChildRef, ComponentReconciler, ComponentScope};
use super::peers::converge_peer_set;
use super::topology::{Topology, Variant};
use crate::builders::networking::{PortRequest, ServiceRequest};
use crate::builders::permissions::{
    policy_rule, RoleBindingRequest, RoleRequest, ServiceAccountRequest,
};
use crate::builders::workloads::{
    selector_labels, ConfigMapRequest, ContainerRequest, DeploymentRequest, PodRequest,
    StatefulSetRequest,
};
use crate::constants::{
    COMPONENT_REDIS, DEFAULT_REPLICAS, REDIS_PORT, REDIS_SENTINEL_PORT, REDIS_TLS_SECRET,
    SUFFIX_REDIS, SUFFIX_REDIS_HA, SUFFIX_REDIS_HA_ANNOUNCE, SUFFIX_REDIS_HA_CONFIG,
    SUFFIX_REDIS_HA_HEALTH_CONFIG, SUFFIX_REDIS_HA_PROXY, SUFFIX_REDIS_HA_SERVER,
};
use crate::crd::ArgoCD;
use crate::errors::{BuildError, ReconcileError};
use crate::labels::{STATEFULSET_POD_NAME, TOLERATE_UNREADY_ENDPOINTS_ANNOTATION};
use crate::naming::{indexed_name, name_with_suffix, peer_base_name};
use crate::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const HAPROXY_CFG_TEMPLATE: &str = include_str!("../../templates/redis-ha/haproxy.cfg.tmpl");
const HAPROXY_INIT_TEMPLATE: &str = include_str!("../../templates/redis-ha/haproxy_init.sh.tmpl");
const INIT_SCRIPT_TEMPLATE: &str = include_str!("../../templates/redis-ha/init.sh.tmpl");
const REDIS_CONF_TEMPLATE: &str = include_str!("../../templates/redis-ha/redis.conf.tmpl");
const SENTINEL_CONF_TEMPLATE: &str = include_str!("../../templates/redis-ha/sentinel.conf.tmpl");
const REDIS_LIVENESS_TEMPLATE: &str = include_str!("../../templates/redis-ha/redis_liveness.sh.tmpl");
const REDIS_READINESS_TEMPLATE: &str =
    include_str!("../../templates/redis-ha/redis_readiness.sh.tmpl");
const SENTINEL_LIVENESS_TEMPLATE: &str =
    include_str!("../../templates/redis-ha/sentinel_liveness.sh.tmpl");

// HA config map keys
pub const HAPROXY_CFG_KEY: &str = "haproxy.cfg";
pub const HAPROXY_INIT_KEY: &str = "haproxy_init.sh";
pub const INIT_SCRIPT_KEY: &str = "init.sh";
pub const REDIS_CONF_KEY: &str = "redis.conf";
pub const SENTINEL_CONF_KEY: &str = "sentinel.conf";

// HA health config map keys
pub const REDIS_LIVENESS_KEY: &str = "redis_liveness.sh";
pub const REDIS_READINESS_KEY: &str = "redis_readiness.sh";
pub const SENTINEL_LIVENESS_KEY: &str = "sentinel_liveness.sh";

/// Sentinel master group name
const MASTER_GROUP: &str = "argocd";

/// Name of the shared identity, and of the standalone deployment and service.
#[must_use]
pub fn resource_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_REDIS)
}

#[must_use]
pub fn ha_service_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_REDIS_HA)
}

#[must_use]
pub fn ha_proxy_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_REDIS_HA_PROXY)
}

#[must_use]
pub fn ha_server_name(instance: &ArgoCD) -> String {
    peer_base_name(&instance.name_any(), SUFFIX_REDIS_HA_SERVER)
}

/// Base name of the announce peer set; member `i` is `<base>-i`.
#[must_use]
pub fn ha_announce_base(instance: &ArgoCD) -> String {
    peer_base_name(&instance.name_any(), SUFFIX_REDIS_HA_ANNOUNCE)
}

#[must_use]
pub fn ha_config_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_REDIS_HA_CONFIG)
}

#[must_use]
pub fn ha_health_config_name(instance: &ArgoCD) -> String {
    name_with_suffix(&instance.name_any(), SUFFIX_REDIS_HA_HEALTH_CONFIG)
}

/// Service other components connect to: the proxy in HA, the single server otherwise.
#[must_use]
pub fn endpoint_name(instance: &ArgoCD) -> String {
    if instance.spec.ha.enabled {
        ha_proxy_name(instance)
    } else {
        resource_name(instance)
    }
}

/// Permissions of the cache tier inside the instance namespace.
#[must_use]
pub fn policy_rules() -> Vec<PolicyRule> {
    vec![policy_rule("", &["endpoints"], &["get"])]
}

/// Contents of the HA configuration config map for `peers` servers.
#[must_use]
pub fn ha_config_data(instance: &ArgoCD, peers: i32) -> BTreeMap<String, String> {
    let announce = ha_announce_base(instance);
    let quorum = (peers / 2 + 1).to_string();
    let replicas = peers.to_string();
    let redis_port = REDIS_PORT.to_string();
    let sentinel_port = REDIS_SENTINEL_PORT.to_string();

    let mut servers = String::new();
    for index in 0..peers {
        let _ = writeln!(
            servers,
            "  server R{index} {}:{REDIS_PORT} check inter 1s",
            indexed_name(&announce, index)
        );
    }

    let render = |template: &str| {
        template
            .replace("{{ANNOUNCE_PREFIX}}", &announce)
            .replace("{{HA_SERVICE}}", &ha_service_name(instance))
            .replace("{{MASTER_GROUP}}", MASTER_GROUP)
            .replace("{{QUORUM}}", &quorum)
            .replace("{{REPLICAS}}", &replicas)
            .replace("{{REDIS_PORT}}", &redis_port)
            .replace("{{SENTINEL_PORT}}", &sentinel_port)
            .replace("{{REDIS_SERVERS}}", &servers)
    };

    let mut data = BTreeMap::new();
    data.insert(HAPROXY_CFG_KEY.into(), render(HAPROXY_CFG_TEMPLATE));
    data.insert(HAPROXY_INIT_KEY.into(), render(HAPROXY_INIT_TEMPLATE));
    data.insert(INIT_SCRIPT_KEY.into(), render(INIT_SCRIPT_TEMPLATE));
    data.insert(REDIS_CONF_KEY.into(), render(REDIS_CONF_TEMPLATE));
    data.insert(SENTINEL_CONF_KEY.into(), render(SENTINEL_CONF_TEMPLATE));
    data
}

/// Contents of the HA health-check config map.
#[must_use]
pub fn ha_health_config_data() -> BTreeMap<String, String> {
    let redis_port = REDIS_PORT.to_string();
    let sentinel_port = REDIS_SENTINEL_PORT.to_string();
    let render = |template: &str| {
        template
            .replace("{{REDIS_PORT}}", &redis_port)
            .replace("{{SENTINEL_PORT}}", &sentinel_port)
    };

    let mut data = BTreeMap::new();
    data.insert(REDIS_LIVENESS_KEY.into(), render(REDIS_LIVENESS_TEMPLATE));
    data.insert(REDIS_READINESS_KEY.into(), render(REDIS_READINESS_TEMPLATE));
    data.insert(SENTINEL_LIVENESS_KEY.into(), render(SENTINEL_LIVENESS_TEMPLATE));
    data
}

fn standalone_deployment<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    name: &str,
) -> Result<Deployment, BuildError> {
    let spec = &scope.instance.spec.redis;
    DeploymentRequest {
        meta: scope.meta(name),
        replicas: DEFAULT_REPLICAS,
        pod: PodRequest {
            service_account_name: resource_name(scope.instance),
            containers: vec![ContainerRequest {
                name: COMPONENT_REDIS.to_string(),
                image: scope.instance.redis_image(),
                args: vec![
                    "--save".to_string(),
                    String::new(),
                    "--appendonly".to_string(),
                    "no".to_string(),
                ],
                ports: vec![("redis".to_string(), REDIS_PORT)],
                resources: spec.resources.clone(),
                ..Default::default()
            }],
            ..Default::default()
        },
    }
    .build()
}

fn proxy_deployment<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    name: &str,
) -> Result<Deployment, BuildError> {
    DeploymentRequest {
        meta: scope.meta(name),
        replicas: DEFAULT_REPLICAS,
        pod: PodRequest {
            service_account_name: resource_name(scope.instance),
            containers: vec![ContainerRequest {
                name: "haproxy".to_string(),
                image: scope.instance.redis_proxy_image(),
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    format!("sh /readonly/{HAPROXY_INIT_KEY} && exec haproxy -f /data/{HAPROXY_CFG_KEY}"),
                ],
                ports: vec![("redis".to_string(), REDIS_PORT)],
                resources: scope.instance.spec.ha.resources.clone(),
                volume_mounts: vec![
                    ("config".to_string(), "/readonly".to_string()),
                    ("data".to_string(), "/data".to_string()),
                ],
                ..Default::default()
            }],
            config_map_volumes: vec![("config".to_string(), ha_config_name(scope.instance))],
            empty_dir_volumes: vec!["data".to_string()],
        },
    }
    .build()
}

fn server_stateful_set<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    name: &str,
    peers: i32,
) -> Result<StatefulSet, BuildError> {
    let image = scope.instance.redis_image();
    let resources = scope.instance.spec.redis.resources.clone();
    let mounts = vec![
        ("config".to_string(), "/readonly-config".to_string()),
        ("health".to_string(), "/health".to_string()),
        ("data".to_string(), "/data".to_string()),
    ];

    StatefulSetRequest {
        meta: scope.meta(name),
        replicas: peers,
        service_name: ha_service_name(scope.instance),
        pod: PodRequest {
            service_account_name: resource_name(scope.instance),
            containers: vec![
                ContainerRequest {
                    name: COMPONENT_REDIS.to_string(),
                    image: image.clone(),
                    command: vec![
                        "sh".to_string(),
                        "-c".to_string(),
                        format!(
                            "sh /readonly-config/{INIT_SCRIPT_KEY} && exec redis-server /data/conf/{REDIS_CONF_KEY}"
                        ),
                    ],
                    ports: vec![("redis".to_string(), REDIS_PORT)],
                    resources: resources.clone(),
                    volume_mounts: mounts.clone(),
                    ..Default::default()
                },
                ContainerRequest {
                    name: "sentinel".to_string(),
                    image,
                    command: vec![
                        "sh".to_string(),
                        "-c".to_string(),
                        format!(
                            "until [ -f /data/conf/{SENTINEL_CONF_KEY} ]; do sleep 1; done; exec redis-sentinel /data/conf/{SENTINEL_CONF_KEY}"
                        ),
                    ],
                    ports: vec![("sentinel".to_string(), REDIS_SENTINEL_PORT)],
                    resources,
                    volume_mounts: mounts,
                    ..Default::default()
                },
            ],
            config_map_volumes: vec![
                ("config".to_string(), ha_config_name(scope.instance)),
                ("health".to_string(), ha_health_config_name(scope.instance)),
            ],
            empty_dir_volumes: vec!["data".to_string()],
        },
    }
    .build()
}

fn announce_service<S: ObjectStore>(
    scope: &ComponentScope<'_, S>,
    index: i32,
    name: &str,
) -> Result<Service, BuildError> {
    let server = ha_server_name(scope.instance);
    let mut selector = selector_labels(&server);
    // Pods are named by the stateful set controller, which never shortens names
    selector.insert(STATEFULSET_POD_NAME.to_string(), format!("{server}-{index}"));

    let mut meta = scope.meta(name);
    meta.annotations
        .insert(TOLERATE_UNREADY_ENDPOINTS_ANNOTATION.to_string(), "true".to_string());

    ServiceRequest {
        meta,
        selector,
        ports: vec![
            PortRequest::same("server", REDIS_PORT),
            PortRequest::same("sentinel", REDIS_SENTINEL_PORT),
        ],
        publish_not_ready_addresses: true,
        ..Default::default()
    }
    .build()
}

/// Cache tier reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedisReconciler;

#[async_trait]
impl<S: ObjectStore> ComponentReconciler<S> for RedisReconciler {
    fn name(&self) -> &'static str {
        COMPONENT_REDIS
    }

    fn topology(&self, instance: &ArgoCD) -> Topology {
        Topology::new(true, instance.spec.ha.enabled)
    }

    fn resources(&self, instance: &ArgoCD) -> Vec<ChildRef> {
        let name = resource_name(instance);
        vec![
            ChildRef::new(ChildKind::ServiceAccount, name.clone()),
            ChildRef::new(ChildKind::Role, name.clone()),
            ChildRef::new(ChildKind::RoleBinding, name.clone()),
            ChildRef::new(ChildKind::ConfigMap, ha_config_name(instance)),
            ChildRef::new(ChildKind::ConfigMap, ha_health_config_name(instance)),
            ChildRef::new(ChildKind::Deployment, name.clone()),
            ChildRef::new(ChildKind::Deployment, ha_proxy_name(instance)),
            ChildRef::new(ChildKind::StatefulSet, ha_server_name(instance)),
            ChildRef::new(ChildKind::PeerServices, ha_announce_base(instance)),
            ChildRef::new(ChildKind::Service, ha_service_name(instance)),
            ChildRef::new(ChildKind::Service, ha_proxy_name(instance)),
            ChildRef::new(ChildKind::Service, name),
        ]
    }

    async fn reconcile(&self, scope: &ComponentScope<'_, S>) -> Result<(), ReconcileError> {
        let instance = scope.instance;
        let name = resource_name(instance);
        let peers = instance.spec.ha.peer_count();
        let auto_tls = scope.auto_tls(REDIS_TLS_SECRET, instance.spec.redis.wants_auto_tls());

        scope
            .converge::<ServiceAccount>(
                Variant::Any,
                &name,
                ServiceAccountRequest { meta: scope.meta(&name) }.build(),
                &[],
            )
            .await?;

        scope
            .converge::<Role>(
                Variant::Any,
                &name,
                RoleRequest {
                    meta: scope.meta(&name),
                    rules: policy_rules(),
                }
                .build(),
                &[],
            )
            .await?;

        scope
            .converge::<RoleBinding>(
                Variant::Any,
                &name,
                RoleBindingRequest {
                    meta: scope.meta(&name),
                    role_name: name.clone(),
                    service_account_name: name.clone(),
                }
                .build(),
                &[],
            )
            .await?;

        let config_name = ha_config_name(instance);
        scope
            .converge::<ConfigMap>(
                Variant::HighAvailability,
                &config_name,
                ConfigMapRequest {
                    meta: scope.meta(&config_name),
                    data: ha_config_data(instance, peers),
                }
                .build(),
                &[],
            )
            .await?;

        let health_name = ha_health_config_name(instance);
        scope
            .converge::<ConfigMap>(
                Variant::HighAvailability,
                &health_name,
                ConfigMapRequest {
                    meta: scope.meta(&health_name),
                    data: ha_health_config_data(),
                }
                .build(),
                &[],
            )
            .await?;

        scope
            .converge::<Deployment>(
                Variant::Standalone,
                &name,
                standalone_deployment(scope, &name),
                &[],
            )
            .await?;

        let proxy_name = ha_proxy_name(instance);
        scope
            .converge::<Deployment>(
                Variant::HighAvailability,
                &proxy_name,
                proxy_deployment(scope, &proxy_name),
                &[],
            )
            .await?;

        let server_name = ha_server_name(instance);
        scope
            .converge::<StatefulSet>(
                Variant::HighAvailability,
                &server_name,
                server_stateful_set(scope, &server_name, peers),
                &[],
            )
            .await?;

        converge_peer_set::<S, Service, _>(
            scope,
            Variant::HighAvailability,
            &ha_announce_base(instance),
            peers,
            |index, member| announce_service(scope, index, member),
        )
        .await?;

        let ha_name = ha_service_name(instance);
        scope
            .converge::<Service>(
                Variant::HighAvailability,
                &ha_name,
                ServiceRequest {
                    meta: scope.meta(&ha_name),
                    selector: selector_labels(&server_name),
                    ports: vec![
                        PortRequest::same("server", REDIS_PORT),
                        PortRequest::same("sentinel", REDIS_SENTINEL_PORT),
                    ],
                    ..Default::default()
                }
                .build(),
                &[],
            )
            .await?;

        scope
            .converge::<Service>(
                Variant::HighAvailability,
                &proxy_name,
                ServiceRequest {
                    meta: scope.meta(&proxy_name),
                    selector: selector_labels(&proxy_name),
                    ports: vec![PortRequest::same("haproxy", REDIS_PORT)],
                    ..Default::default()
                }
                .build(),
                &auto_tls,
            )
            .await?;

        scope
            .converge::<Service>(
                Variant::Standalone,
                &name,
                ServiceRequest {
                    meta: scope.meta(&name),
                    selector: selector_labels(&name),
                    ports: vec![PortRequest::same("tcp-redis", REDIS_PORT)],
                    ..Default::default()
                }
                .build(),
                &auto_tls,
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod redis_tests;
