// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workloads and their configuration: config maps, deployments and stateful sets.

use super::ResourceMeta;
use crate::errors::BuildError;
use crate::labels::K8S_NAME;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar,
    PodSpec, PodTemplateSpec, ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

/// Request for a `ConfigMap`.
#[derive(Clone, Debug, Default)]
pub struct ConfigMapRequest {
    pub meta: ResourceMeta,
    pub data: BTreeMap<String, String>,
}

impl ConfigMapRequest {
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty.
    pub fn build(&self) -> Result<ConfigMap, BuildError> {
        self.meta.validate("ConfigMap")?;
        Ok(ConfigMap {
            metadata: self.meta.object_meta(),
            data: Some(self.data.clone()),
            ..Default::default()
        })
    }
}

/// One container of a workload.
#[derive(Clone, Debug, Default)]
pub struct ContainerRequest {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    /// (port name, container port)
    pub ports: Vec<(String, i32)>,
    pub env: Vec<(String, String)>,
    pub resources: Option<ResourceRequirements>,
    /// (volume name, mount path)
    pub volume_mounts: Vec<(String, String)>,
}

impl ContainerRequest {
    fn build(&self, kind: &'static str, workload: &str) -> Result<Container, BuildError> {
        if self.image.is_empty() {
            return Err(BuildError::MissingImage {
                kind,
                name: workload.to_string(),
            });
        }

        let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());

        Ok(Container {
            name: self.name.clone(),
            image: Some(self.image.clone()),
            image_pull_policy: Some("Always".to_string()),
            command: non_empty(&self.command),
            args: non_empty(&self.args),
            ports: (!self.ports.is_empty()).then(|| {
                self.ports
                    .iter()
                    .map(|(name, port)| ContainerPort {
                        name: Some(name.clone()),
                        container_port: *port,
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect()
            }),
            env: (!self.env.is_empty()).then(|| {
                self.env
                    .iter()
                    .map(|(name, value)| EnvVar {
                        name: name.clone(),
                        value: Some(value.clone()),
                        ..Default::default()
                    })
                    .collect()
            }),
            resources: self.resources.clone(),
            volume_mounts: (!self.volume_mounts.is_empty()).then(|| {
                self.volume_mounts
                    .iter()
                    .map(|(name, path)| VolumeMount {
                        name: name.clone(),
                        mount_path: path.clone(),
                        ..Default::default()
                    })
                    .collect()
            }),
            ..Default::default()
        })
    }
}

/// Pod template shared by deployments and stateful sets.
#[derive(Clone, Debug, Default)]
pub struct PodRequest {
    pub service_account_name: String,
    pub containers: Vec<ContainerRequest>,
    /// (volume name, config map name)
    pub config_map_volumes: Vec<(String, String)>,
    /// Scratch volumes shared between the pod's containers
    pub empty_dir_volumes: Vec<String>,
}

impl PodRequest {
    fn build(
        &self,
        kind: &'static str,
        meta: &ResourceMeta,
    ) -> Result<PodTemplateSpec, BuildError> {
        if self.containers.is_empty() {
            return Err(BuildError::MissingImage {
                kind,
                name: meta.name.clone(),
            });
        }
        let containers = self
            .containers
            .iter()
            .map(|c| c.build(kind, &meta.name))
            .collect::<Result<Vec<_>, _>>()?;

        let volumes: Vec<Volume> = self
            .config_map_volumes
            .iter()
            .map(|(name, config_map)| Volume {
                name: name.clone(),
                config_map: Some(ConfigMapVolumeSource {
                    name: config_map.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .chain(self.empty_dir_volumes.iter().map(|name| Volume {
                name: name.clone(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            }))
            .collect();

        Ok(PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(pod_labels(meta)),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                service_account_name: (!self.service_account_name.is_empty())
                    .then(|| self.service_account_name.clone()),
                containers,
                volumes: (!volumes.is_empty()).then_some(volumes),
                ..Default::default()
            }),
        })
    }
}

/// Labels that select the pods of a workload.
///
/// Only the name label is used so that changing other labels never orphans running pods.
#[must_use]
pub fn selector_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.to_string(), name.to_string());
    labels
}

fn pod_labels(meta: &ResourceMeta) -> BTreeMap<String, String> {
    let mut labels = meta.labels.clone();
    labels.extend(selector_labels(&meta.name));
    labels
}

fn validate_replicas(kind: &'static str, meta: &ResourceMeta, replicas: i32) -> Result<(), BuildError> {
    if replicas < 1 {
        return Err(BuildError::InvalidReplicas {
            kind,
            name: meta.name.clone(),
            replicas,
        });
    }
    Ok(())
}

/// Request for a `Deployment`.
#[derive(Clone, Debug, Default)]
pub struct DeploymentRequest {
    pub meta: ResourceMeta,
    pub replicas: i32,
    pub pod: PodRequest,
}

impl DeploymentRequest {
    /// # Errors
    ///
    /// Returns an error if the metadata is incomplete, the replica count is not
    /// positive, or a container has no image.
    pub fn build(&self) -> Result<Deployment, BuildError> {
        const KIND: &str = "Deployment";
        self.meta.validate(KIND)?;
        validate_replicas(KIND, &self.meta, self.replicas)?;

        Ok(Deployment {
            metadata: self.meta.object_meta(),
            spec: Some(DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(selector_labels(&self.meta.name)),
                    ..Default::default()
                },
                template: self.pod.build(KIND, &self.meta)?,
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

/// Request for a `StatefulSet` whose pods get stable names `<name>-<index>`.
#[derive(Clone, Debug, Default)]
pub struct StatefulSetRequest {
    pub meta: ResourceMeta,
    pub replicas: i32,
    /// Headless service governing the pods' network identity
    pub service_name: String,
    pub pod: PodRequest,
}

impl StatefulSetRequest {
    /// # Errors
    ///
    /// Returns an error if the metadata is incomplete, the replica count is not
    /// positive, or a container has no image.
    pub fn build(&self) -> Result<StatefulSet, BuildError> {
        const KIND: &str = "StatefulSet";
        self.meta.validate(KIND)?;
        validate_replicas(KIND, &self.meta, self.replicas)?;

        let spec = StatefulSetSpec {
            replicas: Some(self.replicas),
            pod_management_policy: Some("OrderedReady".to_string()),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&self.meta.name)),
                ..Default::default()
            },
            template: self.pod.build(KIND, &self.meta)?,
            ..Default::default()
        };

        Ok(StatefulSet {
            metadata: self.meta.object_meta(),
            spec: Some(self.with_service_name(spec)?),
            ..Default::default()
        })
    }

    /// `serviceName` is required or optional depending on the API version the types were
    /// generated for, so it is set on the wire representation.
    fn with_service_name(&self, spec: StatefulSetSpec) -> Result<StatefulSetSpec, BuildError> {
        if self.service_name.is_empty() {
            return Ok(spec);
        }
        let invalid = |e: serde_json::Error| BuildError::Invalid {
            kind: "StatefulSet",
            name: self.meta.name.clone(),
            reason: e.to_string(),
        };
        let mut value = serde_json::to_value(spec).map_err(invalid)?;
        value["serviceName"] = serde_json::Value::String(self.service_name.clone());
        serde_json::from_value(value).map_err(invalid)
    }
}

#[cfg(test)]
#[path = "workloads_tests.rs"]
mod workloads_tests;
