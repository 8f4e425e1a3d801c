// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service builder.

use super::ResourceMeta;
use crate::errors::BuildError;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Default Kubernetes service type
pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";

/// One port exposed by a service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortRequest {
    pub name: String,
    pub port: i32,
    pub target_port: i32,
}

impl PortRequest {
    /// Port whose service and container port are the same.
    #[must_use]
    pub fn same(name: &str, port: i32) -> Self {
        Self {
            name: name.to_string(),
            port,
            target_port: port,
        }
    }

    /// Port forwarding `port` to a different container port.
    #[must_use]
    pub fn forward(name: &str, port: i32, target_port: i32) -> Self {
        Self {
            name: name.to_string(),
            port,
            target_port,
        }
    }
}

/// Request for a `Service`.
#[derive(Clone, Debug, Default)]
pub struct ServiceRequest {
    pub meta: ResourceMeta,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<PortRequest>,
    /// Defaults to `ClusterIP`
    pub service_type: Option<String>,
    /// Publish endpoints of pods that are not ready yet (peer discovery)
    pub publish_not_ready_addresses: bool,
}

impl ServiceRequest {
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty or no port is requested.
    pub fn build(&self) -> Result<Service, BuildError> {
        self.meta.validate("Service")?;
        if self.ports.is_empty() {
            return Err(BuildError::NoPorts {
                kind: "Service",
                name: self.meta.name.clone(),
            });
        }

        let ports = self
            .ports
            .iter()
            .map(|p| ServicePort {
                name: Some(p.name.clone()),
                port: p.port,
                target_port: Some(IntOrString::Int(p.target_port)),
                protocol: Some("TCP".into()),
                ..Default::default()
            })
            .collect();

        Ok(Service {
            metadata: self.meta.object_meta(),
            spec: Some(ServiceSpec {
                selector: Some(self.selector.clone()),
                ports: Some(ports),
                type_: Some(
                    self.service_type
                        .clone()
                        .unwrap_or_else(|| SERVICE_TYPE_CLUSTER_IP.to_string()),
                ),
                publish_not_ready_addresses: self.publish_not_ready_addresses.then_some(true),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
#[path = "networking_tests.rs"]
mod networking_tests;
