// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ObjectStore`] backed by the Kubernetes API.

use super::{selector_string, ChildResource, ClusterChildResource, ObjectStore};
use crate::constants::FIELD_MANAGER;
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::errors::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Kubernetes phase of a namespace that is being deleted
const NAMESPACE_PHASE_TERMINATING: &str = "Terminating";

/// Store talking to the API server through a [`kube::Client`].
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ChildResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn cluster_api<K: ClusterChildResource>(&self) -> Api<K> {
        Api::all(self.client.clone())
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

/// Map API status codes to the typed store errors.
fn classify(
    error: kube::Error,
    kind: &str,
    name: &str,
    namespace: &str,
    on_conflict_exists: bool,
) -> StoreError {
    let kind = kind.to_string();
    match error {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 && on_conflict_exists => StoreError::AlreadyExists {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: ChildResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, StoreError> {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify(e, &K::kind(&()), name, namespace, false))
    }

    async fn create<K: ChildResource>(&self, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let namespace = object.namespace().unwrap_or_default();
        self.api::<K>(&namespace)
            .create(&Self::post_params(), object)
            .await
            .map_err(|e| classify(e, &K::kind(&()), &name, &namespace, true))
    }

    async fn update<K: ChildResource>(&self, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let namespace = object.namespace().unwrap_or_default();
        self.api::<K>(&namespace)
            .replace(&name, &Self::post_params(), object)
            .await
            .map_err(|e| classify(e, &K::kind(&()), &name, &namespace, false))
    }

    async fn delete<K: ChildResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<bool, StoreError> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(namespace = %namespace, name = %name, kind = %K::kind(&()), "Already deleted");
                Ok(false)
            }
            Err(e) => Err(classify(e, &K::kind(&()), name, namespace, false)),
        }
    }

    async fn list<K: ChildResource>(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        let params = ListParams::default().labels(&selector_string(selector));
        let list = self.api::<K>(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn get_cluster<K: ClusterChildResource>(&self, name: &str) -> Result<Option<K>, StoreError> {
        self.cluster_api::<K>()
            .get_opt(name)
            .await
            .map_err(|e| classify(e, &K::kind(&()), name, "", false))
    }

    async fn create_cluster<K: ClusterChildResource>(&self, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        self.cluster_api::<K>()
            .create(&Self::post_params(), object)
            .await
            .map_err(|e| classify(e, &K::kind(&()), &name, "", true))
    }

    async fn update_cluster<K: ClusterChildResource>(&self, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        self.cluster_api::<K>()
            .replace(&name, &Self::post_params(), object)
            .await
            .map_err(|e| classify(e, &K::kind(&()), &name, "", false))
    }

    async fn delete_cluster<K: ClusterChildResource>(&self, name: &str) -> Result<bool, StoreError> {
        match self
            .cluster_api::<K>()
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(name = %name, kind = %K::kind(&()), "Already deleted");
                Ok(false)
            }
            Err(e) => Err(classify(e, &K::kind(&()), name, "", false)),
        }
    }

    async fn list_cluster<K: ClusterChildResource>(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        let params = ListParams::default().labels(&selector_string(selector));
        let list = self.cluster_api::<K>().list(&params).await?;
        Ok(list.items)
    }

    async fn namespace_terminating(&self, namespace: &str) -> Result<bool, StoreError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let Some(ns) = api.get_opt(namespace).await? else {
            // A namespace that is already gone cannot host new children
            return Ok(true);
        };

        let phase_terminating = ns
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|phase| phase == NAMESPACE_PHASE_TERMINATING);

        Ok(ns.metadata.deletion_timestamp.is_some() || phase_terminating)
    }

    async fn set_instance_finalizers(
        &self,
        instance: &ArgoCD,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        let name = instance.name_any();
        let namespace = instance.namespace().unwrap_or_default();
        let api: Api<ArgoCD> = Api::namespaced(self.client.clone(), &namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &ArgoCD::kind(&()), &name, &namespace, false))?;
        Ok(())
    }

    async fn patch_instance_status(
        &self,
        instance: &ArgoCD,
        status: &ArgoCDStatus,
    ) -> Result<(), StoreError> {
        let name = instance.name_any();
        let namespace = instance.namespace().unwrap_or_default();
        let api: Api<ArgoCD> = Api::namespaced(self.client.clone(), &namespace);
        let patch = json!({ "status": status });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify(e, &ArgoCD::kind(&()), &name, &namespace, false))?;
        Ok(())
    }
}
