// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common utilities for cluster-backed integration tests

#![allow(dead_code)]

use argocd_operator::crd::{ArgoCD, ArgoCDSpec};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use std::collections::BTreeMap;

/// Name of the `ArgoCD` CRD that must be installed for these tests
pub const ARGOCD_CRD: &str = "argocds.argoproj.io";

/// Get a Kubernetes client with the `ArgoCD` CRD installed, or skip the test
pub async fn get_kube_client_or_skip() -> Option<Client> {
    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            return None;
        }
    };

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    match crds.get_opt(ARGOCD_CRD).await {
        Ok(Some(_)) => {
            println!("✓ Connected to cluster with {ARGOCD_CRD} installed");
            Some(client)
        }
        Ok(None) => {
            eprintln!("⊘ Skipping integration test: CRD {ARGOCD_CRD} is not installed");
            None
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: cannot query CRDs: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let mut labels = BTreeMap::new();
    labels.insert("test".to_string(), "integration".to_string());
    labels.insert("managed-by".to_string(), "argocd-operator-test".to_string());

    let test_ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &test_ns).await {
        Ok(_) => {
            println!("✓ Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("  Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Delete a test namespace
pub async fn delete_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted test namespace: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("  Test namespace already deleted: {name}");
        }
        Err(e) => eprintln!("⚠ Failed to delete test namespace {name}: {e}"),
    }
}

/// Create an `ArgoCD` instance and return the stored object
pub async fn create_argocd(
    client: &Client,
    namespace: &str,
    name: &str,
    spec: ArgoCDSpec,
) -> Result<ArgoCD, kube::Error> {
    let api: Api<ArgoCD> = Api::namespaced(client.clone(), namespace);
    let mut instance = ArgoCD::new(name, spec);
    instance.metadata.namespace = Some(namespace.to_string());
    api.create(&PostParams::default(), &instance).await
}

/// Fetch the current state of an `ArgoCD` instance
pub async fn get_argocd(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<Option<ArgoCD>, kube::Error> {
    let api: Api<ArgoCD> = Api::namespaced(client.clone(), namespace);
    api.get_opt(name).await
}
