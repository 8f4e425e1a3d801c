// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use argocd_operator::{
    config::{AutoTls, LogFormat, OperatorConfig},
    constants::METRICS_SERVER_PATH,
    context::Context,
    crd::ArgoCD,
    errors::ReconcileError,
    metrics,
    store::KubeStore,
};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, Resource, ResourceExt,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("argocd-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    // Format: timestamp file:line LEVEL message
    // Respects RUST_LOG if set, otherwise defaults to INFO
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Argo CD Operator");
    debug!(?config, "Logging initialized with file and line number tracking");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let auto_tls_managed = detect_auto_tls(&client, config.auto_tls).await?;
    info!("Auto-TLS annotation management: {}", auto_tls_managed);

    let metrics_addr = config.metrics_addr;
    let context = Arc::new(Context::new(
        KubeStore::new(client.clone()),
        config,
        auto_tls_managed,
    ));

    // Neither task should ever exit; if one does, the process exits with it
    tokio::select! {
        result = run_metrics_server(metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = run_argocd_controller(client, context) => {
            info!("ArgoCD controller stopped");
            result
        }
    }
}

/// Decide whether auto-TLS annotations are managed on this cluster.
async fn detect_auto_tls(client: &Client, mode: AutoTls) -> Result<bool> {
    if mode != AutoTls::Auto {
        return Ok(mode.resolve(std::iter::empty()));
    }

    debug!("Probing API server for the route API group");
    let groups = client.list_api_groups().await?;
    Ok(mode.resolve(groups.groups.iter().map(|group| group.name.as_str())))
}

/// Serve `GET /metrics` in the Prometheus text format.
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving metrics on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    metrics::gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Api for `K`, restricted to the watch namespace when one is configured.
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the `ArgoCD` controller
async fn run_argocd_controller(client: Client, context: Arc<Context>) -> Result<()> {
    let namespace = context.config.watch_namespace().map(str::to_string);
    info!(
        "Starting ArgoCD controller (namespace: {})",
        namespace.as_deref().unwrap_or("<all>")
    );

    let ns = namespace.as_deref();
    let watcher_config = Config::default();

    Controller::new(scoped_api::<ArgoCD>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<ServiceAccount>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<Role>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<RoleBinding>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<ConfigMap>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<Deployment>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<StatefulSet>(&client, ns), watcher_config.clone())
        .owns(scoped_api::<Service>(&client, ns), watcher_config)
        .shutdown_on_signal()
        .run(reconcile_argocd_wrapper, error_policy, context)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("Controller event: {}", e);
            }
            futures::future::ready(())
        })
        .await;

    Ok(())
}

/// Reconcile wrapper for `ArgoCD`
async fn reconcile_argocd_wrapper(
    instance: Arc<ArgoCD>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    debug!(
        name = %instance.name_any(),
        namespace = ?instance.namespace(),
        "Reconcile wrapper called for ArgoCD"
    );

    match ctx.reconcile(&instance).await {
        Ok(action) => {
            info!(
                "Successfully reconciled ArgoCD: {}/{}",
                instance.namespace().unwrap_or_default(),
                instance.name_any()
            );
            Ok(action)
        }
        Err(e) => {
            error!("Failed to reconcile ArgoCD {}: {}", instance.name_any(), e);
            Err(e)
        }
    }
}

/// Error policy for the `ArgoCD` controller
fn error_policy(
    _instance: Arc<ArgoCD>,
    err: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    warn!("Requeueing after error ({})", err.category());
    ctx.error_action(err)
}
