// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use kubehomedns::{
    cloudflare::CloudflareClient,
    config::{Cli, Credentials},
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    http::{build_http_client, install_crypto_provider},
    ingress::KubeIngressSource,
    metrics_server,
    public_ip::HttpIpResolver,
    reconcilers::DnsReconciler,
    records::ZoneHandle,
    sync::{run_full_sync_loop, run_label_trigger_loop},
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    install_crypto_provider();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("kubehomedns")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json|text`.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
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
}

async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let Some(path) = kubeconfig else {
        return Ok(Client::try_default().await?);
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("reading kubeconfig {}", path.display()))?;
    let config =
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(Client::try_from(config)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Resolves only if the metrics server stops; pending forever when disabled.
async fn metrics_server_exit(handle: Option<JoinHandle<std::io::Result<()>>>) -> Result<()> {
    match handle {
        Some(handle) => Ok(handle.await??),
        None => std::future::pending().await,
    }
}

async fn async_main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        full_sync_interval_secs = cli.full_sync_interval_secs,
        label_sync_interval_secs = cli.label_sync_interval_secs,
        sentinel_label = %cli.sentinel_label,
        "Starting kubehomedns"
    );

    debug!("Initializing Kubernetes client");
    let client = kube_client(cli.kubeconfig.as_deref()).await?;

    let credentials = Credentials::load(&cli, &client)
        .await
        .context("loading Cloudflare credentials")?;

    // One connection pool for the DNS provider and the IP resolver
    let http = build_http_client(cli.http_timeout())?;

    let store = CloudflareClient::new(
        http.clone(),
        credentials.api_key,
        ZoneHandle::new(credentials.zone_id),
    )
    .with_base_url(&cli.api_base_url);
    let resolver = HttpIpResolver::with_url(http, cli.public_ip_url.clone());
    let reconciler = DnsReconciler::new(Arc::new(store), Arc::new(resolver))
        .with_defaults(cli.record_defaults());

    let settings = cli.sync_settings();
    let ingresses = KubeIngressSource::new(client, settings.sentinel_label.clone());
    let ctx = Arc::new(Context::new(
        Arc::new(ingresses),
        Arc::new(reconciler),
        settings,
    ));

    let metrics = match cli.metrics_address() {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding metrics server to {addr}"))?;
            Some(tokio::spawn(metrics_server::serve(listener)))
        }
        None => {
            info!("Metrics server disabled");
            None
        }
    };

    info!("Starting sync loops");
    let full_sync = tokio::spawn(run_full_sync_loop(Arc::clone(&ctx)));
    let label_trigger = tokio::spawn(run_label_trigger_loop(ctx));

    // Loops never return on their own; an exit means a panic
    tokio::select! {
        result = full_sync => {
            error!("CRITICAL: full sync loop exited unexpectedly: {:?}", result);
            anyhow::bail!("full sync loop exited unexpectedly")
        }
        result = label_trigger => {
            error!("CRITICAL: label trigger loop exited unexpectedly: {:?}", result);
            anyhow::bail!("label trigger loop exited unexpectedly")
        }
        result = metrics_server_exit(metrics) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        () = shutdown_signal() => {
            info!("Shutdown signal received, exiting");
            Ok(())
        }
    }
}
