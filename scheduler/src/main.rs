use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use ns_scheduler::{bootstrap::build_registry, kube_client, Cli};
use scheduler_api::{create_app, AppState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use workload_driver::KubeWorkloadDriver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.logging_level.as_env_filter_directive())),
        )
        .init();

    info!(config_file = %cli.config_file, "reading scheduler config");
    let config = config_loader::load(Path::new(&cli.config_file))?;
    info!(
        schedules = config.schedules.len(),
        environments = config.environments.len(),
        "config validated"
    );

    info!("initializing kubernetes client");
    let kube_client = kube_client::build(cli.incluster, cli.context.as_deref()).await?;
    let driver: Arc<dyn workload_driver::WorkloadDriver> =
        Arc::new(KubeWorkloadDriver::new(kube_client));

    let registry = Arc::new(build_registry(&config, driver)?);
    let cancellation = CancellationToken::new();
    let supervisor = scheduler_controller::Supervisor::new(Arc::clone(&registry), cancellation.clone());

    let supervisor_task = tokio::spawn(async move { supervisor.run().await });

    if cli.no_api {
        wait_for_shutdown_signal().await;
        cancellation.cancel();
    } else {
        let app = create_app(AppState { registry });
        let addr: SocketAddr = format!("{}:{}", cli.listen_host, cli.listen_port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "starting API server");

        let shutdown_cancellation = cancellation.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                wait_for_shutdown_signal().await;
                shutdown_cancellation.cancel();
            })
            .await?;
    }

    if let Err(err) = supervisor_task.await {
        error!(error = %err, "supervisor task ended abnormally");
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl+C handler");
    }
    info!("shutdown signal received");
}
