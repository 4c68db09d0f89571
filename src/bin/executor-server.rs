use anyhow::Context;
use clap::Parser;
use cluster_plugins::config::{Config, ServerArgs, DEFAULT_EXECUTOR_ENDPOINT};
use cluster_plugins::executors::{builtin_executors, ExecutionDispatcher};
use cluster_plugins::resource::KubeResourceStore;
use cluster_plugins::transport::{shutdown_signal, ExecutorHandler, SocketServer};
use log::{error, info};
use std::sync::Arc;

/// Command-line arguments for the executor plugin server
#[derive(Parser)]
#[command(
    name = "executor-server",
    about = "Executor plugin server - applies label and tag actions to cluster resources",
    long_about = "Serves executor requests over a Unix socket (default /var/run/executor.sock). \
                  Each request names a resource and an ordered list of executors that label or \
                  tag it, or revert those changes."
)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = KubeResourceStore::connect(config.kubernetes.kubeconfig.as_deref()).await?;
    let dispatcher = ExecutionDispatcher::new(Arc::new(builtin_executors()), Arc::new(store));

    let endpoint = config.endpoint_or(DEFAULT_EXECUTOR_ENDPOINT);
    let server = SocketServer::bind(&endpoint)
        .with_context(|| format!("failed to listen on {}", endpoint.display()))?;
    let shutdown = shutdown_signal().context("Error setting handler for graceful shutdown")?;

    info!("Executor server is running. Press Ctrl+C to stop.");
    server
        .serve(Arc::new(ExecutorHandler::new(dispatcher)), shutdown)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.server.init_logging();

    info!("Starting executor plugin server");

    if let Err(e) = cli.server.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = match cli.server.load_config(|_| {}) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("Executor server failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Executor server shutdown complete");
}
