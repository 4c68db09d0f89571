use anyhow::Context;
use clap::Parser;
use cluster_plugins::config::{Config, ServerArgs, DEFAULT_OBSERVER_ENDPOINT};
use cluster_plugins::observers::{
    MetricsServerObserver, Observer, ObserverDispatcher, PrometheusObserver,
};
use cluster_plugins::resource::KubeResourceStore;
use cluster_plugins::timeseries::PrometheusClient;
use cluster_plugins::transport::{shutdown_signal, ObserverHandler, SocketServer};
use cluster_plugins::Registry;
use log::{error, info, warn};
use std::sync::Arc;

/// Command-line arguments for the observer plugin server
#[derive(Parser)]
#[command(
    name = "observer-server",
    about = "Observer plugin server - fetches and aggregates resource metrics",
    long_about = "Serves observer requests over a Unix socket (default /var/run/observer.sock). \
                  Metrics are read from Prometheus range queries or from the Kubernetes \
                  resource metrics API and reduced to a single value."
)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    /// Prometheus server address
    #[arg(
        short,
        long,
        value_name = "URL",
        help = "Prometheus address, e.g. http://prometheus:9090"
    )]
    address: Option<String>,

    /// Range query step
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "Range query step in seconds (default 60)"
    )]
    step: Option<u64>,
}

impl Cli {
    /// Validate the observer-specific arguments on top of the shared ones
    fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        if self.step == Some(0) {
            return Err("Step must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Overlay the Prometheus arguments on the loaded configuration
    fn apply_prometheus(&self, config: &mut Config) {
        if let Some(ref address) = self.address {
            config.prometheus.address = Some(address.clone());
        }
        if let Some(step) = self.step {
            config.prometheus.step_seconds = step;
        }
    }
}

/// Register every observer whose backend can be reached
///
/// A failing backend only skips its observer; the server still starts.
async fn register_observers(config: &Config) -> Registry<dyn Observer> {
    let mut registry: Registry<dyn Observer> = Registry::new("observer");

    match config.prometheus.address.as_deref() {
        Some(address) => match PrometheusClient::new(address, config.prometheus.timeout()) {
            Ok(client) => {
                let observer = PrometheusObserver::new(Arc::new(client), config.prometheus.step());
                let name = observer.name().to_string();
                registry.register(name.clone(), Arc::new(observer));
                info!("Observer [{}] registration is successful", name);
            }
            Err(e) => warn!(
                "Observer [prometheus] registration failed: {}",
                e
            ),
        },
        None => warn!("Observer [prometheus] registration skipped: no address configured"),
    }

    match KubeResourceStore::connect(config.kubernetes.kubeconfig.as_deref()).await {
        Ok(store) => {
            let observer = MetricsServerObserver::new(Arc::new(store));
            let name = observer.name().to_string();
            registry.register(name.clone(), Arc::new(observer));
            info!("Observer [{}] registration is successful", name);
        }
        Err(e) => warn!(
            "Observer [metrics-server] registration failed: {:#}",
            e
        ),
    }

    registry
}

async fn run(config: Config) -> anyhow::Result<()> {
    let registry = register_observers(&config).await;
    if registry.is_empty() {
        warn!("No observers registered; every metric request will get an empty result");
    }
    let dispatcher = ObserverDispatcher::new(Arc::new(registry));

    let endpoint = config.endpoint_or(DEFAULT_OBSERVER_ENDPOINT);
    let server = SocketServer::bind(&endpoint)
        .with_context(|| format!("failed to listen on {}", endpoint.display()))?;
    let shutdown = shutdown_signal().context("Error setting handler for graceful shutdown")?;

    info!("Observer server is running. Press Ctrl+C to stop.");
    server
        .serve(Arc::new(ObserverHandler::new(dispatcher)), shutdown)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.server.init_logging();

    info!("Starting observer plugin server");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = match cli.server.load_config(|config| cli.apply_prometheus(config)) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("Observer server failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Observer server shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn cli() -> Cli {
        Cli {
            server: ServerArgs::default(),
            address: None,
            step: None,
        }
    }

    #[test]
    fn test_cli_validation_without_arguments() {
        assert!(cli().validate().is_ok());
    }

    #[test]
    fn test_cli_validation_rejects_zero_step() {
        let cli = Cli {
            step: Some(0),
            ..cli()
        };
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli {
            address: Some("http://prom:9090".to_string()),
            step: Some(30),
            server: ServerArgs {
                endpoint: Some(PathBuf::from("/tmp/obs.sock")),
                ..Default::default()
            },
        };
        let mut config = Config::from_toml_str(
            "[prometheus]\naddress = \"http://old:9090\"\ntimeout_seconds = 5",
        )
        .unwrap();
        cli.server.apply(&mut config);
        cli.apply_prometheus(&mut config);

        assert_eq!(
            config.prometheus.address.as_deref(),
            Some("http://prom:9090")
        );
        assert_eq!(config.prometheus.step(), Duration::from_secs(30));
        assert_eq!(config.prometheus.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.endpoint_or(DEFAULT_OBSERVER_ENDPOINT),
            PathBuf::from("/tmp/obs.sock")
        );
    }

    #[test]
    fn test_cli_address_still_validated() {
        let cli = Cli {
            address: Some("prom:9090".to_string()),
            ..cli()
        };
        assert!(cli
            .server
            .load_config(|config| cli.apply_prometheus(config))
            .is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "observer-server",
            "--address",
            "http://prom:9090",
            "--step",
            "15",
        ]);
        assert_eq!(cli.address.as_deref(), Some("http://prom:9090"));
        assert_eq!(cli.step, Some(15));
        assert!(!cli.server.verbose);
    }
}
