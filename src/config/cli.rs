use crate::config::Config;
use crate::error::ConfigError;
use clap::Args;
use log::warn;
use std::path::PathBuf;

/// Command-line arguments shared by both plugin servers
#[derive(Debug, Clone, Default, Args)]
pub struct ServerArgs {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    pub config: Option<PathBuf>,

    /// Unix socket to listen on
    #[arg(short, long, value_name = "PATH", help = "Socket path")]
    pub endpoint: Option<PathBuf>,

    /// Kubeconfig file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Kubeconfig path; the in-cluster configuration is used when omitted"
    )]
    pub kubeconfig: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    pub verbose: bool,
}

impl ServerArgs {
    /// Initialize logging based on verbosity
    pub fn init_logging(&self) {
        if self.verbose {
            std::env::set_var("RUST_LOG", "debug");
        }
        env_logger::init();
    }

    /// Validate the CLI arguments
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in Config::load
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }

        if let Some(ref endpoint) = self.endpoint {
            if endpoint.as_os_str().is_empty() {
                return Err("Socket path must not be empty".to_string());
            }
            if endpoint.is_dir() {
                return Err(format!(
                    "Socket path is a directory: {}",
                    endpoint.display()
                ));
            }
        }

        if let Some(ref kubeconfig) = self.kubeconfig {
            if !kubeconfig.is_file() {
                warn!("Kubeconfig {} does not exist", kubeconfig.display());
            }
        }

        Ok(())
    }

    /// Overlay command-line values on the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref endpoint) = self.endpoint {
            config.server.endpoint = Some(endpoint.clone());
        }
        if let Some(ref kubeconfig) = self.kubeconfig {
            config.kubernetes.kubeconfig = Some(kubeconfig.clone());
        }
    }

    /// Load the configuration, apply these arguments plus `overlay`, then validate
    pub fn load_config(&self, overlay: impl FnOnce(&mut Config)) -> Result<Config, ConfigError> {
        let mut config = Config::load(self.config.as_deref());
        self.apply(&mut config);
        overlay(&mut config);
        config.validate()?;
        Ok(config)
    }
}
