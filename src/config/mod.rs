/// TOML settings for the plugin servers
pub mod settings;

/// Command-line arguments shared by the server binaries
pub mod cli;

pub use cli::ServerArgs;
pub use settings::{
    Config, KubernetesConfig, PrometheusConfig, ServerConfig, DEFAULT_EXECUTOR_ENDPOINT,
    DEFAULT_OBSERVER_ENDPOINT,
};
