/// Error types for plugins, stores, configuration and transport
pub mod error;

/// Name-keyed plugin registry shared by both plugin families
pub mod registry;

/// Resource identity, model and stores
pub mod resource;

/// Executor plugins and the execution dispatcher
pub mod executors;

/// Time series shapes, normalisation, aggregation and backends
pub mod timeseries;

/// Observer plugins and the observer dispatcher
pub mod observers;

/// Line-delimited JSON transport over Unix sockets
pub mod transport;

/// Configuration management
pub mod config;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by plugin and collaborator trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export commonly used types
pub use error::{ConfigError, PluginError, StoreError, TransportError};
pub use registry::Registry;
