use thiserror::Error;

/// Errors surfaced by executor and observer plugins
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error("Failed to decode payload: {0}")]
    Decode(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Unsupported time series shape: {0}")]
    UnsupportedShape(String),
}

/// Errors returned by a resource store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<StoreError> for PluginError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PluginError::NotFound(what),
            StoreError::Conflict(msg) => PluginError::Conflict(msg),
            StoreError::Backend(msg) => PluginError::Backend(msg),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors raised by the socket transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Socket path problem: {0}")]
    SocketPath(String),

    #[error("Malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Request line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("Too many connections (max {max})")]
    TooManyConnections { max: usize },
}
