/// Observer trait and the request/result model
pub mod observer;

/// Kubernetes resource quantity parsing
pub mod quantity;

/// Prometheus-backed observer
pub mod prometheus;

/// Metrics API (metrics-server) observer
pub mod metrics_server;

/// Routing of metric requests to observers
pub mod dispatcher;

pub use dispatcher::ObserverDispatcher;
pub use metrics_server::MetricsServerObserver;
pub use observer::{MetricRecord, MetricRequest, MetricResult, Observer, PluginCapability};
pub use prometheus::PrometheusObserver;
pub use quantity::Quantity;
