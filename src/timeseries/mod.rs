/// Time series value shapes returned by a backend
pub mod value;

/// Conversion of backend values into ordered samples
pub mod normalize;

/// Reduction of samples to a single data point
pub mod aggregate;

/// Time series backend trait
pub mod backend;

/// Prometheus HTTP API client
pub mod prometheus;

pub use aggregate::{aggregate, Aggregation, DataPoint};
pub use backend::{QueryRange, TimeSeriesBackend};
pub use normalize::normalize;
pub use prometheus::PrometheusClient;
pub use value::{InstantSample, Sample, Series, TimeSeriesValue};
