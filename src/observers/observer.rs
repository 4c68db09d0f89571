use crate::error::PluginError;
use crate::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Trait implemented by every observer plugin
pub trait Observer: Send + Sync {
    /// Name the observer is registered under
    fn name(&self) -> &str;

    /// Static capability declaration, keyed by metric name
    ///
    /// Must not perform any I/O.
    fn capabilities(&self) -> BTreeMap<String, PluginCapability>;

    fn fetch_data<'a>(
        &'a self,
        request: &'a MetricRequest,
    ) -> BoxFuture<'a, Result<MetricResult, PluginError>>;
}

/// What an observer can report for one metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCapability {
    pub unit: String,
    pub description: String,
    /// Supported aggregation operators, serialised as a sorted list
    pub aggregations: BTreeSet<String>,
}

impl PluginCapability {
    pub fn new(unit: &str, description: &str, aggregations: &[&str]) -> Self {
        Self {
            unit: unit.to_string(),
            description: description.to_string(),
            aggregations: aggregations.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// One metric request routed to a single observer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricRequest {
    /// Name of the observer that should serve the request
    pub source: String,
    /// Kind of the observed resource (`Pod`, `Node`, ...)
    pub kind: String,
    /// Only the first name is honoured
    pub resource_names: Vec<String>,
    pub namespace: String,
    pub metric_name: String,
    pub query: String,
    /// Epoch milliseconds
    pub start_time: i64,
    /// Epoch milliseconds
    pub end_time: i64,
    /// Only the first operator is honoured
    pub aggregation: Vec<String>,
    pub unit: String,
}

impl MetricRequest {
    /// First requested resource name, empty when none was given
    pub fn resource_name(&self) -> &str {
        self.resource_names.first().map(String::as_str).unwrap_or("")
    }
}

/// A single timestamped value of a metric result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub value: String,
}

/// Observer response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    pub resource_name: String,
    pub namespace: String,
    pub unit: String,
    pub source: String,
    pub records: Vec<MetricRecord>,
}

impl MetricResult {
    /// Empty result echoing the identity fields of `request`
    pub fn for_request(request: &MetricRequest) -> Self {
        Self {
            resource_name: request.resource_name().to_string(),
            namespace: request.namespace.clone(),
            unit: request.unit.clone(),
            source: String::new(),
            records: Vec::new(),
        }
    }
}
