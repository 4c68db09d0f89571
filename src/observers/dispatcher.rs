use crate::error::PluginError;
use crate::observers::{MetricRequest, MetricResult, Observer, PluginCapability};
use crate::registry::Registry;
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Routes metric requests to the observer named by their `source`
///
/// Capability discovery only reads the observers' static declarations. A request
/// for an unregistered observer gets an empty result, not an error.
pub struct ObserverDispatcher {
    registry: Arc<Registry<dyn Observer>>,
}

impl ObserverDispatcher {
    pub fn new(registry: Arc<Registry<dyn Observer>>) -> Self {
        Self { registry }
    }

    pub fn get_plugin_names(&self) -> BTreeSet<String> {
        self.registry.names()
    }

    /// Capabilities of every registered observer, keyed by observer name
    pub fn get_capabilities(&self) -> BTreeMap<String, BTreeMap<String, PluginCapability>> {
        self.registry
            .iter()
            .map(|(name, observer)| (name.to_string(), observer.capabilities()))
            .collect()
    }

    pub async fn get_metrics(&self, request: &MetricRequest) -> Result<MetricResult, PluginError> {
        info!("GetMetrics with req: {:?}", request);

        let Some(observer) = self.registry.lookup(&request.source) else {
            warn!(
                "GetMetrics request plugin {}, but it doesn't exist",
                request.source
            );
            return Ok(MetricResult::default());
        };

        observer.fetch_data(request).await.map_err(|e| {
            error!(
                "GetMetrics fetch data for {} from {} error: {}",
                request.metric_name, request.source, e
            );
            e
        })
    }
}
