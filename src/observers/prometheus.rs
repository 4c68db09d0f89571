use crate::error::PluginError;
use crate::observers::{MetricRecord, MetricRequest, MetricResult, Observer, PluginCapability};
use crate::timeseries::aggregate::DEFAULT_AGGREGATION;
use crate::timeseries::{aggregate, normalize, DataPoint, QueryRange, TimeSeriesBackend};
use crate::BoxFuture;
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default registration name of the Prometheus observer
pub const PROMETHEUS_OBSERVER: &str = "prometheus";

/// Resource kinds whose query results are aggregated; anything else gets the raw payload
const AGGREGATED_KINDS: [&str; 2] = ["Pod", "Node"];

/// Observer running range queries against a time series backend
///
/// For `Pod` and `Node` requests the result is normalised and reduced to a
/// single record with the requested operator. For any other kind the backend
/// payload is returned verbatim as JSON, stamped with the query end time.
pub struct PrometheusObserver {
    backend: Arc<dyn TimeSeriesBackend>,
    step: Duration,
}

impl PrometheusObserver {
    pub fn new(backend: Arc<dyn TimeSeriesBackend>, step: Duration) -> Self {
        debug!("prometheus observer step: {:?}", step);
        Self { backend, step }
    }

    async fn query(&self, request: &MetricRequest, op: &str) -> Result<DataPoint, PluginError> {
        let range = QueryRange::from_millis(request.start_time, request.end_time, self.step)?;
        let end = range.end_millis();

        let value = self
            .backend
            .query_range(&request.query, range)
            .await
            .map_err(|e| {
                error!("query '{}' error: {}", request.query, e);
                e
            })?;

        if AGGREGATED_KINDS.contains(&request.kind.as_str()) {
            let samples = normalize(&value)?;
            Ok(aggregate(op, &samples, end))
        } else {
            Ok(DataPoint {
                timestamp: end,
                value: value.to_raw_json().to_string(),
            })
        }
    }
}

impl Observer for PrometheusObserver {
    fn name(&self) -> &str {
        PROMETHEUS_OBSERVER
    }

    fn capabilities(&self) -> BTreeMap<String, PluginCapability> {
        let aggregations = ["max", "min", "avg"];
        BTreeMap::from([
            (
                "cpu".to_string(),
                PluginCapability::new(
                    "m",
                    "request pod or node cpu information from prometheus",
                    &aggregations,
                ),
            ),
            (
                "memory".to_string(),
                PluginCapability::new(
                    "byte",
                    "request pod or node memory information from prometheus",
                    &aggregations,
                ),
            ),
        ])
    }

    fn fetch_data<'a>(
        &'a self,
        request: &'a MetricRequest,
    ) -> BoxFuture<'a, Result<MetricResult, PluginError>> {
        Box::pin(async move {
            debug!("prometheus query: {}", request.query);
            let op = request
                .aggregation
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_AGGREGATION);

            let point = self.query(request, op).await?;
            info!(
                "query by metric '{}', query '{}' successfully",
                request.metric_name, request.query
            );

            let mut result = MetricResult::for_request(request);
            result.source = PROMETHEUS_OBSERVER.to_string();
            result.records.push(MetricRecord {
                timestamp: point.timestamp,
                value: point.value,
            });
            Ok(result)
        })
    }
}
