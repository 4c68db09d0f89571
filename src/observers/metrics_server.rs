use crate::error::PluginError;
use crate::observers::{
    MetricRecord, MetricRequest, MetricResult, Observer, PluginCapability, Quantity,
};
use crate::resource::{ResourceKey, ResourceStore};
use crate::BoxFuture;
use chrono::Utc;
use log::{debug, error, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default registration name of the metrics-server observer
pub const METRICS_SERVER_OBSERVER: &str = "metrics-server";

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

/// Usage map of a metrics object, resource name to quantity string
type Usage = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct PodMetrics {
    #[serde(default)]
    containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetrics {
    #[serde(default)]
    name: String,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct NodeMetrics {
    #[serde(default)]
    usage: Usage,
}

/// Resource kinds served by the metrics API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricsKind {
    Pod,
    Node,
}

impl MetricsKind {
    fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "Pod" => Some(Self::Pod),
            "Node" => Some(Self::Node),
            _ => None,
        }
    }
}

/// Observer reading current usage from the resource metrics API
///
/// Pod usage is the sum over all containers. CPU is reported in millicores,
/// everything else in bytes. The record carries the time of the read.
pub struct MetricsServerObserver {
    store: Arc<dyn ResourceStore>,
}

impl MetricsServerObserver {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Key of the metrics object backing a Pod or Node request
    ///
    /// Pod metrics are namespaced, so a Pod request without a namespace is
    /// rejected instead of being looked up cluster-wide.
    fn metrics_key(
        kind: MetricsKind,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceKey, PluginError> {
        if name.is_empty() {
            return Err(PluginError::Decode(
                "metric request names no resource".to_string(),
            ));
        }
        match kind {
            MetricsKind::Pod if namespace.is_empty() => Err(PluginError::Decode(format!(
                "pod metric request for {} has no namespace",
                name
            ))),
            MetricsKind::Pod => Ok(ResourceKey::new(
                METRICS_GROUP,
                METRICS_VERSION,
                "pods",
                namespace,
                name,
            )),
            MetricsKind::Node => Ok(ResourceKey::new(
                METRICS_GROUP,
                METRICS_VERSION,
                "nodes",
                "",
                name,
            )),
        }
    }

    /// Sum the usage of `metric` across a pod's containers
    ///
    /// Any metric other than `cpu` is read from the memory usage.
    fn sum_pod(body: serde_json::Value, metric: &str) -> Result<Quantity, PluginError> {
        let pod: PodMetrics = serde_json::from_value(body)
            .map_err(|e| PluginError::Decode(format!("unmarshal pod-metric error: {}", e)))?;

        let resource = if metric == "cpu" { "cpu" } else { "memory" };
        pod.containers
            .iter()
            .map(|container| {
                debug!("container {} usage: {:?}", container.name, container.usage);
                parse_usage(&container.usage, resource)
            })
            .sum()
    }

    fn sum_node(body: serde_json::Value, metric: &str) -> Result<Quantity, PluginError> {
        let node: NodeMetrics = serde_json::from_value(body)
            .map_err(|e| PluginError::Decode(format!("unmarshal node-metric error: {}", e)))?;
        parse_usage(&node.usage, metric)
    }
}

/// Quantity of `resource` in a usage map, zero when absent
fn parse_usage(usage: &Usage, resource: &str) -> Result<Quantity, PluginError> {
    usage
        .get(resource)
        .map(|raw| raw.parse())
        .unwrap_or(Ok(Quantity::default()))
}

/// Convert a summed quantity into the reported number and unit
fn scale(total: Quantity, metric: &str) -> (i128, &'static str) {
    if metric == "cpu" {
        (total.milli_value(), "m")
    } else {
        (total.value(), "byte")
    }
}

impl Observer for MetricsServerObserver {
    fn name(&self) -> &str {
        METRICS_SERVER_OBSERVER
    }

    fn capabilities(&self) -> BTreeMap<String, PluginCapability> {
        BTreeMap::from([
            (
                "cpu".to_string(),
                PluginCapability::new(
                    "m",
                    "request pod or node cpu information from metrics server",
                    &["time"],
                ),
            ),
            (
                "memory".to_string(),
                PluginCapability::new(
                    "byte",
                    "request pod or node memory information from metrics server",
                    &["time"],
                ),
            ),
        ])
    }

    fn fetch_data<'a>(
        &'a self,
        request: &'a MetricRequest,
    ) -> BoxFuture<'a, Result<MetricResult, PluginError>> {
        Box::pin(async move {
            let mut result = MetricResult::for_request(request);
            result.source = METRICS_SERVER_OBSERVER.to_string();

            let Some(kind) = MetricsKind::from_kind(&request.kind) else {
                warn!("metrics-server doesn't support kind {}", request.kind);
                return Ok(result);
            };
            let key = Self::metrics_key(kind, &request.namespace, request.resource_name())?;

            let body = self
                .store
                .get(&key)
                .await
                .map_err(|e| {
                    error!("failed to get {} metrics: {}", key, e);
                    PluginError::from(e)
                })?
                .body;
            debug!("query: {}", request.query);

            let total = match kind {
                MetricsKind::Pod => Self::sum_pod(body, &request.metric_name)?,
                MetricsKind::Node => Self::sum_node(body, &request.metric_name)?,
            };

            let (value, unit) = scale(total, &request.metric_name);
            result.unit = unit.to_string();
            result.records.push(MetricRecord {
                timestamp: Utc::now().timestamp_millis(),
                value: format!("{:.3}", value as f64),
            });
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::resource::{MemoryStore, Resource};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn pod_metrics_key() -> ResourceKey {
        ResourceKey::new(METRICS_GROUP, METRICS_VERSION, "pods", "default", "web-0")
    }

    fn node_metrics_key() -> ResourceKey {
        ResourceKey::new(METRICS_GROUP, METRICS_VERSION, "nodes", "", "node-1")
    }

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            pod_metrics_key(),
            Resource::new("PodMetrics", "web-0").with_body(json!({
                "apiVersion": "metrics.k8s.io/v1beta1",
                "kind": "PodMetrics",
                "metadata": {"name": "web-0", "namespace": "default"},
                "window": "30s",
                "containers": [
                    {"name": "app", "usage": {"cpu": "250m", "memory": "64Mi"}},
                    {"name": "sidecar", "usage": {"cpu": "1500001n", "memory": "1Ki"}}
                ]
            })),
        );
        store.insert(
            node_metrics_key(),
            Resource::new("NodeMetrics", "node-1").with_body(json!({
                "kind": "NodeMetrics",
                "metadata": {"name": "node-1"},
                "usage": {"cpu": "2", "memory": "1Gi"}
            })),
        );
        store
    }

    fn request(kind: &str, name: &str, metric: &str) -> MetricRequest {
        MetricRequest {
            source: METRICS_SERVER_OBSERVER.to_string(),
            kind: kind.to_string(),
            resource_names: vec![name.to_string()],
            namespace: "default".to_string(),
            metric_name: metric.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pod_cpu_sums_containers_in_millicores() {
        let observer = MetricsServerObserver::new(store());
        let before = Utc::now().timestamp_millis();

        let result = observer
            .fetch_data(&request("Pod", "web-0", "cpu"))
            .await
            .unwrap();

        assert_eq!(result.unit, "m");
        assert_eq!(result.source, METRICS_SERVER_OBSERVER);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].value, "252.000");
        assert!(result.records[0].timestamp >= before);
    }

    #[tokio::test]
    async fn test_pod_non_cpu_metric_reads_memory() {
        let observer = MetricsServerObserver::new(store());

        let result = observer
            .fetch_data(&request("Pod", "web-0", "working_set"))
            .await
            .unwrap();

        assert_eq!(result.unit, "byte");
        assert_eq!(result.records[0].value, "67109888.000");
    }

    #[tokio::test]
    async fn test_node_memory_in_bytes() {
        let observer = MetricsServerObserver::new(store());

        let result = observer
            .fetch_data(&request("Node", "node-1", "memory"))
            .await
            .unwrap();

        assert_eq!(result.unit, "byte");
        assert_eq!(result.records[0].value, "1073741824.000");
    }

    #[tokio::test]
    async fn test_node_unknown_metric_is_zero() {
        let observer = MetricsServerObserver::new(store());

        let result = observer
            .fetch_data(&request("Node", "node-1", "gpu"))
            .await
            .unwrap();

        assert_eq!(result.records[0].value, "0.000");
    }

    #[tokio::test]
    async fn test_unsupported_kind_returns_empty_result() {
        let observer = MetricsServerObserver::new(store());

        let result = observer
            .fetch_data(&request("Deployment", "web", "cpu"))
            .await
            .unwrap();

        assert!(result.records.is_empty());
        assert_eq!(result.resource_name, "web");
    }

    #[tokio::test]
    async fn test_missing_metrics_object_is_not_found() {
        let observer = MetricsServerObserver::new(store());

        let err = observer
            .fetch_data(&request("Pod", "ghost", "cpu"))
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failure_is_backend_error() {
        let store = store();
        store.fail_gets_with(StoreError::Backend("metrics API unavailable".to_string()));
        let observer = MetricsServerObserver::new(store);

        let err = observer
            .fetch_data(&request("Node", "node-1", "cpu"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PluginError::Backend("metrics API unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_resource_name_is_decode_error() {
        let observer = MetricsServerObserver::new(store());
        let mut req = request("Pod", "", "cpu");
        req.resource_names.clear();

        let err = observer.fetch_data(&req).await.unwrap_err();
        assert!(matches!(err, PluginError::Decode(_)));
    }

    #[tokio::test]
    async fn test_pod_without_namespace_is_decode_error() {
        let store = store();
        store.insert(
            ResourceKey::new(METRICS_GROUP, METRICS_VERSION, "pods", "", "web-0"),
            Resource::new("PodMetrics", "web-0").with_body(json!({
                "containers": [{"name": "app", "usage": {"cpu": "250m"}}]
            })),
        );
        let observer = MetricsServerObserver::new(store);
        let mut req = request("Pod", "web-0", "cpu");
        req.namespace.clear();

        let err = observer.fetch_data(&req).await.unwrap_err();
        assert!(matches!(err, PluginError::Decode(_)));
    }

    #[tokio::test]
    async fn test_node_request_ignores_namespace() {
        let observer = MetricsServerObserver::new(store());
        let mut req = request("Node", "node-1", "cpu");
        req.namespace = "default".to_string();

        let result = observer.fetch_data(&req).await.unwrap();
        assert_eq!(result.unit, "m");
        assert_eq!(result.records[0].value, "2000.000");
    }

    #[test]
    fn test_kind_selects_metrics_schema() {
        assert_eq!(MetricsKind::from_kind("Pod"), Some(MetricsKind::Pod));
        assert_eq!(MetricsKind::from_kind("Node"), Some(MetricsKind::Node));
        assert_eq!(MetricsKind::from_kind("pod"), None);
    }

    #[test]
    fn test_capabilities_use_time_aggregation() {
        let observer = MetricsServerObserver::new(Arc::new(MemoryStore::new()));
        let capabilities = observer.capabilities();
        assert_eq!(
            capabilities["cpu"].aggregations,
            BTreeSet::from(["time".to_string()])
        );
        assert_eq!(capabilities["memory"].unit, "byte");
    }
}
