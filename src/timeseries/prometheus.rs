use crate::error::PluginError;
use crate::timeseries::{
    InstantSample, QueryRange, Sample, Series, TimeSeriesBackend, TimeSeriesValue,
};
use crate::BoxFuture;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Prometheus HTTP API backend
///
/// Issues `GET /api/v1/query_range` requests and converts the typed result into a
/// `TimeSeriesValue`.
pub struct PrometheusClient {
    client: Client,
    address: String,
}

/// Envelope of every Prometheus API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Query result tagged by `resultType`
#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum QueryData {
    Scalar(WirePair),
    Vector(Vec<WireInstant>),
    Matrix(Vec<WireSeries>),
    String(WirePair),
}

/// `[<unix seconds>, "<value>"]`
type WirePair = (f64, String);

#[derive(Debug, Deserialize)]
struct WireInstant {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: WirePair,
}

#[derive(Debug, Deserialize)]
struct WireSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<WirePair>,
}

impl PrometheusClient {
    /// Create a client for the server at `address` (e.g. "http://prometheus:9090")
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, PluginError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PluginError::Backend(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            address: address.into(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Format the range query endpoint URL
    fn api_url(&self) -> String {
        format!("{}/api/v1/query_range", self.address.trim_end_matches('/'))
    }

    /// Query parameters for a range request; times are fractional unix seconds
    fn query_params(query: &str, range: &QueryRange) -> Vec<(&'static str, String)> {
        vec![
            ("query", query.to_string()),
            ("start", format_seconds(range.start.timestamp_millis())),
            ("end", format_seconds(range.end.timestamp_millis())),
            ("step", format!("{}", range.step.as_secs_f64())),
        ]
    }

    /// Parse a response body into a time series value
    fn parse_response(body: &str) -> Result<TimeSeriesValue, PluginError> {
        let response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| PluginError::Backend(format!("invalid Prometheus response: {}", e)))?;

        for warning in &response.warnings {
            debug!("Prometheus warning: {}", warning);
        }

        if response.status != "success" {
            return Err(PluginError::Backend(format!(
                "Prometheus query failed ({}): {}",
                response.error_type.as_deref().unwrap_or("unknown"),
                response.error.as_deref().unwrap_or("no error message")
            )));
        }

        let data = response
            .data
            .ok_or_else(|| PluginError::Backend("Prometheus response has no data".to_string()))?;

        match data {
            QueryData::Scalar(pair) => Ok(TimeSeriesValue::Scalar(to_sample(&pair)?)),
            QueryData::Vector(elements) => elements
                .into_iter()
                .map(|element| {
                    Ok(InstantSample {
                        sample: to_sample(&element.value)?,
                        metric: element.metric,
                    })
                })
                .collect::<Result<Vec<_>, PluginError>>()
                .map(TimeSeriesValue::Vector),
            QueryData::Matrix(series) => series
                .into_iter()
                .map(|s| {
                    Ok(Series {
                        samples: s.values.iter().map(to_sample).collect::<Result<_, _>>()?,
                        metric: s.metric,
                    })
                })
                .collect::<Result<Vec<_>, PluginError>>()
                .map(TimeSeriesValue::Matrix),
            QueryData::String((seconds, value)) => Ok(TimeSeriesValue::String {
                timestamp: to_millis(seconds),
                value,
            }),
        }
    }
}

impl TimeSeriesBackend for PrometheusClient {
    fn query_range<'a>(
        &'a self,
        query: &'a str,
        range: QueryRange,
    ) -> BoxFuture<'a, Result<TimeSeriesValue, PluginError>> {
        Box::pin(async move {
            debug!(
                "query_range {} start={} end={} step={:?}",
                query, range.start, range.end, range.step
            );

            let response = self
                .client
                .get(self.api_url())
                .query(&Self::query_params(query, &range))
                .send()
                .await
                .map_err(|e| PluginError::Backend(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| PluginError::Backend(format!("Failed to read response: {}", e)))?;

            // Prometheus reports query errors with a JSON body on 4xx/5xx statuses
            match Self::parse_response(&body) {
                Ok(value) if status.is_success() => Ok(value),
                Ok(_) => Err(PluginError::Backend(format!(
                    "Prometheus API returned error {}",
                    status
                ))),
                Err(e) if status.is_success() => Err(e),
                Err(_) => Err(PluginError::Backend(format!(
                    "Prometheus API returned error {}: {}",
                    status, body
                ))),
            }
        })
    }
}

fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

fn format_seconds(millis: i64) -> String {
    format!("{:.3}", millis as f64 / 1000.0)
}

fn to_sample(pair: &WirePair) -> Result<Sample, PluginError> {
    let (seconds, raw) = pair;
    let value = raw
        .parse::<f64>()
        .map_err(|e| PluginError::Backend(format!("invalid sample value '{}': {}", raw, e)))?;
    Ok(Sample::new(to_millis(*seconds), value))
}
