//! Time series value shapes
//!
//! `TimeSeriesValue` is a closed sum over the shapes a range query can produce.
//! Adding a shape forces every `match` over it to be revisited.

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One timestamped value; timestamps are epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Element of an instant vector
#[derive(Debug, Clone, PartialEq)]
pub struct InstantSample {
    pub metric: BTreeMap<String, String>,
    pub sample: Sample,
}

/// One labelled series of a range matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

/// A time series backend result
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSeriesValue {
    Scalar(Sample),
    Vector(Vec<InstantSample>),
    Matrix(Vec<Series>),
    String { timestamp: i64, value: String },
}

impl TimeSeriesValue {
    /// Name of the shape as used by the Prometheus API
    pub fn kind(&self) -> &'static str {
        match self {
            TimeSeriesValue::Scalar(_) => "scalar",
            TimeSeriesValue::Vector(_) => "vector",
            TimeSeriesValue::Matrix(_) => "matrix",
            TimeSeriesValue::String { .. } => "string",
        }
    }

    /// Serialise in Prometheus wire format (`[<seconds>, "<value>"]` pairs)
    pub fn to_raw_json(&self) -> Value {
        match self {
            TimeSeriesValue::Scalar(sample) => sample_pair(sample),
            TimeSeriesValue::Vector(elements) => Value::Array(
                elements
                    .iter()
                    .map(|element| {
                        json!({
                            "metric": element.metric,
                            "value": sample_pair(&element.sample),
                        })
                    })
                    .collect(),
            ),
            TimeSeriesValue::Matrix(series) => Value::Array(
                series
                    .iter()
                    .map(|s| {
                        json!({
                            "metric": s.metric,
                            "values": s.samples.iter().map(sample_pair).collect::<Vec<_>>(),
                        })
                    })
                    .collect(),
            ),
            TimeSeriesValue::String { timestamp, value } => {
                json!([*timestamp as f64 / 1000.0, value])
            }
        }
    }
}

fn sample_pair(sample: &Sample) -> Value {
    json!([sample.timestamp as f64 / 1000.0, format_float(sample.value)])
}

/// Format a value the way Prometheus does on the wire
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: &str) -> BTreeMap<String, String> {
        [("__name__".to_string(), name.to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            TimeSeriesValue::Scalar(Sample::new(0, 1.0)).kind(),
            "scalar"
        );
        assert_eq!(TimeSeriesValue::Vector(vec![]).kind(), "vector");
        assert_eq!(TimeSeriesValue::Matrix(vec![]).kind(), "matrix");
        assert_eq!(
            TimeSeriesValue::String {
                timestamp: 0,
                value: String::new()
            }
            .kind(),
            "string"
        );
    }

    #[test]
    fn test_scalar_raw_json() {
        let value = TimeSeriesValue::Scalar(Sample::new(1_500, 2.5));
        assert_eq!(value.to_raw_json(), json!([1.5, "2.5"]));
    }

    #[test]
    fn test_matrix_raw_json() {
        let value = TimeSeriesValue::Matrix(vec![Series {
            metric: metric("up"),
            samples: vec![Sample::new(1_000, 1.0), Sample::new(2_000, 0.0)],
        }]);

        assert_eq!(
            value.to_raw_json(),
            json!([{
                "metric": {"__name__": "up"},
                "values": [[1.0, "1"], [2.0, "0"]]
            }])
        );
    }

    #[test]
    fn test_vector_raw_json() {
        let value = TimeSeriesValue::Vector(vec![InstantSample {
            metric: metric("load"),
            sample: Sample::new(3_000, 0.75),
        }]);

        assert_eq!(
            value.to_raw_json(),
            json!([{"metric": {"__name__": "load"}, "value": [3.0, "0.75"]}])
        );
    }

    #[test]
    fn test_format_special_floats() {
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_float(42.0), "42");
    }
}
