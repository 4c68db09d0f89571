//! Aggregation engine
//!
//! Reduces a normalised sample sequence to one data point. The result starts out
//! as a default point (query end time, empty value) and each operator overwrites
//! only what it computes:
//! - `max`/`min` report the winning sample's timestamp; ties keep the first one
//! - `avg` reports the mean but keeps the default timestamp
//! - unknown operators and empty input leave the default untouched

use crate::timeseries::Sample;
use std::fmt;
use std::str::FromStr;

/// Operator used when a request names none
pub const DEFAULT_AGGREGATION: &str = "avg";

/// Reduced result of a metric query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Formatted value, empty when nothing was computed
    pub value: String,
}

impl DataPoint {
    /// Default result carrying the query end time and no value
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: String::new(),
        }
    }
}

/// Supported reduction operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Max,
    Min,
    Avg,
}

impl Aggregation {
    pub const ALL: [Aggregation; 3] = [Aggregation::Max, Aggregation::Min, Aggregation::Avg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Avg => "avg",
        }
    }

    /// Apply the operator to `samples`, updating `result` in place
    pub fn reduce(&self, samples: &[Sample], result: &mut DataPoint) {
        let Some(first) = samples.first() else {
            return;
        };

        match self {
            Aggregation::Max => {
                let winner = samples[1..]
                    .iter()
                    .fold(first, |best, s| if s.value > best.value { s } else { best });
                result.timestamp = winner.timestamp;
                result.value = format_value(winner.value);
            }
            Aggregation::Min => {
                let winner = samples[1..]
                    .iter()
                    .fold(first, |best, s| if s.value < best.value { s } else { best });
                result.timestamp = winner.timestamp;
                result.value = format_value(winner.value);
            }
            Aggregation::Avg => {
                let sum: f64 = samples.iter().map(|s| s.value).sum();
                result.value = format_value(sum / samples.len() as f64);
            }
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Aggregation::Max),
            "min" => Ok(Aggregation::Min),
            "avg" => Ok(Aggregation::Avg),
            other => Err(format!("unknown aggregation '{}'", other)),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Six-decimal fixed formatting used for aggregated values
pub fn format_value(value: f64) -> String {
    format!("{:.6}", value)
}

/// Reduce `samples` with the operator named `op`
///
/// `default_timestamp` is normally the query end time. Unknown operator names
/// return the default point unchanged.
pub fn aggregate(op: &str, samples: &[Sample], default_timestamp: i64) -> DataPoint {
    let mut result = DataPoint::at(default_timestamp);
    if let Ok(aggregation) = op.parse::<Aggregation>() {
        aggregation.reduce(samples, &mut result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const END: i64 = 1_700_000_000_000;

    fn samples(values: &[(i64, f64)]) -> Vec<Sample> {
        values.iter().map(|&(t, v)| Sample::new(t, v)).collect()
    }

    #[test]
    fn test_max_first_maximum_wins() {
        let result = aggregate("max", &samples(&[(1, 5.0), (2, 9.0), (3, 9.0)]), END);
        assert_eq!(result.timestamp, 2);
        assert_eq!(result.value, "9.000000");
    }

    #[test]
    fn test_min_first_minimum_wins() {
        let result = aggregate(
            "min",
            &samples(&[(1, 3.0), (2, 1.0), (3, 1.0), (4, 2.0)]),
            END,
        );
        assert_eq!(result.timestamp, 2);
        assert_eq!(result.value, "1.000000");
    }

    #[test]
    fn test_avg_keeps_end_time() {
        let result = aggregate("avg", &samples(&[(1, 2.0), (2, 4.0)]), END);
        assert_eq!(result.timestamp, END);
        assert_eq!(result.value, "3.000000");
    }

    #[test]
    fn test_empty_input_leaves_default() {
        for op in ["max", "min", "avg", "p99"] {
            assert_eq!(aggregate(op, &[], END), DataPoint::at(END));
        }
    }

    #[test]
    fn test_unknown_operator_leaves_default() {
        let result = aggregate("median", &samples(&[(1, 2.0), (2, 4.0)]), END);
        assert_eq!(result, DataPoint::at(END));
    }

    #[test]
    fn test_parse_and_display() {
        for aggregation in Aggregation::ALL {
            assert_eq!(aggregation.as_str().parse::<Aggregation>(), Ok(aggregation));
            assert_eq!(aggregation.to_string(), aggregation.as_str());
        }
        assert!("MAX".parse::<Aggregation>().is_err());
        assert_eq!(
            DEFAULT_AGGREGATION.parse::<Aggregation>(),
            Ok(Aggregation::Avg)
        );
    }

    #[test]
    fn test_single_sample() {
        let input = samples(&[(7, 1.25)]);
        for op in ["max", "min"] {
            let result = aggregate(op, &input, END);
            assert_eq!(result.timestamp, 7);
            assert_eq!(result.value, "1.250000");
        }
        assert_eq!(aggregate("avg", &input, END).timestamp, END);
    }
}
