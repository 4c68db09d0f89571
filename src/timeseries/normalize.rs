use crate::error::PluginError;
use crate::timeseries::{Sample, TimeSeriesValue};
use log::{debug, error};

/// Flatten a backend value into an ordered sample sequence
///
/// Scalars give one sample and vectors one sample per element, in backend order.
/// Only the first series of a matrix is read; the others are logged and dropped.
/// String results cannot be normalised.
pub fn normalize(value: &TimeSeriesValue) -> Result<Vec<Sample>, PluginError> {
    match value {
        TimeSeriesValue::Scalar(sample) => {
            debug!("value type is scalar");
            Ok(vec![*sample])
        }
        TimeSeriesValue::Vector(elements) => {
            debug!("value type is vector");
            Ok(elements.iter().map(|element| element.sample).collect())
        }
        TimeSeriesValue::Matrix(series) => {
            debug!("value type is matrix, total rows: {}", series.len());
            for (idx, dropped) in series.iter().enumerate().skip(1) {
                debug!(
                    "only a single series is supported, ignoring series {} {:?}",
                    idx, dropped.metric
                );
            }
            Ok(series
                .first()
                .map(|first| first.samples.clone())
                .unwrap_or_default())
        }
        TimeSeriesValue::String { .. } => {
            error!("string type response is not supported");
            Err(PluginError::UnsupportedShape(
                "string type response isn't supported".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::{InstantSample, Series};
    use std::collections::BTreeMap;

    fn series(values: &[(i64, f64)]) -> Series {
        Series {
            metric: BTreeMap::new(),
            samples: values.iter().map(|&(t, v)| Sample::new(t, v)).collect(),
        }
    }

    #[test]
    fn test_scalar_gives_one_sample() {
        let samples = normalize(&TimeSeriesValue::Scalar(Sample::new(10, 4.0))).unwrap();
        assert_eq!(samples, vec![Sample::new(10, 4.0)]);
    }

    #[test]
    fn test_vector_preserves_order() {
        let value = TimeSeriesValue::Vector(vec![
            InstantSample {
                metric: BTreeMap::new(),
                sample: Sample::new(3, 1.0),
            },
            InstantSample {
                metric: BTreeMap::new(),
                sample: Sample::new(1, 2.0),
            },
        ]);

        assert_eq!(
            normalize(&value).unwrap(),
            vec![Sample::new(3, 1.0), Sample::new(1, 2.0)]
        );
    }

    #[test]
    fn test_matrix_reads_only_first_series() {
        let value = TimeSeriesValue::Matrix(vec![
            series(&[(1, 1.0), (2, 2.0)]),
            series(&[(1, 100.0)]),
            series(&[(1, 200.0), (2, 300.0)]),
        ]);

        assert_eq!(
            normalize(&value).unwrap(),
            vec![Sample::new(1, 1.0), Sample::new(2, 2.0)]
        );
    }

    #[test]
    fn test_empty_matrix_gives_no_samples() {
        assert!(normalize(&TimeSeriesValue::Matrix(vec![]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_string_is_unsupported() {
        let value = TimeSeriesValue::String {
            timestamp: 0,
            value: "hello".to_string(),
        };
        assert!(matches!(
            normalize(&value),
            Err(PluginError::UnsupportedShape(_))
        ));
    }
}
