use crate::error::PluginError;
use crate::timeseries::TimeSeriesValue;
use crate::BoxFuture;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time window and resolution of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

impl QueryRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        Self { start, end, step }
    }

    /// Build a range from epoch-millisecond bounds
    ///
    /// Bounds outside the representable date range are a decode error.
    pub fn from_millis(start_ms: i64, end_ms: i64, step: Duration) -> Result<Self, PluginError> {
        let start = DateTime::<Utc>::from_timestamp_millis(start_ms).ok_or_else(|| {
            PluginError::Decode(format!("invalid start time {}", start_ms))
        })?;
        let end = DateTime::<Utc>::from_timestamp_millis(end_ms)
            .ok_or_else(|| PluginError::Decode(format!("invalid end time {}", end_ms)))?;
        Ok(Self::new(start, end, step))
    }

    /// End of the window in epoch milliseconds
    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// Trait for time series backend implementations
pub trait TimeSeriesBackend: Send + Sync {
    fn query_range<'a>(
        &'a self,
        query: &'a str,
        range: QueryRange,
    ) -> BoxFuture<'a, Result<TimeSeriesValue, PluginError>>;
}
