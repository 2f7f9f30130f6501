//! Per-series statistics for status output and export.

use super::reading::ReadingRecord;
use super::series::{SensorSeries, SeriesMap};

/// Aggregates for one sensor's series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub sensor_name: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub latest: ReadingRecord,
}

impl SeriesSummary {
    /// Summarize a series. Returns `None` only for an empty series.
    pub fn from_series(series: &SensorSeries) -> Option<Self> {
        let latest = series.latest()?.clone();

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for reading in series.iter() {
            min = min.min(reading.level);
            max = max.max(reading.level);
            sum += reading.level;
        }

        Some(Self {
            sensor_name: series.sensor_name.clone(),
            count: series.len(),
            min,
            max,
            mean: sum / series.len() as f64,
            latest,
        })
    }

    /// One-line rendering used by the CLI.
    pub fn line(&self) -> String {
        format!(
            "{:<16} {:>5} readings  latest {:>6.1} dB @ {}  min {:.1}  max {:.1}  mean {:.1}",
            self.sensor_name,
            self.count,
            self.latest.level,
            self.latest.display_time(),
            self.min,
            self.max,
            self.mean
        )
    }
}

/// Summaries for every series, in the map's order.
pub fn summarize(map: &SeriesMap) -> Vec<SeriesSummary> {
    map.iter().filter_map(SeriesSummary::from_series).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::series::{group, RawPayload};
    use serde_json::json;

    #[test]
    fn summary_stats() {
        let payload = RawPayload::detect(json!([
            {"id": 1, "sensor_name": "A", "sound": "10", "time": {"secs_since_epoch": 1}},
            {"id": 2, "sensor_name": "A", "sound": "30", "time": {"secs_since_epoch": 3}},
            {"id": 3, "sensor_name": "A", "sound": "20", "time": {"secs_since_epoch": 2}},
        ]))
        .unwrap();
        let summaries = summarize(&group(&payload));
        assert_eq!(summaries.len(), 1);

        let a = &summaries[0];
        assert_eq!(a.count, 3);
        assert_eq!(a.min, 10.0);
        assert_eq!(a.max, 30.0);
        assert_eq!(a.mean, 20.0);
        assert_eq!(a.latest.id, 2);
        assert!(a.line().starts_with("A "));
    }

    #[test]
    fn empty_map_has_no_summaries() {
        assert!(summarize(&SeriesMap::new()).is_empty());
    }
}
