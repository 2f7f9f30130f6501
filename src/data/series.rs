//! Grouping of readings into per-sensor series.
//!
//! The service returns readings in one of two shapes:
//!
//! ```text
//! Flat:    [ {A@100}, {B@95}, {A@90} ]          -> partition by sensor, sort by time
//! Nested:  [ [ {A@90}, {A@100} ], [ {B@95} ] ]  -> already grouped, validate order
//! ```
//!
//! The shape is detected once by [`RawPayload::detect`]; [`group`] then runs
//! the matching path. Malformed records are dropped one at a time and never
//! abort the batch.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::reading::ReadingRecord;
use crate::error::FetchError;

/// Detected layout of a readings response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Empty,
    Flat,
    Nested,
}

/// A readings response with its shape made explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// An empty array.
    Empty,
    /// One array of reading objects.
    Flat(Vec<Value>),
    /// An array of per-sensor arrays.
    Nested(Vec<Vec<Value>>),
}

impl RawPayload {
    /// Detect the payload shape from the first element's nesting depth.
    ///
    /// Fails only when the top level is not an array. Inside a nested
    /// payload, top-level entries that are not arrays are dropped.
    pub fn detect(value: Value) -> Result<Self, FetchError> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(FetchError::Decode(format!(
                    "expected a JSON array of readings, got {}",
                    json_kind(&other)
                )))
            }
        };

        match items.first() {
            None => Ok(RawPayload::Empty),
            Some(Value::Array(_)) => {
                let mut groups = Vec::with_capacity(items.len());
                for (position, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Array(inner) => groups.push(inner),
                        other => debug!(
                            position,
                            "dropping non-array entry ({}) in nested payload",
                            json_kind(&other)
                        ),
                    }
                }
                Ok(RawPayload::Nested(groups))
            }
            Some(_) => Ok(RawPayload::Flat(items)),
        }
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            RawPayload::Empty => PayloadShape::Empty,
            RawPayload::Flat(_) => PayloadShape::Flat,
            RawPayload::Nested(_) => PayloadShape::Nested,
        }
    }

    /// Number of raw records, malformed ones included.
    pub fn record_count(&self) -> usize {
        match self {
            RawPayload::Empty => 0,
            RawPayload::Flat(items) => items.len(),
            RawPayload::Nested(groups) => groups.iter().map(Vec::len).sum(),
        }
    }
}

/// Chronologically ordered readings from one sensor. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSeries {
    pub sensor_name: String,
    pub readings: Vec<ReadingRecord>,
}

impl SensorSeries {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Always false for series produced by [`group`].
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Oldest reading.
    pub fn first(&self) -> Option<&ReadingRecord> {
        self.readings.first()
    }

    /// Most recent reading.
    pub fn latest(&self) -> Option<&ReadingRecord> {
        self.readings.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadingRecord> {
        self.readings.iter()
    }

    /// Whether sort keys are non-decreasing.
    pub fn is_chronological(&self) -> bool {
        self.readings
            .windows(2)
            .all(|pair| pair[0].sort_key() <= pair[1].sort_key())
    }

    fn sort(&mut self) {
        // Stable: equal keys keep source order.
        self.readings.sort_by_key(ReadingRecord::sort_key);
    }
}

/// Series keyed by sensor name, iterated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMap {
    series: Vec<SensorSeries>,
    index: HashMap<String, usize>,
}

impl SeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, sensor_name: &str) -> Option<&SensorSeries> {
        self.index.get(sensor_name).map(|&i| &self.series[i])
    }

    pub fn contains(&self, sensor_name: &str) -> bool {
        self.index.contains_key(sensor_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorSeries> {
        self.series.iter()
    }

    pub fn sensor_names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.sensor_name.as_str())
    }

    /// Total readings across all series.
    pub fn total_readings(&self) -> usize {
        self.series.iter().map(SensorSeries::len).sum()
    }

    pub fn into_vec(self) -> Vec<SensorSeries> {
        self.series
    }

    fn push(&mut self, record: ReadingRecord) {
        match self.index.get(&record.sensor_name) {
            Some(&i) => self.series[i].readings.push(record),
            None => {
                self.index
                    .insert(record.sensor_name.clone(), self.series.len());
                self.series.push(SensorSeries {
                    sensor_name: record.sensor_name.clone(),
                    readings: vec![record],
                });
            }
        }
    }
}

/// Counters from one grouping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupReport {
    /// Records that made it into a series.
    pub accepted: usize,
    /// Malformed records that were skipped.
    pub dropped: usize,
    /// Nested series that arrived out of order and were re-sorted.
    pub resorted: usize,
}

/// Group a payload into per-sensor series.
pub fn group(payload: &RawPayload) -> SeriesMap {
    group_with_report(payload).0
}

/// Group a payload and report how many records were kept and dropped.
pub fn group_with_report(payload: &RawPayload) -> (SeriesMap, GroupReport) {
    let mut map = SeriesMap::new();
    let mut report = GroupReport::default();

    match payload {
        RawPayload::Empty => {}
        RawPayload::Flat(items) => {
            for value in items {
                accept(&mut map, &mut report, value);
            }
            for series in &mut map.series {
                series.sort();
            }
        }
        RawPayload::Nested(groups) => {
            for value in groups.iter().flatten() {
                accept(&mut map, &mut report, value);
            }
            for series in &mut map.series {
                if !series.is_chronological() {
                    warn!(
                        sensor = %series.sensor_name,
                        "nested series arrived out of order, re-sorting"
                    );
                    series.sort();
                    report.resorted += 1;
                }
            }
        }
    }

    if report.dropped > 0 {
        debug!(
            accepted = report.accepted,
            dropped = report.dropped,
            "dropped malformed readings"
        );
    }

    (map, report)
}

fn accept(map: &mut SeriesMap, report: &mut GroupReport, value: &Value) {
    match ReadingRecord::from_value(value) {
        Ok(record) => {
            map.push(record);
            report.accepted += 1;
        }
        Err(reason) => {
            debug!(%reason, "dropping malformed reading");
            report.dropped += 1;
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(id: i64, sensor: &str, sound: &str, secs: i64) -> Value {
        json!({
            "id": id,
            "sensor_name": sensor,
            "sound": sound,
            "time": {"secs_since_epoch": secs, "nanos_since_epoch": 0}
        })
    }

    fn secs(series: &SensorSeries) -> Vec<u64> {
        series.iter().map(|r| r.time.secs()).collect()
    }

    #[test]
    fn detect_empty_array() {
        assert_eq!(RawPayload::detect(json!([])).unwrap(), RawPayload::Empty);
    }

    #[test]
    fn detect_flat_and_nested() {
        let flat = RawPayload::detect(json!([reading(1, "A", "1", 1)])).unwrap();
        assert_eq!(flat.shape(), PayloadShape::Flat);

        let nested = RawPayload::detect(json!([[reading(1, "A", "1", 1)]])).unwrap();
        assert_eq!(nested.shape(), PayloadShape::Nested);
    }

    #[test]
    fn detect_rejects_non_array() {
        let err = RawPayload::detect(json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn detect_drops_stray_entries_in_nested_payload() {
        let payload =
            RawPayload::detect(json!([[reading(1, "A", "1", 1)], "junk", [reading(2, "B", "2", 2)]]))
                .unwrap();
        match payload {
            RawPayload::Nested(groups) => assert_eq!(groups.len(), 2),
            other => panic!("expected nested, got {:?}", other.shape()),
        }
    }

    #[test]
    fn group_empty_is_empty() {
        let map = group(&RawPayload::Empty);
        assert!(map.is_empty());
        assert_eq!(map.total_readings(), 0);
    }

    #[test]
    fn flat_readings_are_sorted_by_time_not_input_order() {
        let payload = RawPayload::detect(json!([
            reading(1, "A", "10", 100),
            reading(2, "A", "12", 90),
        ]))
        .unwrap();

        let map = group(&payload);
        assert_eq!(map.len(), 1);
        let a = map.get("A").unwrap();
        assert_eq!(secs(a), vec![90, 100]);
        assert_eq!(a.readings[0].level, 12.0);
    }

    #[test]
    fn nested_series_pass_through() {
        let payload = RawPayload::detect(json!([[
            reading(1, "B", "40", 1),
            reading(2, "B", "41", 2),
        ]]))
        .unwrap();

        let (map, report) = group_with_report(&payload);
        assert_eq!(map.len(), 1);
        assert_eq!(secs(map.get("B").unwrap()), vec![1, 2]);
        assert_eq!(report.resorted, 0);
    }

    #[test]
    fn nested_out_of_order_is_resorted() {
        let payload = RawPayload::detect(json!([[
            reading(1, "B", "40", 5),
            reading(2, "B", "41", 2),
        ]]))
        .unwrap();

        let (map, report) = group_with_report(&payload);
        assert_eq!(secs(map.get("B").unwrap()), vec![2, 5]);
        assert_eq!(report.resorted, 1);
    }

    #[test]
    fn flat_counts_match_sensors_and_records() {
        let mut items = Vec::new();
        for i in 0..12 {
            let sensor = ["A", "B", "C"][i % 3];
            items.push(reading(i as i64, sensor, "50", 1000 - i as i64));
        }
        let map = group(&RawPayload::detect(Value::Array(items)).unwrap());

        assert_eq!(map.len(), 3);
        assert_eq!(map.total_readings(), 12);
        for series in map.iter() {
            assert!(series.is_chronological());
            assert!(!series.is_empty());
        }
    }

    #[test]
    fn first_seen_order_is_kept() {
        let payload = RawPayload::detect(json!([
            reading(1, "zeta", "1", 3),
            reading(2, "alpha", "1", 2),
            reading(3, "zeta", "1", 1),
        ]))
        .unwrap();
        let names: Vec<_> = group(&payload).sensor_names().map(String::from).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn equal_times_keep_source_order() {
        let payload = RawPayload::detect(json!([
            reading(1, "A", "1", 50),
            reading(2, "A", "2", 50),
            reading(3, "A", "3", 10),
        ]))
        .unwrap();
        let ids: Vec<i64> = group(&payload).get("A").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn malformed_record_does_not_disturb_the_rest() {
        let good = vec![
            reading(1, "A", "10", 3),
            reading(2, "B", "20", 2),
            reading(3, "A", "30", 1),
        ];
        let baseline = group(&RawPayload::detect(Value::Array(good.clone())).unwrap());

        let mut with_bad = good;
        with_bad.insert(1, json!({"id": 99, "sound": "5", "time": {"secs_since_epoch": 4}}));
        let (map, report) = group_with_report(&RawPayload::detect(Value::Array(with_bad)).unwrap());

        assert_eq!(map, baseline);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn unparsable_time_is_dropped() {
        let payload = RawPayload::detect(json!([
            reading(1, "A", "10", 3),
            {"id": 2, "sensor_name": "A", "sound": "1", "time": {"secs_since_epoch": "soon"}},
        ]))
        .unwrap();
        let (map, report) = group_with_report(&payload);
        assert_eq!(map.total_readings(), 1);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn all_malformed_yields_no_series() {
        let payload = RawPayload::detect(json!([{"id": 1}, {"id": 2}])).unwrap();
        let map = group(&payload);
        assert!(map.is_empty());
        assert!(map.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn nested_groups_with_same_sensor_merge() {
        let payload = RawPayload::detect(json!([
            [reading(1, "A", "1", 1)],
            [reading(2, "A", "1", 2)],
        ]))
        .unwrap();
        let map = group(&payload);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("A").unwrap().len(), 2);
    }
}
