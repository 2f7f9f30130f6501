//! Data models and processing for telemetry payloads.
//!
//! This module turns raw service responses into the records and series the
//! rest of the crate works with.
//!
//! ## Submodules
//!
//! - [`time`]: Timestamp validation, sort keys and local display strings
//! - [`reading`]: Canonical records ([`ReadingRecord`], [`Sensor`], [`LogRecord`])
//! - [`series`]: Payload shape detection and per-sensor grouping
//! - [`summary`]: Per-series statistics
//!
//! ## Data Flow
//!
//! ```text
//! serde_json::Value (response body)
//!        │
//!        ▼
//! RawPayload::detect()  ── Flat | Nested | Empty
//!        │
//!        ▼
//! group()  ── ReadingRecord::from_value() per record, malformed ones dropped
//!        │
//!        ▼
//! SeriesMap (sensor_name -> SensorSeries, sorted by time)
//! ```

pub mod reading;
pub mod series;
pub mod summary;
pub mod time;

pub use reading::{LogRecord, Malformed, ReadingRecord, Sensor};
pub use series::{
    group, group_with_report, GroupReport, PayloadShape, RawPayload, SensorSeries, SeriesMap,
};
pub use summary::{summarize, SeriesSummary};
pub use time::{decode, sort_key, strip_zone_annotation, TimeError, Timestamp};
