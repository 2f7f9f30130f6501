//! # soundwatch
//!
//! A polling client and library for sound-level telemetry from a network of
//! IoT sensors.
//!
//! The crate fetches readings from the telemetry service on a fixed interval,
//! normalizes their timestamps and groups them into per-sensor series ordered
//! by time. Failed refreshes never erase data that was already delivered.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐   ┌─────────┐ │
//! │  │ source  │───▶│ session  │───▶│ monitor  │──▶│  stdout │ │
//! │  │ (HTTP)  │    │ (timer)  │    │(retention)   │         │ │
//! │  └─────────┘    └────┬─────┘    └──────────┘   └─────────┘ │
//! │                      │                                      │
//! │                      ▼                                      │
//! │                 ┌──────────┐                                │
//! │                 │   data   │◀── time | reading | series     │
//! │                 │ (pure)   │                                │
//! │                 └──────────┘                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`TelemetrySource`] trait and its reqwest-backed
//!   [`HttpSource`]
//! - **[`session`]**: [`PollingSession`] for recurring fetches,
//!   [`LogTailSession`] and [`SensorDirectory`] for one-shot fetches
//! - **[`data`]**: timestamp codec, record validation and series grouping.
//!   No I/O.
//! - **[`monitor`]**: [`SoundMonitor`], the last-known-good view the CLI prints
//! - **[`config`]**: layered [`Settings`]
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Poll /sound/sorted every 5 seconds
//! soundwatch watch
//!
//! # Last 20 log lines from another host
//! soundwatch --base-url http://sensors.local:8081 logs --limit 20
//! ```
//!
//! ### Grouping a payload
//!
//! ```
//! use serde_json::json;
//! use soundwatch::{group, RawPayload};
//!
//! let body = json!([
//!     {"id": 1, "sensor_name": "A", "sound": "100",
//!      "time": {"secs_since_epoch": 20, "nanos_since_epoch": 0}},
//!     {"id": 2, "sensor_name": "A", "sound": "90",
//!      "time": {"secs_since_epoch": 10, "nanos_since_epoch": 0}},
//! ]);
//!
//! let series = group(&RawPayload::detect(body).unwrap());
//! let levels: Vec<f64> = series.get("A").unwrap().iter().map(|r| r.level).collect();
//! assert_eq!(levels, vec![90.0, 100.0]);
//! ```
//!
//! ### Watching a service
//!
//! ```no_run
//! use std::sync::Arc;
//! use soundwatch::{watch_series, HttpSource, ReadingFeed, DEFAULT_INTERVAL};
//!
//! # tokio_test::block_on(async {
//! let source = Arc::new(HttpSource::builder().endpoint("http://localhost:8081").build().unwrap());
//!
//! let session = watch_series(
//!     source,
//!     ReadingFeed::Sorted,
//!     DEFAULT_INTERVAL,
//!     |series| println!("{} sensors", series.len()),
//!     |err| eprintln!("refresh failed: {}", err),
//! );
//!
//! // ...
//! session.stop();
//! # });
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod monitor;
pub mod session;
pub mod source;

// Re-export main types for convenience
pub use config::{Overrides, Settings};
pub use data::{
    decode, group, group_with_report, summarize, GroupReport, LogRecord, RawPayload,
    ReadingRecord, Sensor, SensorSeries, SeriesMap, SeriesSummary, Timestamp,
};
pub use error::FetchError;
pub use monitor::SoundMonitor;
pub use session::{
    watch_series, LogTailSession, PollingSession, SensorDirectory, SessionState,
    DEFAULT_INTERVAL,
};
pub use source::{HttpSource, ReadingFeed, TelemetrySource};
