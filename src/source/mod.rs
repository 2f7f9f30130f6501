//! Telemetry source abstraction.
//!
//! Sessions talk to the service through the [`TelemetrySource`] trait, so
//! they can be driven by the HTTP client in production and by scripted
//! sources in tests.

mod http;

pub use http::{HttpSource, HttpSourceBuilder};

use std::fmt::Debug;
use std::num::NonZeroU32;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// Which readings endpoint to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingFeed {
    /// `/sound/sorted`: readings pre-grouped per sensor.
    #[default]
    Sorted,
    /// `/sound`: one flat array of readings.
    Flat,
}

impl ReadingFeed {
    pub fn path(&self) -> &'static str {
        match self {
            ReadingFeed::Sorted => "/sound/sorted",
            ReadingFeed::Flat => "/sound",
        }
    }
}

/// A place telemetry can be fetched from.
///
/// Every method returns the decoded JSON body. Interpreting the body
/// (shape detection, per-record validation) is left to the caller so that a
/// bad record never fails a whole fetch.
#[async_trait]
pub trait TelemetrySource: Send + Sync + Debug {
    /// Fetch the current readings.
    async fn fetch_readings(&self, feed: ReadingFeed) -> Result<Value, FetchError>;

    /// Fetch the sensor directory.
    async fn fetch_sensors(&self) -> Result<Value, FetchError>;

    /// Fetch at most `limit` recent log entries.
    async fn fetch_logs(&self, limit: NonZeroU32) -> Result<Value, FetchError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
