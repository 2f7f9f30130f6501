//! Consumer-side view over a readings session.
//!
//! [`SoundMonitor`] keeps the last successful series snapshot visible through
//! failed refreshes. A failure only sets `load_error`; the next success
//! replaces the snapshot and clears it.

use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::data::{summarize, SeriesMap, SeriesSummary};
use crate::session::SessionState;

/// Last-known-good view of the per-sensor series.
#[derive(Debug, Default)]
pub struct SoundMonitor {
    source: String,
    series: Option<SeriesMap>,
    load_error: Option<String>,
    loading: bool,
    refreshes: u64,
    failures: u64,
}

impl SoundMonitor {
    /// Create a monitor for data coming from `source` (used in status output).
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Returns a description of where the data comes from.
    pub fn source_description(&self) -> &str {
        &self.source
    }

    /// Apply a session state update.
    ///
    /// Returns true if the series snapshot was replaced.
    pub fn apply(&mut self, state: &SessionState<SeriesMap>) -> bool {
        match state {
            SessionState::Idle => false,
            SessionState::Loading => {
                self.loading = true;
                false
            }
            SessionState::Ready(series) => {
                self.record_ready(series.clone());
                true
            }
            SessionState::Failed(message) => {
                self.record_failure(message.clone());
                false
            }
        }
    }

    /// Replace the snapshot with a fresh one.
    pub fn record_ready(&mut self, series: SeriesMap) {
        debug!(
            sensors = series.len(),
            readings = series.total_readings(),
            "series snapshot replaced"
        );
        self.series = Some(series);
        self.load_error = None;
        self.loading = false;
        self.refreshes += 1;
    }

    /// Record a failed refresh. The previous snapshot stays.
    pub fn record_failure(&mut self, message: String) {
        self.load_error = Some(message);
        self.loading = false;
        self.failures += 1;
    }

    /// Last successfully fetched series, if any.
    pub fn series(&self) -> Option<&SeriesMap> {
        self.series.as_ref()
    }

    /// Error from the most recent refresh, if it failed.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// True while waiting for the very first result.
    pub fn is_loading(&self) -> bool {
        self.loading && self.series.is_none() && self.load_error.is_none()
    }

    pub fn summaries(&self) -> Vec<SeriesSummary> {
        self.series.as_ref().map(summarize).unwrap_or_default()
    }

    /// One-line status for the CLI.
    pub fn status_line(&self) -> String {
        let data = self.series.as_ref().map(|series| {
            format!(
                "{} sensors, {} readings",
                series.len(),
                series.total_readings()
            )
        });

        match (data, &self.load_error) {
            (Some(data), Some(err)) => format!("{} (stale: {})", data, err),
            (Some(data), None) => data,
            (None, Some(err)) => format!("Error: {}", err),
            (None, None) if self.loading => "Loading...".to_string(),
            (None, None) => "No data".to_string(),
        }
    }

    /// Write the current snapshot to `path` as pretty JSON.
    pub fn export_json(&self, path: &Path) -> anyhow::Result<()> {
        use std::io::Write;

        let Some(ref series) = self.series else {
            anyhow::bail!("No data to export");
        };

        let mut export = Map::new();

        let mut summary = Map::new();
        summary.insert("source".to_string(), json!(self.source));
        summary.insert("sensors".to_string(), json!(series.len()));
        summary.insert("readings".to_string(), json!(series.total_readings()));
        summary.insert("refreshes".to_string(), json!(self.refreshes));
        summary.insert("failures".to_string(), json!(self.failures));
        if let Some(ref err) = self.load_error {
            summary.insert("last_error".to_string(), json!(err));
        }
        export.insert("summary".to_string(), Value::Object(summary));

        let stats: Vec<Value> = summarize(series)
            .iter()
            .map(|s| {
                json!({
                    "sensor_name": s.sensor_name,
                    "count": s.count,
                    "min": s.min,
                    "max": s.max,
                    "mean": s.mean,
                    "latest": s.latest.level,
                })
            })
            .collect();
        export.insert("series_summary".to_string(), Value::Array(stats));

        let sensors: Vec<Value> = series
            .iter()
            .map(|s| {
                let readings: Vec<Value> = s
                    .iter()
                    .map(|r| {
                        json!({
                            "id": r.id,
                            "sound": r.level,
                            "secs_since_epoch": r.time.secs(),
                            "nanos_since_epoch": r.time.nanos(),
                            "time_string": r.time.rfc2822(),
                        })
                    })
                    .collect();
                json!({
                    "sensor_name": s.sensor_name,
                    "readings": readings,
                })
            })
            .collect();
        export.insert("series".to_string(), Value::Array(sensors));

        let json = serde_json::to_string_pretty(&Value::Object(export))?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
