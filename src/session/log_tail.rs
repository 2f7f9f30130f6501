//! One-shot fetch of the most recent log entries.

use std::num::NonZeroU32;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{decode_list, OneShotSlot, SessionState};
use crate::data::LogRecord;
use crate::error::FetchError;
use crate::source::TelemetrySource;

/// Fetches the last N log lines on demand.
///
/// There is no timer and no retry. A failed call leaves the session in
/// `Failed` until the next call.
#[derive(Debug)]
pub struct LogTailSession {
    source: Arc<dyn TelemetrySource>,
    slot: OneShotSlot<Vec<LogRecord>>,
}

impl LogTailSession {
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self {
            source,
            slot: OneShotSlot::new(),
        }
    }

    /// Fetch at most `limit` recent logs, in the order the service returns them.
    pub async fn fetch_recent(&self, limit: NonZeroU32) -> Result<Vec<LogRecord>, FetchError> {
        let fetch = async {
            let body = self.source.fetch_logs(limit).await?;
            let logs = decode_list(body, "log", LogRecord::from_value)?;
            debug!(limit = limit.get(), received = logs.len(), "fetched logs");
            Ok(logs)
        };

        let result = self.slot.run(fetch).await;
        if let Err(err) = &result {
            warn!(error = %err, "log fetch failed");
        }
        result
    }

    pub fn state(&self) -> SessionState<Vec<LogRecord>> {
        self.slot.state()
    }
}
