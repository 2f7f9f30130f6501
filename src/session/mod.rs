//! Fetch sessions against a [`TelemetrySource`](crate::source::TelemetrySource).
//!
//! - [`PollingSession`]: recurring fetch on a fixed interval, failures retried
//!   on the next tick
//! - [`LogTailSession`]: one-shot fetch of the most recent log lines
//! - [`SensorDirectory`]: one-shot fetch of the sensor list
//!
//! Every session owns a single [`SessionState`] slot. Nothing is shared
//! between sessions.

mod log_tail;
mod polling;
mod sensors;

pub use log_tail::LogTailSession;
pub use polling::{watch_series, PollingSession, DEFAULT_INTERVAL};
pub use sensors::SensorDirectory;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::data::Malformed;
use crate::error::FetchError;

/// State of a session's data slot.
///
/// A fetch cycle moves the slot to `Loading` and ends in exactly one of
/// `Ready` or `Failed`, replacing whatever terminal state came before.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState<T> {
    /// Nothing fetched yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Ready(T),
    /// The last fetch failed with this message.
    Failed(String),
}

impl<T> SessionState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed(_))
    }

    /// Data from a `Ready` state.
    pub fn data(&self) -> Option<&T> {
        match self {
            SessionState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// Message from a `Failed` state.
    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the display label for this state.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Loading => "Loading",
            SessionState::Ready(_) => "Ready",
            SessionState::Failed(_) => "Failed",
        }
    }
}

/// State slot for sessions that fetch once per call.
///
/// Calls may overlap. Each call takes a sequence number and only the latest
/// call writes its terminal state, so a slow older call can't roll back a
/// newer result.
#[derive(Debug)]
pub(crate) struct OneShotSlot<T> {
    state: Mutex<SessionState<T>>,
    latest_seq: AtomicU64,
}

impl<T: Clone> OneShotSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Idle),
            latest_seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> SessionState<T> {
        self.state.lock().clone()
    }

    /// Run one fetch, moving the slot through `Loading` to `Ready` or `Failed`.
    ///
    /// The caller always gets its own result, even when a newer call has
    /// already settled the slot.
    pub(crate) async fn run<Fut>(&self, fetch: Fut) -> Result<T, FetchError>
    where
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let seq = {
            let mut state = self.state.lock();
            *state = SessionState::Loading;
            self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = fetch.await;

        let mut state = self.state.lock();
        let latest = self.latest_seq.load(Ordering::SeqCst);
        if seq == latest {
            *state = match &result {
                Ok(data) => SessionState::Ready(data.clone()),
                Err(err) => SessionState::Failed(err.to_string()),
            };
        } else {
            debug!(seq, latest, "newer fetch started, leaving slot alone");
        }
        result
    }
}

/// Decode a JSON array record by record, skipping malformed entries.
pub(crate) fn decode_list<R>(
    body: Value,
    what: &str,
    parse: fn(&Value) -> Result<R, Malformed>,
) -> Result<Vec<R>, FetchError> {
    let Value::Array(items) = body else {
        return Err(FetchError::Decode(format!("expected a JSON array of {}", what)));
    };

    let mut records = Vec::with_capacity(items.len());
    for item in &items {
        match parse(item) {
            Ok(record) => records.push(record),
            Err(reason) => debug!(%reason, "dropping malformed {} entry", what),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LogRecord;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn state_accessors() {
        let ready: SessionState<u32> = SessionState::Ready(3);
        assert_eq!(ready.data(), Some(&3));
        assert!(ready.error().is_none());

        let failed: SessionState<u32> = SessionState::Failed("boom".into());
        assert_eq!(failed.error(), Some("boom"));
        assert_eq!(failed.label(), "Failed");

        assert_eq!(SessionState::<u32>::default(), SessionState::Idle);
    }

    #[test]
    fn decode_list_skips_bad_entries() {
        let body = json!([
            {"id": 1, "message": "a", "time": {"secs_since_epoch": 1}},
            {"id": 2},
            {"id": 3, "message": "c", "time": {"secs_since_epoch": 3}},
        ]);
        let logs = decode_list(body, "logs", LogRecord::from_value).unwrap();
        let ids: Vec<i64> = logs.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn decode_list_rejects_non_array() {
        let err = decode_list(json!({"id": 1}), "logs", LogRecord::from_value).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn one_shot_slot_transitions() {
        let slot: OneShotSlot<u32> = OneShotSlot::new();
        assert_eq!(slot.state(), SessionState::Idle);

        slot.run(async { Ok(7) }).await.unwrap();
        assert_eq!(slot.state(), SessionState::Ready(7));

        slot.run(async { Err(FetchError::Timeout) }).await.unwrap_err();
        assert_eq!(slot.state(), SessionState::Failed("Request timed out".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn older_call_finishing_last_does_not_overwrite_newer_result() {
        let slot: OneShotSlot<u32> = OneShotSlot::new();

        let slow = slot.run(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(FetchError::Timeout)
        });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            slot.run(async { Ok(2) }).await
        };

        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, Err(FetchError::Timeout));
        assert_eq!(fast, Ok(2));
        assert_eq!(slot.state(), SessionState::Ready(2));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_failure_still_wins_over_older_success() {
        let slot: OneShotSlot<u32> = OneShotSlot::new();

        let slow = slot.run(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(1)
        });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            slot.run(async { Err(FetchError::Timeout) }).await
        };

        let (slow, _) = tokio::join!(slow, fast);

        assert_eq!(slow, Ok(1));
        assert!(slot.state().is_failed());
    }
}
