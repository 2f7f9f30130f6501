//! Recurring fetch session.
//!
//! A [`PollingSession`] owns one background task that fetches, waits for the
//! next tick, and fetches again. Fetches never overlap. Each cycle is tagged
//! with a sequence number and its result is only delivered if it is still the
//! latest cycle and the session has not been stopped.

use std::cell::RefCell;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::SessionState;
use crate::data::{group_with_report, RawPayload, SeriesMap};
use crate::error::FetchError;
use crate::source::{ReadingFeed, TelemetrySource};

/// Refresh interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

struct Callbacks<T> {
    on_ready: Box<dyn FnMut(&T) + Send>,
    on_error: Box<dyn FnMut(&FetchError) + Send>,
}

/// The single authoritative state slot of a session.
///
/// `stopped` is set before anything else is touched, so stopping never
/// waits on a lock the caller might already hold. Callbacks run under a
/// re-entrant lock: `stop()` from another thread waits for a running
/// callback to finish, while a callback stopping its own session passes
/// straight through.
struct Slot<T> {
    stopped: AtomicBool,
    latest_seq: AtomicU64,
    callbacks: ReentrantMutex<RefCell<Callbacks<T>>>,
    state_tx: watch::Sender<SessionState<T>>,
}

impl<T> Slot<T> {
    fn new<R, E>(on_ready: R, on_error: E, state_tx: watch::Sender<SessionState<T>>) -> Self
    where
        R: FnMut(&T) + Send + 'static,
        E: FnMut(&FetchError) + Send + 'static,
    {
        Self {
            stopped: AtomicBool::new(false),
            latest_seq: AtomicU64::new(0),
            callbacks: ReentrantMutex::new(RefCell::new(Callbacks {
                on_ready: Box::new(on_ready),
                on_error: Box::new(on_error),
            })),
            state_tx,
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn latest_seq(&self) -> u64 {
        self.latest_seq.load(Ordering::SeqCst)
    }

    /// Open a new cycle. Returns `None` once the session is stopped.
    fn begin(&self) -> Option<u64> {
        if self.is_stopped() {
            return None;
        }
        let seq = self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state_tx.send_replace(SessionState::Loading);
        Some(seq)
    }

    /// Deliver a cycle's result. Returns false if it was discarded.
    fn resolve(&self, seq: u64, result: Result<T, FetchError>) -> bool {
        let guard = self.callbacks.lock();
        if self.is_stopped() {
            debug!(seq, "session stopped, discarding result");
            return false;
        }
        let latest = self.latest_seq();
        if seq != latest {
            debug!(seq, latest, "discarding stale result");
            return false;
        }

        {
            let mut callbacks = guard.borrow_mut();
            match &result {
                Ok(data) => (callbacks.on_ready)(data),
                Err(err) => {
                    warn!(seq, error = %err, "fetch cycle failed, retrying on next tick");
                    (callbacks.on_error)(err);
                }
            }
        }

        let state = match result {
            Ok(data) => SessionState::Ready(data),
            Err(err) => SessionState::Failed(err.to_string()),
        };
        self.state_tx.send_replace(state);
        true
    }

    /// Mark the slot stopped. Returns true on the first call.
    fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        // Barrier: a callback already running elsewhere finishes before we return.
        drop(self.callbacks.lock());
        first
    }
}

/// A recurring fetch-and-refresh cycle.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use soundwatch::PollingSession;
///
/// # tokio_test::block_on(async {
/// let session = PollingSession::start(
///     Duration::from_secs(5),
///     || async { Ok::<_, soundwatch::FetchError>(42u32) },
///     |value| println!("ready: {}", value),
///     |err| eprintln!("failed: {}", err),
/// );
///
/// session.stop();
/// # });
/// ```
pub struct PollingSession<T> {
    slot: Arc<Slot<T>>,
    state_rx: watch::Receiver<SessionState<T>>,
    task: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl<T> PollingSession<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling: one fetch right away, then one per `interval`.
    ///
    /// Must be called from within a tokio runtime. `on_ready` and `on_error`
    /// run on the session's task; either may call [`stop`](Self::stop).
    pub fn start<F, Fut, R, E>(interval: Duration, fetch: F, on_ready: R, on_error: E) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
        R: FnMut(&T) + Send + 'static,
        E: FnMut(&FetchError) + Send + 'static,
    {
        // tokio intervals can't be zero
        let interval = interval.max(Duration::from_millis(1));
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let slot = Arc::new(Slot::new(on_ready, on_error, state_tx));

        let task = tokio::spawn(run_cycles(slot.clone(), interval, fetch));
        info!(interval_ms = interval.as_millis() as u64, "polling session started");

        Self {
            slot,
            state_rx,
            task: Mutex::new(Some(task)),
            interval,
        }
    }

    /// Current state of the session's slot.
    pub fn state(&self) -> SessionState<T> {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState<T>> {
        self.state_rx.clone()
    }
}

impl<T> PollingSession<T> {
    /// Stop polling.
    ///
    /// Idempotent and safe to call from `on_ready`/`on_error`. Once this
    /// returns no callback fires again, even if a fetch was in flight.
    pub fn stop(&self) {
        let first = self.slot.stop();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        if first {
            info!("polling session stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.slot.is_stopped()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.slot.latest_seq()
    }
}

impl<T> Drop for PollingSession<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T> std::fmt::Debug for PollingSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSession")
            .field("interval", &self.interval)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn run_cycles<T, F, Fut>(slot: Arc<Slot<T>>, interval: Duration, mut fetch: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut timer = tokio::time::interval(interval);
    // A slow fetch pushes the schedule back instead of bursting to catch up.
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        let Some(seq) = slot.begin() else {
            break;
        };

        let result = fetch().await;
        slot.resolve(seq, result);
    }
}

/// Poll a source's readings and group them into per-sensor series.
///
/// Every cycle fetches `feed`, detects the payload shape and groups it. A
/// body that isn't a JSON array fails the cycle; malformed records are
/// dropped without failing it.
pub fn watch_series<R, E>(
    source: Arc<dyn TelemetrySource>,
    feed: ReadingFeed,
    interval: Duration,
    on_ready: R,
    on_error: E,
) -> PollingSession<SeriesMap>
where
    R: FnMut(&SeriesMap) + Send + 'static,
    E: FnMut(&FetchError) + Send + 'static,
{
    info!(source = source.description(), feed = feed.path(), "watching series");

    let fetch = move || {
        let source = source.clone();
        async move {
            let body = source.fetch_readings(feed).await?;
            let payload = RawPayload::detect(body)?;
            let (series, report) = group_with_report(&payload);
            debug!(
                shape = ?payload.shape(),
                sensors = series.len(),
                accepted = report.accepted,
                dropped = report.dropped,
                "grouped readings"
            );
            Ok(series)
        }
    };

    PollingSession::start(interval, fetch, on_ready, on_error)
}
