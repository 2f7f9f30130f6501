use std::future::Future;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use soundwatch::data::{group_with_report, RawPayload};
use soundwatch::{
    watch_series, HttpSource, LogTailSession, Overrides, ReadingFeed, SensorDirectory, SeriesMap,
    Settings, SoundMonitor, TelemetrySource,
};

#[derive(Parser, Debug)]
#[command(name = "soundwatch")]
#[command(about = "Poll a sound-level telemetry service and show per-sensor series")]
struct Args {
    /// Config file (default: soundwatch.toml in the working directory, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the telemetry service
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long, global = true)]
    refresh_ms: Option<u64>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll readings and print a status block after every refresh
    Watch {
        /// Poll the flat /sound feed instead of /sound/sorted
        #[arg(long)]
        flat: bool,

        /// Stop after this many refreshes
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Fetch readings once and print them grouped
    Once {
        #[arg(long)]
        flat: bool,
    },
    /// List sensors
    Sensors,
    /// Show the most recent log lines
    Logs {
        /// Number of lines (default from config)
        #[arg(short, long)]
        limit: Option<NonZeroU32>,
    },
    /// Fetch readings once and write them to a JSON file
    Export {
        path: PathBuf,

        #[arg(long)]
        flat: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    let overrides = Overrides {
        base_url: args.base_url.clone(),
        refresh_ms: args.refresh_ms,
        timeout_ms: args.timeout_ms,
        log_limit: None,
    };
    let settings = Settings::load(args.config.as_deref(), &overrides)?;

    let source: Arc<dyn TelemetrySource> = Arc::new(
        HttpSource::builder()
            .endpoint(&settings.base_url)
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client")?,
    );

    let command = args.command;
    let settings = &settings;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        match command {
            Command::Watch { flat, cycles } => run_watch(source, settings, feed(flat), cycles).await,
            Command::Once { flat } => run_once(source, feed(flat)).await,
            Command::Sensors => run_sensors(source).await,
            Command::Logs { limit } => run_logs(source, limit.unwrap_or(settings.log_limit())).await,
            Command::Export { path, flat } => run_export(source, feed(flat), &path).await,
        }
    })
}

/// Log to stderr so stdout carries only data.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("soundwatch=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn feed(flat: bool) -> ReadingFeed {
    if flat {
        ReadingFeed::Flat
    } else {
        ReadingFeed::Sorted
    }
}

#[derive(Debug)]
enum Refresh {
    Ready(SeriesMap),
    Failed(String),
}

/// Run the readings session until Ctrl-C or `cycles` refreshes.
async fn run_watch(
    source: Arc<dyn TelemetrySource>,
    settings: &Settings,
    feed: ReadingFeed,
    cycles: Option<u64>,
) -> Result<()> {
    let mut monitor = SoundMonitor::new(source.description());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();

    let session = watch_series(
        source,
        feed,
        settings.refresh_interval(),
        move |series| {
            let _ = tx.send(Refresh::Ready(series.clone()));
        },
        move |err| {
            let _ = error_tx.send(Refresh::Failed(err.to_string()));
        },
    );

    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupted");
    };
    drain_refreshes(&mut monitor, &mut rx, cycles, ctrl_c, print_status).await;

    session.stop();
    Ok(())
}

/// Apply refreshes to `monitor` until `shutdown` resolves, the channel
/// closes or `cycles` refreshes were handled. Returns the number handled.
///
/// `shutdown` is polled across the whole loop, and ahead of pending refreshes.
async fn drain_refreshes<S>(
    monitor: &mut SoundMonitor,
    rx: &mut mpsc::UnboundedReceiver<Refresh>,
    cycles: Option<u64>,
    shutdown: S,
    mut report: impl FnMut(&SoundMonitor),
) -> u64
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut seen = 0u64;
    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,
            refresh = rx.recv() => {
                let Some(refresh) = refresh else { break };
                match refresh {
                    Refresh::Ready(series) => monitor.record_ready(series),
                    Refresh::Failed(message) => monitor.record_failure(message),
                }
                report(monitor);

                seen += 1;
                if cycles.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    }
    seen
}

fn print_status(monitor: &SoundMonitor) {
    println!(
        "[{}] {}  {}",
        Local::now().format("%H:%M:%S"),
        monitor.source_description(),
        monitor.status_line()
    );
    for summary in monitor.summaries() {
        println!("  {}", summary.line());
    }
}

async fn fetch_series(source: &dyn TelemetrySource, feed: ReadingFeed) -> Result<SeriesMap> {
    let body = source
        .fetch_readings(feed)
        .await
        .with_context(|| format!("Failed to fetch {}", feed.path()))?;
    let payload = RawPayload::detect(body)?;
    let (series, report) = group_with_report(&payload);
    if report.dropped > 0 {
        info!(dropped = report.dropped, "skipped malformed readings");
    }
    Ok(series)
}

async fn run_once(source: Arc<dyn TelemetrySource>, feed: ReadingFeed) -> Result<()> {
    let series = fetch_series(source.as_ref(), feed).await?;

    for sensor in series.iter() {
        println!("{} ({} readings)", sensor.sensor_name, sensor.len());
        for reading in sensor.iter() {
            println!("  {:>6.1} dB  {}", reading.level, reading.display_time());
        }
    }
    if series.is_empty() {
        println!("No readings");
    }
    Ok(())
}

async fn run_sensors(source: Arc<dyn TelemetrySource>) -> Result<()> {
    let directory = SensorDirectory::new(source);
    let sensors = directory.fetch().await.context("Failed to fetch sensors")?;

    println!("{:<12} {:<24} {}", "ID", "LOCATION", "TYPE");
    for sensor in &sensors {
        println!("{:<12} {:<24} {}", sensor.id, sensor.location, sensor.kind);
    }
    Ok(())
}

async fn run_logs(source: Arc<dyn TelemetrySource>, limit: NonZeroU32) -> Result<()> {
    let session = LogTailSession::new(source);
    let logs = session
        .fetch_recent(limit)
        .await
        .context("Failed to fetch logs")?;

    for log in &logs {
        println!("{:>6}  {}  {}", log.id, log.display_time(), log.message);
    }
    Ok(())
}

async fn run_export(source: Arc<dyn TelemetrySource>, feed: ReadingFeed, path: &Path) -> Result<()> {
    let series = fetch_series(source.as_ref(), feed).await?;

    let mut monitor = SoundMonitor::new(source.description());
    monitor.record_ready(series);
    monitor.export_json(path)?;

    println!("Exported {} to {}", monitor.status_line(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn queued(count: usize) -> (mpsc::UnboundedSender<Refresh>, mpsc::UnboundedReceiver<Refresh>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..count {
            tx.send(Refresh::Ready(SeriesMap::new())).unwrap();
        }
        (tx, rx)
    }

    #[tokio::test]
    async fn shutdown_during_refresh_handling_is_not_lost() {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (_tx, mut rx) = queued(3);
        let mut monitor = SoundMonitor::new("test");

        // Fire the interrupt from inside refresh handling.
        let mut shutdown_tx = Some(shutdown_tx);
        let report = |_: &SoundMonitor| {
            if let Some(tx) = shutdown_tx.take() {
                let _ = tx.send(());
            }
        };
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };

        let handled = tokio::time::timeout(
            Duration::from_secs(2),
            drain_refreshes(&mut monitor, &mut rx, None, shutdown, report),
        )
        .await
        .expect("loop kept running after shutdown");

        assert_eq!(handled, 1);
        assert_eq!(monitor.refreshes(), 1);
    }

    #[tokio::test]
    async fn stops_after_requested_cycles() {
        let (_tx, mut rx) = queued(5);
        let mut monitor = SoundMonitor::new("test");

        let handled = drain_refreshes(
            &mut monitor,
            &mut rx,
            Some(2),
            std::future::pending::<()>(),
            |_| {},
        )
        .await;

        assert_eq!(handled, 2);
        assert_eq!(monitor.refreshes(), 2);
    }

    #[tokio::test]
    async fn failures_are_recorded_and_channel_close_ends_the_loop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Refresh::Ready(SeriesMap::new())).unwrap();
        tx.send(Refresh::Failed("Request timed out".into())).unwrap();
        drop(tx);
        let mut monitor = SoundMonitor::new("test");

        let handled =
            drain_refreshes(&mut monitor, &mut rx, None, std::future::pending::<()>(), |_| {})
                .await;

        assert_eq!(handled, 2);
        assert_eq!(monitor.load_error(), Some("Request timed out"));
        assert!(monitor.series().is_some());
    }
}
