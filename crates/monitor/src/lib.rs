//! Drowsiness Monitor
//!
//! Replays recorded detector output through one drowsiness tracker per
//! input stream, raising SOS records when a tracker fires.

pub mod config;
pub mod input;

pub use config::MonitorConfig;
pub use input::{FrameRecord, RecordedDetector};

use anyhow::anyhow;
use clap::Parser;
use dms::{AlertDecision, DmsSession, DrowsinessTracker, IncidentReporter, ReportOutcome};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use storage::JsonFileStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "drowsy-monitor", version, about = "Replay recorded frames through the drowsiness tracker")]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// SOS store path, overriding the configured one
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    pub print_metrics: bool,

    /// Recorded frame files (JSON lines); stdin when empty
    pub inputs: Vec<PathBuf>,
}

/// Where a session's frames come from
#[derive(Debug, Clone)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// Session name used in logs and output
    pub fn name(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// One output line per processed frame
#[derive(Debug, Clone, Serialize)]
pub struct DecisionLine {
    pub session: String,
    pub t: f64,
    pub label: &'static str,
    #[serde(flatten)]
    pub decision: AlertDecision,
    pub report: ReportOutcome,
}

/// Per-session totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub name: String,
    pub frames: u64,
    pub alerts: u64,
    pub report_failures: u64,
    pub skipped_lines: u64,
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let level = Level::from_str(level).map_err(|_| anyhow!("invalid log level '{}'", level))?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Read frames from `reader` and run them through a fresh session
///
/// Parsing happens on the async side; the tracker lives on a blocking
/// worker that owns it exclusively for the whole session.
pub async fn run_session<S, R>(
    name: String,
    reader: S,
    config: Arc<MonitorConfig>,
    reporter: R,
    out: mpsc::UnboundedSender<DecisionLine>,
) -> anyhow::Result<SessionSummary>
where
    S: AsyncBufRead + Unpin,
    R: IncidentReporter + Send + 'static,
{
    let tracker = DrowsinessTracker::new(config.tracker.clone())?;
    let mut session = DmsSession::new(name.clone(), tracker, RecordedDetector, reporter);
    if let Some(location) = &config.location {
        session = session.with_location(location.clone());
    }

    let (tx, mut rx) = mpsc::channel::<FrameRecord>(config.channel_capacity);

    let worker = tokio::task::spawn_blocking(move || {
        let mut skipped = 0u64;
        while let Some(frame) = rx.blocking_recv() {
            let Some(now) = frame.timestamp() else {
                warn!("{}: skipping frame with invalid timestamp {}", session.name(), frame.t);
                skipped += 1;
                continue;
            };

            let outcome = match frame.observation {
                Some(observation) => session.observe(observation, now),
                None => match session.process_frame(&frame, now) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("{}: frame at {:.3}s rejected: {}", session.name(), frame.t, e);
                        skipped += 1;
                        continue;
                    }
                },
            };

            let line = DecisionLine {
                session: session.name().to_string(),
                t: frame.t,
                label: outcome.decision.label(),
                decision: outcome.decision,
                report: outcome.report,
            };
            // Receiver gone means nobody is printing; keep tracking anyway
            let _ = out.send(line);
        }

        SessionSummary {
            name: session.name().to_string(),
            frames: session.frames(),
            alerts: session.tracker().state().alerts_fired,
            report_failures: session.report_failures(),
            skipped_lines: skipped,
        }
    });

    let mut lines = reader.lines();
    let mut unparsable = 0u64;
    let mut line_no = 0u64;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FrameRecord>(&line) {
            Ok(frame) => {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("{}: line {} is not a frame record: {}", name, line_no, e);
                unparsable += 1;
            }
        }
    }
    drop(tx);

    let mut summary = worker.await?;
    summary.skipped_lines += unparsable;
    Ok(summary)
}

/// Run the monitor
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MonitorConfig::load(cli.config.as_deref())?;
    init_logging(&config.log_level, cli.json_logs)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = if cli.print_metrics {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    let reporter = Arc::new(JsonFileStore::new(store_path));
    let config = Arc::new(config);

    let sources = if cli.inputs.is_empty() {
        vec![InputSource::Stdin]
    } else {
        cli.inputs.into_iter().map(InputSource::File).collect()
    };

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let mut handles = Vec::with_capacity(sources.len());
    for source in sources {
        let config = Arc::clone(&config);
        let reporter = Arc::clone(&reporter);
        let out = out_tx.clone();
        handles.push(tokio::spawn(async move {
            let name = source.name();
            match source {
                InputSource::Stdin => {
                    run_session(name, BufReader::new(tokio::io::stdin()), config, reporter, out).await
                }
                InputSource::File(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .map_err(|e| anyhow!("cannot open {}: {}", path.display(), e))?;
                    run_session(name, BufReader::new(file), config, reporter, out).await
                }
            }
        }));
    }
    drop(out_tx);

    while let Some(line) = out_rx.recv().await {
        println!("{}", serde_json::to_string(&line)?);
    }

    let mut failed = 0usize;
    for handle in handles {
        match handle.await? {
            Ok(summary) => info!(
                "Session {} finished: {} frames, {} alerts, {} report failures, {} skipped lines",
                summary.name,
                summary.frames,
                summary.alerts,
                summary.report_failures,
                summary.skipped_lines
            ),
            Err(e) => {
                warn!("Session failed: {:#}", e);
                failed += 1;
            }
        }
    }

    if let Some(handle) = metrics {
        eprint!("{}", handle.render());
    }

    anyhow::ensure!(failed == 0, "{} session(s) failed", failed);
    Ok(())
}
