//! Live reporting and completion detection.
mod timer;

use crate::aggregate::LiveStats;
use crate::error::BenchError;
use crate::summary::RunResult;
use graphbench_core::{RequestBudget, RunConfig};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use timer::Timer;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// How the reporting loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnd {
    /// Every request in the budget was processed.
    Completed,
    /// The run was cancelled before reaching its budget (or it had none).
    Interrupted,
}

/// Point-in-time figures printed once per reporting period.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusLine {
    pub elapsed: Duration,
    /// Percentage of the request budget processed; `None` when running unbounded.
    pub completion: Option<f64>,
    pub commands: u64,
    pub errors: u64,
    pub error_percent: f64,
    /// Commands per second since the previous tick.
    pub command_rate: f64,
    /// Client-observed p50 since the previous tick.
    pub client_p50: Duration,
    /// Server-reported p50 since the previous tick.
    pub server_p50: Duration,
}

/// Push interface for live and final results.
pub trait ReportSink: Send + Sync {
    fn started(&self, _config: &RunConfig) {}

    fn status(&self, line: &StatusLine);

    fn finished(&self, _result: &RunResult) {}
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn status(&self, _line: &StatusLine) {}
}

/// Prints a single, continuously overwritten status line to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn started(&self, config: &RunConfig) {
        match (config.requests, config.client_shares()) {
            (RequestBudget::Fixed(total), Some(shares)) => println!(
                "Total clients: {}. Commands per client: {} Total commands: {}",
                config.clients,
                shares.first().copied().unwrap_or_default(),
                total
            ),
            _ => println!("Running in loop until you hit Ctrl+C"),
        }
        println!(
            "{:>26} {:>7} {:>25} {:>25} {:>7} {:>25} {:>25} {:>26}",
            "Test time",
            "",
            "Total Commands",
            "Total Errors",
            "",
            "Command Rate",
            "Client p50 with RTT(ms)",
            "Graph Internal Time p50 (ms)"
        );
    }

    fn status(&self, line: &StatusLine) {
        write_status(&mut std::io::stdout().lock(), line);
    }

    fn finished(&self, result: &RunResult) {
        println!();
        println!("{result}");
    }
}

/// Overwrites the current terminal line. A broken output only costs the status line.
fn write_status(out: &mut impl Write, line: &StatusLine) {
    let completion = match line.completion {
        Some(pct) => format!("[{pct:3.1}%]"),
        None => "[----%]".to_string(),
    };
    let written = write!(
        out,
        "{:>25}s {} {:>25} {:>25} [{:3.1}%] {:>25.2} {:>25.3} {:>26.3}\t\r",
        line.elapsed.as_secs(),
        completion,
        line.commands,
        line.errors,
        line.error_percent,
        line.command_rate,
        millis(line.client_p50),
        millis(line.server_p50),
    )
    .and_then(|()| out.flush());
    if let Err(err) = written {
        debug!("Unable to write status line: {err}");
    }
}

pub(crate) fn millis(dur: Duration) -> f64 {
    dur.as_secs_f64() * 1_000.
}

/// Computes `(current - previous) / took`, in events per second.
pub fn rate(current: u64, previous: u64, took: Duration) -> f64 {
    let secs = took.as_secs_f64();
    if secs > 0. {
        current.saturating_sub(previous) as f64 / secs
    } else {
        0.
    }
}

pub(crate) struct Reporter {
    live: Arc<LiveStats>,
    budget: Option<u64>,
    period: Duration,
    cancel: CancellationToken,
    sink: Arc<dyn ReportSink>,
}

impl Reporter {
    pub fn new(
        live: Arc<LiveStats>,
        budget: Option<u64>,
        period: Duration,
        cancel: CancellationToken,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            live,
            budget,
            period,
            cancel,
            sink,
        }
    }

    /// Ticks until the budget has been processed or the run is cancelled.
    pub async fn run(self, start: Instant) -> Result<RunEnd, BenchError> {
        let mut timer = Timer::new(self.period).await;
        debug!("Reporting every {timer}.");
        let mut prev_commands = 0;

        loop {
            let took = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Run interrupted, stopping live reporting.");
                    return Ok(RunEnd::Interrupted);
                }
                took = timer.tick() => took,
            };

            let commands = self.live.commands();
            let errors = self.live.errors();
            let instant = self.live.take_instant()?;

            let line = StatusLine {
                elapsed: start.elapsed(),
                completion: self
                    .budget
                    .map(|budget| commands as f64 / budget as f64 * 100.),
                commands,
                errors,
                error_percent: if commands > 0 {
                    errors as f64 / commands as f64 * 100.
                } else {
                    0.
                },
                command_rate: rate(commands, prev_commands, took),
                client_p50: instant.client_p50,
                server_p50: instant.server_p50,
            };
            trace!("{line:?}");
            self.sink.status(&line);
            prev_commands = commands;

            if self.budget.is_some_and(|budget| commands >= budget) {
                return Ok(RunEnd::Completed);
            }
        }
    }
}
