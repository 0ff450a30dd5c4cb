//! Outcome aggregation.
//!
//! A single pipeline task owns every full-run histogram and counter ([`Aggregate`]) and hands
//! them back only once it has exited. The reporter sees the run through [`LiveStats`]: two
//! atomics and a mutex-guarded pair of instant histograms covering the time since its last tick.
use crate::error::BenchError;
use graphbench_core::{MutationCounts, RequestOutcome, HISTOGRAM_MAX_MICROS, HISTOGRAM_SIGFIG};
use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Client-observed and server-reported latency, both in microseconds.
#[derive(Clone, Debug)]
pub struct LatencyHistograms {
    pub client: Histogram<u64>,
    pub server: Histogram<u64>,
}

impl LatencyHistograms {
    pub fn new() -> Result<Self, BenchError> {
        Ok(Self {
            client: latency_histogram()?,
            server: latency_histogram()?,
        })
    }

    pub fn record(&mut self, client: Duration, server: Duration) -> Result<(), BenchError> {
        record_micros(&mut self.client, client)?;
        record_micros(&mut self.server, server)
    }

    /// Number of recorded requests.
    pub fn len(&self) -> u64 {
        self.client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.client.is_empty()
    }

    pub fn reset(&mut self) {
        self.client.reset();
        self.server.reset();
    }
}

fn latency_histogram() -> Result<Histogram<u64>, BenchError> {
    Ok(Histogram::new_with_bounds(
        1,
        HISTOGRAM_MAX_MICROS,
        HISTOGRAM_SIGFIG,
    )?)
}

fn record_micros(histogram: &mut Histogram<u64>, latency: Duration) -> Result<(), BenchError> {
    let value = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
    histogram
        .record(value)
        .map_err(|_| BenchError::Record { value })
}

/// Everything accumulated for one query (or for all of them).
#[derive(Clone, Debug)]
pub struct QueryStats {
    pub latency: LatencyHistograms,
    pub errors: u64,
    pub empty_results: u64,
    pub mutations: MutationCounts,
}

impl QueryStats {
    fn new() -> Result<Self, BenchError> {
        Ok(Self {
            latency: LatencyHistograms::new()?,
            errors: 0,
            empty_results: 0,
            mutations: MutationCounts::default(),
        })
    }

    /// Requests issued, failed ones included.
    pub fn issued(&self) -> u64 {
        self.latency.len()
    }

    fn record(&mut self, outcome: &RequestOutcome) -> Result<(), BenchError> {
        self.latency
            .record(outcome.client_duration, outcome.server_duration)?;

        if outcome.error {
            self.errors += 1;
        } else {
            self.mutations += outcome.mutations;
            if outcome.empty {
                self.empty_results += 1;
            }
        }
        Ok(())
    }
}

/// Full-run statistics, per query index and overall.
#[derive(Clone, Debug)]
pub struct Aggregate {
    per_query: Vec<QueryStats>,
    total: QueryStats,
    processed: u64,
}

impl Aggregate {
    pub fn new(queries: usize) -> Result<Self, BenchError> {
        Ok(Self {
            per_query: (0..queries)
                .map(|_| QueryStats::new())
                .collect::<Result<_, _>>()?,
            total: QueryStats::new()?,
            processed: 0,
        })
    }

    pub fn record(&mut self, outcome: &RequestOutcome) -> Result<(), BenchError> {
        match self.per_query.get_mut(outcome.query_index) {
            Some(stats) => stats.record(outcome)?,
            None => error!(
                "Outcome for unknown query #{}; counting it in the totals only.",
                outcome.query_index
            ),
        }
        self.total.record(outcome)?;
        self.processed += 1;
        Ok(())
    }

    pub fn per_query(&self) -> &[QueryStats] {
        &self.per_query
    }

    pub fn total(&self) -> &QueryStats {
        &self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }
}

/// Instant latency figures handed to the reporter.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InstantLatency {
    pub count: u64,
    pub client_p50: Duration,
    pub server_p50: Duration,
}

/// State the reporter may read while the run is in progress.
pub struct LiveStats {
    commands: AtomicU64,
    errors: AtomicU64,
    instant: Mutex<LatencyHistograms>,
}

impl LiveStats {
    pub fn new() -> Result<Self, BenchError> {
        Ok(Self {
            commands: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            instant: Mutex::new(LatencyHistograms::new()?),
        })
    }

    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn record(&self, outcome: &RequestOutcome) -> Result<(), BenchError> {
        self.commands.fetch_add(1, Ordering::Relaxed);
        if outcome.error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        self.instant
            .lock()?
            .record(outcome.client_duration, outcome.server_duration)
    }

    /// Number of requests recorded in the instant histograms since the last reset.
    pub fn instant_len(&self) -> Result<u64, BenchError> {
        Ok(self.instant.lock()?.len())
    }

    /// Reads the instant p50 figures and resets the instant histograms in one critical section.
    pub fn take_instant(&self) -> Result<InstantLatency, BenchError> {
        let mut instant = self.instant.lock()?;
        let latency = InstantLatency {
            count: instant.len(),
            client_p50: Duration::from_micros(instant.client.value_at_quantile(0.5)),
            server_p50: Duration::from_micros(instant.server.value_at_quantile(0.5)),
        };
        instant.reset();
        Ok(latency)
    }
}

/// The single consumer of the outcome channel.
pub(crate) struct Pipeline {
    rx: Receiver<RequestOutcome>,
    budget: Option<u64>,
    live: Arc<LiveStats>,
    cancel: CancellationToken,
    aggregate: Aggregate,
}

impl Pipeline {
    pub fn new(
        rx: Receiver<RequestOutcome>,
        queries: usize,
        budget: Option<u64>,
        live: Arc<LiveStats>,
        cancel: CancellationToken,
    ) -> Result<Self, BenchError> {
        Ok(Self {
            rx,
            budget,
            live,
            cancel,
            aggregate: Aggregate::new(queries)?,
        })
    }

    /// Drains outcomes until the budget is processed, every sender is gone, or the run is
    /// cancelled. Running out of senders cancels the run. Returns the full-run statistics.
    pub async fn run(mut self) -> Result<Aggregate, BenchError> {
        if self.budget == Some(0) {
            return Ok(self.aggregate);
        }

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Run interrupted, stopping outcome processing.");
                    break;
                }
                outcome = self.rx.recv() => outcome,
            };

            // Every worker is gone before the budget was met, so the run can't complete.
            let Some(outcome) = outcome else {
                warn!(
                    "Outcome channel closed after {} outcomes, stopping the run.",
                    self.aggregate.processed()
                );
                self.cancel.cancel();
                break;
            };

            if let Err(err) = self.record(&outcome) {
                error!("Unable to record outcome: {err}");
                self.cancel.cancel();
                return Err(err);
            }

            if self
                .budget
                .is_some_and(|budget| self.aggregate.processed() >= budget)
            {
                debug!("Processed all {} outcomes.", self.aggregate.processed());
                break;
            }
        }

        Ok(self.aggregate)
    }

    fn record(&mut self, outcome: &RequestOutcome) -> Result<(), BenchError> {
        self.aggregate.record(outcome)?;
        self.live.record(outcome)?;

        #[cfg(feature = "metrics")]
        {
            let query = outcome.query_index.to_string();
            metrics::counter!("graphbench_commands", "query" => query.clone()).increment(1);
            if outcome.error {
                metrics::counter!("graphbench_errors", "query" => query.clone()).increment(1);
            }
            metrics::histogram!("graphbench_client_latency", "query" => query.clone())
                .record(outcome.client_duration.as_nanos() as f64);
            metrics::histogram!("graphbench_server_latency", "query" => query)
                .record(outcome.server_duration.as_nanos() as f64);
        }

        Ok(())
    }
}
