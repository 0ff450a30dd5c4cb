//! Post-run reduction of the aggregated statistics into a serializable record.
use crate::aggregate::{Aggregate, QueryStats};
use crate::reporter::RunEnd;
use crate::workload::Workload;
use graphbench_core::{MutationCounts, RunConfig, RESULT_FORMAT_VERSION};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Latency distribution, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    pub q0: f64,
    pub q50: f64,
    pub q95: f64,
    pub q99: f64,
    #[serde(rename = "q99.9")]
    pub q999: f64,
    pub q100: f64,
    pub mean: f64,
}

impl Quantiles {
    /// Reads a microsecond histogram. An empty histogram yields all zeros.
    pub fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }

        let ms = |micros: u64| micros as f64 / 1_000.;
        Self {
            q0: ms(histogram.value_at_quantile(0.0)),
            q50: ms(histogram.value_at_quantile(0.5)),
            q95: ms(histogram.value_at_quantile(0.95)),
            q99: ms(histogram.value_at_quantile(0.99)),
            q999: ms(histogram.value_at_quantile(0.999)),
            q100: ms(histogram.value_at_quantile(1.0)),
            mean: histogram.mean() / 1_000.,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub issued_queries: u64,
    pub errors: u64,
    pub empty_results: u64,
    #[serde(flatten)]
    pub mutations: MutationCounts,
}

impl From<&QueryStats> for Totals {
    fn from(stats: &QueryStats) -> Self {
        Self {
            issued_queries: stats.issued(),
            errors: stats.errors,
            empty_results: stats.empty_results,
            mutations: stats.mutations,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub ops_per_sec: f64,
}

impl Rate {
    fn new(observations: u64, duration: Duration) -> Self {
        let secs = duration.as_secs_f64();
        Self {
            ops_per_sec: if secs > 0. {
                observations as f64 / secs
            } else {
                0.
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryBreakdown<T> {
    pub query: String,
    #[serde(flatten)]
    pub stats: T,
}

/// One figure per query template, plus the same figure over the whole run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breakdown<T> {
    pub per_query: Vec<QueryBreakdown<T>>,
    pub total: T,
}

impl<T> Breakdown<T> {
    fn build<F>(workload: &Workload, aggregate: &Aggregate, f: F) -> Self
    where
        F: Fn(&QueryStats) -> T,
    {
        Self {
            per_query: workload
                .templates()
                .iter()
                .zip(aggregate.per_query())
                .map(|(template, stats)| QueryBreakdown {
                    query: template.text.clone(),
                    stats: f(stats),
                })
                .collect(),
            total: f(aggregate.total()),
        }
    }
}

/// Final record of a run, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub format_version: String,
    pub metadata: String,
    pub description: String,
    pub clients: usize,
    pub max_rps: Option<u32>,
    pub random_seed: u64,
    /// `None` when the run had no request limit.
    pub configured_requests: Option<u64>,
    pub issued_commands: u64,
    pub fully_run: bool,
    pub end: RunEnd,
    pub start_ms: i64,
    pub end_ms: i64,
    pub duration_ms: u64,
    pub totals: Breakdown<Totals>,
    pub query_rates: Breakdown<Rate>,
    pub client_quantiles: Breakdown<Quantiles>,
    pub server_quantiles: Breakdown<Quantiles>,
    pub config: RunConfig,
}

impl RunResult {
    pub(crate) fn new(
        config: &RunConfig,
        workload: &Workload,
        aggregate: &Aggregate,
        end: RunEnd,
        started: OffsetDateTime,
        finished: OffsetDateTime,
    ) -> Self {
        let duration = (finished - started).unsigned_abs();
        let issued_commands = aggregate.processed();
        let configured_requests = config.requests.limit();

        Self {
            format_version: RESULT_FORMAT_VERSION.to_string(),
            metadata: config.metadata.clone(),
            description: config.description.clone(),
            clients: config.clients,
            max_rps: config.rate_limit.map(|rate| rate.get()),
            random_seed: config.random_seed,
            configured_requests,
            issued_commands,
            fully_run: configured_requests.is_some_and(|limit| issued_commands >= limit),
            end,
            start_ms: unix_millis(started),
            end_ms: unix_millis(finished),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            totals: Breakdown::build(workload, aggregate, |stats| Totals::from(stats)),
            query_rates: Breakdown::build(workload, aggregate, |stats| {
                Rate::new(stats.issued(), duration)
            }),
            client_quantiles: Breakdown::build(workload, aggregate, |stats| {
                Quantiles::from_histogram(&stats.latency.client)
            }),
            server_quantiles: Breakdown::build(workload, aggregate, |stats| {
                Quantiles::from_histogram(&stats.latency.server)
            }),
            config: config.clone(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn error_percent(&self) -> f64 {
        let totals = &self.totals.total;
        if totals.issued_queries == 0 {
            0.
        } else {
            totals.errors as f64 / totals.issued_queries as f64 * 100.
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = &self.totals.total;
        writeln!(
            f,
            "Finished sending {} queries of type {}",
            self.issued_commands,
            self.totals.per_query.len()
        )?;
        writeln!(
            f,
            "Total duration {}",
            humantime::format_duration(self.duration())
        )?;
        writeln!(
            f,
            "Errors: {} ({:.3}%), empty results: {}",
            totals.errors,
            self.error_percent(),
            totals.empty_results
        )?;
        writeln!(
            f,
            "Overall throughput: {:.2} queries/sec",
            self.query_rates.total.ops_per_sec
        )?;

        for (client, server) in self
            .client_quantiles
            .per_query
            .iter()
            .zip(&self.server_quantiles.per_query)
        {
            writeln!(
                f,
                "{}: client p50 {:.3} ms, p95 {:.3} ms, p99 {:.3} ms; server p50 {:.3} ms",
                client.query, client.stats.q50, client.stats.q95, client.stats.q99, server.stats.q50
            )?;
        }

        let client = &self.client_quantiles.total;
        write!(
            f,
            "Overall: client p50 {:.3} ms, p95 {:.3} ms, p99 {:.3} ms",
            client.q50, client.q95, client.q99
        )
    }
}
