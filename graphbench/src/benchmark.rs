//! Benchmark entry point and run coordination.
use crate::aggregate::{LiveStats, Pipeline};
use crate::error::BenchError;
use crate::executor::Connector;
use crate::limiter::RequestLimiter;
use crate::reporter::{ConsoleSink, ReportSink, Reporter, RunEnd};
use crate::summary::RunResult;
use crate::template::{NamedTerms, Templater};
use crate::worker::{Positions, Worker, WorkerShared};
use crate::workload::Workload;
use graphbench_core::{RandomIntRange, RequestBudget, RunConfig};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::{
    fmt,
    future::{Future, IntoFuture},
    num::NonZeroU32,
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Init,
    Running,
    Completed,
    Interrupted,
    Draining,
    Done,
}

impl From<RunEnd> for Phase {
    fn from(end: RunEnd) -> Self {
        match end {
            RunEnd::Completed => Phase::Completed,
            RunEnd::Interrupted => Phase::Interrupted,
        }
    }
}

/// A configured benchmark run.
///
/// Drives `clients` connections from `connector` against the weighted query mix in `workload`.
/// Await it (or call [`Benchmark::run`]) to execute the run.
///
/// # Example
/// ```no_run
/// # async fn example<C>(connector: C) -> Result<(), graphbench::BenchError>
/// # where C: graphbench::Connector + Send + Sync + 'static {
/// use graphbench::prelude::*;
/// use std::num::NonZeroU32;
///
/// let workload = Workload::from_parts(
///     vec![
///         QueryTemplate::read_only("MATCH (n:Person {id: __rand_int__}) RETURN n"),
///         QueryTemplate::new("CREATE (:Person {id: __rand_int__})"),
///     ],
///     &[0.7, 0.3],
/// )?;
///
/// let result = Benchmark::new(connector, workload)
///     .clients(16)
///     .requests(100_000)
///     .rate_limit(NonZeroU32::new(5_000).unwrap())
///     .await?;
///
/// println!("{}", result.to_json_pretty().unwrap());
/// # Ok(())
/// # }
/// ```
pub struct Benchmark<C> {
    connector: C,
    workload: Workload,
    config: RunConfig,
    terms: NamedTerms,
    sink: Arc<dyn ReportSink>,
    cancel: CancellationToken,
    handle_ctrl_c: bool,
}

impl<C> fmt::Debug for Benchmark<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Benchmark")
            .field("workload", &self.workload)
            .field("config", &self.config)
            .field("terms", &self.terms)
            .field("handle_ctrl_c", &self.handle_ctrl_c)
            .finish_non_exhaustive()
    }
}

impl<C> Benchmark<C> {
    pub fn new(connector: C, workload: Workload) -> Self {
        Self {
            connector,
            workload,
            config: RunConfig::default(),
            terms: NamedTerms::default(),
            sink: Arc::new(ConsoleSink),
            cancel: CancellationToken::new(),
            handle_ctrl_c: true,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Replaces the whole configuration at once.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of concurrent client connections.
    pub fn clients(mut self, clients: usize) -> Self {
        self.config.clients = clients;
        self
    }

    /// Total number of requests, split across all clients.
    pub fn requests(mut self, requests: u64) -> Self {
        self.config.requests = RequestBudget::Fixed(requests);
        self
    }

    /// Keep issuing requests until the run is cancelled.
    pub fn run_forever(mut self) -> Self {
        self.config.requests = RequestBudget::Unbounded;
        self
    }

    /// Caps the aggregate request rate across all clients.
    pub fn rate_limit(mut self, rps: NonZeroU32) -> Self {
        self.config.rate_limit = Some(rps);
        self
    }

    /// Values substituted for `__rand_int__` are drawn from `[offset, offset + width)`.
    pub fn random_int_range(mut self, offset: i64, width: i64) -> Self {
        self.config.random_int = RandomIntRange::new(offset, width);
        self
    }

    /// When disabled, the first failed request ends the run with [`BenchError::Query`].
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.config.continue_on_error = continue_on_error;
        self
    }

    pub fn reporting_period(mut self, period: Duration) -> Self {
        self.config.reporting_period = period;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Capacity of the outcome channel. Defaults to the request budget.
    pub fn event_backlog(mut self, backlog: usize) -> Self {
        self.config.event_backlog = Some(backlog);
        self
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.config.metadata = metadata.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn named_terms(mut self, terms: NamedTerms) -> Self {
        self.terms = terms;
        self
    }

    pub fn sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Cancelling `token` interrupts the run. Results collected so far are still returned.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Whether Ctrl+C interrupts the run. Enabled by default.
    pub fn handle_ctrl_c(mut self, enabled: bool) -> Self {
        self.handle_ctrl_c = enabled;
        self
    }
}

impl<C> Benchmark<C>
where
    C: Connector + Send + Sync + 'static,
{
    #[instrument(name = "benchmark", skip_all, fields(clients = self.config.clients))]
    pub async fn run(self) -> Result<RunResult, BenchError> {
        let Self {
            connector,
            workload,
            config,
            terms,
            sink,
            cancel,
            handle_ctrl_c,
        } = self;

        phase(Phase::Init);
        config.validate()?;
        debug!("Running benchmark with config {config:?}");

        let mut executors = Vec::with_capacity(config.clients);
        for client in 0..config.clients {
            let executor = connector
                .connect(client)
                .await
                .map_err(|err| BenchError::Connect {
                    client,
                    reason: err.to_string(),
                })?;
            executors.push(executor);
        }
        info!("Established {} connections.", executors.len());

        let budget = config.requests.limit();
        let live = Arc::new(LiveStats::new()?);
        let (tx, rx) = mpsc::channel(config.event_capacity());

        sink.started(&config);
        let started_at = OffsetDateTime::now_utc();
        let start = Instant::now();

        let pipeline = Pipeline::new(rx, workload.len(), budget, live.clone(), cancel.clone())?;
        let pipeline = tokio::spawn(pipeline.run());

        let shared = Arc::new(WorkerShared {
            workload: workload.clone(),
            templater: Templater::new(config.random_int, terms),
            limiter: RequestLimiter::new(config.rate_limit, config.clients),
            continue_on_error: config.continue_on_error,
            cancel: cancel.clone(),
        });

        let shares = config.client_shares();
        let mut seeds = SmallRng::seed_from_u64(config.random_seed);
        let mut workers = JoinSet::new();
        let mut position = 0;
        for (id, executor) in executors.into_iter().enumerate() {
            let iterations = shares
                .as_ref()
                .map(|shares| shares.get(id).copied().unwrap_or_default());
            let positions = match iterations {
                Some(n) => {
                    let positions = Positions::contiguous(position);
                    position += n;
                    positions
                }
                None => Positions::interleaved(id, config.clients),
            };
            let worker = Worker::new(
                id,
                executor,
                shared.clone(),
                tx.clone(),
                iterations,
                positions,
                SmallRng::seed_from_u64(seeds.gen()),
            );
            workers.spawn(worker.run());
        }
        drop(tx);

        let ctrl_c = handle_ctrl_c.then(|| tokio::spawn(interrupt_on_ctrl_c(cancel.clone())));

        phase(Phase::Running);
        let reporter = Reporter::new(
            live,
            budget,
            config.reporting_period,
            cancel.clone(),
            sink.clone(),
        );
        let end = reporter.run(start).await;
        let finished_at = OffsetDateTime::now_utc();

        if let Some(ctrl_c) = ctrl_c {
            ctrl_c.abort();
        }

        let end = match end {
            Ok(end) => end,
            Err(err) => {
                error!("Live reporting failed: {err}");
                cancel.cancel();
                RunEnd::Interrupted
            }
        };
        phase(end.into());
        if end == RunEnd::Interrupted {
            cancel.cancel();
        }

        phase(Phase::Draining);
        let aggregate = pipeline.await?;

        let mut fatal = None;
        while let Some(res) = workers.join_next().await {
            match res? {
                Ok(issued) => trace!("Worker finished after {issued} requests."),
                Err(err) => {
                    fatal.get_or_insert(err);
                }
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }
        let aggregate = aggregate?;

        phase(Phase::Done);
        let result = RunResult::new(
            &config,
            &workload,
            &aggregate,
            end,
            started_at,
            finished_at,
        );
        info!(
            "Benchmark {:?} after {} commands in {}.",
            result.end,
            result.issued_commands,
            humantime::format_duration(result.duration())
        );
        sink.finished(&result);

        Ok(result)
    }
}

impl<C> IntoFuture for Benchmark<C>
where
    C: Connector + Send + Sync + 'static,
{
    type Output = Result<RunResult, BenchError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

fn phase(phase: Phase) {
    debug!("Benchmark phase: {phase:?}");
}

async fn interrupt_on_ctrl_c(cancel: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => {
                warn!("Received interrupt, stopping benchmark.");
                cancel.cancel();
            }
            Err(err) => error!("Unable to listen for Ctrl+C: {err}"),
        },
        _ = cancel.cancelled() => {}
    }
}
