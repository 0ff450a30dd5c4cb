//! An in-process stand-in for a graph service.
//!
//! [`MockGraph`] hands out [`MockSession`]s that sleep for a simulated latency and reply with a
//! server-side execution time, without any network involved. Failures, empty results and
//! throughput caps can be injected to exercise the benchmark's error paths.
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use graphbench::{BoxError, Connector, MutationCounts, QueryExecutor, QueryReply};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, info, trace};

#[derive(Debug, Error)]
pub enum MockError {
    #[error("Injected failure on call #{call}")]
    Injected { call: u64 },

    #[error("Server over capacity")]
    Overloaded,

    #[error("Connection refused for client #{client}")]
    Refused { client: usize },

    #[error("Invalid latency distribution: {0}")]
    Latency(#[from] NormalError),
}

/// How the mock reacts to more requests than it can serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Throughput {
    Unlimited,
    /// Requests queue until capacity frees up.
    Limited(NonZeroU32),
    /// Requests beyond capacity fail immediately.
    Max(NonZeroU32),
}

#[derive(Clone, Debug)]
struct MockConfig {
    latency: Duration,
    jitter: Duration,
    server_fraction: f64,
    fail_every: Option<u64>,
    empty_every: Option<u64>,
    refuse_client: Option<usize>,
    throughput: Throughput,
    seed: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1),
            jitter: Duration::ZERO,
            server_fraction: 0.5,
            fail_every: None,
            empty_every: None,
            refuse_client: None,
            throughput: Throughput::Unlimited,
            seed: 0,
        }
    }
}

struct Shared {
    config: MockConfig,
    calls: AtomicU64,
    limiter: Option<DefaultDirectRateLimiter>,
}

/// Simulated graph service. Cloning shares the call counter and throughput cap.
#[derive(Clone)]
pub struct MockGraph {
    config: MockConfig,
    shared: Option<Arc<Shared>>,
}

impl Default for MockGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraph {
    pub fn new() -> Self {
        Self {
            config: MockConfig::default(),
            shared: None,
        }
    }

    /// Mean client-side latency of each request.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.config.latency = latency;
        self
    }

    /// Standard deviation of the simulated latency.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Share of the latency reported as server-side execution time, clamped to `[0, 1]`.
    pub fn server_fraction(mut self, fraction: f64) -> Self {
        self.config.server_fraction = fraction.clamp(0., 1.);
        self
    }

    /// Every `n`th call (counted across all sessions) fails.
    pub fn fail_every(mut self, n: u64) -> Self {
        self.config.fail_every = Some(n.max(1));
        self
    }

    /// Every `n`th read-only call returns an empty result set.
    pub fn empty_every(mut self, n: u64) -> Self {
        self.config.empty_every = Some(n.max(1));
        self
    }

    pub fn refuse_client(mut self, client: usize) -> Self {
        self.config.refuse_client = Some(client);
        self
    }

    pub fn throughput(mut self, throughput: Throughput) -> Self {
        self.config.throughput = throughput;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Freezes the configuration. Sessions opened from clones of the result share state.
    pub fn build(mut self) -> Self {
        let limiter = match self.config.throughput {
            Throughput::Unlimited => None,
            Throughput::Limited(rps) | Throughput::Max(rps) => {
                Some(RateLimiter::direct(Quota::per_second(rps)))
            }
        };
        self.shared = Some(Arc::new(Shared {
            config: self.config.clone(),
            calls: AtomicU64::new(0),
            limiter,
        }));
        self
    }

    /// Total calls served so far, failed ones included.
    pub fn calls(&self) -> u64 {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.calls.load(Ordering::Relaxed))
    }

    /// Logs the number of calls served every `period` until the task is dropped.
    pub fn spawn_rate_printer(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let graph = self.clone();
        tokio::spawn(async move {
            let mut last = graph.calls();
            loop {
                tokio::time::sleep(period).await;
                let calls = graph.calls();
                info!("mock-graph served {} calls", calls - last);
                last = calls;
            }
        })
    }

    fn shared(&self) -> Arc<Shared> {
        match &self.shared {
            Some(shared) => shared.clone(),
            None => self.clone().build().shared(),
        }
    }
}

impl Connector for MockGraph {
    type Executor = MockSession;

    async fn connect(&self, client: usize) -> Result<MockSession, BoxError> {
        let shared = self.shared();
        if shared.config.refuse_client == Some(client) {
            return Err(MockError::Refused { client }.into());
        }

        let latency = Normal::new(
            shared.config.latency.as_secs_f64(),
            shared.config.jitter.as_secs_f64(),
        )
        .map_err(MockError::from)?;

        trace!("Client #{client} connected to mock-graph.");
        Ok(MockSession {
            rng: SmallRng::seed_from_u64(shared.config.seed.wrapping_add(client as u64)),
            latency,
            shared,
        })
    }
}

/// One simulated connection.
pub struct MockSession {
    shared: Arc<Shared>,
    latency: Normal<f64>,
    rng: SmallRng,
}

impl QueryExecutor for MockSession {
    async fn execute(&mut self, query: &str, read_only: bool) -> Result<QueryReply, BoxError> {
        let config = &self.shared.config;
        let call = self.shared.calls.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(limiter) = &self.shared.limiter {
            match config.throughput {
                Throughput::Max(_) if limiter.check().is_err() => {
                    return Err(MockError::Overloaded.into())
                }
                Throughput::Limited(_) => limiter.until_ready().await,
                _ => {}
            }
        }

        let secs = self.latency.sample(&mut self.rng).max(0.);
        let latency = Duration::from_secs_f64(secs);
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }

        if config.fail_every.is_some_and(|n| call % n == 0) {
            debug!("Injecting failure for: {query}");
            return Err(MockError::Injected { call }.into());
        }

        let mut mutations = MutationCounts::default();
        if !read_only {
            mutations.nodes_created = 1;
            mutations.properties_set = query.matches('{').count() as u64;
        }

        Ok(QueryReply {
            internal_execution_time: latency.mul_f64(config.server_fraction),
            empty: read_only && config.empty_every.is_some_and(|n| call % n == 0),
            mutations,
        })
    }
}
