use crate::{
    ConfigError, DEFAULT_CLIENTS, DEFAULT_RANDOM_INT_WIDTH, DEFAULT_RANDOM_SEED,
    DEFAULT_REPORTING_PERIOD, DEFAULT_REQUESTS, MAX_EVENT_BACKLOG,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::num::NonZeroU32;
use std::time::Duration;

/// How many requests a run issues in total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestBudget {
    /// Issue exactly this many requests, split across all clients.
    Fixed(u64),
    /// Keep issuing requests until the run is interrupted.
    Unbounded,
}

impl RequestBudget {
    pub fn limit(&self) -> Option<u64> {
        match self {
            RequestBudget::Fixed(n) => Some(*n),
            RequestBudget::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, RequestBudget::Unbounded)
    }
}

/// Half-open range `[offset, offset + width)` that random integer placeholders are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomIntRange {
    pub offset: i64,
    pub width: i64,
}

impl RandomIntRange {
    pub fn new(offset: i64, width: i64) -> Self {
        Self { offset, width }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.offset
            && value
                .checked_sub(self.offset)
                .is_some_and(|delta| delta < self.width)
    }
}

impl Default for RandomIntRange {
    fn default() -> Self {
        Self::new(0, DEFAULT_RANDOM_INT_WIDTH)
    }
}

/// Settings for a single benchmark run. Fixed once the run starts.
///
/// Usually assembled through the builder methods on `graphbench::Benchmark`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub clients: usize,
    pub requests: RequestBudget,
    pub rate_limit: Option<NonZeroU32>,
    pub random_int: RandomIntRange,
    pub continue_on_error: bool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub reporting_period: Duration,
    pub random_seed: u64,
    pub event_backlog: Option<usize>,
    pub metadata: String,
    pub description: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clients: DEFAULT_CLIENTS,
            requests: RequestBudget::Fixed(DEFAULT_REQUESTS),
            rate_limit: None,
            random_int: RandomIntRange::default(),
            continue_on_error: true,
            reporting_period: DEFAULT_REPORTING_PERIOD,
            random_seed: DEFAULT_RANDOM_SEED,
            event_backlog: None,
            metadata: String::new(),
            description: String::new(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clients == 0 {
            return Err(ConfigError::NoClients);
        }

        if self.requests == RequestBudget::Fixed(0) {
            return Err(ConfigError::EmptyBudget);
        }

        if self.random_int.width < 1 {
            return Err(ConfigError::RandomIntWidth(self.random_int.width));
        }

        if self.reporting_period.is_zero() {
            return Err(ConfigError::ReportingPeriod);
        }

        if self.event_backlog == Some(0) {
            return Err(ConfigError::EventBacklog);
        }

        Ok(())
    }

    /// Number of requests each client issues, or `None` when running unbounded.
    ///
    /// The remainder of an uneven split goes to the lowest client ids, so the shares always sum
    /// to the full budget.
    pub fn client_shares(&self) -> Option<Vec<u64>> {
        let total = self.requests.limit()?;
        let clients = self.clients.max(1) as u64;
        let base = total / clients;
        let remainder = total % clients;

        Some(
            (0..clients)
                .map(|id| if id < remainder { base + 1 } else { base })
                .collect(),
        )
    }

    /// Capacity of the outcome channel between workers and the aggregation pipeline.
    ///
    /// Sized to the whole budget unless overridden, and never above [`MAX_EVENT_BACKLOG`].
    pub fn event_capacity(&self) -> usize {
        let capacity = match (self.event_backlog, self.requests) {
            (Some(backlog), _) => backlog,
            (None, RequestBudget::Fixed(n)) => usize::try_from(n).unwrap_or(usize::MAX),
            (None, RequestBudget::Unbounded) => crate::DEFAULT_LOOP_BACKLOG,
        };
        capacity.clamp(1, MAX_EVENT_BACKLOG)
    }
}
