use std::time::Duration;

/// Placeholder replaced with a freshly drawn random integer on every occurrence.
pub const RAND_INT_PLACEHOLDER: &str = "__rand_int__";

/// Version tag carried by every serialized run result.
pub const RESULT_FORMAT_VERSION: &str = "graphbench/run-result/0.0.1";

/// Allowed drift of the configured weights away from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

pub const DEFAULT_CLIENTS: usize = 50;
pub const DEFAULT_REQUESTS: u64 = 1_000_000;
pub const DEFAULT_RANDOM_SEED: u64 = 12345;
pub const DEFAULT_RANDOM_INT_WIDTH: i64 = 1_000_000;
pub const DEFAULT_REPORTING_PERIOD: Duration = Duration::from_secs(1);

/// Outcome channel capacity used when the run has no request budget.
pub const DEFAULT_LOOP_BACKLOG: usize = 1 << 16;

/// Largest outcome channel capacity ever requested, whatever the budget or backlog setting.
pub const MAX_EVENT_BACKLOG: usize = 1 << 24;

/// Highest trackable latency, in microseconds (25 hours).
pub const HISTOGRAM_MAX_MICROS: u64 = 90_000_000_000;

/// Significant figures kept by every latency histogram.
pub const HISTOGRAM_SIGFIG: u8 = 3;
