#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod benchmark;
pub mod error;
pub mod executor;
pub mod limiter;
pub mod reporter;
pub mod summary;
pub mod template;
pub mod workload;

pub(crate) mod worker;

pub use benchmark::Benchmark;
pub use error::BenchError;
pub use executor::{BoxError, Connector, LocalConnector, LocalQueryExecutor, QueryExecutor};
pub use limiter::RequestLimiter;
pub use reporter::{ConsoleSink, NullSink, ReportSink, RunEnd, StatusLine};
pub use summary::{Breakdown, QueryBreakdown, Quantiles, Rate, RunResult, Totals};
pub use template::{NamedTerms, TermMap, Templater};
pub use workload::Workload;

pub use graphbench_core as core;
pub use graphbench_core::{
    ConfigError, MutationCounts, QueryReply, QueryTemplate, RandomIntRange, RequestBudget,
    RequestOutcome, RunConfig,
};

pub mod prelude {
    pub use crate::benchmark::Benchmark;
    pub use crate::executor::{BoxError, Connector, QueryExecutor};
    pub use crate::reporter::{ConsoleSink, NullSink, ReportSink, RunEnd};
    pub use crate::summary::RunResult;
    pub use crate::template::{NamedTerms, TermMap};
    pub use crate::workload::Workload;
    pub use crate::BenchError;

    pub use graphbench_core::{QueryReply, QueryTemplate, RunConfig};
}
