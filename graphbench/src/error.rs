use graphbench_core::ConfigError;
use std::sync::PoisonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Error preparing for benchmark, while creating connection #{client}: {reason}")]
    Connect { client: usize, reason: String },

    #[error("Received an error with the following query: {query}, error: {reason}")]
    Query { query: String, reason: String },

    #[error("Latency value {value}us is outside of the histogram range.")]
    Record { value: u64 },

    #[error("Unable to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("Benchmark task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Mutex is poisoned.")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for BenchError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}
