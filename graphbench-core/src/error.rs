use thiserror::Error;

/// Configuration problems. All of these are detected before any worker starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("At least one query is required.")]
    NoQueries,

    #[error("Weights are required when running more than one query ({queries} queries given).")]
    MissingWeights { queries: usize },

    #[error("Number of weights ({weights}) does not match the number of queries ({queries}).")]
    WeightCountMismatch { queries: usize, weights: usize },

    #[error("Weight {weight} for query #{index} is not a finite, non-negative number.")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("Total weight should be 1.0 (currently {0:.4}).")]
    WeightSum(f64),

    #[error("Client count must be at least 1.")]
    NoClients,

    #[error("Request budget must be at least 1.")]
    EmptyBudget,

    #[error("Random integer range width must be at least 1 (got {0}).")]
    RandomIntWidth(i64),

    #[error("Reporting period must be non-zero.")]
    ReportingPeriod,

    #[error("Event backlog must be at least 1.")]
    EventBacklog,
}
