//! Shared configuration and data records for `graphbench`.
//!
//! Everything in here is plain data: the run configuration, the query templates that make up a
//! workload, and the per-request records that flow from workers to the aggregation pipeline.
mod config;
mod constants;
mod error;
mod outcome;
mod query;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use outcome::*;
pub use query::*;
