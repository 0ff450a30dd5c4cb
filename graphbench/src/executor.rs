//! Seams to the graph service.
//!
//! Connection setup and the wire protocol live outside this crate. A benchmark only needs to
//! open one connection per client and then execute query text over it.
use graphbench_core::QueryReply;

/// Opaque per-request error. Only its presence matters to the benchmark.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Executes one query over an established connection.
#[trait_variant::make(QueryExecutor: Send)]
pub trait LocalQueryExecutor {
    async fn execute(&mut self, query: &str, read_only: bool) -> Result<QueryReply, BoxError>;
}

/// Opens connections, one per client. Failures here abort the run before any request is sent.
#[trait_variant::make(Connector: Send)]
pub trait LocalConnector {
    type Executor: QueryExecutor + 'static;

    async fn connect(&self, client: usize) -> Result<Self::Executor, BoxError>;
}
