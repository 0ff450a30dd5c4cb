//! Runs a mixed read/write benchmark against the in-process mock graph and prints the result
//! record as JSON.
use anyhow::Result;
use graphbench::prelude::*;
use mock_graph::{MockGraph, Throughput};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graphbench=info")),
        )
        .init();

    let graph = MockGraph::new()
        .latency(Duration::from_millis(2))
        .jitter(Duration::from_micros(500))
        .server_fraction(0.6)
        .fail_every(1_000)
        .throughput(Throughput::Limited(NonZeroU32::new(20_000).unwrap()))
        .build();
    let _printer = graph.spawn_rate_printer(Duration::from_secs(5));

    let workload = Workload::from_parts(
        vec![
            QueryTemplate::read_only("MATCH (p:Person {id: __rand_int__}) RETURN p"),
            QueryTemplate::read_only(
                "MATCH (p:Person {id: __rand_int__})-[:KNOWS]->(f) RETURN count(f)",
            ),
            QueryTemplate::new("CREATE (:Person {id: __rand_int__})"),
        ],
        &[0.6, 0.3, 0.1],
    )?;

    let result = Benchmark::new(graph, workload)
        .clients(32)
        .requests(50_000)
        .random_int_range(1, 100_000)
        .rate_limit(NonZeroU32::new(10_000).unwrap())
        .metadata("mock-run")
        .description("Mixed read/write demo against mock-graph")
        .await?;

    println!("{}", result.to_json_pretty()?);
    Ok(())
}
