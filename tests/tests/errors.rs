mod utils;
use utils::*;

use graphbench::prelude::*;
use mock_graph::{MockGraph, Throughput};
use std::num::NonZeroU32;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn every_tenth_request_fails() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).fail_every(10).build();
    let result = quiet(graph, mixed_workload())
        .clients(8)
        .requests(10_000)
        .continue_on_error(true)
        .await
        .unwrap();

    let total = &result.totals.total;
    assert_eq!(total.issued_queries, 10_000);
    assert_eq!(total.errors, 1_000);
    assert_eq!(result.error_percent(), 10.);

    let per_query: u64 = result
        .totals
        .per_query
        .iter()
        .map(|q| q.stats.errors)
        .sum();
    assert_eq!(per_query, total.errors);

    // Failed writes report no mutations.
    let writes = &result.totals.per_query[1].stats;
    assert_eq!(writes.mutations.nodes_created, writes.issued_queries - writes.errors);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn failure_without_continue_ends_run() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).fail_every(100).build();
    let res = quiet(graph.clone(), mixed_workload())
        .clients(4)
        .requests(50_000)
        .continue_on_error(false)
        .await;

    match res {
        Err(BenchError::Query { reason, .. }) => {
            assert!(reason.starts_with("Injected failure on call #"), "{reason}");
        }
        other => panic!("expected a query error, got {other:?}"),
    }
    assert!(graph.calls() < 50_000);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn connection_failure_aborts() {
    init();

    let graph = MockGraph::new().refuse_client(3).build();
    let res = quiet(graph.clone(), mixed_workload())
        .clients(5)
        .requests(100)
        .await;

    assert!(matches!(res, Err(BenchError::Connect { client: 3, .. })));
    assert_eq!(graph.calls(), 0);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn invalid_configuration() {
    init();

    let res = quiet(MockGraph::new(), mixed_workload())
        .random_int_range(0, 0)
        .await;
    assert!(matches!(
        res,
        Err(BenchError::Config(graphbench::ConfigError::RandomIntWidth(0)))
    ));

    let res = quiet(MockGraph::new(), mixed_workload()).requests(0).await;
    assert!(matches!(
        res,
        Err(BenchError::Config(graphbench::ConfigError::EmptyBudget))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn overloaded_service_counts_errors() {
    init();

    let graph = MockGraph::new()
        .latency(Duration::ZERO)
        .throughput(Throughput::Max(NonZeroU32::new(100).unwrap()))
        .build();
    let result = quiet(graph, mixed_workload())
        .clients(4)
        .requests(1_000)
        .await
        .unwrap();

    let total = &result.totals.total;
    assert_eq!(total.issued_queries, 1_000);
    assert!(total.errors >= 800, "errors: {}", total.errors);

    // Failed requests still contribute client latency but no server time.
    assert_eq!(result.server_quantiles.total.q0, 0.);
}
