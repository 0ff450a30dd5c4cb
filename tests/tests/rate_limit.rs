mod utils;
use utils::*;

use graphbench::prelude::*;
use mock_graph::MockGraph;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn aggregate_rate_is_capped() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).build();
    let start = Instant::now();
    let result = quiet(graph, mixed_workload())
        .clients(10)
        .requests(1_010)
        .rate_limit(NonZeroU32::new(500).unwrap())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // Ten tokens up front, then 500 per second across all clients.
    assert!(elapsed >= Duration::from_millis(1_900), "{elapsed:?}");
    assert_eq!(result.issued_commands, 1_010);
    assert_eq!(result.max_rps, Some(500));
    assert!(result.query_rates.total.ops_per_sec <= 550.);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn uncapped_run_is_fast() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).build();
    let start = Instant::now();
    let result = quiet(graph, mixed_workload())
        .clients(10)
        .requests(1_000)
        .await
        .unwrap();

    assert_eq!(result.max_rps, None);
    assert!(start.elapsed() < Duration::from_secs(2));
}
