mod utils;
use utils::*;

use graphbench::prelude::*;
use mock_graph::MockGraph;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn cancel_after(delay: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn interrupted_run_keeps_collected_data() {
    init();

    let graph = MockGraph::new().latency(Duration::from_millis(2)).build();
    let result = quiet(graph.clone(), mixed_workload())
        .clients(4)
        .requests(1_000_000)
        .cancellation_token(cancel_after(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(result.end, RunEnd::Interrupted);
    assert!(!result.fully_run);
    assert!(result.issued_commands > 0);
    assert!(result.issued_commands < 1_000_000);
    assert!(result.issued_commands <= graph.calls());

    let total = &result.totals.total;
    assert_eq!(total.issued_queries, result.issued_commands);
    let per_query: u64 = result
        .totals
        .per_query
        .iter()
        .map(|q| q.stats.issued_queries)
        .sum();
    assert_eq!(per_query, total.issued_queries);
    assert!(result.client_quantiles.total.q50 >= 2.);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn loop_mode_runs_until_cancelled() {
    init();

    let graph = MockGraph::new().latency(Duration::from_micros(200)).build();
    let start = std::time::Instant::now();
    let result = quiet(graph, mixed_workload())
        .clients(3)
        .run_forever()
        .cancellation_token(cancel_after(Duration::from_millis(500)))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(500));
    assert_eq!(result.end, RunEnd::Interrupted);
    assert_eq!(result.configured_requests, None);
    assert!(result.issued_commands > 0);
    assert!(result.duration_ms >= 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn small_backlog_still_completes() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).build();
    let result = quiet(graph, mixed_workload())
        .clients(8)
        .requests(5_000)
        .event_backlog(4)
        .await
        .unwrap();

    assert_eq!(result.end, RunEnd::Completed);
    assert_eq!(result.issued_commands, 5_000);
}
