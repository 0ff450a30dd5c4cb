mod utils;
use utils::*;

use mock_graph::MockGraph;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn pipeline_pushes_metrics() {
    init();
    let handle = metrics_handle();

    let graph = MockGraph::new().latency(Duration::ZERO).fail_every(5).build();
    let result = quiet(graph, mixed_workload())
        .clients(2)
        .requests(100)
        .await
        .unwrap();
    assert_eq!(result.issued_commands, 100);

    let rendered = handle.render();
    assert!(rendered.contains("graphbench_commands"), "{rendered}");
    assert!(rendered.contains("graphbench_errors"));
    assert!(rendered.contains("graphbench_client_latency"));
    assert!(rendered.contains("graphbench_server_latency"));
    assert!(rendered.contains("query=\"0\""));
}
