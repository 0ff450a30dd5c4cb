mod utils;
use utils::*;

use graphbench::prelude::*;
use mock_graph::MockGraph;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60_000)]
async fn weighted_mix_over_100k_requests() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).build();
    let result = quiet(graph.clone(), mixed_workload())
        .clients(16)
        .requests(100_000)
        .random_int_range(-50, 100)
        .await
        .unwrap();

    assert_eq!(graph.calls(), 100_000);
    assert_eq!(result.end, RunEnd::Completed);
    assert!(result.fully_run);
    assert_eq!(result.issued_commands, 100_000);

    let reads = result.totals.per_query[0].stats.issued_queries;
    let writes = result.totals.per_query[1].stats.issued_queries;
    assert!(reads.abs_diff(70_000) <= 1_400, "reads: {reads}");
    assert!(writes.abs_diff(30_000) <= 600, "writes: {writes}");
    assert_eq!(reads + writes, result.totals.total.issued_queries);

    // One property map per write, nothing for reads.
    assert_eq!(result.totals.per_query[0].stats.mutations.nodes_created, 0);
    assert_eq!(
        result.totals.per_query[1].stats.mutations.nodes_created,
        writes
    );
    assert_eq!(result.totals.total.mutations.properties_set, writes);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60_000)]
async fn latency_quantiles_follow_service() {
    init();

    let graph = MockGraph::new()
        .latency(Duration::from_millis(5))
        .server_fraction(0.5)
        .build();
    let result = quiet(graph, mixed_workload())
        .clients(10)
        .requests(500)
        .await
        .unwrap();

    let client = &result.client_quantiles.total;
    let server = &result.server_quantiles.total;
    assert!(client.q0 >= 5., "{client:?}");
    assert!(client.q50 >= client.q0);
    assert!(client.q100 >= client.q99);
    assert!((server.q50 - 2.5).abs() < 0.05, "{server:?}");
    assert!(client.q50 > server.q50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn uneven_budget_fully_processed() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).build();
    let result = quiet(graph.clone(), mixed_workload())
        .clients(7)
        .requests(1_001)
        .await
        .unwrap();

    assert_eq!(graph.calls(), 1_001);
    assert_eq!(result.issued_commands, 1_001);
    assert!(result.fully_run);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ntest::timeout(30_000)]
async fn named_terms_reach_service() {
    init();

    let workload = Workload::new(vec![QueryTemplate::read_only(
        "MATCH (e:Entity {uid: '__Entity__'}) RETURN e",
    )])
    .unwrap();
    let terms = NamedTerms::new(vec![
        TermMap::from([("__Entity__".to_string(), "a".to_string())]),
        TermMap::from([("__Entity__".to_string(), "b".to_string())]),
    ]);

    let graph = MockGraph::new().latency(Duration::ZERO).empty_every(2).build();
    let result = quiet(graph, workload)
        .clients(2)
        .requests(100)
        .named_terms(terms)
        .await
        .unwrap();

    assert_eq!(result.totals.total.issued_queries, 100);
    assert_eq!(result.totals.total.empty_results, 50);
    assert_eq!(
        result.totals.per_query[0].query,
        "MATCH (e:Entity {uid: '__Entity__'}) RETURN e"
    );
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn result_serializes() {
    init();

    let graph = MockGraph::new().latency(Duration::ZERO).build();
    let result = quiet(graph, mixed_workload())
        .clients(2)
        .requests(200)
        .metadata("ci")
        .description("mixed read/write")
        .random_seed(99)
        .await
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["format_version"], "graphbench/run-result/0.0.1");
    assert_eq!(json["random_seed"], 99);
    assert_eq!(json["description"], "mixed read/write");
    assert_eq!(json["totals"]["total"]["issued_queries"], 200);
    assert_eq!(json["config"]["requests"]["fixed"], 200);
    assert!(json["end_ms"].as_i64().unwrap() >= json["start_ms"].as_i64().unwrap());

    let summary = result.to_string();
    assert!(summary.contains("Finished sending 200 queries of type 2"));
}
