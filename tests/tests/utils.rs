use graphbench::prelude::*;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("graphbench=debug,mock_graph=info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// The process-wide Prometheus recorder. Installed on first use.
#[allow(unused)]
pub fn metrics_handle() -> &'static PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("Unable to install Prometheus recorder")
    })
}

/// Reads and writes split 70/30.
#[allow(unused)]
pub fn mixed_workload() -> Workload {
    Workload::from_parts(
        vec![
            QueryTemplate::read_only("MATCH (p:Person {id: __rand_int__}) RETURN p"),
            QueryTemplate::new("CREATE (:Person {id: __rand_int__, age: __rand_int__})"),
        ],
        &[0.7, 0.3],
    )
    .unwrap()
}

/// A benchmark that stays quiet on stdout and ignores Ctrl+C.
#[allow(unused)]
pub fn quiet<C>(connector: C, workload: Workload) -> Benchmark<C> {
    Benchmark::new(connector, workload)
        .sink(NullSink)
        .handle_ctrl_c(false)
        .reporting_period(Duration::from_millis(20))
}
