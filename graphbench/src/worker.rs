use crate::error::BenchError;
use crate::executor::QueryExecutor;
use crate::limiter::RequestLimiter;
use crate::template::Templater;
use crate::workload::Workload;
use graphbench_core::RequestOutcome;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Read-only state shared by every worker of a run.
pub(crate) struct WorkerShared {
    pub workload: Workload,
    pub templater: Templater,
    pub limiter: RequestLimiter,
    pub continue_on_error: bool,
    pub cancel: CancellationToken,
}

/// Global request positions owned by one worker: `start`, `start + stride`, `start + 2 * stride`...
///
/// Positions select the named-term map of each request, so no two workers share one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Positions {
    pub start: u64,
    pub stride: u64,
}

impl Positions {
    /// A contiguous block, used when every worker has a fixed share.
    pub fn contiguous(start: u64) -> Self {
        Self { start, stride: 1 }
    }

    /// Interleaved with the other workers, used when running unbounded.
    pub fn interleaved(id: usize, clients: usize) -> Self {
        Self {
            start: id as u64,
            stride: clients.max(1) as u64,
        }
    }

    fn nth(&self, n: u64) -> u64 {
        self.start.wrapping_add(n.wrapping_mul(self.stride))
    }
}

/// One client connection issuing requests in a tight loop.
pub(crate) struct Worker<E> {
    id: usize,
    executor: E,
    shared: Arc<WorkerShared>,
    tx: Sender<RequestOutcome>,
    iterations: Option<u64>,
    positions: Positions,
    rng: SmallRng,
}

impl<E> Worker<E>
where
    E: QueryExecutor,
{
    /// `iterations` of `None` keeps the worker going until the run is cancelled or the
    /// aggregation pipeline goes away.
    pub fn new(
        id: usize,
        executor: E,
        shared: Arc<WorkerShared>,
        tx: Sender<RequestOutcome>,
        iterations: Option<u64>,
        positions: Positions,
        rng: SmallRng,
    ) -> Self {
        Self {
            id,
            executor,
            shared,
            tx,
            iterations,
            positions,
            rng,
        }
    }

    /// Returns the number of requests issued.
    pub async fn run(mut self) -> Result<u64, BenchError> {
        let mut issued = 0;
        while self.iterations.map_or(true, |n| issued < n) {
            if self.shared.cancel.is_cancelled() {
                debug!("Worker {} stopping, run cancelled.", self.id);
                break;
            }

            let outcome = match self.issue(self.positions.nth(issued)).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("Worker {}: {err}", self.id);
                    self.shared.cancel.cancel();
                    return Err(err);
                }
            };
            issued += 1;

            // Published outside of the timed region; a slow consumer delays the next request,
            // never the measurement of this one.
            if self.tx.send(outcome).await.is_err() {
                debug!("Worker {} stopping, outcome channel closed.", self.id);
                break;
            }
        }

        trace!("Worker {} done after {issued} requests.", self.id);
        Ok(issued)
    }

    async fn issue(&mut self, position: u64) -> Result<RequestOutcome, BenchError> {
        let shared = &self.shared;
        let query_index = shared.workload.sample(&mut self.rng);
        let template = &shared.workload.templates()[query_index];
        let query = shared
            .templater
            .instantiate(&template.text, position, &mut self.rng);

        shared.limiter.acquire().await;

        let start = Instant::now();
        let res = self.executor.execute(&query, template.read_only).await;
        let elapsed = start.elapsed();

        match res {
            Ok(reply) => {
                trace!("Issued query: {query}; reply: {reply:?}");
                Ok(RequestOutcome::success(query_index, elapsed, reply))
            }
            Err(err) if shared.continue_on_error => {
                debug!("Received an error with the following query: {query}, error: {err}");
                Ok(RequestOutcome::failure(query_index, elapsed))
            }
            Err(err) => Err(BenchError::Query {
                query,
                reason: err.to_string(),
            }),
        }
    }
}
