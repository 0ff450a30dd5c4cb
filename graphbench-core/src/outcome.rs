use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::time::Duration;

/// Graph mutations reported by the server for a single query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCounts {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub labels_added: u64,
    pub properties_set: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
}

impl AddAssign for MutationCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_created += rhs.nodes_created;
        self.nodes_deleted += rhs.nodes_deleted;
        self.labels_added += rhs.labels_added;
        self.properties_set += rhs.properties_set;
        self.relationships_created += rhs.relationships_created;
        self.relationships_deleted += rhs.relationships_deleted;
    }
}

/// What the server tells us about a successfully executed query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueryReply {
    /// Time the server spent executing the query, as reported by the server itself.
    pub internal_execution_time: Duration,
    pub empty: bool,
    pub mutations: MutationCounts,
}

/// One worker's record of a single request.
///
/// Created right after the request completes and consumed exactly once by the aggregation
/// pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequestOutcome {
    pub query_index: usize,
    pub client_duration: Duration,
    pub server_duration: Duration,
    pub error: bool,
    pub empty: bool,
    pub mutations: MutationCounts,
}

impl RequestOutcome {
    pub fn success(query_index: usize, client_duration: Duration, reply: QueryReply) -> Self {
        Self {
            query_index,
            client_duration,
            server_duration: reply.internal_execution_time,
            error: false,
            empty: reply.empty,
            mutations: reply.mutations,
        }
    }

    /// Failed requests still carry their client-observed latency; the server time is zero.
    pub fn failure(query_index: usize, client_duration: Duration) -> Self {
        Self {
            query_index,
            client_duration,
            server_duration: Duration::ZERO,
            error: true,
            empty: true,
            mutations: MutationCounts::default(),
        }
    }
}
