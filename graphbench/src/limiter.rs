use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Global token bucket shared by every worker.
///
/// The bucket holds up to one token per client and refills at the configured rate, so the cap
/// applies to the sum of all workers rather than to each of them. Without a rate there is no
/// bucket at all and [`RequestLimiter::acquire`] returns immediately.
#[derive(Clone, Default)]
pub struct RequestLimiter {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl RequestLimiter {
    pub fn new(rate: Option<NonZeroU32>, clients: usize) -> Self {
        Self {
            limiter: rate.map(|rate| Arc::new(rate_limiter(rate, clients))),
        }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Takes one token, sleeping for as long as the bucket needs to produce it.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

fn rate_limiter(rate: NonZeroU32, clients: usize) -> DefaultDirectRateLimiter {
    let burst = u32::try_from(clients)
        .ok()
        .and_then(NonZeroU32::new)
        .unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))
}
