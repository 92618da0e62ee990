use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out requests to at least `interval` apart, shared across every
/// worker in a run (§4.A). There is no burst credit: a long idle period does
/// not let the next few requests through back-to-back.
pub struct RateLimiter {
    interval: Duration,
    next_ok: Mutex<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_ok: Mutex::new(Instant::now()),
        }
    }

    /// Blocks the calling task until it is this caller's turn, then reserves
    /// the next slot `interval` later.
    pub async fn acquire(&self) {
        let mut next_ok = self.next_ok.lock().await;
        let now = Instant::now();
        if *next_ok > now {
            tokio::time::sleep(*next_ok - now).await;
        }
        *next_ok = Instant::now() + self.interval;
    }
}
