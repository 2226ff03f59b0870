use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

/// Serializes outbound fetches and enforces a minimum spacing between
/// them, to respect upstream provider rate limits.
///
/// The internal lock is held across the wait, so concurrent callers
/// queue up and each departs at least `min_interval` after the previous
/// one.
pub struct RequestGate {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait until the next outbound request may be dispatched.
    pub async fn acquire(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate limit gate: delaying request by {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
