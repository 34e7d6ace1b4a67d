use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Spaces chunk submissions at least `interval` apart.
pub struct RateController {
    interval: Duration,
    next_slot: Option<Instant>,
}

/// Longest gap allowed between two paced chunks.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Gap between chunks for a target rate, or `None` when the rate is not
/// positive or its gap exceeds [`MAX_INTERVAL`].
pub fn pacing_interval(chunks_per_second: f64) -> Option<Duration> {
    if !(chunks_per_second > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / chunks_per_second)
        .ok()
        .filter(|interval| *interval <= MAX_INTERVAL)
}

impl RateController {
    pub fn new(chunks_per_second: f64) -> Option<Self> {
        pacing_interval(chunks_per_second).map(Self::from_interval)
    }

    pub fn from_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: None,
        }
    }

    /// Sleep until the next slot opens. The first call returns immediately.
    pub async fn wait_for_next(&mut self) {
        if let Some(slot) = self.next_slot {
            sleep_until(slot).await;
        }
        // A slow submission does not earn a burst afterwards.
        self.next_slot = Some(Instant::now() + self.interval);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
