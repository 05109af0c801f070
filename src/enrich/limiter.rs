use std::time::Duration;

use tokio::time::sleep;

/// Floor for the user-supplied pacing interval, in seconds.
pub const MIN_INTERVAL_SECS: f64 = 1.0;

/// Default pacing interval, in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 2.0;

/// Fixed-interval pacing gate for the enrichment loop, kept separate from the
/// loop body so the pacing policy can change without touching lookup logic.
#[derive(Debug, Clone)]
pub struct IntervalGate {
    interval: Duration,
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        IntervalGate { interval }
    }

    /// Build a gate from a seconds value entered in the UI, clamped to the
    /// configured minimum.
    pub fn from_secs_clamped(secs: f64) -> Self {
        IntervalGate::new(Duration::from_secs_f64(secs.max(MIN_INTERVAL_SECS)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block for one full interval. Called after every entity,
    /// unconditionally.
    pub async fn pause(&self) {
        sleep(self.interval).await;
    }
}

impl Default for IntervalGate {
    fn default() -> Self {
        IntervalGate::new(Duration::from_secs_f64(DEFAULT_INTERVAL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_to_minimum() {
        let gate = IntervalGate::from_secs_clamped(0.1);
        assert_eq!(gate.interval(), Duration::from_secs_f64(MIN_INTERVAL_SECS));

        let gate = IntervalGate::from_secs_clamped(3.5);
        assert_eq!(gate.interval(), Duration::from_secs_f64(3.5));
    }

    #[test]
    fn default_interval() {
        assert_eq!(
            IntervalGate::default().interval(),
            Duration::from_secs_f64(DEFAULT_INTERVAL_SECS)
        );
    }

    #[tokio::test]
    async fn pause_blocks_for_the_interval() {
        let gate = IntervalGate::new(Duration::from_millis(20));
        let start = std::time::Instant::now();
        gate.pause().await;
        gate.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
