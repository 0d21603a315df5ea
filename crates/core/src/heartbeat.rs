// crates/core/src/heartbeat.rs
//! Keepalive ticks for an outstanding job.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Recurring keepalive timer owned by one call.
///
/// The first tick lands one full interval after [`Heartbeat::start`]. The
/// bridge polls [`Heartbeat::tick`] next to the subscription so heartbeats
/// share the ordered notification path. Once cancelled, `tick` never resolves.
pub struct Heartbeat {
    interval: Option<Interval>,
}

impl Heartbeat {
    /// A heartbeat that has not been started; `tick` never resolves.
    pub fn idle() -> Self {
        Self { interval: None }
    }

    /// Start ticking every `period`. A zero period disables the heartbeat.
    pub fn start(period: Duration) -> Self {
        if period.is_zero() {
            return Self::idle();
        }
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    /// Stop ticking. Returns `false` if already cancelled.
    pub fn cancel(&mut self) -> bool {
        self.interval.take().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let started = Instant::now();
        let mut hb = Heartbeat::start(Duration::from_secs(5));
        hb.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        hb.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_never_ticks() {
        let mut hb = Heartbeat::start(Duration::from_secs(5));
        assert!(hb.cancel());
        assert!(!hb.cancel());
        assert!(!hb.is_running());
        let ticked = tokio::time::timeout(Duration::from_secs(60), hb.tick()).await;
        assert!(ticked.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_idle() {
        let mut hb = Heartbeat::start(Duration::ZERO);
        assert!(!hb.is_running());
        let ticked = tokio::time::timeout(Duration::from_secs(60), hb.tick()).await;
        assert!(ticked.is_err());
    }
}
