//! Heartbeat timer for an open connection.
//!
//! One `Heartbeat` is created per opened connection and dropped with it, so a
//! dead connection can never keep pinging.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Periodic ping schedule. The first tick lands one full period after start.
///
/// A zero period disables the heartbeat: [`tick`](Self::tick) never
/// completes.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Option<Interval>,
}

impl Heartbeat {
    /// Start ticking every `period`.
    pub fn start(period: Duration) -> Self {
        if period.is_zero() {
            return Self { interval: None };
        }
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    /// Wait for the next tick.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                let _ = interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Configured period, `None` when disabled.
    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(Interval::period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let start = Instant::now();
        let mut hb = Heartbeat::start(Duration::from_secs(30));
        hb.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_at_period() {
        let start = Instant::now();
        let mut hb = Heartbeat::start(Duration::from_secs(5));
        for _ in 0..3 {
            hb.tick().await;
        }
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert_eq!(hb.period(), Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_never_ticks() {
        let mut hb = Heartbeat::start(Duration::ZERO);
        assert_eq!(hb.period(), None);
        let ticked = tokio::time::timeout(Duration::from_secs(3600), hb.tick()).await;
        assert!(ticked.is_err());
    }
}
