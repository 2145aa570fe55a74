//! Paint-frame clock.
//!
//! Stands in for the display's vsync callback in the headless binary.  Ticks
//! that fall behind are skipped rather than bursted, since only the latest
//! render position matters.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

const FALLBACK_RATE_HZ: u32 = 60;

pub struct FrameClock {
    interval: Interval,
}

impl FrameClock {
    /// A clock ticking `rate_hz` times per second.  `0` falls back to 60.
    pub fn new(rate_hz: u32) -> Self {
        let rate = if rate_hz == 0 { FALLBACK_RATE_HZ } else { rate_hz };
        let period = Duration::from_secs(1) / rate;
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Waits for the next frame.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
