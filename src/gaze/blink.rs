use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use crate::config::BlinkConfig;

/// Randomized blink timer, independent of the gaze state.
#[derive(Debug, Clone)]
pub struct BlinkScheduler {
    config: BlinkConfig,
    rng: StdRng,
    last_blink: Instant,
    next_delay: Duration,
    closed_until: Option<Instant>,
}

impl BlinkScheduler {
    pub fn new(config: BlinkConfig, now: Instant) -> Self {
        Self::with_rng(config, now, StdRng::from_entropy())
    }

    /// Deterministic intervals for tests and replays.
    pub fn with_seed(config: BlinkConfig, now: Instant, seed: u64) -> Self {
        Self::with_rng(config, now, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: BlinkConfig, now: Instant, rng: StdRng) -> Self {
        let mut scheduler = Self {
            config,
            rng,
            last_blink: now,
            next_delay: Duration::ZERO,
            closed_until: None,
        };
        scheduler.next_delay = scheduler.draw_interval();
        scheduler
    }

    fn draw_interval(&mut self) -> Duration {
        let min = self.config.min_interval_ms;
        let max = self.config.max_interval_ms.max(min + 1);
        Duration::from_millis(self.rng.gen_range(min..max))
    }

    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    pub fn is_closed(&self) -> bool {
        self.closed_until.is_some()
    }

    /// Returns the new blink weight when it changes this frame.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        if let Some(until) = self.closed_until {
            if now >= until {
                self.closed_until = None;
                return Some(0.0);
            }
            return None;
        }

        if !self.config.enabled {
            return None;
        }

        if now.saturating_duration_since(self.last_blink) >= self.next_delay {
            self.last_blink = now;
            self.next_delay = self.draw_interval();
            self.closed_until = Some(now + Duration::from_millis(self.config.hold_ms));
            tracing::trace!("Blink, next in {}ms", self.next_delay.as_millis());
            return Some(1.0);
        }
        None
    }
}
