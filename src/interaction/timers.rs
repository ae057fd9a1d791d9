//! Greeting and idle prompts, rescheduled on every interaction.

use std::time::{Duration, Instant};

use crate::config::InteractionConfig;

/// A timer that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionCue {
    Greeting,
    Idle,
    LongIdle,
}

#[derive(Debug, Clone)]
pub struct InteractionTimers {
    greeting_delay: Duration,
    idle_delay: Duration,
    long_idle_delay: Duration,
    greeting_at: Option<Instant>,
    idle_at: Option<Instant>,
    long_idle_at: Option<Instant>,
    idle: bool,
    interactions: u64,
    last_interaction: Option<Instant>,
}

impl InteractionTimers {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            greeting_delay: Duration::from_secs(config.greeting_delay_secs),
            idle_delay: Duration::from_secs(config.idle_secs),
            long_idle_delay: Duration::from_secs(config.long_idle_secs),
            greeting_at: None,
            idle_at: None,
            long_idle_at: None,
            idle: false,
            interactions: 0,
            last_interaction: None,
        }
    }

    /// Arm the greeting and both idle timers.
    pub fn start(&mut self, now: Instant) {
        self.greeting_at = Some(now + self.greeting_delay);
        self.reset_idle(now);
    }

    /// Record user activity and push the idle prompts back.
    pub fn register_interaction(&mut self, now: Instant) {
        self.interactions += 1;
        self.last_interaction = Some(now);
        self.reset_idle(now);
    }

    fn reset_idle(&mut self, now: Instant) {
        self.idle = false;
        self.idle_at = Some(now + self.idle_delay);
        self.long_idle_at = Some(now + self.long_idle_delay);
    }

    /// Window lost focus.
    pub fn mark_idle(&mut self) {
        self.idle = true;
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn interaction_count(&self) -> u64 {
        self.interactions
    }

    pub fn last_interaction(&self) -> Option<Instant> {
        self.last_interaction
    }

    pub fn is_armed(&self) -> bool {
        self.greeting_at.is_some() || self.idle_at.is_some() || self.long_idle_at.is_some()
    }

    /// Fire every due timer, each at most once per scheduling.
    pub fn poll(&mut self, now: Instant) -> Vec<InteractionCue> {
        let mut cues = Vec::new();
        if take_due(&mut self.greeting_at, now) {
            cues.push(InteractionCue::Greeting);
        }
        if take_due(&mut self.idle_at, now) {
            self.idle = true;
            cues.push(InteractionCue::Idle);
        }
        if take_due(&mut self.long_idle_at, now) {
            cues.push(InteractionCue::LongIdle);
        }
        cues
    }

    pub fn cancel_all(&mut self) {
        self.greeting_at = None;
        self.idle_at = None;
        self.long_idle_at = None;
    }
}

fn take_due(deadline: &mut Option<Instant>, now: Instant) -> bool {
    match deadline {
        Some(at) if now >= *at => {
            *deadline = None;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_greeting_then_idle_prompts() {
        let t0 = Instant::now();
        let mut timers = InteractionTimers::new(&InteractionConfig::default());
        timers.start(t0);

        assert_eq!(timers.poll(t0 + Duration::from_millis(1999)), vec![]);
        assert_eq!(timers.poll(t0 + secs(2)), vec![InteractionCue::Greeting]);
        assert_eq!(timers.poll(t0 + secs(29)), vec![]);
        assert_eq!(timers.poll(t0 + secs(30)), vec![InteractionCue::Idle]);
        assert!(timers.is_idle());
        assert_eq!(timers.poll(t0 + secs(120)), vec![InteractionCue::LongIdle]);
        assert_eq!(timers.poll(t0 + secs(500)), vec![]);
    }

    #[test]
    fn test_interaction_reschedules() {
        let t0 = Instant::now();
        let mut timers = InteractionTimers::new(&InteractionConfig::default());
        timers.start(t0);
        timers.poll(t0 + secs(2));

        timers.register_interaction(t0 + secs(25));
        assert_eq!(timers.poll(t0 + secs(30)), vec![]);
        assert!(!timers.is_idle());
        assert_eq!(timers.poll(t0 + secs(55)), vec![InteractionCue::Idle]);
        assert_eq!(timers.interaction_count(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let t0 = Instant::now();
        let mut timers = InteractionTimers::new(&InteractionConfig::default());
        timers.start(t0);
        timers.cancel_all();
        assert!(!timers.is_armed());
        assert_eq!(timers.poll(t0 + secs(600)), vec![]);
    }
}
