//! Gaze state machine: follow the cursor, re-center on idle or expression.

use glam::Vec3;
use serde::Serialize;
use std::time::{Duration, Instant};

use super::smoothing::{in_dead_zone, SpringVec3};
use crate::config::GazeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GazeState {
    /// Eyes follow the cursor target
    Tracking,
    /// Moving back to the anchor
    Centering,
    /// Resting at the anchor
    Idle,
}

/// Bounding box the cursor is normalized against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Cursor position in [-1, 1] on both axes, y pointing up.
    pub fn normalize(&self, client_x: f32, client_y: f32) -> (f32, f32) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return (0.0, 0.0);
        }
        let x = ((client_x - self.left) / self.width) * 2.0 - 1.0;
        let y = -((client_y - self.top) / self.height) * 2.0 + 1.0;
        (x, y)
    }
}

/// A short move toward a new target.
///
/// Only informs observers; the springs drive the actual position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeMove {
    pub from: Vec3,
    pub to: Vec3,
    pub started: Instant,
    pub duration: Duration,
}

impl GazeMove {
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (now.saturating_duration_since(self.started).as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}

/// Result of one gaze frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeFrame {
    pub state: GazeState,
    /// Where the look-at target should sit
    pub position: Vec3,
    /// Position was set directly instead of smoothed
    pub snapped: bool,
    pub moving: bool,
}

#[derive(Debug, Clone)]
pub struct GazeController {
    config: GazeConfig,
    enabled: bool,
    state: GazeState,
    target: Vec3,
    aim: SpringVec3,
    last_move: Instant,
    last_frame: Option<Instant>,
    current_move: Option<GazeMove>,
}

impl GazeController {
    pub fn new(config: GazeConfig, now: Instant) -> Self {
        let anchor = Vec3::from_array(config.anchor);
        Self {
            enabled: config.enabled,
            config,
            state: GazeState::Tracking,
            target: anchor,
            aim: SpringVec3::new(anchor),
            last_move: now,
            last_frame: None,
            current_move: None,
        }
    }

    pub fn state(&self) -> GazeState {
        self.state
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn aim(&self) -> Vec3 {
        self.aim.value()
    }

    pub fn anchor(&self) -> Vec3 {
        Vec3::from_array(self.config.anchor)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn current_move(&self) -> Option<&GazeMove> {
        self.current_move.as_ref()
    }

    /// World-space target for a normalized cursor position.
    pub fn target_for(&self, nx: f32, ny: f32) -> Vec3 {
        let c = &self.config;
        let anchor = self.anchor();
        let x = nx.clamp(-c.clamp_x, c.clamp_x);
        let y = ny.clamp(-c.clamp_y, c.clamp_y);

        if in_dead_zone(x, y, c.dead_zone) {
            return anchor;
        }

        Vec3::new(
            anchor.x + x * c.horizontal_scale,
            anchor.y + y * c.vertical_scale,
            anchor.z + y.abs() * c.depth_scale,
        )
    }

    /// Feed a normalized cursor position.
    pub fn on_mouse_move(&mut self, nx: f32, ny: f32, now: Instant) {
        self.last_move = now;
        let target = self.target_for(nx, ny);

        let aim = self.aim.value();
        if target.distance(aim) > self.config.move_epsilon {
            self.current_move = Some(GazeMove {
                from: aim,
                to: target,
                started: now,
                duration: Duration::from_millis(self.config.move_duration_ms),
            });
        }
        self.target = target;
    }

    /// Feed a cursor position in client coordinates.
    pub fn on_cursor(&mut self, client_x: f32, client_y: f32, rect: &ViewRect, now: Instant) {
        let (nx, ny) = rect.normalize(client_x, client_y);
        self.on_mouse_move(nx, ny, now);
    }

    /// Advance one frame. `expression_active` is true while a non-blink
    /// expression has weight.
    pub fn tick(&mut self, now: Instant, expression_active: bool) -> GazeFrame {
        let dt = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0)
            .min(self.config.max_frame_delta);
        self.last_frame = Some(now);

        if self.current_move.is_some_and(|m| m.progress(now) >= 1.0) {
            self.current_move = None;
        }

        let anchor = self.anchor();
        if expression_active || !self.enabled {
            if self.state == GazeState::Tracking {
                tracing::debug!("Gaze centering (expression or tracking disabled)");
            }
            self.state = GazeState::Centering;
            self.target = anchor;
            self.current_move = None;
            self.aim.set(anchor);
            return self.frame(true);
        }

        // Idle is reachable only from a frame that started out centering
        let was_centering = self.state == GazeState::Centering;
        let idle_for = now.saturating_duration_since(self.last_move);
        let idle = idle_for >= Duration::from_millis(self.config.idle_threshold_ms);

        if idle {
            if self.state == GazeState::Tracking {
                tracing::debug!("Gaze centering after {}ms idle", idle_for.as_millis());
                self.state = GazeState::Centering;
            }
            self.target = anchor;
        } else {
            self.state = GazeState::Tracking;
        }

        let halflives = [
            self.config.smooth_time_x,
            self.config.smooth_time_y,
            self.config.smooth_time_z,
        ];
        let position = self.aim.update(self.target, halflives, dt);

        if was_centering
            && self.state == GazeState::Centering
            && position.distance(anchor) <= self.config.settle_epsilon
        {
            self.state = GazeState::Idle;
        }

        self.frame(false)
    }

    fn frame(&self, snapped: bool) -> GazeFrame {
        GazeFrame {
            state: self.state,
            position: self.aim.value(),
            snapped,
            moving: self.current_move.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(now: Instant) -> GazeController {
        GazeController::new(GazeConfig::default(), now)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_dead_zone_maps_to_anchor() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        gaze.on_mouse_move(0.5, 0.3, t0);
        assert_ne!(gaze.target(), gaze.anchor());

        gaze.on_mouse_move(0.02, 0.03, t0 + ms(10));
        assert_eq!(gaze.target(), Vec3::new(0.0, 1.5, -2.0));
    }

    #[test]
    fn test_target_mapping_is_clamped() {
        let gaze = controller(Instant::now());
        let t = gaze.target_for(1.0, -1.0);
        assert!((t.x - 0.72).abs() < 1e-5);
        assert!((t.y - 1.1).abs() < 1e-5);
        assert!((t.z - -1.92).abs() < 1e-5);
        // outside the dead zone on one axis is enough
        assert_ne!(gaze.target_for(0.3, 0.0), gaze.anchor());
    }

    #[test]
    fn test_view_rect_normalization() {
        let rect = ViewRect::new(0.0, 0.0, 200.0, 100.0);
        assert_eq!(rect.normalize(100.0, 50.0), (0.0, 0.0));
        assert_eq!(rect.normalize(0.0, 0.0), (-1.0, 1.0));
        assert_eq!(rect.normalize(200.0, 100.0), (1.0, -1.0));
    }

    #[test]
    fn test_idle_transition_boundary() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        gaze.on_mouse_move(0.5, 0.2, t0);

        assert_eq!(gaze.tick(t0 + ms(999), false).state, GazeState::Tracking);
        assert_eq!(gaze.tick(t0 + ms(1000), false).state, GazeState::Centering);
        assert_eq!(gaze.target(), gaze.anchor());
    }

    #[test]
    fn test_centering_visible_when_already_at_anchor() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        // aim never left the anchor, so it is settled from the start
        assert_eq!(gaze.tick(t0 + ms(1000), false).state, GazeState::Centering);
        assert_eq!(gaze.tick(t0 + ms(1016), false).state, GazeState::Idle);
    }

    #[test]
    fn test_centering_settles_to_idle_and_resumes() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        gaze.on_mouse_move(0.5, 0.2, t0);

        let mut now = t0;
        for _ in 0..20 {
            now += ms(16);
            gaze.tick(now, false);
        }
        assert!(gaze.aim().x > 0.0);

        now += ms(1000);
        let mut state = gaze.tick(now, false).state;
        for _ in 0..400 {
            now += ms(16);
            state = gaze.tick(now, false).state;
        }
        assert_eq!(state, GazeState::Idle);

        gaze.on_mouse_move(-0.5, 0.0, now);
        assert_eq!(gaze.tick(now + ms(16), false).state, GazeState::Tracking);
    }

    #[test]
    fn test_expression_snaps_to_anchor() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        gaze.on_mouse_move(0.5, 0.3, t0);
        for i in 1..10 {
            gaze.tick(t0 + ms(16 * i), false);
        }
        assert_ne!(gaze.aim(), gaze.anchor());

        let frame = gaze.tick(t0 + ms(170), true);
        assert!(frame.snapped);
        assert_eq!(frame.state, GazeState::Centering);
        assert_eq!(frame.position, gaze.anchor());
    }

    #[test]
    fn test_disabled_tracking_stays_centered() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        gaze.set_enabled(false);
        gaze.on_mouse_move(0.5, 0.3, t0);
        let frame = gaze.tick(t0 + ms(16), false);
        assert_eq!(frame.position, gaze.anchor());
        assert_eq!(frame.state, GazeState::Centering);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let t0 = Instant::now();
        let mut stalled = controller(t0);
        let mut smooth = controller(t0);
        stalled.tick(t0, false);
        smooth.tick(t0, false);
        stalled.on_mouse_move(0.5, 0.0, t0);
        smooth.on_mouse_move(0.5, 0.0, t0);

        // a 500ms stall moves no further than a regular frame
        let a = stalled.tick(t0 + ms(500), false).position;
        let b = smooth.tick(t0 + ms(16), false).position;
        assert!((a.x - b.x).abs() < 1e-6);
    }

    #[test]
    fn test_advisory_move_expires() {
        let t0 = Instant::now();
        let mut gaze = controller(t0);
        gaze.on_mouse_move(0.5, 0.3, t0);
        assert!(gaze.tick(t0 + ms(100), false).moving);
        assert!(!gaze.tick(t0 + ms(300), false).moving);

        // no move when the target equals the current aim
        let mut still = controller(t0);
        still.on_mouse_move(0.0, 0.0, t0);
        assert!(still.current_move().is_none());
    }
}
