//! Per-axis spring smoothing for the gaze aim.
//!
//! Wraps `signal_smooth` springs so each axis keeps its own velocity and
//! halflife.

use glam::Vec3;
use signal_smooth::{apply_deadzone_symmetric, DampedSpring};

/// True when both components sit inside the central dead zone.
pub fn in_dead_zone(x: f32, y: f32, dead_zone: f32) -> bool {
    apply_deadzone_symmetric(x, dead_zone) == 0.0 && apply_deadzone_symmetric(y, dead_zone) == 0.0
}

/// One spring per axis (horizontal, vertical, depth).
#[derive(Debug, Clone)]
pub struct SpringVec3 {
    axes: [DampedSpring; 3],
}

impl SpringVec3 {
    pub fn new(value: Vec3) -> Self {
        Self {
            axes: value.to_array().map(DampedSpring::new),
        }
    }

    pub fn value(&self) -> Vec3 {
        Vec3::new(self.axes[0].value(), self.axes[1].value(), self.axes[2].value())
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::new(
            self.axes[0].velocity(),
            self.axes[1].velocity(),
            self.axes[2].velocity(),
        )
    }

    /// Jump to `value` and stop.
    pub fn set(&mut self, value: Vec3) {
        for (axis, v) in self.axes.iter_mut().zip(value.to_array()) {
            axis.set(v);
        }
    }

    pub fn update(&mut self, target: Vec3, halflives: [f32; 3], dt: f32) -> Vec3 {
        for ((axis, t), halflife) in self.axes.iter_mut().zip(target.to_array()).zip(halflives) {
            axis.update(t, halflife, dt);
        }
        self.value()
    }
}
