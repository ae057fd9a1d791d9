//! Per-frame eye control: cursor tracking, idle re-centering and blinks.

pub mod blink;
pub mod controller;
pub mod smoothing;

pub use blink::BlinkScheduler;
pub use controller::{GazeController, GazeFrame, GazeMove, GazeState, ViewRect};
pub use smoothing::{in_dead_zone, SpringVec3};
