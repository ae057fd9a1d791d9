//! Lyra - humanoid avatar companion core
//!
//! Loads VRM humanoid characters and their animations and keeps one
//! character alive frame by frame:
//! - Validates and heuristically repairs humanoid bone mappings
//! - Retargets animation clips authored for other rigs onto the character
//! - Drives eye gaze from the cursor with idle re-centering and blinks
//! - Canned dialogue and idle prompts with a speech fallback

pub mod animation;
pub mod avatar;
pub mod config;
pub mod error;
pub mod gaze;
pub mod humanoid;
pub mod interaction;
pub mod loader;
pub mod scene;
pub mod session;

pub use config::Config;
pub use error::{LyraError, Result};
pub use session::{CompanionSession, FrameOutput};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
