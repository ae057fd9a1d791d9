//! Configuration parsing and management for Lyra

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, LyraError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gaze: GazeConfig,
    pub blink: BlinkConfig,
    pub animation: AnimationConfig,
    pub interaction: InteractionConfig,
    pub loader: LoaderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LyraError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, LyraError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, LyraError> {
        let paths = [
            PathBuf::from("lyra.toml"),
            PathBuf::from("config/lyra.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LyraError> {
        if self.gaze.idle_threshold_ms == 0 {
            return Err(invalid("gaze.idle_threshold_ms", "Idle threshold must be greater than 0"));
        }

        for (field, value) in [
            ("gaze.smooth_time_x", self.gaze.smooth_time_x),
            ("gaze.smooth_time_y", self.gaze.smooth_time_y),
            ("gaze.smooth_time_z", self.gaze.smooth_time_z),
            ("gaze.max_frame_delta", self.gaze.max_frame_delta),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(invalid(field, "Must be a positive number of seconds"));
            }
        }

        if !(0.0..1.0).contains(&self.gaze.dead_zone) {
            return Err(invalid("gaze.dead_zone", "Dead zone must be between 0.0 and 1.0"));
        }

        if self.gaze.clamp_x <= 0.0 || self.gaze.clamp_y <= 0.0 {
            return Err(invalid("gaze.clamp_x", "Clamp window must be positive"));
        }

        if self.blink.min_interval_ms >= self.blink.max_interval_ms {
            return Err(invalid(
                "blink.min_interval_ms",
                "Minimum blink interval must be below the maximum",
            ));
        }

        if self.blink.hold_ms == 0 {
            return Err(invalid("blink.hold_ms", "Blink hold must be greater than 0"));
        }

        if self.interaction.long_idle_secs <= self.interaction.idle_secs {
            tracing::warn!(
                "interaction.long_idle_secs ({}) is not longer than idle_secs ({})",
                self.interaction.long_idle_secs,
                self.interaction.idle_secs
            );
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> LyraError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Gaze tracking tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Follow the mouse at all
    pub enabled: bool,
    /// Time without mouse movement before the eyes re-center
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
    /// Upper bound on the per-frame delta fed to the springs (seconds)
    #[serde(default = "default_max_frame_delta")]
    pub max_frame_delta: f32,

    // --- Spring halflives per axis (seconds) ---
    #[serde(default = "default_0_08")]
    pub smooth_time_x: f32,
    #[serde(default = "default_0_10")]
    pub smooth_time_y: f32,
    #[serde(default = "default_0_12")]
    pub smooth_time_z: f32,

    // --- Mouse mapping ---
    /// Eye-level anchor the target is offset around
    #[serde(default = "default_anchor")]
    pub anchor: [f32; 3],
    /// Horizontal clamp on the normalized cursor
    #[serde(default = "default_0_6")]
    pub clamp_x: f32,
    /// Vertical clamp on the normalized cursor
    #[serde(default = "default_0_4")]
    pub clamp_y: f32,
    /// Central dead zone on both normalized axes
    #[serde(default = "default_0_1")]
    pub dead_zone: f32,
    #[serde(default = "default_1_2")]
    pub horizontal_scale: f32,
    #[serde(default = "default_1_0")]
    pub vertical_scale: f32,
    #[serde(default = "default_0_2")]
    pub depth_scale: f32,

    // --- Advisory saccade ---
    #[serde(default = "default_move_epsilon")]
    pub move_epsilon: f32,
    #[serde(default = "default_move_duration_ms")]
    pub move_duration_ms: u64,
    /// Distance from center below which centering counts as settled
    #[serde(default = "default_settle_epsilon")]
    pub settle_epsilon: f32,
}

fn default_idle_threshold_ms() -> u64 { 1000 }
fn default_max_frame_delta() -> f32 { 0.016 }
fn default_0_08() -> f32 { 0.08 }
fn default_0_10() -> f32 { 0.10 }
fn default_0_12() -> f32 { 0.12 }
fn default_anchor() -> [f32; 3] { [0.0, 1.5, -2.0] }
fn default_0_6() -> f32 { 0.6 }
fn default_0_4() -> f32 { 0.4 }
fn default_0_1() -> f32 { 0.1 }
fn default_1_2() -> f32 { 1.2 }
fn default_1_0() -> f32 { 1.0 }
fn default_0_2() -> f32 { 0.2 }
fn default_move_epsilon() -> f32 { 0.0001 }
fn default_move_duration_ms() -> u64 { 300 }
fn default_settle_epsilon() -> f32 { 0.001 }

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_threshold_ms: default_idle_threshold_ms(),
            max_frame_delta: default_max_frame_delta(),
            smooth_time_x: default_0_08(),
            smooth_time_y: default_0_10(),
            smooth_time_z: default_0_12(),
            anchor: default_anchor(),
            clamp_x: default_0_6(),
            clamp_y: default_0_4(),
            dead_zone: default_0_1(),
            horizontal_scale: default_1_2(),
            vertical_scale: default_1_0(),
            depth_scale: default_0_2(),
            move_epsilon: default_move_epsilon(),
            move_duration_ms: default_move_duration_ms(),
            settle_epsilon: default_settle_epsilon(),
        }
    }
}

/// Blink scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub enabled: bool,
    /// Inclusive lower bound of the random interval
    pub min_interval_ms: u64,
    /// Exclusive upper bound of the random interval
    pub max_interval_ms: u64,
    /// How long the eyes stay shut
    pub hold_ms: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_ms: 2000,
            max_interval_ms: 6000,
            hold_ms: 150,
        }
    }
}

/// Animation playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Animation played once after a character loads
    pub default_idle_animation: Option<PathBuf>,
    /// Apply the relaxed arms-down rest pose on load
    pub relax_arms_on_load: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            default_idle_animation: Some(PathBuf::from("animations/VRMA_01.vrma")),
            relax_arms_on_load: true,
        }
    }
}

/// Idle dialogue and click feedback timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub greeting_delay_secs: u64,
    pub idle_secs: u64,
    pub long_idle_secs: u64,
    /// How long the click expression is held
    pub click_expression_secs: u64,
    pub click_expression: String,
    /// Lifetime of the on-screen fallback text
    pub notification_secs: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            greeting_delay_secs: 2,
            idle_secs: 30,
            long_idle_secs: 120,
            click_expression_secs: 3,
            click_expression: "happy".to_string(),
            notification_secs: 3,
        }
    }
}

/// Character loading behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Run the bone repair pipeline when validation fails
    pub auto_repair: bool,
    /// Merge skins that share an identical joint list
    pub combine_skeletons: bool,
    pub shadows: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            auto_repair: true,
            combine_skeletons: true,
            shadows: true,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("lyra");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/lyra");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/lyra");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("lyra");
        }
    }

    PathBuf::from(".")
}
