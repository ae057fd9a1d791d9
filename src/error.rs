//! Error types for Lyra

use thiserror::Error;

/// Main error type for Lyra
#[derive(Error, Debug)]
pub enum LyraError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Avatar error: {0}")]
    Avatar(#[from] AvatarError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Asset load errors (character and animation files)
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read asset {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to decode asset: {0}")]
    Decode(String),

    #[error("Asset has no humanoid metadata (VRM / VRMC_vrm extension)")]
    MissingHumanoid,
}

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Unknown node: {0}")]
    UnknownNode(usize),

    #[error("Attaching {child} under {parent} would create a cycle")]
    Cycle { child: String, parent: String },

    #[error("The scene root cannot be detached")]
    DetachRoot,
}

/// Avatar/session-level errors
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("No character loaded")]
    NoCharacter,

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Unknown animation: {0}")]
    UnknownAnimation(String),

    #[error("Animation not decoded yet: {0}")]
    AnimationNotDecoded(String),
}

/// Speech synthesis errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Speech synthesizer is busy")]
    Busy,
}

/// Result type alias for Lyra operations
pub type Result<T> = std::result::Result<T, LyraError>;
