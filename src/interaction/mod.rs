//! User interaction: idle prompts, canned dialogue and speech.

pub mod dialogue;
pub mod speech;
pub mod timers;

pub use dialogue::{DialogueCategory, DialogueManager};
pub use speech::{Notification, SilentSynthesizer, Speaker, SpeechSynthesizer, VoiceSettings};
pub use timers::{InteractionCue, InteractionTimers};
