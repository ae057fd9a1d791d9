//! Speech output with an on-screen text fallback.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::SpeechError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    /// Backend voice identifier, `None` for the default voice
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// A speech backend.
///
/// `speak` starts an utterance and returns immediately; completion is
/// observed through `is_speaking`.
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, text: &str, voice: &VoiceSettings) -> Result<(), SpeechError>;

    fn is_speaking(&self) -> bool;

    fn stop(&mut self);
}

/// Backend used when no speech engine is available. Every line finishes at once.
#[derive(Debug, Default)]
pub struct SilentSynthesizer;

impl SpeechSynthesizer for SilentSynthesizer {
    fn speak(&mut self, text: &str, _voice: &VoiceSettings) -> Result<(), SpeechError> {
        tracing::debug!("Speech unavailable, skipping: {}", text);
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        false
    }

    fn stop(&mut self) {}
}

/// Text shown in place of audio for a short while
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub text: String,
    #[serde(skip)]
    pub expires_at: Instant,
}

pub struct Speaker {
    synth: Box<dyn SpeechSynthesizer>,
    voice: VoiceSettings,
    notification_lifetime: Duration,
    current_line: Option<String>,
    notifications: Vec<Notification>,
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("voice", &self.voice)
            .field("current_line", &self.current_line)
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

impl Speaker {
    pub fn new(synth: Box<dyn SpeechSynthesizer>, notification_lifetime: Duration) -> Self {
        Self {
            synth,
            voice: VoiceSettings::default(),
            notification_lifetime,
            current_line: None,
            notifications: Vec::new(),
        }
    }

    pub fn silent(notification_lifetime: Duration) -> Self {
        Self::new(Box::new(SilentSynthesizer), notification_lifetime)
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    pub fn set_voice(&mut self, voice: VoiceSettings) {
        self.voice = voice;
    }

    pub fn is_speaking(&self) -> bool {
        self.current_line.is_some()
    }

    pub fn current_line(&self) -> Option<&str> {
        self.current_line.as_deref()
    }

    /// Speak a line. A synthesis failure never propagates: the line is
    /// turned into a notification instead and returned.
    pub fn say(&mut self, text: &str, now: Instant) -> Option<Notification> {
        if text.is_empty() {
            return None;
        }

        if self.current_line.is_some() {
            self.synth.stop();
        }
        self.current_line = Some(text.to_string());

        match self.synth.speak(text, &self.voice) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Error speaking response (non-critical): {}", e);
                self.current_line = None;
                let notification = Notification {
                    text: text.to_string(),
                    expires_at: now + self.notification_lifetime,
                };
                self.notifications.push(notification.clone());
                Some(notification)
            }
        }
    }

    pub fn stop(&mut self) {
        self.synth.stop();
        self.current_line = None;
    }

    /// Returns true when the current line finished since the last poll.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.notifications.retain(|n| n.expires_at > now);

        if self.current_line.is_some() && !self.synth.is_speaking() {
            self.current_line = None;
            return true;
        }
        false
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Backend whose behaviour the test controls
    #[derive(Debug, Default, Clone)]
    pub(crate) struct ScriptedSynthesizer {
        pub fail: Arc<AtomicBool>,
        pub speaking: Arc<AtomicBool>,
    }

    impl SpeechSynthesizer for ScriptedSynthesizer {
        fn speak(&mut self, _text: &str, _voice: &VoiceSettings) -> Result<(), SpeechError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SpeechError::Synthesis("no voices".to_string()));
            }
            self.speaking.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_speaking(&self) -> bool {
            self.speaking.load(Ordering::SeqCst)
        }

        fn stop(&mut self) {
            self.speaking.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_speaking_until_backend_finishes() {
        let synth = ScriptedSynthesizer::default();
        let mut speaker = Speaker::new(Box::new(synth.clone()), Duration::from_secs(3));
        let now = Instant::now();

        assert_eq!(speaker.say("Hey there, stargazer!", now), None);
        assert!(speaker.is_speaking());
        assert!(!speaker.poll(now));

        synth.speaking.store(false, Ordering::SeqCst);
        assert!(speaker.poll(now));
        assert!(!speaker.is_speaking());
    }

    #[test]
    fn test_failure_becomes_notification() {
        let synth = ScriptedSynthesizer::default();
        synth.fail.store(true, Ordering::SeqCst);
        let mut speaker = Speaker::new(Box::new(synth), Duration::from_secs(3));
        let now = Instant::now();

        let notification = speaker.say("Ooh, what's that for?", now).unwrap();
        assert_eq!(notification.text, "Ooh, what's that for?");
        assert!(!speaker.is_speaking());
        assert_eq!(speaker.notifications().len(), 1);

        speaker.poll(now + Duration::from_millis(2999));
        assert_eq!(speaker.notifications().len(), 1);
        speaker.poll(now + Duration::from_secs(3));
        assert!(speaker.notifications().is_empty());
    }

    #[test]
    fn test_empty_line_is_ignored() {
        let mut speaker = Speaker::silent(Duration::from_secs(3));
        assert_eq!(speaker.say("", Instant::now()), None);
        assert!(!speaker.is_speaking());
    }
}
