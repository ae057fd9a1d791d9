//! Canned character lines.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// What prompted a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogueCategory {
    Idle,
    Click,
    Pause,
    Keyboard,
    LongIdle,
    Greeting,
}

impl DialogueCategory {
    pub const ALL: [DialogueCategory; 6] = [
        DialogueCategory::Idle,
        DialogueCategory::Click,
        DialogueCategory::Pause,
        DialogueCategory::Keyboard,
        DialogueCategory::LongIdle,
        DialogueCategory::Greeting,
    ];

    /// Unknown actions fall back to idle.
    pub fn from_action(action: &str) -> Self {
        match action {
            "click" => Self::Click,
            "keyboard" => Self::Keyboard,
            "pause" => Self::Pause,
            "longIdle" => Self::LongIdle,
            "greeting" => Self::Greeting,
            _ => Self::Idle,
        }
    }

    /// Category for a key press
    pub fn for_key(key: &str) -> Self {
        match key {
            " " | "Space" | "Escape" => Self::Pause,
            "Enter" => Self::Greeting,
            _ => Self::Keyboard,
        }
    }

    pub fn lines(&self) -> &'static [&'static str] {
        match self {
            Self::Idle => &[
                "Hello there! I'm Lyra, your virtual companion.",
                "I'm here whenever you need me!",
                "What would you like to talk about?",
                "The cosmos holds so many mysteries...",
                "I love watching the stars with you.",
            ],
            Self::Click => &[
                "You clicked on me! That tickles!",
                "Ooh, what's that for?",
                "Did you need something?",
                "I'm all ears... well, digital ears!",
                "That's one way to get my attention!",
            ],
            Self::Pause => &[
                "Seriously? You pressed pause?",
                "Taking a break already?",
                "I'll wait right here for you!",
                "Paused in the middle of our conversation!",
                "Time stops for no one... except you, apparently!",
            ],
            Self::Keyboard => &[
                "Ooh, typing something interesting?",
                "What are you working on?",
                "Those keys are getting a workout!",
                "I love the sound of productivity!",
                "Writing the next great novel?",
            ],
            Self::LongIdle => &[
                "Still there? I'm getting a bit lonely...",
                "Should I put on some ambient space music?",
                "The silence is quite peaceful, actually.",
                "I'm just here, contemplating the universe.",
                "Wake me up when you're ready to chat!",
            ],
            Self::Greeting => &[
                "Welcome to the cosmos!",
                "Hey there, stargazer!",
                "Ready to explore the universe together?",
                "The stars have aligned for our meeting!",
                "Greetings from the digital realm!",
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogueManager {
    rng: StdRng,
}

impl Default for DialogueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueManager {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn response(&mut self, category: DialogueCategory) -> &'static str {
        category.lines().choose(&mut self.rng).copied().unwrap_or_default()
    }

    pub fn contextual_response(&mut self, action: &str) -> &'static str {
        self.response(DialogueCategory::from_action(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_lines_per_category() {
        for category in DialogueCategory::ALL {
            assert_eq!(category.lines().len(), 5, "{:?}", category);
        }
    }

    #[test]
    fn test_response_comes_from_category() {
        let mut dialogue = DialogueManager::with_seed(42);
        for _ in 0..20 {
            let line = dialogue.response(DialogueCategory::Click);
            assert!(DialogueCategory::Click.lines().contains(&line));
        }
    }

    #[test]
    fn test_action_and_key_mapping() {
        assert_eq!(DialogueCategory::from_action("longIdle"), DialogueCategory::LongIdle);
        assert_eq!(DialogueCategory::from_action("dance"), DialogueCategory::Idle);
        assert_eq!(DialogueCategory::for_key("Escape"), DialogueCategory::Pause);
        assert_eq!(DialogueCategory::for_key(" "), DialogueCategory::Pause);
        assert_eq!(DialogueCategory::for_key("Enter"), DialogueCategory::Greeting);
        assert_eq!(DialogueCategory::for_key("a"), DialogueCategory::Keyboard);
    }
}
