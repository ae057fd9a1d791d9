//! Serialisable snapshot of the companion handed to the UI layer

use serde::{Deserialize, Serialize};

/// What the companion is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// No character loaded, or resting
    #[default]
    Idle,
    /// Speech synthesis in progress
    Speaking,
    /// A non-neutral expression is showing
    Expression,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activity::Idle => write!(f, "idle"),
            Activity::Speaking => write!(f, "speaking"),
            Activity::Expression => write!(f, "expression"),
        }
    }
}

/// Character loaded flag, load error, expressions and animations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    loaded: bool,
    model_name: Option<String>,
    error: Option<String>,
    current_animation: Option<String>,
    animations: Vec<String>,
    expression: Option<String>,
    available_expressions: Vec<String>,
    speaking: bool,
    /// No user interaction for the idle-dialogue delay
    idle: bool,
    activity: Activity,
}

impl CharacterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.current_animation.as_deref()
    }

    pub fn animations(&self) -> &[String] {
        &self.animations
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn available_expressions(&self) -> &[String] {
        &self.available_expressions
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Mark a character as loaded, clearing any previous error.
    pub fn with_loaded(mut self, model_name: &str, available_expressions: Vec<String>) -> Self {
        self.loaded = true;
        self.model_name = Some(model_name.to_string());
        self.available_expressions = available_expressions;
        self.error = None;
        self
    }

    /// Record a failed load. The previous character is considered gone.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.loaded = false;
        self.model_name = None;
        self.available_expressions.clear();
        self.current_animation = None;
        self.error = Some(message.into());
        self.refresh_activity();
        self
    }

    pub fn with_animations(mut self, animations: Vec<String>) -> Self {
        self.animations = animations;
        self
    }

    pub fn with_current_animation(mut self, name: Option<String>) -> Self {
        self.current_animation = name;
        self
    }

    pub fn with_expression(mut self, expression: Option<String>) -> Self {
        if expression != self.expression {
            self.expression = expression;
            self.refresh_activity();
        }
        self
    }

    pub fn with_speaking(mut self, speaking: bool) -> Self {
        if speaking != self.speaking {
            self.speaking = speaking;
            self.refresh_activity();
        }
        self
    }

    pub fn with_idle(mut self, idle: bool) -> Self {
        self.idle = idle;
        self
    }

    fn refresh_activity(&mut self) {
        let expressive = self
            .expression
            .as_deref()
            .is_some_and(|e| e != super::expression::NEUTRAL_EXPRESSION);
        self.activity = if self.speaking {
            Activity::Speaking
        } else if expressive {
            Activity::Expression
        } else {
            Activity::Idle
        };
    }
}
