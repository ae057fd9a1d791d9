//! Facial expression weights

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::AvatarError;

/// Preset expressions offered to the UI, in display order
pub const PRESET_EXPRESSIONS: [&str; 6] =
    ["neutral", "happy", "angry", "sad", "relaxed", "surprised"];

/// Expressions driven by the blink scheduler
pub const BLINK_EXPRESSIONS: [&str; 3] = ["blink", "blinkLeft", "blinkRight"];

/// Resting expression; never blocks gaze
pub const NEUTRAL_EXPRESSION: &str = "neutral";

/// Expression name to weight in [0, 1]. The set of names is fixed at load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpressionSet {
    weights: BTreeMap<String, f32>,
}

impl ExpressionSet {
    /// Create a set with every expression at weight 0
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            weights: names.into_iter().map(|n| (n.into(), 0.0)).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, name: &str) -> Option<f32> {
        self.weights.get(name).copied()
    }

    /// Set a weight, clamped to [0, 1]. Unknown names and NaN are rejected.
    pub fn set(&mut self, name: &str, weight: f32) -> Result<(), AvatarError> {
        if weight.is_nan() {
            return Err(AvatarError::InvalidExpression(format!("{} = NaN", name)));
        }
        match self.weights.get_mut(name) {
            Some(w) => {
                *w = weight.clamp(0.0, 1.0);
                Ok(())
            }
            None => Err(AvatarError::InvalidExpression(name.to_string())),
        }
    }

    /// Zero every non-blink expression
    pub fn clear_emotions(&mut self) {
        for (name, weight) in self.weights.iter_mut() {
            if !is_blink(name) {
                *weight = 0.0;
            }
        }
    }

    /// Write the shared blink weight. Ignored when the model has no blink.
    pub fn set_blink(&mut self, weight: f32) {
        if let Some(w) = self.weights.get_mut("blink") {
            *w = weight.clamp(0.0, 1.0);
        }
    }

    /// Presets this model actually has, in [`PRESET_EXPRESSIONS`] order
    pub fn available_presets(&self) -> Vec<&'static str> {
        PRESET_EXPRESSIONS
            .iter()
            .copied()
            .filter(|p| self.contains(p))
            .collect()
    }

    /// The strongest active non-blink expression other than neutral.
    pub fn dominant(&self) -> Option<(&str, f32)> {
        self.weights
            .iter()
            .filter(|(name, w)| blocks_gaze(name) && **w > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, w)| (name.as_str(), *w))
    }

    /// True while an expression that should hold the eyes centered is active
    pub fn has_blocking_active(&self) -> bool {
        self.dominant().is_some()
    }
}

pub fn is_blink(name: &str) -> bool {
    BLINK_EXPRESSIONS.contains(&name)
}

fn blocks_gaze(name: &str) -> bool {
    !is_blink(name) && name != NEUTRAL_EXPRESSION
}
