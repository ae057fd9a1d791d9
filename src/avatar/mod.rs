//! Avatar module
//!
//! The loaded humanoid character, its expressions, and the UI-facing state snapshot.

pub mod character;
pub mod expression;
pub mod state;

pub use character::HumanoidCharacter;
pub use expression::ExpressionSet;
pub use state::{Activity, CharacterState};
