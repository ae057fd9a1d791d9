//! Canonical humanoid bone schema, name validation and heuristic repair.

pub mod bone;
pub mod mapper;
pub mod patterns;
pub mod validator;

pub use bone::{BoneRole, Finger, FingerJoint, Side};
pub use mapper::{auto_map_bones, fix_vrm_bones, map_bone, RepairOutcome};
pub use validator::{validate_vrm, ValidationReport};
