//! Humanoid bone validation.
//!
//! Everything here produces reports; nothing fails. Callers decide whether
//! an invalid report should block anything.

use serde::Serialize;
use std::fmt;

use super::bone::{BoneRole, ESSENTIAL_ANIMATION_ROLES, REQUIRED_ROLES, SKELETON_CHAINS};
use super::patterns::{match_bone_name, NameMatch};
use crate::avatar::HumanoidCharacter;

/// Rig dialect whose off-pattern mappings are still accepted
pub const BIP_DIALECT_MARKER: &str = "_Bip_";

/// A role mapped to a bone whose name matches none of its patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncorrectBone {
    pub role: BoneRole,
    pub bone_name: String,
}

impl IncorrectBone {
    pub fn is_bip_dialect(&self) -> bool {
        self.bone_name.contains(BIP_DIALECT_MARKER)
    }
}

impl fmt::Display for IncorrectBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mapped to {})", self.role, self.bone_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneMappingReport {
    pub valid: bool,
    pub missing_bones: Vec<BoneRole>,
    pub incorrect_bones: Vec<IncorrectBone>,
}

/// `bone` should sit somewhere below `expected_ancestor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyIssue {
    pub bone: BoneRole,
    pub expected_ancestor: BoneRole,
}

impl fmt::Display for HierarchyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a descendant of {}", self.bone, self.expected_ancestor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyReport {
    pub valid: bool,
    pub issues: Vec<HierarchyIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub ready: bool,
    pub has_skinned_mesh: bool,
    pub missing_essential: Vec<BoneRole>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub bone_mapping: BoneMappingReport,
    pub skeleton_hierarchy: HierarchyReport,
    pub animation_readiness: ReadinessReport,
}

/// Check required roles are mapped and every mapped role has a plausible name.
///
/// Required roles may be missing or incorrect; optional roles (upperChest,
/// jaw, fingers) are only checked for incorrect names. A report whose only
/// problems are incorrect "_Bip_" names is still valid.
pub fn validate_bone_mapping(character: &HumanoidCharacter) -> BoneMappingReport {
    let mut missing_bones = Vec::new();
    let mut incorrect_bones = Vec::new();

    for role in REQUIRED_ROLES {
        match character.bone_name(role) {
            None => missing_bones.push(role),
            Some(name) => {
                if let Some(bad) = check_name(role, name) {
                    incorrect_bones.push(bad);
                }
            }
        }
    }

    let optional = BoneRole::all().filter(|r| !r.is_required());
    for role in optional {
        if let Some(bad) = character.bone_name(role).and_then(|n| check_name(role, n)) {
            incorrect_bones.push(bad);
        }
    }

    let valid = missing_bones.is_empty()
        && incorrect_bones.iter().all(IncorrectBone::is_bip_dialect);

    BoneMappingReport {
        valid,
        missing_bones,
        incorrect_bones,
    }
}

fn check_name(role: BoneRole, bone_name: &str) -> Option<IncorrectBone> {
    match match_bone_name(role, bone_name) {
        NameMatch::Unmatched => Some(IncorrectBone {
            role,
            bone_name: bone_name.to_string(),
        }),
        _ => None,
    }
}

/// Walk every skeleton chain and report links that are not ancestors.
pub fn validate_skeleton_hierarchy(character: &HumanoidCharacter) -> HierarchyReport {
    let issues: Vec<HierarchyIssue> = SKELETON_CHAINS
        .iter()
        .flat_map(|chain| chain_issues(character, chain))
        .collect();

    HierarchyReport {
        valid: issues.is_empty(),
        issues,
    }
}

/// Issues for a single chain. Unmapped roles are skipped; each mapped bone
/// is compared with the previous mapped bone.
pub fn chain_issues(character: &HumanoidCharacter, chain: &[BoneRole]) -> Vec<HierarchyIssue> {
    let scene = character.scene();
    let mut issues = Vec::new();
    let mut previous: Option<(BoneRole, _)> = None;

    for &role in chain {
        let Some(node) = character.bone(role) else {
            continue;
        };
        if let Some((prev_role, prev_node)) = previous {
            if !scene.is_descendant_of(node, prev_node) {
                issues.push(HierarchyIssue {
                    bone: role,
                    expected_ancestor: prev_role,
                });
            }
        }
        previous = Some((role, node));
    }

    issues
}

/// A character is ready to animate when it has a skinned mesh and every
/// essential role resolves.
pub fn validate_animation_readiness(character: &HumanoidCharacter) -> ReadinessReport {
    let mut issues = Vec::new();

    let has_skinned_mesh = character.scene().has_skinned_mesh();
    if !has_skinned_mesh {
        issues.push("Model does not have a skeleton".to_string());
    }

    let missing_essential: Vec<BoneRole> = ESSENTIAL_ANIMATION_ROLES
        .into_iter()
        .filter(|role| character.bone(*role).is_none())
        .collect();

    if !missing_essential.is_empty() {
        let names: Vec<&str> = missing_essential.iter().map(|r| r.name()).collect();
        issues.push(format!(
            "Missing essential animation bones: {}",
            names.join(", ")
        ));
    }

    ReadinessReport {
        ready: issues.is_empty(),
        has_skinned_mesh,
        missing_essential,
        issues,
    }
}

/// Run all three checks.
pub fn validate_vrm(character: &HumanoidCharacter) -> ValidationReport {
    let bone_mapping = validate_bone_mapping(character);
    let skeleton_hierarchy = validate_skeleton_hierarchy(character);
    let animation_readiness = validate_animation_readiness(character);

    let valid = bone_mapping.valid && skeleton_hierarchy.valid && animation_readiness.ready;
    tracing::debug!(
        "Validated {}: mapping={} hierarchy={} readiness={}",
        character.name(),
        bone_mapping.valid,
        skeleton_hierarchy.valid,
        animation_readiness.ready
    );

    ValidationReport {
        valid,
        bone_mapping,
        skeleton_hierarchy,
        animation_readiness,
    }
}
