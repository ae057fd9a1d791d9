//! Heuristic bone mapping and skeleton repair.
//!
//! Three stages, run in order by [`fix_vrm_bones`]: name-based auto-mapping,
//! synthesis of missing torso bones, and torso hierarchy reparenting.
//! Each stage is best effort; the combined [`RepairOutcome`] says which
//! stages fully succeeded and what is still missing.

use glam::Vec3;
use serde::Serialize;

use super::bone::{BoneRole, Finger, FingerJoint, Side, MAIN_CHAIN, MINIMAL_CHAIN, REQUIRED_ROLES};
use crate::avatar::HumanoidCharacter;
use crate::error::SceneError;
use crate::scene::NodeId;

/// Lowercase substrings commonly found in third-party rig bone names.
const COMMON_NAMES: [(BoneRole, &[&str]); 25] = [
    (BoneRole::Hips, &["hip", "pelvis", "root", "waist", "cog", "origin"]),
    (BoneRole::Spine, &["spine", "spine1", "chest_lower", "torso"]),
    (BoneRole::Chest, &["chest", "spine2", "torso_upper", "upperchest_lower"]),
    (BoneRole::UpperChest, &["upperchest", "spine3", "chest_upper"]),
    (BoneRole::Neck, &["neck", "neckbase"]),
    (BoneRole::Head, &["head", "skull", "face"]),
    (BoneRole::LeftEye, &["eye_l", "eye.l", "eyel", "lefteye"]),
    (BoneRole::RightEye, &["eye_r", "eye.r", "eyer", "righteye"]),
    (BoneRole::Jaw, &["jaw", "mandible", "chin"]),
    (BoneRole::LeftShoulder, &["shoulder_l", "shoulder.l", "shoulderl", "leftshoulder", "clavicle_l"]),
    (BoneRole::RightShoulder, &["shoulder_r", "shoulder.r", "shoulderr", "rightshoulder", "clavicle_r"]),
    (BoneRole::LeftUpperArm, &["upperarm_l", "arm_l", "arml", "leftarm", "arm.l"]),
    (BoneRole::RightUpperArm, &["upperarm_r", "arm_r", "armr", "rightarm", "arm.r"]),
    (BoneRole::LeftLowerArm, &["lowerarm_l", "forearm_l", "elbow_l", "forearml", "leftforearm", "forearm.l"]),
    (BoneRole::RightLowerArm, &["lowerarm_r", "forearm_r", "elbow_r", "forearmr", "rightforearm", "forearm.r"]),
    (BoneRole::LeftHand, &["hand_l", "hand.l", "handl", "lefthand"]),
    (BoneRole::RightHand, &["hand_r", "hand.r", "handr", "righthand"]),
    (BoneRole::LeftUpperLeg, &["upperleg_l", "thigh_l", "thighl", "leftthigh", "thigh.l"]),
    (BoneRole::RightUpperLeg, &["upperleg_r", "thigh_r", "thighr", "rightthigh", "thigh.r"]),
    (BoneRole::LeftLowerLeg, &["lowerleg_l", "calf_l", "shin_l", "calfl", "leftcalf", "calf.l"]),
    (BoneRole::RightLowerLeg, &["lowerleg_r", "calf_r", "shin_r", "calfr", "rightcalf", "calf.r"]),
    (BoneRole::LeftFoot, &["foot_l", "foot.l", "footl", "leftfoot"]),
    (BoneRole::RightFoot, &["foot_r", "foot.r", "footr", "rightfoot"]),
    (BoneRole::LeftToes, &["toe_l", "toes_l", "toe.l", "toel", "lefttoe"]),
    (BoneRole::RightToes, &["toe_r", "toes_r", "toe.r", "toer", "righttoe"]),
];

/// Offset of a synthesized hips bone from the scene root
const CREATED_HIPS_OFFSET: Vec3 = Vec3::new(0.0, 1.0, 0.0);
/// Offset of every other synthesized torso bone from its parent
const CREATED_BONE_OFFSET: Vec3 = Vec3::new(0.0, 0.1, 0.0);

/// Candidate name fragments for one finger joint, in seven naming styles.
fn finger_candidates(side: Side, finger: Finger, joint: FingerJoint) -> Vec<String> {
    let (s, l, f, p) = (side.as_str(), side.letter(), finger.as_str(), joint.as_str());
    vec![
        format!("{f}_{p}_{s}"),
        format!("{f}{p}_{l}"),
        format!("{s}_{f}_{p}"),
        format!("{l}_{f}_{p}"),
        format!("{f}.{p}.{s}"),
        format!("{f}{p}.{s}"),
        format!("{f}{p}_{l}"),
    ]
}

/// Role → candidate substrings, body roles first then fingers.
pub fn candidate_table() -> Vec<(BoneRole, Vec<String>)> {
    let mut table: Vec<(BoneRole, Vec<String>)> = COMMON_NAMES
        .iter()
        .map(|(role, names)| (*role, names.iter().map(|n| n.to_string()).collect()))
        .collect();

    for finger in Finger::ALL {
        for joint in FingerJoint::ALL {
            for side in Side::ALL {
                table.push((
                    BoneRole::Finger(side, finger, joint),
                    finger_candidates(side, finger, joint),
                ));
            }
        }
    }
    table
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedBone {
    pub role: BoneRole,
    pub bone_name: String,
}

/// Map every unmapped role to the first scene bone whose lowercase name
/// contains one of the role's candidate substrings.
pub fn auto_map_bones(character: &mut HumanoidCharacter) -> Vec<MappedBone> {
    let bones: Vec<(NodeId, String)> = character
        .scene()
        .bones()
        .into_iter()
        .map(|id| (id, character.scene().name(id).to_lowercase()))
        .collect();
    tracing::debug!("Auto-map: {} bones in scene", bones.len());

    let mut mapped = Vec::new();
    for (role, candidates) in candidate_table() {
        if character.bone(role).is_some() {
            continue;
        }
        let hit = bones
            .iter()
            .find(|(_, name)| candidates.iter().any(|c| name.contains(c.as_str())));
        if let Some((id, _)) = hit {
            character.set_bone(role, *id);
            let bone_name = character.scene().name(*id).to_string();
            tracing::debug!("Mapped {} to {}", role, bone_name);
            mapped.push(MappedBone { role, bone_name });
        }
    }

    tracing::info!("Automatically mapped {} bones", mapped.len());
    mapped
}

/// Map a role to the scene node with exactly this name.
pub fn map_bone(
    character: &mut HumanoidCharacter,
    role: BoneRole,
    scene_bone_name: &str,
) -> Option<NodeId> {
    let Some(id) = character.scene().find_by_name(scene_bone_name) else {
        tracing::warn!("Bone {:?} not found in the scene", scene_bone_name);
        return None;
    };
    character.set_bone(role, id);
    tracing::info!("Manually mapped {} to {}", role, scene_bone_name);
    Some(id)
}

/// Synthesize any missing link of hips→spine→chest→neck→head.
///
/// Hips is created under the scene root; every other bone chains off the
/// nearest resolved (or just created) ancestor. Returns the created roles.
pub fn create_missing_bones(character: &mut HumanoidCharacter) -> Vec<BoneRole> {
    let mut created = Vec::new();
    let mut parent: Option<NodeId> = None;

    for role in MINIMAL_CHAIN {
        if let Some(existing) = character.bone(role) {
            parent = Some(existing);
            continue;
        }

        let root = character.scene().root();
        let (attach_to, offset) = match parent {
            Some(p) => (p, CREATED_BONE_OFFSET),
            None => (root, CREATED_HIPS_OFFSET),
        };
        let id = character.scene_mut().add_bone(role.name(), attach_to, offset);
        character.set_bone(role, id);
        tracing::info!("Created {} bone", role);

        created.push(role);
        parent = Some(id);
    }

    created
}

/// Result of reparenting the torso chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyFix {
    pub reparented: Vec<BoneRole>,
    pub failed: Vec<(BoneRole, SceneError)>,
}

/// Reparent torso bones that are not below their expected ancestor,
/// preserving world position. Missing links (upperChest) are skipped.
pub fn fix_bone_hierarchy(character: &mut HumanoidCharacter) -> HierarchyFix {
    let mut fix = HierarchyFix::default();
    let mut previous: Option<(BoneRole, NodeId)> = None;

    for role in MAIN_CHAIN {
        let Some(node) = character.bone(role) else {
            continue;
        };

        if let Some((prev_role, prev_node)) = previous {
            if !character.scene().is_descendant_of(node, prev_node) {
                match character.scene_mut().reparent_preserving_world(node, prev_node) {
                    Ok(()) => {
                        tracing::info!("Reparented {} under {}", role, prev_role);
                        fix.reparented.push(role);
                    }
                    Err(e) => {
                        tracing::warn!("Could not reparent {} under {}: {}", role, prev_role, e);
                        fix.failed.push((role, e));
                    }
                }
            }
        }
        previous = Some((role, node));
    }

    fix
}

/// What the full repair pipeline did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub auto_mapped: Vec<MappedBone>,
    pub created: Vec<BoneRole>,
    pub reparented: Vec<BoneRole>,
    pub auto_map_ok: bool,
    pub create_ok: bool,
    pub hierarchy_ok: bool,
    /// Required roles that are still unmapped afterwards
    pub still_missing: Vec<BoneRole>,
}

impl RepairOutcome {
    /// All three stages succeeded
    pub fn succeeded(&self) -> bool {
        self.auto_map_ok && self.create_ok && self.hierarchy_ok
    }
}

/// Auto-map, create missing torso bones, then fix the torso hierarchy.
pub fn fix_vrm_bones(character: &mut HumanoidCharacter) -> RepairOutcome {
    let missing_before = missing_required(character);
    let auto_mapped = auto_map_bones(character);
    // Nothing to map is not a failure.
    let auto_map_ok = !auto_mapped.is_empty() || missing_before.is_empty();

    let created = create_missing_bones(character);
    let create_ok = MINIMAL_CHAIN.iter().all(|r| character.bone(*r).is_some());

    let hierarchy = fix_bone_hierarchy(character);
    let hierarchy_ok = hierarchy.failed.is_empty();

    let outcome = RepairOutcome {
        auto_mapped,
        created,
        reparented: hierarchy.reparented,
        auto_map_ok,
        create_ok,
        hierarchy_ok,
        still_missing: missing_required(character),
    };

    tracing::info!(
        "Bone repair for {}: auto-map={} create={} hierarchy={} ({} required still missing)",
        character.name(),
        outcome.auto_map_ok,
        outcome.create_ok,
        outcome.hierarchy_ok,
        outcome.still_missing.len()
    );
    outcome
}

fn missing_required(character: &HumanoidCharacter) -> Vec<BoneRole> {
    REQUIRED_ROLES
        .into_iter()
        .filter(|r| character.bone(*r).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::character::tests::standard_character;
    use crate::humanoid::validator::validate_skeleton_hierarchy;
    use crate::scene::SceneGraph;
    use pretty_assertions::assert_eq;

    /// Rig with generic names and an empty bone map.
    fn unmapped_rig() -> HumanoidCharacter {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let pelvis = scene.add_bone("Pelvis", root, Vec3::Y);
        let spine = scene.add_bone("spine_01", pelvis, Vec3::Y * 0.1);
        let neck = scene.add_bone("neck_01", spine, Vec3::Y * 0.3);
        scene.add_bone("head", neck, Vec3::Y * 0.1);
        let clavicle = scene.add_bone("clavicle_l", spine, Vec3::X * 0.1);
        let upper = scene.add_bone("upperarm_l", clavicle, Vec3::X * 0.1);
        let lower = scene.add_bone("lowerarm_l", upper, Vec3::X * 0.25);
        let hand = scene.add_bone("hand_l", lower, Vec3::X * 0.25);
        scene.add_bone("index_proximal_left", hand, Vec3::X * 0.05);
        scene.add_bone("thigh_l", pelvis, Vec3::X * 0.1);
        HumanoidCharacter::new("rig", scene)
    }

    #[test]
    fn test_auto_map_common_names() {
        let mut character = unmapped_rig();
        let mapped = auto_map_bones(&mut character);

        assert_eq!(character.bone_name(BoneRole::Hips), Some("Pelvis"));
        assert_eq!(character.bone_name(BoneRole::Spine), Some("spine_01"));
        assert_eq!(character.bone_name(BoneRole::LeftShoulder), Some("clavicle_l"));
        assert_eq!(character.bone_name(BoneRole::LeftUpperArm), Some("upperarm_l"));
        assert_eq!(character.bone_name(BoneRole::LeftHand), Some("hand_l"));
        assert_eq!(character.bone_name(BoneRole::LeftUpperLeg), Some("thigh_l"));
        assert_eq!(
            character.bone_name(BoneRole::Finger(Side::Left, Finger::Index, FingerJoint::Proximal)),
            Some("index_proximal_left")
        );
        assert!(character.bone(BoneRole::Chest).is_none());
        assert_eq!(mapped.len(), character.bone_map().len());
    }

    #[test]
    fn test_auto_map_skips_resolved_roles() {
        let mut character = standard_character();
        let before = character.bone_map().clone();
        auto_map_bones(&mut character);
        for (role, node) in &before {
            assert_eq!(character.bone(*role), Some(*node));
        }
    }

    #[test]
    fn test_map_bone_by_exact_name() {
        let mut character = unmapped_rig();
        assert!(map_bone(&mut character, BoneRole::Chest, "spine_01").is_some());
        assert_eq!(character.bone_name(BoneRole::Chest), Some("spine_01"));
        assert!(map_bone(&mut character, BoneRole::Jaw, "nope").is_none());
    }

    #[test]
    fn test_create_missing_bones_chains() {
        let mut character = HumanoidCharacter::new("empty", SceneGraph::new());
        let created = create_missing_bones(&mut character);
        assert_eq!(created, MINIMAL_CHAIN.to_vec());

        let scene = character.scene();
        let hips = character.bone(BoneRole::Hips).unwrap();
        let head = character.bone(BoneRole::Head).unwrap();
        assert_eq!(scene.parent(hips), Some(scene.root()));
        assert!(scene.is_descendant_of(head, hips));
        assert!((scene.world_position(head) - Vec3::new(0.0, 1.4, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_create_missing_bones_chains_off_existing() {
        let mut character = unmapped_rig();
        auto_map_bones(&mut character);
        let created = create_missing_bones(&mut character);
        assert_eq!(created, vec![BoneRole::Chest]);

        let chest = character.bone(BoneRole::Chest).unwrap();
        let spine = character.bone(BoneRole::Spine).unwrap();
        assert_eq!(character.scene().parent(chest), Some(spine));
    }

    #[test]
    fn test_fix_hierarchy_reparents_and_keeps_world_position() {
        let mut character = standard_character();
        let neck = character.bone(BoneRole::Neck).unwrap();
        let root = character.scene().root();
        let before = character.scene().world_position(neck);
        character.scene_mut().reparent_preserving_world(neck, root).unwrap();
        assert!(!validate_skeleton_hierarchy(&character).valid);

        let fix = fix_bone_hierarchy(&mut character);
        assert_eq!(fix.reparented, vec![BoneRole::Neck]);
        assert!(fix.failed.is_empty());

        let upper_chest = character.bone(BoneRole::UpperChest).unwrap();
        assert_eq!(character.scene().parent(neck), Some(upper_chest));
        assert!((character.scene().world_position(neck) - before).length() < 1e-5);
        assert!(validate_skeleton_hierarchy(&character).valid);
    }

    #[test]
    fn test_fix_hierarchy_reports_cycles() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        // spine sits above hips
        let spine = scene.add_bone("spine", root, Vec3::Y);
        let hips = scene.add_bone("hips", spine, Vec3::Y);
        let mut character = HumanoidCharacter::new("inverted", scene);
        character.set_bone(BoneRole::Hips, hips);
        character.set_bone(BoneRole::Spine, spine);

        let fix = fix_bone_hierarchy(&mut character);
        assert_eq!(fix.failed.len(), 1);
        assert_eq!(fix.failed[0].0, BoneRole::Spine);
    }

    #[test]
    fn test_fix_vrm_bones_is_idempotent() {
        let mut character = unmapped_rig();
        let first = fix_vrm_bones(&mut character);
        assert!(first.auto_map_ok);
        assert!(first.create_ok);
        assert!(first.hierarchy_ok);
        assert!(!first.still_missing.is_empty());

        let node_count = character.scene().len();
        let mapping = character.bone_map().clone();

        let second = fix_vrm_bones(&mut character);
        assert_eq!(character.scene().len(), node_count);
        assert_eq!(character.bone_map(), &mapping);
        assert!(second.created.is_empty());
        assert!(second.auto_mapped.is_empty());
        assert!(second.reparented.is_empty());
    }

    #[test]
    fn test_fix_vrm_bones_on_valid_character() {
        let mut character = standard_character();
        let outcome = fix_vrm_bones(&mut character);
        assert!(outcome.succeeded());
        assert!(outcome.still_missing.is_empty());
    }
}
