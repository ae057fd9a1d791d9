//! Foreign bone-name tables and bone lookup for animation tracks.

use glam::Vec3;

use super::clip::AnimationClip;
use crate::avatar::HumanoidCharacter;
use crate::humanoid::bone::{BoneRole, Finger, FingerJoint, Side};
use crate::scene::NodeId;

/// Segment names used by common mocap rigs, with the humanoid names they
/// usually stand for. Used when building a retarget table.
pub const RETARGET_ALTERNATES: [(&str, &[&str]); 14] = [
    ("rightArm", &["rightUpperArm", "rightShoulder", "rightArmUpper"]),
    ("leftArm", &["leftUpperArm", "leftShoulder", "leftArmUpper"]),
    ("rightForeArm", &["rightLowerArm", "rightElbow", "rightArmLower"]),
    ("leftForeArm", &["leftLowerArm", "leftElbow", "leftArmLower"]),
    ("rightHand", &["rightPalm", "rightWrist"]),
    ("leftHand", &["leftPalm", "leftWrist"]),
    ("rightUpLeg", &["rightUpperLeg", "rightHip", "rightThigh"]),
    ("leftUpLeg", &["leftUpperLeg", "leftHip", "leftThigh"]),
    ("rightLeg", &["rightLowerLeg", "rightKnee", "rightShin"]),
    ("leftLeg", &["leftLowerLeg", "leftKnee", "leftShin"]),
    ("rightFoot", &["rightAnkle"]),
    ("leftFoot", &["leftAnkle"]),
    ("spine", &["chest", "torso"]),
    ("head", &["face", "skull"]),
];

/// Shorter list consulted by [`find_bone`].
const LOOKUP_ALTERNATES: [(&str, &[&str]); 12] = [
    ("rightArm", &["rightUpperArm", "rightShoulder"]),
    ("leftArm", &["leftUpperArm", "leftShoulder"]),
    ("rightForeArm", &["rightLowerArm", "rightElbow"]),
    ("leftForeArm", &["leftLowerArm", "leftElbow"]),
    ("rightHand", &["rightPalm", "rightWrist"]),
    ("leftHand", &["leftPalm", "leftWrist"]),
    ("rightUpLeg", &["rightUpperLeg", "rightHip"]),
    ("leftUpLeg", &["leftUpperLeg", "leftHip"]),
    ("rightLeg", &["rightLowerLeg", "rightKnee"]),
    ("leftLeg", &["leftLowerLeg", "leftKnee"]),
    ("rightFoot", &["rightAnkle"]),
    ("leftFoot", &["leftAnkle"]),
];

/// Conventional child → parent pairs used to synthesize bones a clip
/// writes to but the character lacks.
pub const CONVENTIONAL_PARENTS: [(&str, &str); 18] = [
    ("rightArm", "rightShoulder"),
    ("leftArm", "leftShoulder"),
    ("rightForeArm", "rightUpperArm"),
    ("leftForeArm", "leftUpperArm"),
    ("rightHand", "rightLowerArm"),
    ("leftHand", "leftLowerArm"),
    ("rightUpLeg", "hips"),
    ("leftUpLeg", "hips"),
    ("rightLeg", "rightUpperLeg"),
    ("leftLeg", "leftUpperLeg"),
    ("rightFoot", "rightLowerLeg"),
    ("leftFoot", "leftLowerLeg"),
    ("J_Bip_R_UpperArm", "J_Bip_R_Shoulder"),
    ("J_Bip_L_UpperArm", "J_Bip_L_Shoulder"),
    ("J_Bip_R_LowerArm", "J_Bip_R_UpperArm"),
    ("J_Bip_L_LowerArm", "J_Bip_L_UpperArm"),
    ("J_Bip_R_Hand", "J_Bip_R_LowerArm"),
    ("J_Bip_L_Hand", "J_Bip_L_LowerArm"),
];

/// Local offset of a bone synthesized for playback
const SYNTHESIZED_BONE_OFFSET: Vec3 = Vec3::new(0.0, -0.1, 0.0);

const BIP_BODY: [(&str, BoneRole); 21] = [
    ("J_Bip_C_Hips", BoneRole::Hips),
    ("J_Bip_C_Spine", BoneRole::Spine),
    ("J_Bip_C_Chest", BoneRole::Chest),
    ("J_Bip_C_Neck", BoneRole::Neck),
    ("J_Bip_C_Head", BoneRole::Head),
    ("J_Bip_L_Shoulder", BoneRole::LeftShoulder),
    ("J_Bip_L_UpperArm", BoneRole::LeftUpperArm),
    ("J_Bip_L_LowerArm", BoneRole::LeftLowerArm),
    ("J_Bip_L_Hand", BoneRole::LeftHand),
    ("J_Bip_R_Shoulder", BoneRole::RightShoulder),
    ("J_Bip_R_UpperArm", BoneRole::RightUpperArm),
    ("J_Bip_R_LowerArm", BoneRole::RightLowerArm),
    ("J_Bip_R_Hand", BoneRole::RightHand),
    ("J_Bip_L_UpperLeg", BoneRole::LeftUpperLeg),
    ("J_Bip_L_LowerLeg", BoneRole::LeftLowerLeg),
    ("J_Bip_L_Foot", BoneRole::LeftFoot),
    ("J_Bip_L_ToeBase", BoneRole::LeftToes),
    ("J_Bip_R_UpperLeg", BoneRole::RightUpperLeg),
    ("J_Bip_R_LowerLeg", BoneRole::RightLowerLeg),
    ("J_Bip_R_Foot", BoneRole::RightFoot),
    ("J_Bip_R_ToeBase", BoneRole::RightToes),
];

/// Every "J_Bip_" name with its role: body bones, then
/// `J_Bip_{L|R}_{Finger}{1..3}` for all fingers.
pub fn bip_table() -> Vec<(String, BoneRole)> {
    let mut table: Vec<(String, BoneRole)> = BIP_BODY
        .iter()
        .map(|(name, role)| (name.to_string(), *role))
        .collect();

    for side in Side::ALL {
        let letter = side.letter().to_uppercase();
        for finger in Finger::ALL {
            let mut finger_name = finger.as_str().to_string();
            finger_name[..1].make_ascii_uppercase();
            for joint in FingerJoint::ALL {
                table.push((
                    format!("J_Bip_{}_{}{}", letter, finger_name, joint.number()),
                    BoneRole::Finger(side, finger, joint),
                ));
            }
        }
    }
    table
}

/// Role for a "J_Bip_" body bone name. Fingers are not covered.
pub fn bip_to_role(name: &str) -> Option<BoneRole> {
    BIP_BODY
        .iter()
        .find(|(bip, _)| *bip == name)
        .map(|(_, role)| *role)
}

fn role_node(character: &HumanoidCharacter, name: &str) -> Option<NodeId> {
    BoneRole::from_name(name).and_then(|role| character.bone(role))
}

/// Resolve a track bone token to a node: humanoid role, "J_Bip_" name,
/// conventional alternates, then a case-insensitive scene search.
pub fn find_bone(character: &HumanoidCharacter, token: &str) -> Option<NodeId> {
    if let Some(id) = role_node(character, token) {
        return Some(id);
    }

    if token.starts_with("J_Bip_") {
        if let Some(id) = bip_to_role(token).and_then(|role| character.bone(role)) {
            return Some(id);
        }
    }

    let alternates = LOOKUP_ALTERNATES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, alts)| *alts)
        .unwrap_or_default();
    if let Some(id) = alternates.iter().find_map(|alt| role_node(character, alt)) {
        return Some(id);
    }

    character.scene().find_by_name_ignore_case(token)
}

/// Create bones the clip writes to but the character cannot resolve, when a
/// conventional parent exists. Returns the names of created bones.
pub fn create_missing_animation_bones(
    character: &mut HumanoidCharacter,
    clip: &AnimationClip,
) -> Vec<String> {
    let mut created = Vec::new();

    for token in clip.bone_tokens() {
        if find_bone(character, token).is_some() {
            continue;
        }
        let Some((_, parent_name)) = CONVENTIONAL_PARENTS.iter().find(|(child, _)| *child == token)
        else {
            continue;
        };
        let Some(parent) = find_bone(character, parent_name) else {
            continue;
        };

        character
            .scene_mut()
            .add_bone(token, parent, SYNTHESIZED_BONE_OFFSET);
        tracing::info!("Created missing bone {:?} as child of {:?}", token, parent_name);
        created.push(token.to_string());
    }

    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::Track;
    use crate::avatar::character::tests::standard_character;
    use crate::scene::SceneGraph;

    #[test]
    fn test_bip_table_covers_fingers() {
        let table = bip_table();
        assert_eq!(table.len(), 21 + 30);
        assert!(table.contains(&(
            "J_Bip_R_Little3".to_string(),
            BoneRole::Finger(Side::Right, Finger::Little, FingerJoint::Distal)
        )));
    }

    #[test]
    fn test_find_bone_order() {
        let character = standard_character();
        let upper_arm = character.bone(BoneRole::RightUpperArm);
        assert_eq!(find_bone(&character, "rightUpperArm"), upper_arm);
        assert_eq!(find_bone(&character, "J_Bip_R_UpperArm"), upper_arm);
        assert_eq!(find_bone(&character, "rightArm"), upper_arm);
        // scene fallback, case-insensitive
        assert_eq!(find_bone(&character, "lefttoes"), character.bone(BoneRole::LeftToes));
        assert!(find_bone(&character, "tail").is_none());
    }

    #[test]
    fn test_create_missing_animation_bones() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let hips = scene.add_bone("Hips", root, Vec3::Y);
        let thigh = scene.add_bone("Thigh_R", hips, Vec3::X * 0.1);
        let mut character = HumanoidCharacter::new("legs", scene);
        character.set_bone(BoneRole::Hips, hips);
        character.set_bone(BoneRole::RightUpperLeg, thigh);

        let clip = AnimationClip::new(
            "kick",
            1.0,
            vec![
                Track::quaternion("rightLeg", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]),
                Track::quaternion("leftForeArm", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]),
                Track::quaternion("rightUpLeg", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]),
            ],
        );
        let created = create_missing_animation_bones(&mut character, &clip);
        // rightUpLeg resolves through its alternate, leftForeArm has no parent
        assert_eq!(created, vec!["rightLeg".to_string()]);

        let id = character.scene().find_by_name("rightLeg").unwrap();
        assert_eq!(character.scene().parent(id), Some(thigh));
        assert_eq!(character.scene().node(id).unwrap().translation, Vec3::new(0.0, -0.1, 0.0));

        // second pass finds it through the scene search
        assert!(create_missing_animation_bones(&mut character, &clip).is_empty());
    }
}
