//! Rewrite track targets from foreign bone names to the character's own.

use std::collections::HashMap;

use super::clip::AnimationClip;
use super::names::{bip_table, RETARGET_ALTERNATES};
use crate::avatar::HumanoidCharacter;
use crate::humanoid::bone::BoneRole;

/// Foreign bone token → actual scene bone name
#[derive(Debug, Clone, Default)]
pub struct BoneNameTable {
    names: HashMap<String, String>,
}

impl BoneNameTable {
    /// Build the table for one character.
    ///
    /// Role names (as written, lowercase, snake_case) come first. Alternate
    /// segment names and "J_Bip_" names are layered on top but never replace
    /// an entry that is already present.
    pub fn for_character(character: &HumanoidCharacter) -> Self {
        let mut names: HashMap<String, String> = HashMap::new();

        for (role, _) in character.bone_map() {
            let Some(actual) = character.bone_name(*role) else {
                continue;
            };
            let role_name = role.name();
            names.insert(role_name.to_string(), actual.to_string());
            names.insert(role_name.to_lowercase(), actual.to_string());
            names.insert(role.snake_name(), actual.to_string());
        }

        for (common, alternates) in RETARGET_ALTERNATES {
            let target = alternates.iter().find_map(|alt| names.get(*alt).cloned());
            if let Some(actual) = target {
                names.entry(common.to_string()).or_insert_with(|| actual.clone());
                names.entry(common.to_lowercase()).or_insert(actual);
            }
        }

        for (bip, role) in bip_table() {
            if names.contains_key(&bip) {
                continue;
            }
            if let Some(actual) = character.bone_name(role) {
                names.insert(bip, actual.to_string());
            } else if character.scene().find_by_name(&bip).is_some() {
                names.insert(bip.clone(), bip);
            }
        }

        Self { names }
    }

    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.names.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Retargeted clip plus the bone tokens that had no mapping
#[derive(Debug, Clone, PartialEq)]
pub struct RetargetedClip {
    pub clip: AnimationClip,
    pub unmapped: Vec<String>,
}

/// Retarget every track of `clip` onto the character.
///
/// Resolved tracks get the actual bone name with identical samples.
/// Unresolved tracks are kept unchanged and their bone token is reported.
pub fn retarget_animation(character: &HumanoidCharacter, clip: &AnimationClip) -> RetargetedClip {
    let table = BoneNameTable::for_character(character);
    let mut unmapped: Vec<String> = Vec::new();
    let mut tracks = Vec::with_capacity(clip.tracks.len());

    for track in &clip.tracks {
        // a name without a property suffix is an unresolvable token as a whole
        let bone = track.bone();
        let resolved = track
            .split_name()
            .and_then(|(bone, _)| table.resolve(bone));
        match resolved {
            Some(actual) => tracks.push(track.retargeted(actual)),
            None => {
                if !unmapped.iter().any(|u| u == bone) {
                    unmapped.push(bone.to_string());
                }
                tracks.push(track.clone());
            }
        }
    }

    if !unmapped.is_empty() {
        tracing::warn!("Unmapped bones in animation {}: {:?}", clip.name, unmapped);
    }

    RetargetedClip {
        clip: AnimationClip::new(clip.name.clone(), clip.duration, tracks),
        unmapped,
    }
}

/// Roles whose actual bone appears as a track target in `clip`
pub fn animated_roles(character: &HumanoidCharacter, clip: &AnimationClip) -> Vec<BoneRole> {
    character
        .bone_map()
        .keys()
        .copied()
        .filter(|role| {
            character
                .bone_name(*role)
                .is_some_and(|name| clip.tracks.iter().any(|t| t.bone() == name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::{Track, TrackKind};
    use crate::avatar::character::tests::standard_character;
    use crate::scene::SceneGraph;
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    fn numbered_arm() -> HumanoidCharacter {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let shoulder = scene.add_bone("Bone_002", root, Vec3::X * 0.1);
        let upper = scene.add_bone("Bone_003", shoulder, Vec3::X * 0.1);
        let lower = scene.add_bone("Bone_004", upper, Vec3::X * 0.25);
        let mut character = HumanoidCharacter::new("numbered", scene);
        character.set_bone(BoneRole::RightShoulder, shoulder);
        character.set_bone(BoneRole::RightUpperArm, upper);
        character.set_bone(BoneRole::RightLowerArm, lower);
        character
    }

    #[test]
    fn test_retarget_foreign_segment_names() {
        let character = numbered_arm();
        let arm = Track::quaternion("rightArm", vec![0.0, 1.0], vec![0.0, 0.0, 0.0, 1.0, 0.1, 0.0, 0.0, 0.995]);
        let fore = Track::quaternion("rightForeArm", vec![0.0, 0.5], vec![0.0, 0.2, 0.0, 0.98, 0.0, 0.0, 0.0, 1.0]);
        let clip = AnimationClip::new("reach", 1.0, vec![arm.clone(), fore.clone()]);

        let result = retarget_animation(&character, &clip);
        assert!(result.unmapped.is_empty());

        let names: Vec<&str> = result.clip.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Bone_003.quaternion", "Bone_004.quaternion"]);
        assert_eq!(result.clip.tracks[0].times, arm.times);
        assert_eq!(result.clip.tracks[0].values, arm.values);
        assert_eq!(result.clip.tracks[1].times, fore.times);
        assert_eq!(result.clip.tracks[1].values, fore.values);
    }

    #[test]
    fn test_role_name_variants() {
        let character = standard_character();
        let table = BoneNameTable::for_character(&character);
        assert_eq!(table.resolve("leftUpperArm"), Some("LeftUpperArm"));
        assert_eq!(table.resolve("leftupperarm"), Some("LeftUpperArm"));
        assert_eq!(table.resolve("left_upper_arm"), Some("LeftUpperArm"));
        assert_eq!(table.resolve("J_Bip_L_UpperArm"), Some("LeftUpperArm"));
        // role name wins over the "spine" alternate list
        assert_eq!(table.resolve("spine"), Some("Spine"));
        // first present alternate wins
        assert_eq!(table.resolve("leftArm"), Some("LeftUpperArm"));
    }

    #[test]
    fn test_bip_scene_fallback() {
        let mut character = standard_character();
        let hand = character.bone(BoneRole::LeftHand).unwrap();
        character.scene_mut().add_bone("J_Bip_L_Index1", hand, Vec3::X * 0.05);

        let table = BoneNameTable::for_character(&character);
        assert_eq!(table.resolve("J_Bip_L_Index1"), Some("J_Bip_L_Index1"));
        assert_eq!(table.resolve("J_Bip_L_Index2"), None);
    }

    #[test]
    fn test_unmapped_tracks_kept() {
        let character = standard_character();
        let tail = Track::new("Tail.position", TrackKind::Position, vec![0.0], vec![0.0, 1.0, 0.0]);
        let hips = Track::quaternion("hips", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]);
        let clip = AnimationClip::new("swish", 1.0, vec![tail.clone(), hips, tail.clone()]);

        let result = retarget_animation(&character, &clip);
        assert_eq!(result.unmapped, vec!["Tail".to_string()]);
        assert_eq!(result.clip.tracks.len(), 3);
        assert_eq!(result.clip.tracks[0], tail);
        assert_eq!(result.clip.tracks[1].name, "Hips.quaternion");
        assert_eq!(animated_roles(&character, &result.clip), vec![BoneRole::Hips]);
    }

    #[test]
    fn test_track_without_property_is_kept() {
        let character = standard_character();
        let bare = Track::new("hips", TrackKind::Quaternion, vec![0.0], vec![0.0, 0.0, 0.0, 1.0]);
        let clip = AnimationClip::new("bare", 1.0, vec![bare.clone()]);

        let result = retarget_animation(&character, &clip);
        assert_eq!(result.clip.tracks, vec![bare]);
        assert_eq!(result.unmapped, vec!["hips".to_string()]);
    }
}
