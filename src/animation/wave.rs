//! Arm pose rewrite for clips whose name contains "wave".
//!
//! The bundled wave raises both arms. The left upper arm is pinned to
//! identity and the right upper arm gets a gentle side-to-side wave.

use glam::Quat;
use std::f32::consts::TAU;

use super::clip::{AnimationClip, Track, TrackKind};
use crate::avatar::HumanoidCharacter;
use crate::humanoid::bone::{BoneRole, Side};

/// Constant X lift of the waving arm, radians
pub const WAVE_LIFT: f32 = -0.2;
/// Peak Y swing of the waving arm, radians
pub const WAVE_AMPLITUDE: f32 = 0.3;

const SYNTHESIZED_TIMES: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Case-insensitive "wave" substring check.
pub fn is_wave_clip(name: &str) -> bool {
    name.to_lowercase().contains("wave")
}

/// Waving arm rotation at clip time `t`; the swing repeats every second.
pub fn wave_rotation(t: f32) -> Quat {
    let phase = t % 1.0;
    let swing = (phase * TAU).sin() * WAVE_AMPLITUDE;
    Quat::from_rotation_x(WAVE_LIFT) * Quat::from_rotation_y(swing)
}

fn targets_upper_arm(track: &Track, bone: Option<&str>, role: BoneRole) -> bool {
    if track.kind != TrackKind::Quaternion {
        return false;
    }
    let by_bone = bone.is_some_and(|b| track.name.starts_with(&format!("{b}.quaternion")));
    by_bone || track.name.contains(&format!("{}.quaternion", role.name()))
}

/// Apply the wave rewrite when `clip` is a wave clip. Returns whether it did.
pub fn keep_arms_down(character: &HumanoidCharacter, clip: &mut AnimationClip) -> bool {
    let left_role = BoneRole::upper_arm(Side::Left);
    let right_role = BoneRole::upper_arm(Side::Right);
    let left = character.bone_name(left_role);
    let right = character.bone_name(right_role);

    if left.is_none() && right.is_none() {
        return false;
    }
    if !is_wave_clip(&clip.name) {
        return false;
    }
    tracing::info!("Clip {:?} matched \"wave\", rewriting upper arm tracks", clip.name);

    let mut right_found = false;
    for track in clip.tracks.iter_mut() {
        if targets_upper_arm(track, left, left_role) {
            for i in 0..track.keyframe_count() {
                track.keyframe_mut(i).copy_from_slice(&[0.0, 0.0, 0.0, 1.0]);
            }
        } else if targets_upper_arm(track, right, right_role) {
            right_found = true;
            for i in 0..track.keyframe_count() {
                let q = wave_rotation(track.times[i]);
                track.keyframe_mut(i).copy_from_slice(&q.to_array());
            }
        }
    }

    if let (Some(bone), false) = (right, right_found) {
        let values = SYNTHESIZED_TIMES
            .iter()
            .flat_map(|t| wave_rotation(*t).to_array())
            .collect();
        clip.tracks
            .push(Track::quaternion(bone, SYNTHESIZED_TIMES.to_vec(), values));
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::character::tests::standard_character;

    fn quat_at(track: &Track, i: usize) -> Quat {
        Quat::from_slice(track.keyframe(i))
    }

    #[test]
    fn test_wave_rewrite() {
        let character = standard_character();
        let raised = Quat::from_rotation_z(1.2).to_array();
        let left = Track::quaternion(
            "LeftUpperArm",
            vec![0.0, 0.5, 1.0],
            [raised, raised, raised].concat(),
        );
        let mut clip = AnimationClip::new("Wave01", 1.0, vec![left]);

        assert!(keep_arms_down(&character, &mut clip));

        let left = clip.track("LeftUpperArm.quaternion").unwrap();
        for i in 0..left.keyframe_count() {
            assert_eq!(left.keyframe(i), &[0.0, 0.0, 0.0, 1.0]);
        }

        let right = clip.track("RightUpperArm.quaternion").unwrap();
        assert_eq!(right.times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        for (i, t) in right.times.iter().enumerate() {
            let expected = Quat::from_rotation_x(-0.2)
                * Quat::from_rotation_y((t % 1.0 * TAU).sin() * 0.3);
            assert!(quat_at(right, i).abs_diff_eq(expected, 1e-6));
        }
        // quarter phase is the full swing
        let (_, angle_y, _) = quat_at(right, 1).to_euler(glam::EulerRot::XYZ);
        assert!((angle_y - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_existing_right_track_rewritten_in_place() {
        let character = standard_character();
        let right = Track::quaternion(
            "RightUpperArm",
            vec![0.0, 1.25],
            [Quat::IDENTITY.to_array(), Quat::IDENTITY.to_array()].concat(),
        );
        let mut clip = AnimationClip::new("big_WAVE", 1.25, vec![right]);
        keep_arms_down(&character, &mut clip);

        assert_eq!(clip.tracks.len(), 1);
        let track = &clip.tracks[0];
        assert_eq!(track.times, vec![0.0, 1.25]);
        assert!(quat_at(track, 1).abs_diff_eq(wave_rotation(0.25), 1e-6));
    }

    #[test]
    fn test_other_clips_untouched() {
        let character = standard_character();
        let left = Track::quaternion("LeftUpperArm", vec![0.0], Quat::from_rotation_z(1.0).to_array().to_vec());
        let mut clip = AnimationClip::new("dance", 1.0, vec![left.clone()]);
        assert!(!keep_arms_down(&character, &mut clip));
        assert_eq!(clip.tracks, vec![left]);
    }
}
