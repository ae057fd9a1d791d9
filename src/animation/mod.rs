//! Animation clips, retargeting and playback.
//!
//! [`prepare_clip`] turns a clip authored for some other rig into one that
//! targets the character's own bones:
//!
//! 1. synthesize conventional bones the clip writes to but the rig lacks
//! 2. retarget track names
//! 3. repair hand tracks
//! 4. the "wave" arm rewrite

pub mod clip;
pub mod hands;
pub mod names;
pub mod player;
pub mod retarget;
pub mod wave;

pub use clip::{AnimationClip, Track, TrackKind};
pub use player::{AnimationPlayer, LoopMode, PlayerEvent, Pose};
pub use retarget::{animated_roles, retarget_animation, RetargetedClip};

use crate::avatar::HumanoidCharacter;
use crate::humanoid::bone::BoneRole;

/// A clip ready to play on one character, with what was done to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedClip {
    pub clip: AnimationClip,
    pub created_bones: Vec<String>,
    pub unmapped: Vec<String>,
    pub hands: hands::HandRepair,
    pub wave_rewritten: bool,
    /// Humanoid roles the final clip writes to
    pub animated_roles: Vec<BoneRole>,
}

pub fn prepare_clip(character: &mut HumanoidCharacter, source: &AnimationClip) -> PreparedClip {
    let created_bones = names::create_missing_animation_bones(character, source);
    let RetargetedClip { mut clip, unmapped } = retarget_animation(character, source);
    let hands = hands::fix_hands(character, &mut clip);
    let wave_rewritten = wave::keep_arms_down(character, &mut clip);
    let animated_roles = animated_roles(character, &clip);

    tracing::debug!(
        "Prepared {}: {} tracks, {} roles animated, {} unmapped, {} hand tracks redirected",
        clip.name,
        clip.tracks.len(),
        animated_roles.len(),
        unmapped.len(),
        hands.redirected.len()
    );

    PreparedClip {
        clip,
        created_bones,
        unmapped,
        hands,
        wave_rewritten,
        animated_roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::character::tests::standard_character;

    #[test]
    fn test_prepare_fallback_wave() {
        let mut character = standard_character();
        let prepared = prepare_clip(&mut character, &AnimationClip::fallback_wave());

        assert!(prepared.created_bones.is_empty());
        assert!(prepared.unmapped.is_empty());
        assert!(prepared.wave_rewritten);
        assert_eq!(prepared.hands.neutral.len(), 2);
        assert_eq!(
            prepared.animated_roles,
            vec![BoneRole::LeftHand, BoneRole::RightUpperArm, BoneRole::RightHand]
        );

        // rightArm resolved to the upper arm, which the wave rewrite then owns
        let names: Vec<&str> = prepared.clip.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "RightUpperArm.quaternion",
                "LeftHand.quaternion",
                "RightHand.quaternion"
            ]
        );
        let arm = &prepared.clip.tracks[0];
        assert_eq!(arm.times.len(), 5);
        assert!(glam::Quat::from_slice(arm.keyframe(1)).abs_diff_eq(wave::wave_rotation(0.5), 1e-6));
    }
}
