//! Hand-track repair after retargeting.
//!
//! Clips from other rigs often animate hands under names the retarget table
//! does not know. Such rotation tracks are redirected to the character's own
//! hand bones, and any hand still without a rotation track gets a neutral one
//! so it never inherits an arbitrary pose.

use super::clip::{AnimationClip, Track, TrackKind};
use crate::avatar::HumanoidCharacter;
use crate::humanoid::bone::{BoneRole, Side};

const HAND_KEYWORDS: [&str; 15] = [
    "hand", "wrist", "palm", "finger", "thumb", "index", "middle", "ring", "little", "pinky",
    "te_", "te.", "hand_", "wrist_", "finger_",
];

const LEFT_ALIASES: [&str; 13] = [
    "lefthand", "left_hand", "hand_l", "handl", "l_hand", "lhand", "left.hand", "leftwrist",
    "left_wrist", "wrist_l", "wristl", "l_wrist", "lwrist",
];

const RIGHT_ALIASES: [&str; 13] = [
    "righthand", "right_hand", "hand_r", "handr", "r_hand", "rhand", "right.hand", "rightwrist",
    "right_wrist", "wrist_r", "wristr", "r_wrist", "rwrist",
];

/// What the repair pass changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandRepair {
    /// (old track name, new track name)
    pub redirected: Vec<(String, String)>,
    /// Hand bones that received a neutral track
    pub neutral: Vec<String>,
}

pub fn is_hand_related(track_name: &str) -> bool {
    let lower = track_name.to_lowercase();
    HAND_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn side_from_aliases(token: &str, left: bool, right: bool) -> Option<Side> {
    let aliases = LEFT_ALIASES
        .iter()
        .filter(|_| left)
        .map(|a| (*a, Side::Left))
        .chain(RIGHT_ALIASES.iter().filter(|_| right).map(|a| (*a, Side::Right)));

    let mut partial = None;
    for (alias, side) in aliases {
        if token == alias {
            return Some(side);
        }
        if partial.is_none() && (token.contains(alias) || alias.contains(token)) {
            partial = Some(side);
        }
    }
    partial
}

fn side_from_cues(token: &str) -> Option<Side> {
    let cue = |word: &str, letter: char| {
        token.contains(word)
            || token.contains(&format!("{letter}_"))
            || token.contains(&format!("_{letter}"))
            || token.starts_with(letter)
            || token.ends_with(letter)
    };
    if cue("left", 'l') {
        Some(Side::Left)
    } else if cue("right", 'r') {
        Some(Side::Right)
    } else {
        None
    }
}

/// Decide which hand a lowercase bone token most likely refers to.
pub fn guess_side(token: &str, left: bool, right: bool) -> Option<Side> {
    side_from_aliases(token, left, right).or_else(|| {
        side_from_cues(token).filter(|side| match side {
            Side::Left => left,
            Side::Right => right,
        })
    })
}

fn neutral_track(hand: &str, duration: f32) -> Track {
    Track::quaternion(
        hand,
        vec![0.0, duration],
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    )
}

/// Redirect stray hand rotation tracks and guarantee each resolved hand has
/// exactly one rotation track.
pub fn fix_hands(character: &HumanoidCharacter, clip: &mut AnimationClip) -> HandRepair {
    let mut repair = HandRepair::default();
    let left = character.bone_name(BoneRole::hand(Side::Left)).map(str::to_string);
    let right = character.bone_name(BoneRole::hand(Side::Right)).map(str::to_string);

    if left.is_none() && right.is_none() {
        tracing::warn!("No hand bones found on {}", character.name());
        return repair;
    }
    let hand_name = |side: Side| match side {
        Side::Left => left.as_deref(),
        Side::Right => right.as_deref(),
    };

    let candidates: Vec<usize> = clip
        .tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TrackKind::Quaternion && is_hand_related(&t.name))
        .filter(|(_, t)| character.scene().find_by_name(t.bone()).is_none())
        .map(|(i, _)| i)
        .collect();
    tracing::debug!("{} stray hand tracks in {}", candidates.len(), clip.name);

    for i in candidates {
        let token = clip.tracks[i].bone().to_lowercase();
        let Some(side) = guess_side(&token, left.is_some(), right.is_some()) else {
            tracing::debug!("No hand matches track {}", clip.tracks[i].name);
            continue;
        };
        let Some(target) = hand_name(side) else {
            continue;
        };
        if clip.has_rotation_track(target) {
            tracing::debug!(
                "{} already has a rotation track, leaving {}",
                target,
                clip.tracks[i].name
            );
            continue;
        }

        let redirected = clip.tracks[i].retargeted(target);
        tracing::debug!("Remapped {} to {}", clip.tracks[i].name, redirected.name);
        repair
            .redirected
            .push((clip.tracks[i].name.clone(), redirected.name.clone()));
        clip.tracks[i] = redirected;
    }

    for side in Side::ALL {
        let Some(hand) = hand_name(side) else {
            continue;
        };
        if !clip.has_rotation_track(hand) {
            clip.tracks.push(neutral_track(hand, clip.duration));
            tracing::debug!("Created neutral hand track for {}", hand);
            repair.neutral.push(hand.to_string());
        }
    }

    repair
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::character::tests::standard_character;
    use pretty_assertions::assert_eq;

    fn identity_track(bone: &str) -> Track {
        Track::quaternion(bone, vec![0.0, 1.0], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    #[test]
    fn test_neutral_tracks_for_handless_clip() {
        let character = standard_character();
        let mut clip = AnimationClip::new("nod", 1.5, vec![identity_track("Head")]);

        let repair = fix_hands(&character, &mut clip);
        assert_eq!(repair.neutral, vec!["LeftHand".to_string(), "RightHand".to_string()]);
        assert_eq!(clip.tracks.len(), 3);

        for (track, hand) in clip.tracks[1..].iter().zip(["LeftHand", "RightHand"]) {
            assert_eq!(track.name, format!("{hand}.quaternion"));
            assert_eq!(track.times, vec![0.0, 1.5]);
            assert_eq!(track.values, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_redirects_stray_hand_tracks() {
        let character = standard_character();
        let mut clip = AnimationClip::new(
            "grab",
            1.0,
            vec![identity_track("hand_L"), identity_track("mixamorig_RightWrist")],
        );

        let repair = fix_hands(&character, &mut clip);
        assert_eq!(
            repair.redirected,
            vec![
                ("hand_L.quaternion".to_string(), "LeftHand.quaternion".to_string()),
                (
                    "mixamorig_RightWrist.quaternion".to_string(),
                    "RightHand.quaternion".to_string()
                ),
            ]
        );
        assert!(repair.neutral.is_empty());
        assert_eq!(clip.tracks.len(), 2);
    }

    #[test]
    fn test_never_adds_second_hand_track() {
        let character = standard_character();
        let mut clip = AnimationClip::new(
            "grab",
            1.0,
            vec![identity_track("LeftHand"), identity_track("l_wrist")],
        );

        let repair = fix_hands(&character, &mut clip);
        assert!(repair.redirected.is_empty());
        assert_eq!(repair.neutral, vec!["RightHand".to_string()]);
        let left: Vec<_> = clip
            .tracks
            .iter()
            .filter(|t| t.name == "LeftHand.quaternion")
            .collect();
        assert_eq!(left.len(), 1);
    }

    #[test]
    fn test_guess_side() {
        assert_eq!(guess_side("lefthand", true, true), Some(Side::Left));
        assert_eq!(guess_side("wrist.r", true, true), Some(Side::Right));
        assert_eq!(guess_side("te_r", true, true), Some(Side::Right));
        // only the right hand exists
        assert_eq!(guess_side("lhand", false, true), None);
    }
}
