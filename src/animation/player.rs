//! Single-action animation player.
//!
//! At most one action is current. [`AnimationPlayer::switch_to`] stops the
//! previous action before the new one starts, so no two clips ever blend.

use glam::{Quat, Vec3};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::clip::{AnimationClip, Track, TrackKind};
use crate::scene::SceneGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Repeat,
    Once,
}

/// A clip being played
#[derive(Debug, Clone)]
pub struct Action {
    clip: Arc<AnimationClip>,
    time: f32,
    loop_mode: LoopMode,
    finished: bool,
}

impl Action {
    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn name(&self) -> &str {
        &self.clip.name
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A `LoopMode::Once` action reached its end
    Finished { clip: String },
}

/// Sampled transform of one bone. `None` components are not animated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoneTransform {
    pub rotation: Option<Quat>,
    pub translation: Option<Vec3>,
    pub scale: Option<Vec3>,
}

/// Per-bone transforms keyed by scene bone name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub bones: BTreeMap<String, BoneTransform>,
}

impl Pose {
    pub fn rotation(&self, bone: &str) -> Option<Quat> {
        self.bones.get(bone).and_then(|b| b.rotation)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Write into matching scene nodes. Returns how many bones were found.
    pub fn apply(&self, scene: &mut SceneGraph) -> usize {
        let index: HashMap<String, _> = scene
            .traverse()
            .into_iter()
            .rev()
            .map(|id| (scene.name(id).to_string(), id))
            .collect();

        let mut applied = 0;
        for (name, transform) in &self.bones {
            let Some(node) = index.get(name).and_then(|id| scene.node_mut(*id)) else {
                continue;
            };
            if let Some(r) = transform.rotation {
                node.rotation = r;
            }
            if let Some(t) = transform.translation {
                node.translation = t;
            }
            if let Some(s) = transform.scale {
                node.scale = s;
            }
            applied += 1;
        }
        applied
    }
}

/// Index of the keyframe at or before `t`, and the blend factor to the next.
fn locate(times: &[f32], t: f32) -> (usize, usize, f32) {
    let last = times.len() - 1;
    if t <= times[0] {
        return (0, 0, 0.0);
    }
    if t >= times[last] {
        return (last, last, 0.0);
    }
    let next = times.partition_point(|k| *k <= t);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let alpha = if span > 0.0 { (t - times[prev]) / span } else { 0.0 };
    (prev, next, alpha)
}

/// Sample a track at time `t`, clamping outside the keyframe range.
pub fn sample_track(track: &Track, t: f32) -> Option<BoneTransform> {
    if !track.is_valid() {
        return None;
    }
    let (a, b, alpha) = locate(&track.times, t);
    let mut out = BoneTransform::default();
    match track.kind {
        TrackKind::Quaternion => {
            let qa = Quat::from_slice(track.keyframe(a)).normalize();
            let qb = Quat::from_slice(track.keyframe(b)).normalize();
            out.rotation = Some(qa.slerp(qb, alpha));
        }
        TrackKind::Position => {
            let va = Vec3::from_slice(track.keyframe(a));
            let vb = Vec3::from_slice(track.keyframe(b));
            out.translation = Some(va.lerp(vb, alpha));
        }
        TrackKind::Scale => {
            let va = Vec3::from_slice(track.keyframe(a));
            let vb = Vec3::from_slice(track.keyframe(b));
            out.scale = Some(va.lerp(vb, alpha));
        }
    }
    Some(out)
}

/// Sample every track of `clip` at time `t`.
pub fn sample_clip(clip: &AnimationClip, t: f32) -> Pose {
    let mut pose = Pose::default();
    for track in &clip.tracks {
        let Some(sample) = sample_track(track, t) else {
            continue;
        };
        let entry = pose.bones.entry(track.bone().to_string()).or_default();
        entry.rotation = sample.rotation.or(entry.rotation);
        entry.translation = sample.translation.or(entry.translation);
        entry.scale = sample.scale.or(entry.scale);
    }
    pose
}

#[derive(Debug, Default)]
pub struct AnimationPlayer {
    current: Option<Action>,
}

impl AnimationPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Action> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|a| !a.finished)
    }

    /// Stop whatever is playing and start `clip` from zero.
    /// Returns the stopped action.
    pub fn switch_to(&mut self, clip: Arc<AnimationClip>, loop_mode: LoopMode) -> Option<Action> {
        let previous = self.stop();
        tracing::info!("Playing animation {:?} ({:?})", clip.name, loop_mode);
        self.current = Some(Action {
            clip,
            time: 0.0,
            loop_mode,
            finished: false,
        });
        previous
    }

    pub fn stop(&mut self) -> Option<Action> {
        let previous = self.current.take();
        if let Some(action) = &previous {
            tracing::debug!("Stopped animation {:?}", action.name());
        }
        previous
    }

    /// Advance the current action by `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> Option<PlayerEvent> {
        let action = self.current.as_mut()?;
        if action.finished {
            return None;
        }

        let duration = action.clip.duration;
        action.time += dt.max(0.0);
        match action.loop_mode {
            LoopMode::Repeat => {
                if duration > 0.0 {
                    action.time %= duration;
                }
                None
            }
            LoopMode::Once => {
                if action.time >= duration {
                    // clamp on the last frame
                    action.time = duration;
                    action.finished = true;
                    Some(PlayerEvent::Finished {
                        clip: action.clip.name.clone(),
                    })
                } else {
                    None
                }
            }
        }
    }

    pub fn sample(&self) -> Option<Pose> {
        self.current.as_ref().map(|a| sample_clip(&a.clip, a.time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn turn_clip(name: &str) -> Arc<AnimationClip> {
        let end = Quat::from_rotation_y(FRAC_PI_2);
        let values = [Quat::IDENTITY.to_array(), end.to_array()].concat();
        Arc::new(AnimationClip::new(
            name,
            1.0,
            vec![
                Track::quaternion("Head", vec![0.0, 1.0], values),
                Track::new("Hips.position", TrackKind::Position, vec![0.0, 1.0], vec![0.0, 1.0, 0.0, 0.0, 2.0, 0.0]),
            ],
        ))
    }

    #[test]
    fn test_at_most_one_action() {
        let mut player = AnimationPlayer::new();
        assert!(player.switch_to(turn_clip("a"), LoopMode::Repeat).is_none());
        let previous = player.switch_to(turn_clip("b"), LoopMode::Repeat).unwrap();
        assert_eq!(previous.name(), "a");
        assert_eq!(player.current().unwrap().name(), "b");
    }

    #[test]
    fn test_sampling_interpolates() {
        let mut player = AnimationPlayer::new();
        player.switch_to(turn_clip("turn"), LoopMode::Repeat);
        player.advance(0.5);

        let pose = player.sample().unwrap();
        let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.5);
        assert!(pose.rotation("Head").unwrap().abs_diff_eq(expected, 1e-5));
        let hips = pose.bones["Hips"].translation.unwrap();
        assert!((hips - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_repeat_wraps_and_once_finishes() {
        let mut player = AnimationPlayer::new();
        player.switch_to(turn_clip("loop"), LoopMode::Repeat);
        assert!(player.advance(1.25).is_none());
        assert!((player.current().unwrap().time() - 0.25).abs() < 1e-6);

        player.switch_to(turn_clip("once"), LoopMode::Once);
        assert!(player.advance(0.6).is_none());
        assert_eq!(
            player.advance(0.6),
            Some(PlayerEvent::Finished { clip: "once".to_string() })
        );
        assert!(!player.is_playing());
        assert!(player.advance(0.1).is_none());
        let pose = player.sample().unwrap();
        assert!(pose.rotation("Head").unwrap().abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2), 1e-5));
    }

    #[test]
    fn test_pose_apply_to_scene() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let head = scene.add_bone("Head", root, Vec3::Y);
        let pose = sample_clip(&turn_clip("turn"), 1.0);
        assert_eq!(pose.apply(&mut scene), 1);
        let rotation = scene.node(head).unwrap().rotation;
        assert!(rotation.abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2), 1e-5));
    }
}
