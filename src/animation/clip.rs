//! Keyframe tracks and animation clips.

use serde::Serialize;

/// Property written by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// xyzw rotation, 4 components per keyframe
    Quaternion,
    /// translation, 3 components
    Position,
    /// scale, 3 components
    Scale,
}

impl TrackKind {
    pub fn components(self) -> usize {
        match self {
            TrackKind::Quaternion => 4,
            TrackKind::Position | TrackKind::Scale => 3,
        }
    }

    /// Property suffix used in track names
    pub fn property(self) -> &'static str {
        match self {
            TrackKind::Quaternion => "quaternion",
            TrackKind::Position => "position",
            TrackKind::Scale => "scale",
        }
    }
}

/// One animated property of one node. `name` is `"<bone>.<property>"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind, times: Vec<f32>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            kind,
            times,
            values,
        }
    }

    pub fn quaternion(bone: &str, times: Vec<f32>, values: Vec<f32>) -> Self {
        Self::new(format!("{bone}.quaternion"), TrackKind::Quaternion, times, values)
    }

    /// Split the name into (bone token, property). Bone names may themselves
    /// contain dots, so the split is on the last one.
    pub fn split_name(&self) -> Option<(&str, &str)> {
        self.name.rsplit_once('.')
    }

    /// Bone token, or the whole name when it has no property suffix
    pub fn bone(&self) -> &str {
        self.split_name().map(|(bone, _)| bone).unwrap_or(&self.name)
    }

    /// Same samples, different target bone
    pub fn retargeted(&self, bone: &str) -> Self {
        let property = self
            .split_name()
            .map(|(_, p)| p)
            .unwrap_or(self.kind.property());
        Self {
            name: format!("{bone}.{property}"),
            ..self.clone()
        }
    }

    pub fn keyframe_count(&self) -> usize {
        self.times.len()
    }

    /// Non-empty, finite, and value count consistent with the keyframe count.
    pub fn is_valid(&self) -> bool {
        !self.times.is_empty()
            && !self.values.is_empty()
            && self.times.iter().all(|t| t.is_finite())
            && self.values.iter().all(|v| v.is_finite())
            && self.values.len() == self.times.len() * self.kind.components()
    }

    /// Keyframe `i` as a slice of `components` values
    pub fn keyframe(&self, i: usize) -> &[f32] {
        let n = self.kind.components();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn keyframe_mut(&mut self, i: usize) -> &mut [f32] {
        let n = self.kind.components();
        &mut self.values[i * n..(i + 1) * n]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    pub const FALLBACK_NAME: &'static str = "wave";

    pub fn new(name: impl Into<String>, duration: f32, tracks: Vec<Track>) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Duration from the last keyframe of any track
    pub fn from_tracks(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|t| t.times.last().copied())
            .fold(0.0f32, f32::max);
        Self::new(name, duration, tracks)
    }

    /// Two-second right arm wave played when an animation asset has nothing usable.
    pub fn fallback_wave() -> Self {
        let times = vec![0.0, 0.5, 1.0, 1.5, 2.0];
        #[rustfmt::skip]
        let values = vec![
            0.0, 0.0, 0.0, 1.0,
            0.3826834, 0.0, 0.0, 0.9238795,
            0.3826834, 0.1950903, 0.0, 0.9038795,
            0.3826834, -0.1950903, 0.0, 0.9038795,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self::new(
            Self::FALLBACK_NAME,
            2.0,
            vec![Track::quaternion("rightArm", times, values)],
        )
    }

    /// Drop malformed tracks. `None` when nothing valid is left.
    pub fn validated(self) -> Option<Self> {
        let total = self.tracks.len();
        let tracks: Vec<Track> = self
            .tracks
            .into_iter()
            .filter(|track| {
                let ok = track.is_valid();
                if !ok {
                    tracing::warn!("Skipping invalid track {} in animation {}", track.name, self.name);
                }
                ok
            })
            .collect();

        if tracks.is_empty() {
            tracing::warn!("Animation {} has no valid tracks ({} dropped)", self.name, total);
            return None;
        }
        Some(Self { tracks, ..self })
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    /// Whether some track writes the rotation of `bone`
    pub fn has_rotation_track(&self, bone: &str) -> bool {
        self.tracks
            .iter()
            .any(|t| t.kind == TrackKind::Quaternion && t.bone() == bone)
    }

    /// Unique bone tokens in track order
    pub fn bone_tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = Vec::new();
        for track in &self.tracks {
            if let Some((bone, _)) = track.split_name() {
                if !tokens.contains(&bone) {
                    tokens.push(bone);
                }
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_on_last_dot() {
        let track = Track::quaternion("hand.L", vec![0.0], vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(track.split_name(), Some(("hand.L", "quaternion")));
        assert_eq!(track.retargeted("LeftHand").name, "LeftHand.quaternion");
    }

    #[test]
    fn test_fallback_wave_shape() {
        let clip = AnimationClip::fallback_wave();
        assert_eq!(clip.name, "wave");
        assert_eq!(clip.duration, 2.0);
        assert_eq!(clip.tracks.len(), 1);
        assert_eq!(clip.tracks[0].name, "rightArm.quaternion");
        assert!(clip.tracks[0].is_valid());
    }

    #[test]
    fn test_validation_drops_bad_tracks() {
        let good = Track::quaternion("hips", vec![0.0, 1.0], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let nan = Track::quaternion("spine", vec![0.0], vec![f32::NAN, 0.0, 0.0, 1.0]);
        let empty = Track::quaternion("chest", vec![], vec![]);
        let short = Track::new("neck.position", TrackKind::Position, vec![0.0, 1.0], vec![0.0; 3]);

        let clip = AnimationClip::new("idle", 1.0, vec![good.clone(), nan, empty, short]);
        let clip = clip.validated().unwrap();
        assert_eq!(clip.tracks, vec![good]);

        let broken = AnimationClip::new("broken", 1.0, vec![Track::quaternion("a", vec![], vec![])]);
        assert!(broken.validated().is_none());
    }

    #[test]
    fn test_from_tracks_duration() {
        let clip = AnimationClip::from_tracks(
            "x",
            vec![
                Track::quaternion("a", vec![0.0, 1.5], vec![0.0; 8]),
                Track::new("b.position", TrackKind::Position, vec![0.0, 2.5], vec![0.0; 6]),
            ],
        );
        assert_eq!(clip.duration, 2.5);
        assert_eq!(clip.bone_tokens(), vec!["a", "b"]);
    }
}
