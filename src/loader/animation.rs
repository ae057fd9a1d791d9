//! Animation decoding (glTF / VRMA) with the fallback clip.

use std::collections::HashMap;
use std::path::Path;

use gltf::animation::util::ReadOutputs;
use gltf::animation::Interpolation;

use super::glb;
use crate::animation::{AnimationClip, Track, TrackKind};
use crate::error::LoadError;

/// Decode every animation in a glTF asset.
///
/// Tracks are named `"<node>.<property>"`. For VRM animations the node name
/// is replaced by the humanoid role it is bound to. Morph weight channels are
/// skipped. No validation happens here.
pub fn decode_animations(data: &[u8]) -> Result<Vec<AnimationClip>, LoadError> {
    let root = glb::parse_json(data)?;
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(data).map_err(|e| LoadError::Decode(e.to_string()))?;
    let buffers = gltf::import_buffers(&document, None, blob)
        .map_err(|e| LoadError::Decode(format!("buffer import failed: {}", e)))?;

    let humanoid: HashMap<usize, &'static str> = glb::vrma_bones(&root)
        .into_iter()
        .map(|(node, role)| (node, role.name()))
        .collect();
    let node_name = |node: &gltf::Node| -> String {
        if let Some(role) = humanoid.get(&node.index()) {
            return role.to_string();
        }
        node.name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()))
    };

    let mut clips = Vec::new();
    for animation in document.animations() {
        let mut tracks = Vec::new();
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
            let Some(times) = reader.read_inputs().map(|i| i.collect::<Vec<f32>>()) else {
                continue;
            };
            let (kind, values): (TrackKind, Vec<f32>) = match reader.read_outputs() {
                Some(ReadOutputs::Rotations(r)) => (TrackKind::Quaternion, r.into_f32().flatten().collect()),
                Some(ReadOutputs::Translations(t)) => (TrackKind::Position, t.flatten().collect()),
                Some(ReadOutputs::Scales(s)) => (TrackKind::Scale, s.flatten().collect()),
                Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
            };

            let values = if channel.sampler().interpolation() == Interpolation::CubicSpline {
                spline_values(&values, kind.components())
            } else {
                values
            };

            let target = node_name(&channel.target().node());
            tracks.push(Track::new(
                format!("{}.{}", target, kind.property()),
                kind,
                times,
                values,
            ));
        }

        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index()));
        clips.push(AnimationClip::from_tracks(name, tracks));
    }

    Ok(clips)
}

/// Keep the value of each (in-tangent, value, out-tangent) triple.
fn spline_values(values: &[f32], components: usize) -> Vec<f32> {
    values
        .chunks(components * 3)
        .flat_map(|triple| triple.iter().skip(components).take(components).copied())
        .collect()
}

/// Validate decoded clips, substituting the fallback wave when nothing
/// usable is left or decoding failed.
pub fn clips_or_fallback(decoded: Result<Vec<AnimationClip>, LoadError>) -> Vec<AnimationClip> {
    let clips = match decoded {
        Ok(clips) => clips,
        Err(e) => {
            tracing::error!("Animation decode failed: {}", e);
            return vec![AnimationClip::fallback_wave()];
        }
    };

    if clips.is_empty() {
        tracing::warn!("No animations found in asset, using fallback");
        return vec![AnimationClip::fallback_wave()];
    }

    let valid: Vec<AnimationClip> = clips.into_iter().filter_map(AnimationClip::validated).collect();
    if valid.is_empty() {
        tracing::warn!("No valid animations left after validation, using fallback");
        return vec![AnimationClip::fallback_wave()];
    }

    tracing::info!(
        "Loaded animations: {:?}",
        valid.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );
    valid
}

/// Load animation clips from a file. Never fails; see [`clips_or_fallback`].
pub async fn load_animation(path: &Path) -> Vec<AnimationClip> {
    tracing::info!("Loading animation from {}", path.display());
    let decoded = match super::read_asset(path).await {
        Ok(data) => decode_animations(&data),
        Err(e) => Err(e),
    };
    clips_or_fallback(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use serde_json::json;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// glTF JSON with one rotation channel and an embedded data URI buffer.
    fn animated_json(vrma: bool, rotation: &[f32]) -> serde_json::Value {
        let times = [0.0f32, 1.0];
        let mut bytes = floats(&times);
        bytes.extend(floats(rotation));
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        let mut root = json!({
            "asset": {"version": "2.0"},
            "nodes": [{"name": "mixamorig:RightArm"}],
            "buffers": [{"byteLength": bytes.len(), "uri": uri}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 8},
                {"buffer": 0, "byteOffset": 8, "byteLength": 32}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR",
                 "min": [0.0], "max": [1.0]},
                {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC4"}
            ],
            "animations": [{
                "name": "raise",
                "channels": [{"sampler": 0, "target": {"node": 0, "path": "rotation"}}],
                "samplers": [{"input": 0, "output": 1, "interpolation": "LINEAR"}]
            }]
        });
        if vrma {
            root["extensions"] = json!({"VRMC_vrm_animation": {
                "humanoid": {"humanBones": {"rightUpperArm": {"node": 0}}}
            }});
        }
        root
    }

    #[test]
    fn test_decode_rotation_channel() {
        let rotation = [0.0, 0.0, 0.0, 1.0, 0.0, 0.3826834, 0.0, 0.9238795];
        let data = serde_json::to_vec(&animated_json(false, &rotation)).unwrap();
        let clips = decode_animations(&data).unwrap();

        assert_eq!(clips.len(), 1);
        let clip = &clips[0];
        assert_eq!(clip.name, "raise");
        assert_eq!(clip.duration, 1.0);
        assert_eq!(clip.tracks[0].name, "mixamorig:RightArm.quaternion");
        assert_eq!(clip.tracks[0].times, vec![0.0, 1.0]);
        assert_eq!(clip.tracks[0].values, rotation.to_vec());
    }

    #[test]
    fn test_vrma_tracks_use_role_names() {
        let rotation = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let data = serde_json::to_vec(&animated_json(true, &rotation)).unwrap();
        let clips = decode_animations(&data).unwrap();
        assert_eq!(clips[0].tracks[0].name, "rightUpperArm.quaternion");
    }

    #[tokio::test]
    async fn test_empty_asset_yields_fallback() {
        let clips = clips_or_fallback(decode_animations(br#"{"asset":{"version":"2.0"}}"#));
        assert_eq!(clips, vec![AnimationClip::fallback_wave()]);
        assert_eq!(clips[0].name, "wave");
        assert_eq!(clips[0].duration, 2.0);
        assert_eq!(clips[0].tracks.len(), 1);

        let missing = load_animation(Path::new("animations/missing.vrma")).await;
        assert_eq!(missing, vec![AnimationClip::fallback_wave()]);
    }

    #[test]
    fn test_invalid_samples_fall_back() {
        let rotation = [f32::NAN, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let data = serde_json::to_vec(&animated_json(false, &rotation)).unwrap();
        let clips = clips_or_fallback(decode_animations(&data));
        assert_eq!(clips, vec![AnimationClip::fallback_wave()]);
    }

    #[test]
    fn test_spline_values_keep_middle() {
        let values = [9.0, 9.0, 1.0, 2.0, 8.0, 8.0];
        assert_eq!(spline_values(&values, 2), vec![1.0, 2.0]);
    }
}
