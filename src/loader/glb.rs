//! Raw glTF JSON access for the VRM extensions the `gltf` crate does not model.

use serde_json::Value;

use crate::error::LoadError;
use crate::humanoid::bone::BoneRole;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const JSON_CHUNK_TYPE: u32 = 0x4E4F_534A;

/// JSON part of a glTF asset: the first chunk of a GLB, or the whole file.
pub fn json_chunk(data: &[u8]) -> Result<&[u8], LoadError> {
    if !data.starts_with(GLB_MAGIC) {
        return Ok(data);
    }

    // Header: magic(4) + version(4) + length(4)
    // Chunk: length(4) + type(4) + data(length)
    if data.len() < 20 {
        return Err(LoadError::Decode("GLB shorter than its header".to_string()));
    }
    let word = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

    let json_length = word(12) as usize;
    if word(16) != JSON_CHUNK_TYPE {
        return Err(LoadError::Decode("first GLB chunk is not JSON".to_string()));
    }
    data.get(20..20 + json_length)
        .ok_or_else(|| LoadError::Decode("GLB JSON chunk is truncated".to_string()))
}

/// Parse the glTF JSON document of an asset.
pub fn parse_json(data: &[u8]) -> Result<Value, LoadError> {
    let chunk = json_chunk(data)?;
    serde_json::from_slice(chunk).map_err(|e| LoadError::Decode(format!("JSON parse error: {}", e)))
}

fn extension<'a>(root: &'a Value, name: &str) -> Option<&'a Value> {
    root.get("extensions").and_then(|e| e.get(name))
}

/// Which VRM flavour the asset declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrmVersion {
    /// `VRMC_vrm`
    V1,
    /// `VRM`
    V0,
}

pub fn vrm_version(root: &Value) -> Option<VrmVersion> {
    if extension(root, "VRMC_vrm").is_some() {
        Some(VrmVersion::V1)
    } else if extension(root, "VRM").is_some() {
        Some(VrmVersion::V0)
    } else {
        None
    }
}

/// Humanoid role → glTF node index. `None` when the asset has no humanoid.
pub fn humanoid_bones(root: &Value) -> Option<Vec<(BoneRole, usize)>> {
    let mut bones = Vec::new();

    if let Some(human_bones) = extension(root, "VRMC_vrm")
        .and_then(|v| v.get("humanoid"))
        .and_then(|h| h.get("humanBones"))
        .and_then(|b| b.as_object())
    {
        for (name, data) in human_bones {
            let node = data.get("node").and_then(|n| n.as_u64());
            match (BoneRole::from_vrm1_name(name), node) {
                (Some(role), Some(node)) => bones.push((role, node as usize)),
                _ => tracing::debug!("Ignoring humanoid bone {:?}", name),
            }
        }
        return Some(bones);
    }

    if let Some(human_bones) = extension(root, "VRM")
        .and_then(|v| v.get("humanoid"))
        .and_then(|h| h.get("humanBones"))
        .and_then(|b| b.as_array())
    {
        for bone in human_bones {
            let name = bone.get("bone").and_then(|b| b.as_str());
            let node = bone.get("node").and_then(|n| n.as_u64());
            match (name.and_then(BoneRole::from_name), node) {
                (Some(role), Some(node)) => bones.push((role, node as usize)),
                _ => tracing::debug!("Ignoring humanoid bone {:?}", name),
            }
        }
        return Some(bones);
    }

    None
}

/// VRM 0.x blend shape preset name → VRM 1.0 expression name
pub fn vrm0_preset_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let renamed = match lower.as_str() {
        "a" => "aa",
        "i" => "ih",
        "u" => "ou",
        "e" => "ee",
        "o" => "oh",
        "joy" => "happy",
        "sorrow" => "sad",
        "fun" => "relaxed",
        "blink_l" => "blinkLeft",
        "blink_r" => "blinkRight",
        "lookup" => "lookUp",
        "lookdown" => "lookDown",
        "lookleft" => "lookLeft",
        "lookright" => "lookRight",
        _ => return lower,
    };
    renamed.to_string()
}

/// Expression names declared by the asset, preset before custom.
pub fn expression_names(root: &Value) -> Vec<String> {
    let mut names = Vec::new();

    if let Some(expressions) = extension(root, "VRMC_vrm").and_then(|v| v.get("expressions")) {
        for group in ["preset", "custom"] {
            if let Some(map) = expressions.get(group).and_then(|p| p.as_object()) {
                names.extend(map.keys().cloned());
            }
        }
        return names;
    }

    if let Some(groups) = extension(root, "VRM")
        .and_then(|v| v.get("blendShapeMaster"))
        .and_then(|m| m.get("blendShapeGroups"))
        .and_then(|g| g.as_array())
    {
        for group in groups {
            // presetName "unknown" marks a custom group
            let preset = group
                .get("presetName")
                .and_then(|n| n.as_str())
                .filter(|n| !n.is_empty() && *n != "unknown");
            let raw = preset.or_else(|| group.get("name").and_then(|n| n.as_str()));
            if let Some(raw) = raw {
                let name = vrm0_preset_name(raw);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    names
}

/// Humanoid bindings of a VRM animation (`VRMC_vrm_animation`): node → role.
pub fn vrma_bones(root: &Value) -> Vec<(usize, BoneRole)> {
    let Some(human_bones) = extension(root, "VRMC_vrm_animation")
        .and_then(|v| v.get("humanoid"))
        .and_then(|h| h.get("humanBones"))
        .and_then(|b| b.as_object())
    else {
        return Vec::new();
    };

    human_bones
        .iter()
        .filter_map(|(name, data)| {
            let node = data.get("node").and_then(|n| n.as_u64())? as usize;
            BoneRole::from_vrm1_name(name).map(|role| (node, role))
        })
        .collect()
}
