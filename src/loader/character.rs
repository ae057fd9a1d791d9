//! VRM character decoding.

use glam::{Quat, Vec3};
use std::collections::HashSet;
use std::path::Path;

use super::glb;
use crate::avatar::{ExpressionSet, HumanoidCharacter};
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::humanoid::mapper::{fix_vrm_bones, RepairOutcome};
use crate::humanoid::validator::{validate_vrm, ValidationReport};
use crate::scene::{MeshInfo, NodeId, NodeKind, SceneGraph};

/// A decoded character with its validation state at load time.
#[derive(Debug, Clone)]
pub struct LoadedCharacter {
    pub character: HumanoidCharacter,
    pub report: ValidationReport,
    /// Set when auto-repair ran
    pub repair: Option<RepairOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct CharacterLoader {
    config: LoaderConfig,
}

impl CharacterLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub async fn load(&self, path: &Path) -> Result<LoadedCharacter, LoadError> {
        tracing::info!("Loading character from {}", path.display());
        let data = super::read_asset(path).await?;
        self.decode(&super::display_name(path), &data)
    }

    /// Decode a GLB / glTF JSON asset carrying VRM humanoid metadata.
    pub fn decode(&self, name: &str, data: &[u8]) -> Result<LoadedCharacter, LoadError> {
        let root = glb::parse_json(data)?;
        let humanoid = glb::humanoid_bones(&root).ok_or(LoadError::MissingHumanoid)?;
        let gltf = gltf::Gltf::from_slice(data).map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut scene = SceneGraph::new();
        let humanoid_nodes: HashSet<usize> = humanoid.iter().map(|(_, n)| *n).collect();
        let node_ids = build_scene(&gltf.document, &humanoid_nodes, &mut scene);

        if self.config.combine_skeletons {
            let merged = scene.combine_skeletons();
            if merged > 0 {
                tracing::debug!("Combined {} duplicate skeletons", merged);
            }
        }
        if self.config.shadows {
            scene.enable_shadows();
        }

        let expressions = ExpressionSet::new(glb::expression_names(&root));
        let mut character = HumanoidCharacter::new(name, scene).with_expressions(expressions);
        for (role, index) in humanoid {
            match node_ids.get(index).copied().flatten() {
                Some(id) => character.set_bone(role, id),
                None => tracing::warn!("Humanoid bone {} points at missing node {}", role, index),
            }
        }

        let mut report = validate_vrm(&character);
        let mut repair = None;
        if !report.valid && self.config.auto_repair {
            tracing::info!("Character {} failed validation, attempting repair", name);
            repair = Some(fix_vrm_bones(&mut character));
            // repair may reparent bones
            character.capture_rest_pose();
            report = validate_vrm(&character);
        }

        tracing::info!(
            "Loaded character {} ({} bones mapped, {} expressions, valid={})",
            name,
            character.bone_map().len(),
            character.expressions().len(),
            report.valid
        );

        Ok(LoadedCharacter {
            character,
            report,
            repair,
        })
    }
}

fn root_nodes(document: &gltf::Document) -> Vec<gltf::Node<'_>> {
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        return scene.nodes().collect();
    }
    let children: HashSet<usize> = document
        .nodes()
        .flat_map(|n| n.children().map(|c| c.index()).collect::<Vec<_>>())
        .collect();
    document
        .nodes()
        .filter(|n| !children.contains(&n.index()))
        .collect()
}

fn vertex_count(mesh: &gltf::Mesh) -> usize {
    mesh.primitives()
        .filter_map(|p| p.get(&gltf::Semantic::Positions).map(|a| a.count()))
        .sum()
}

/// Copy the node tree into `scene`. Returns glTF node index → scene node.
fn build_scene(
    document: &gltf::Document,
    humanoid_nodes: &HashSet<usize>,
    scene: &mut SceneGraph,
) -> Vec<Option<NodeId>> {
    let mut joints: HashSet<usize> = humanoid_nodes.clone();
    for skin in document.skins() {
        joints.extend(skin.joints().map(|j| j.index()));
    }

    let mut ids: Vec<Option<NodeId>> = vec![None; document.nodes().count()];
    let mut stack: Vec<(gltf::Node, NodeId)> = root_nodes(document)
        .into_iter()
        .rev()
        .map(|n| (n, scene.root()))
        .collect();

    while let Some((node, parent)) = stack.pop() {
        if ids[node.index()].is_some() {
            continue;
        }

        let kind = if joints.contains(&node.index()) {
            NodeKind::Bone
        } else if let Some(mesh) = node.mesh() {
            NodeKind::Mesh(MeshInfo::new(node.skin().map(|s| s.index()), vertex_count(&mesh)))
        } else {
            NodeKind::Group
        };

        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()));
        let id = scene.add_node(&name, kind, parent);

        let (t, r, s) = node.transform().decomposed();
        if let Some(n) = scene.node_mut(id) {
            n.translation = Vec3::from(t);
            n.rotation = Quat::from_array(r);
            n.scale = Vec3::from(s);
        }
        ids[node.index()] = Some(id);

        let children: Vec<gltf::Node> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|c| (c, id)));
    }

    for skin in document.skins() {
        let skin_joints = skin
            .joints()
            .filter_map(|j| ids.get(j.index()).copied().flatten())
            .collect();
        scene.add_skin(skin_joints);
    }

    ids
}
