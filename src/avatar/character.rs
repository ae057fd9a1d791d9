//! A loaded humanoid character: scene graph, bone map, expressions.

use glam::{Quat, Vec3};
use std::collections::BTreeMap;

use super::expression::ExpressionSet;
use crate::humanoid::bone::{BoneRole, Side};
use crate::scene::{NodeId, NodeKind, SceneGraph};

/// Name of the node the gaze loop moves around
pub const LOOK_AT_TARGET_NAME: &str = "LookAtTarget";

/// Local transform snapshot of one node
#[derive(Debug, Clone, Copy, PartialEq)]
struct RestTransform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

/// Owns its scene graph. The bone map references scene nodes by id.
#[derive(Debug, Clone)]
pub struct HumanoidCharacter {
    name: String,
    scene: SceneGraph,
    bones: BTreeMap<BoneRole, NodeId>,
    expressions: ExpressionSet,
    look_at: Option<NodeId>,
    rest_pose: Vec<RestTransform>,
}

impl HumanoidCharacter {
    pub fn new(name: &str, scene: SceneGraph) -> Self {
        let mut character = Self {
            name: name.to_string(),
            scene,
            bones: BTreeMap::new(),
            expressions: ExpressionSet::default(),
            look_at: None,
            rest_pose: Vec::new(),
        };
        character.capture_rest_pose();
        character
    }

    pub fn with_expressions(mut self, expressions: ExpressionSet) -> Self {
        self.expressions = expressions;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Node mapped to a role
    pub fn bone(&self, role: BoneRole) -> Option<NodeId> {
        self.bones.get(&role).copied()
    }

    /// Actual scene name of the bone mapped to a role
    pub fn bone_name(&self, role: BoneRole) -> Option<&str> {
        self.bone(role).map(|id| self.scene.name(id))
    }

    /// Map a role to a node, replacing any previous mapping.
    pub fn set_bone(&mut self, role: BoneRole, node: NodeId) {
        self.bones.insert(role, node);
    }

    pub fn bone_map(&self) -> &BTreeMap<BoneRole, NodeId> {
        &self.bones
    }

    pub fn expressions(&self) -> &ExpressionSet {
        &self.expressions
    }

    pub fn expressions_mut(&mut self) -> &mut ExpressionSet {
        &mut self.expressions
    }

    /// Gaze target node, if one has been installed
    pub fn look_at(&self) -> Option<NodeId> {
        self.look_at
    }

    /// Create the gaze target under the scene root, or move the existing one.
    pub fn install_look_at_target(&mut self, position: Vec3) -> NodeId {
        let id = match self.look_at {
            Some(id) => id,
            None => {
                let root = self.scene.root();
                self.scene.add_node(LOOK_AT_TARGET_NAME, NodeKind::Group, root)
            }
        };
        if let Some(node) = self.scene.node_mut(id) {
            node.translation = position;
        }
        self.look_at = Some(id);
        id
    }

    pub fn remove_look_at_target(&mut self) {
        if let Some(id) = self.look_at.take() {
            let _ = self.scene.detach(id);
        }
    }

    /// Snapshot every node's local transform as the bind pose.
    pub fn capture_rest_pose(&mut self) {
        self.rest_pose = self
            .scene
            .ids()
            .filter_map(|id| self.scene.node(id))
            .map(|n| RestTransform {
                translation: n.translation,
                rotation: n.rotation,
                scale: n.scale,
            })
            .collect();
    }

    /// Restore the local transform of every node captured by [`capture_rest_pose`](Self::capture_rest_pose).
    /// Nodes created afterwards keep their transform.
    pub fn reset_to_rest_pose(&mut self) {
        let ids: Vec<NodeId> = self.scene.ids().take(self.rest_pose.len()).collect();
        for (id, rest) in ids.into_iter().zip(self.rest_pose.iter()) {
            if let Some(node) = self.scene.node_mut(id) {
                node.rotation = rest.rotation;
                node.translation = rest.translation;
                node.scale = rest.scale;
            }
        }
    }

    /// Arms-down resting pose: shoulders dropped 10 degrees, upper arms 1 degree,
    /// the rest of the torso and arms straightened.
    pub fn apply_relaxed_arms(&mut self) {
        let z = |deg: f32| Quat::from_rotation_z(deg.to_radians());
        let pose = [
            (BoneRole::LeftShoulder, z(-10.0)),
            (BoneRole::RightShoulder, z(10.0)),
            (BoneRole::LeftUpperArm, z(-1.0)),
            (BoneRole::RightUpperArm, z(1.0)),
            (BoneRole::Spine, Quat::IDENTITY),
            (BoneRole::Chest, Quat::IDENTITY),
            (BoneRole::UpperChest, Quat::IDENTITY),
            (BoneRole::Neck, Quat::IDENTITY),
            (BoneRole::Head, Quat::IDENTITY),
            (BoneRole::LeftLowerArm, Quat::IDENTITY),
            (BoneRole::RightLowerArm, Quat::IDENTITY),
        ];
        for (role, rotation) in pose {
            self.set_bone_rotation(role, rotation);
        }
    }

    /// Reset mapped bones to identity, apply a role-keyed pose, then ease
    /// both hands halfway toward a slight inward curl.
    pub fn apply_pose(&mut self, pose: &BTreeMap<BoneRole, Quat>) {
        let mapped: Vec<BoneRole> = self.bones.keys().copied().collect();
        for role in mapped {
            self.set_bone_rotation(role, Quat::IDENTITY);
        }
        for (role, rotation) in pose {
            self.set_bone_rotation(*role, *rotation);
        }
        self.relax_hands();
    }

    fn relax_hands(&mut self) {
        for side in Side::ALL {
            let curl = match side {
                Side::Left => -0.1,
                Side::Right => 0.1,
            };
            let Some(id) = self.bone(BoneRole::hand(side)) else {
                continue;
            };
            if let Some(node) = self.scene.node_mut(id) {
                node.rotation = node.rotation.slerp(Quat::from_rotation_z(curl), 0.5);
            }
        }
    }

    pub fn set_bone_rotation(&mut self, role: BoneRole, rotation: Quat) -> bool {
        let Some(id) = self.bone(role) else {
            return false;
        };
        match self.scene.node_mut(id) {
            Some(node) => {
                node.rotation = rotation;
                true
            }
            None => false,
        }
    }
}
