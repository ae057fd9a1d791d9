//! Arena scene graph holding a character's nodes.
//!
//! Nodes are addressed by [`NodeId`] and never removed, so ids handed out to
//! the bone map stay valid for the lifetime of the graph. Detaching a node
//! only unlinks it from its parent.

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;

use crate::error::SceneError;

/// Handle to a node inside one [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Mesh attributes the core cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInfo {
    /// Index into [`SceneGraph::skins`] when the mesh is skinned
    pub skin: Option<usize>,
    pub vertex_count: usize,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshInfo {
    pub fn new(skin: Option<usize>, vertex_count: usize) -> Self {
        Self {
            skin,
            vertex_count,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Bone,
    Mesh(MeshInfo),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_bone(&self) -> bool {
        self.kind == NodeKind::Bone
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Joint list of one skin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skin {
    pub joints: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    skins: Vec<Skin>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Name given to the implicit root group
    pub const ROOT_NAME: &'static str = "Scene";

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Self::ROOT_NAME, NodeKind::Group)],
            skins: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total nodes, including detached ones and the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Add a node under `parent`. An id from another graph falls back to the root.
    pub fn add_node(&mut self, name: &str, kind: NodeKind, parent: NodeId) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            tracing::warn!("add_node({}): unknown parent {}, using scene root", name, parent.0);
            self.root()
        };

        let id = NodeId(self.nodes.len());
        let mut node = Node::new(name, kind);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Add a bone with a local offset from its parent
    pub fn add_bone(&mut self, name: &str, parent: NodeId, translation: Vec3) -> NodeId {
        let id = self.add_node(name, NodeKind::Bone, parent);
        self.nodes[id.0].translation = translation;
        id
    }

    /// Every node id in creation order, detached nodes included
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Node name, or an empty string for an unknown id
    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.name.as_str()).unwrap_or("")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// True when `ancestor` is a strict transitive parent of `node`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Depth-first, pre-order walk of every node reachable from the root.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Bones reachable from the root, in traversal order.
    pub fn bones(&self) -> Vec<NodeId> {
        self.traverse()
            .into_iter()
            .filter(|id| self.nodes[id.0].is_bone())
            .collect()
    }

    /// First reachable node with exactly this name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.traverse()
            .into_iter()
            .find(|id| self.nodes[id.0].name == name)
    }

    pub fn find_by_name_ignore_case(&self, name: &str) -> Option<NodeId> {
        let lower = name.to_lowercase();
        self.traverse()
            .into_iter()
            .find(|id| self.nodes[id.0].name.to_lowercase() == lower)
    }

    /// Mesh nodes reachable from the root.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &MeshInfo)> + '_ {
        self.traverse().into_iter().filter_map(move |id| match &self.nodes[id.0].kind {
            NodeKind::Mesh(info) => Some((id, info)),
            _ => None,
        })
    }

    /// At least one reachable mesh bound to a skin with joints
    pub fn has_skinned_mesh(&self) -> bool {
        self.meshes().any(|(_, info)| {
            info.skin
                .and_then(|s| self.skins.get(s))
                .is_some_and(|skin| !skin.joints.is_empty())
        })
    }

    pub fn skins(&self) -> &[Skin] {
        &self.skins
    }

    pub fn add_skin(&mut self, joints: Vec<NodeId>) -> usize {
        self.skins.push(Skin { joints });
        self.skins.len() - 1
    }

    /// World matrix of a node, composing parents up to its top ancestor.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            matrix = node.local_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).w_axis.truncate()
    }

    /// World matrices for every node, indexed by [`NodeId::index`].
    pub fn compute_world_transforms(&self) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut computed = vec![false; self.nodes.len()];

        for i in 0..self.nodes.len() {
            self.compute_node(&mut world, &mut computed, i);
        }

        world
    }

    fn compute_node(&self, world: &mut [Mat4], computed: &mut [bool], idx: usize) {
        if computed[idx] {
            return;
        }

        let local = self.nodes[idx].local_matrix();
        if let Some(parent) = self.nodes[idx].parent {
            self.compute_node(world, computed, parent.0);
            world[idx] = world[parent.0] * local;
        } else {
            world[idx] = local;
        }
        computed[idx] = true;
    }

    /// Unlink a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root() {
            return Err(SceneError::DetachRoot);
        }
        let parent = self
            .node(id)
            .ok_or(SceneError::UnknownNode(id.0))?
            .parent;

        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        self.nodes[id.0].parent = None;
        Ok(())
    }

    /// Move a node (and its subtree) under `parent`, keeping local transforms.
    pub fn attach(&mut self, id: NodeId, parent: NodeId) -> Result<(), SceneError> {
        if self.node(id).is_none() {
            return Err(SceneError::UnknownNode(id.0));
        }
        if self.node(parent).is_none() {
            return Err(SceneError::UnknownNode(parent.0));
        }
        if id == parent || self.is_descendant_of(parent, id) {
            return Err(SceneError::Cycle {
                child: self.name(id).to_string(),
                parent: self.name(parent).to_string(),
            });
        }

        self.detach(id)?;
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        Ok(())
    }

    /// Reparent a node without changing where it sits in world space.
    pub fn reparent_preserving_world(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
    ) -> Result<(), SceneError> {
        let world = self.world_matrix(id);
        self.attach(id, new_parent)?;

        let parent_world = self.world_matrix(new_parent);
        let local = parent_world.inverse() * world;
        let (scale, rotation, translation) = local.to_scale_rotation_translation();

        let node = &mut self.nodes[id.0];
        node.translation = translation;
        node.rotation = rotation;
        node.scale = scale;
        Ok(())
    }

    /// Merge skins with identical joint lists. Returns how many were removed.
    pub fn combine_skeletons(&mut self) -> usize {
        let mut unique: Vec<Skin> = Vec::new();
        let mut remap = Vec::with_capacity(self.skins.len());

        for skin in &self.skins {
            match unique.iter().position(|u| u.joints == skin.joints) {
                Some(existing) => remap.push(existing),
                None => {
                    remap.push(unique.len());
                    unique.push(skin.clone());
                }
            }
        }

        let removed = self.skins.len() - unique.len();
        if removed == 0 {
            return 0;
        }

        for node in &mut self.nodes {
            if let NodeKind::Mesh(info) = &mut node.kind {
                info.skin = info.skin.and_then(|s| remap.get(s).copied());
            }
        }
        self.skins = unique;
        tracing::debug!("Combined {} duplicate skeleton(s)", removed);
        removed
    }

    /// Turn on shadow casting and receiving for every mesh. Returns the mesh count.
    pub fn enable_shadows(&mut self) -> usize {
        let mut count = 0;
        for node in &mut self.nodes {
            if let NodeKind::Mesh(info) = &mut node.kind {
                info.cast_shadow = true;
                info.receive_shadow = true;
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut scene = SceneGraph::new();
        let a = scene.add_bone("A", scene.root(), Vec3::new(0.0, 1.0, 0.0));
        let b = scene.add_bone("B", a, Vec3::new(0.0, 0.5, 0.0));
        let c = scene.add_bone("C", b, Vec3::new(0.0, 0.25, 0.0));
        (scene, a, b, c)
    }

    #[test]
    fn test_descendants() {
        let (scene, a, b, c) = chain();
        assert!(scene.is_descendant_of(c, a));
        assert!(scene.is_descendant_of(c, b));
        assert!(!scene.is_descendant_of(a, c));
        assert!(!scene.is_descendant_of(a, a));
    }

    #[test]
    fn test_world_position() {
        let (scene, _, _, c) = chain();
        let pos = scene.world_position(c);
        assert!((pos - Vec3::new(0.0, 1.75, 0.0)).length() < 1e-5);

        let world = scene.compute_world_transforms();
        assert!((world[c.index()].w_axis.truncate() - pos).length() < 1e-5);
    }

    #[test]
    fn test_reparent_preserves_world_position() {
        let (mut scene, a, b, c) = chain();
        scene.node_mut(b).unwrap().rotation = Quat::from_rotation_z(0.7);
        let before = scene.world_position(c);

        scene.reparent_preserving_world(c, scene.root()).unwrap();

        assert_eq!(scene.parent(c), Some(scene.root()));
        assert!(!scene.is_descendant_of(c, a));
        assert!((scene.world_position(c) - before).length() < 1e-5);
        assert!(!scene.node(b).unwrap().children().contains(&c));
    }

    #[test]
    fn test_attach_rejects_cycle() {
        let (mut scene, a, _, c) = chain();
        let err = scene.attach(a, c).unwrap_err();
        assert!(matches!(err, SceneError::Cycle { .. }));
        // graph untouched
        assert!(scene.is_descendant_of(c, a));
        assert_eq!(scene.detach(scene.root()), Err(SceneError::DetachRoot));
    }

    #[test]
    fn test_bones_in_traversal_order() {
        let (mut scene, a, _, _) = chain();
        scene.add_node("Body", NodeKind::Mesh(MeshInfo::new(None, 10)), scene.root());
        scene.add_bone("D", a, Vec3::ZERO);

        let names: Vec<&str> = scene.bones().iter().map(|id| scene.name(*id)).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(scene.find_by_name_ignore_case("d"), scene.find_by_name("D"));
    }

    #[test]
    fn test_combine_skeletons_and_shadows() {
        let (mut scene, a, b, c) = chain();
        let s0 = scene.add_skin(vec![a, b, c]);
        let s1 = scene.add_skin(vec![a, b, c]);
        let m0 = scene.add_node("Body", NodeKind::Mesh(MeshInfo::new(Some(s0), 4)), scene.root());
        let m1 = scene.add_node("Hair", NodeKind::Mesh(MeshInfo::new(Some(s1), 4)), scene.root());

        assert_eq!(scene.combine_skeletons(), 1);
        assert_eq!(scene.skins().len(), 1);
        for id in [m0, m1] {
            match &scene.node(id).unwrap().kind {
                NodeKind::Mesh(info) => assert_eq!(info.skin, Some(0)),
                other => panic!("expected mesh, got {:?}", other),
            }
        }

        assert!(scene.has_skinned_mesh());
        assert_eq!(scene.enable_shadows(), 2);
        assert!(scene.meshes().all(|(_, m)| m.cast_shadow && m.receive_shadow));
    }
}
