#![warn(missing_docs)]
//! Transform hierarchy for the scene.
//!
//! Nodes carry a local [`Transform`] relative to their parent, plus the optional
//! pieces the interaction behaviors query: mesh bounds, a renderer, a grabbable
//! marker and a rigid body. Nodes are addressed by [`NodeId`] handles; once a
//! node is despawned its handle stops resolving instead of dangling.

use glam::{Mat4, Quat, Vec3};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use xrscene_physics::{Aabb, RigidBody};

/// Handle to a node in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Errors raised by scene queries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The handle does not refer to a live node.
    #[error("{0} does not exist")]
    NodeNotFound(NodeId),
    /// The node is a root but the caller needs its parent frame.
    #[error("{0} has no parent")]
    NoParent(NodeId),
}

/// Result alias for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Local transform relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Offset from the parent origin.
    pub translation: Vec3,
    /// Orientation relative to the parent.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform moved to `translation`.
    pub fn new(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Builder: set rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local-to-parent matrix.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Renderable surface attached to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderer {
    /// World-space bounds of what is drawn.
    pub bounds: Aabb,
    /// Whether the renderer currently draws.
    pub enabled: bool,
}

/// A single node in the hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    /// Display name, also used by scene files to wire behaviors.
    pub name: String,
    /// Transform relative to the parent.
    pub local: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mesh_bounds: Option<Aabb>,
    renderer: Option<Renderer>,
    grabbable: bool,
    body: Option<RigidBody>,
}

impl Node {
    fn new(name: String, local: Transform, parent: Option<NodeId>) -> Self {
        Self {
            name,
            local,
            parent,
            children: Vec::new(),
            mesh_bounds: None,
            renderer: None,
            grabbable: false,
            body: None,
        }
    }

    /// Parent handle, `None` for roots.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in spawn order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena of nodes forming a forest of transform trees.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,
}

impl SceneGraph {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes are alive.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Spawn a root node.
    pub fn spawn(&mut self, name: impl Into<String>, local: Transform) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(id, Node::new(name.into(), local, None));
        id
    }

    /// Spawn a node under `parent`.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Transform,
    ) -> SceneResult<NodeId> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = self.allocate();
        self.nodes
            .insert(id, Node::new(name.into(), local, Some(parent)));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove a node and its whole subtree.
    pub fn despawn(&mut self, id: NodeId) -> SceneResult<()> {
        let subtree = self.descendants(id)?;
        if let Some(parent) = self.node(id)?.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        for node in subtree {
            self.nodes.remove(&node);
        }
        tracing::debug!(%id, "despawned subtree");
        Ok(())
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))
    }

    /// First live node with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| *id)
    }

    /// Parent of `id`, or `None` for a root.
    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Position relative to the parent.
    pub fn local_position(&self, id: NodeId) -> SceneResult<Vec3> {
        Ok(self.node(id)?.local.translation)
    }

    /// Move the node within its parent's frame.
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        self.node_mut(id)?.local.translation = position;
        Ok(())
    }

    /// Local-to-world matrix.
    pub fn world_matrix(&self, id: NodeId) -> SceneResult<Mat4> {
        let mut node = self.node(id)?;
        let mut matrix = node.local.to_matrix();
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            matrix = node.local.to_matrix() * matrix;
        }
        Ok(matrix)
    }

    /// World-space position of the node origin.
    pub fn world_position(&self, id: NodeId) -> SceneResult<Vec3> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    /// World-space orientation, composed from the rotations up the chain.
    pub fn world_rotation(&self, id: NodeId) -> SceneResult<Quat> {
        let mut node = self.node(id)?;
        let mut rotation = node.local.rotation;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            rotation = node.local.rotation * rotation;
        }
        Ok(rotation.normalize())
    }

    /// Product of scales up the chain (exact only without skew).
    pub fn lossy_scale(&self, id: NodeId) -> SceneResult<Vec3> {
        let mut node = self.node(id)?;
        let mut scale = node.local.scale;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            scale *= node.local.scale;
        }
        Ok(scale)
    }

    /// Place the node at a world pose, keeping its local scale.
    pub fn set_world_pose(&mut self, id: NodeId, position: Vec3, rotation: Quat) -> SceneResult<()> {
        let (local_position, local_rotation) = match self.node(id)?.parent {
            Some(parent) => {
                let parent_inverse = self.world_matrix(parent)?.inverse();
                let parent_rotation = self.world_rotation(parent)?;
                (
                    parent_inverse.transform_point3(position),
                    (parent_rotation.inverse() * rotation).normalize(),
                )
            }
            None => (position, rotation),
        };
        let node = self.node_mut(id)?;
        node.local.translation = local_position;
        node.local.rotation = local_rotation;
        Ok(())
    }

    /// Rotate a local direction into world space. Scale is ignored.
    pub fn transform_direction(&self, id: NodeId, direction: Vec3) -> SceneResult<Vec3> {
        Ok(self.world_rotation(id)? * direction)
    }

    /// Rotate a world direction into the node's local space. Scale is ignored.
    pub fn inverse_transform_direction(&self, id: NodeId, direction: Vec3) -> SceneResult<Vec3> {
        Ok(self.world_rotation(id)?.inverse() * direction)
    }

    /// Map a world point into the node's local space.
    pub fn inverse_transform_point(&self, id: NodeId, point: Vec3) -> SceneResult<Vec3> {
        Ok(self.world_matrix(id)?.inverse().transform_point3(point))
    }

    /// The node followed by all of its descendants, depth first.
    pub fn descendants(&self, id: NodeId) -> SceneResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Attach local-space mesh bounds.
    pub fn set_mesh_bounds(&mut self, id: NodeId, bounds: Aabb) -> SceneResult<()> {
        self.node_mut(id)?.mesh_bounds = Some(bounds);
        Ok(())
    }

    /// Local-space mesh bounds, if the node has a mesh.
    pub fn mesh_bounds(&self, id: NodeId) -> SceneResult<Option<Aabb>> {
        Ok(self.node(id)?.mesh_bounds)
    }

    /// Attach a renderer with world-space bounds.
    pub fn set_renderer(&mut self, id: NodeId, bounds: Aabb) -> SceneResult<()> {
        self.node_mut(id)?.renderer = Some(Renderer {
            bounds,
            enabled: true,
        });
        Ok(())
    }

    /// Renderer attached to the node.
    pub fn renderer(&self, id: NodeId) -> SceneResult<Option<Renderer>> {
        Ok(self.node(id)?.renderer)
    }

    /// Enable or disable a node's renderer. Nodes without one are left alone.
    pub fn set_renderer_enabled(&mut self, id: NodeId, enabled: bool) -> SceneResult<()> {
        if let Some(renderer) = self.node_mut(id)?.renderer.as_mut() {
            renderer.enabled = enabled;
        }
        Ok(())
    }

    /// Mark the node as something hands can grab.
    pub fn set_grabbable(&mut self, id: NodeId, grabbable: bool) -> SceneResult<()> {
        self.node_mut(id)?.grabbable = grabbable;
        Ok(())
    }

    /// True if the node or any ancestor is grabbable.
    pub fn is_grabbable_in_parent(&self, id: NodeId) -> SceneResult<bool> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            if node.grabbable {
                return Ok(true);
            }
            current = node.parent;
        }
        Ok(false)
    }

    /// Attach a rigid body.
    pub fn set_body(&mut self, id: NodeId, body: RigidBody) -> SceneResult<()> {
        self.node_mut(id)?.body = Some(body);
        Ok(())
    }

    /// Rigid body attached to the node.
    pub fn body(&self, id: NodeId) -> SceneResult<Option<&RigidBody>> {
        Ok(self.node(id)?.body.as_ref())
    }

    /// Mutable rigid body attached to the node.
    pub fn body_mut(&mut self, id: NodeId) -> SceneResult<Option<&mut RigidBody>> {
        Ok(self.node_mut(id)?.body.as_mut())
    }

    /// Advance non-kinematic bodies by their linear velocity.
    pub fn step_physics(&mut self, dt: f32) -> SceneResult<()> {
        let moving: Vec<(NodeId, Vec3)> = self
            .nodes
            .iter()
            .filter_map(|(id, node)| {
                let displacement = node.body?.displacement(dt);
                (displacement != Vec3::ZERO).then_some((*id, displacement))
            })
            .collect();
        for (id, displacement) in moving {
            let position = self.world_position(id)? + displacement;
            let rotation = self.world_rotation(id)?;
            self.set_world_pose(id, position, rotation)?;
        }
        Ok(())
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn world_position_composes_parent_chain() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn(
            "root",
            Transform::new(Vec3::new(1.0, 0.0, 0.0)).with_scale(Vec3::splat(2.0)),
        );
        let child = scene
            .spawn_child(root, "child", Transform::new(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();
        assert!(approx(scene.world_position(child).unwrap(), Vec3::new(1.0, 2.0, 0.0)));
        assert_eq!(scene.lossy_scale(child).unwrap(), Vec3::splat(2.0));
    }

    #[test]
    fn inverse_transform_point_undoes_world_matrix() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn(
            "root",
            Transform::new(Vec3::new(0.0, 1.0, 0.0))
                .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
        );
        let local = Vec3::new(0.3, -0.2, 0.1);
        let world = scene.world_matrix(root).unwrap().transform_point3(local);
        assert!(approx(scene.inverse_transform_point(root, world).unwrap(), local));
    }

    #[test]
    fn directions_ignore_scale() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn(
            "root",
            Transform::default()
                .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::splat(5.0)),
        );
        let world = scene.transform_direction(root, Vec3::Y).unwrap();
        assert!(approx(world, Vec3::NEG_X));
        assert!(approx(scene.inverse_transform_direction(root, world).unwrap(), Vec3::Y));
    }

    #[test]
    fn set_world_pose_accounts_for_parent() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn("root", Transform::new(Vec3::new(0.0, 5.0, 0.0)));
        let child = scene.spawn_child(root, "child", Transform::default()).unwrap();
        scene
            .set_world_pose(child, Vec3::new(1.0, 1.0, 1.0), Quat::IDENTITY)
            .unwrap();
        assert!(approx(scene.local_position(child).unwrap(), Vec3::new(1.0, -4.0, 1.0)));
        assert!(approx(scene.world_position(child).unwrap(), Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn despawn_removes_subtree_and_handles_stop_resolving() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn("root", Transform::default());
        let a = scene.spawn_child(root, "a", Transform::default()).unwrap();
        let b = scene.spawn_child(a, "b", Transform::default()).unwrap();
        assert_eq!(scene.descendants(root).unwrap(), vec![root, a, b]);

        scene.despawn(a).unwrap();
        assert!(!scene.contains(b));
        assert_eq!(scene.node(b).unwrap_err(), SceneError::NodeNotFound(b));
        assert!(scene.node(root).unwrap().children().is_empty());
    }

    #[test]
    fn grabbable_is_inherited_from_ancestors() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn("mug", Transform::default());
        let handle = scene.spawn_child(root, "handle", Transform::default()).unwrap();
        assert!(!scene.is_grabbable_in_parent(handle).unwrap());
        scene.set_grabbable(root, true).unwrap();
        assert!(scene.is_grabbable_in_parent(handle).unwrap());
    }

    #[test]
    fn step_physics_moves_only_dynamic_bodies() {
        let mut scene = SceneGraph::new();
        let dynamic = scene.spawn("ball", Transform::default());
        let kinematic = scene.spawn("crate", Transform::default());
        let mut body = RigidBody::dynamic();
        body.linear_velocity = Vec3::X;
        scene.set_body(dynamic, body).unwrap();
        body.kinematic = true;
        scene.set_body(kinematic, body).unwrap();

        scene.step_physics(0.5).unwrap();
        assert!(approx(scene.world_position(dynamic).unwrap(), Vec3::new(0.5, 0.0, 0.0)));
        assert!(approx(scene.world_position(kinematic).unwrap(), Vec3::ZERO));
    }

    #[test]
    fn renderer_toggle_is_noop_without_renderer() {
        let mut scene = SceneGraph::new();
        let bare = scene.spawn("bare", Transform::default());
        scene.set_renderer_enabled(bare, false).unwrap();
        assert!(scene.renderer(bare).unwrap().is_none());

        let drawn = scene.spawn("drawn", Transform::default());
        scene
            .set_renderer(drawn, Aabb::from_center_size(Vec3::ZERO, Vec3::ONE))
            .unwrap();
        scene.set_renderer_enabled(drawn, false).unwrap();
        assert!(!scene.renderer(drawn).unwrap().unwrap().enabled);
    }
}
