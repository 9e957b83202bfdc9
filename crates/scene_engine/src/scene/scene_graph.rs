//! Placement node arena
//!
//! Nodes live in a [`SlotMap`] owned by the [`SceneGraph`]. Zones own their
//! children by key; destroying a zone destroys everything below it together
//! with its region tree. Global transforms are derived top-down each frame by
//! [`compute_global_transforms`] rather than kept in sync on every edit.

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::{MaterialHandle, MeshHandle, TerrainPatchHandle};
use crate::spatial::{Bounds, RegionTree};

new_key_type! {
    /// Handle to a node in a [`SceneGraph`]
    pub struct SceneNodeKey;
}

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Operation requires a zone
    #[error("Scene node {0:?} is not a zone")]
    NotAZone(SceneNodeKey),

    /// Key does not refer to a live node
    #[error("Unknown scene node {0:?}")]
    UnknownNode(SceneNodeKey),

    /// Mesh handle is not registered
    #[error("Mesh {mesh:?} referenced by node {node:?} is not registered")]
    MissingMesh {
        /// Referencing node
        node: SceneNodeKey,
        /// Dangling handle
        mesh: MeshHandle,
    },

    /// Material handle is not registered
    #[error("Material {material:?} referenced by node {node:?} is not registered")]
    MissingMaterial {
        /// Referencing node
        node: SceneNodeKey,
        /// Dangling handle
        material: MaterialHandle,
    },

    /// Terrain patch handle is not registered
    #[error("Terrain patch {patch:?} referenced by node {node:?} is not registered")]
    MissingTerrainPatch {
        /// Referencing node
        node: SceneNodeKey,
        /// Dangling handle
        patch: TerrainPatchHandle,
    },

    /// Child already has a parent
    #[error("Scene node {0:?} is already attached to a zone")]
    NodeAlreadyAttached(SceneNodeKey),

    /// Attaching would make a zone its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Intended parent
        parent: SceneNodeKey,
        /// Intended child
        child: SceneNodeKey,
    },

    /// The root zone lives as long as the graph
    #[error("The root zone cannot be destroyed")]
    CannotDestroyRoot,

    /// The root zone has no parent
    #[error("The root zone cannot be attached to another zone")]
    CannotReparentRoot,
}

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Local transform and the global transform derived from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Relative to the parent
    pub local: Mat4,
    /// Relative to the world, valid after the last transform update
    pub global: Mat4,
}

impl NodeTransform {
    /// Transform with the given local part; global starts equal to it
    pub fn new(local: Mat4) -> Self {
        Self { local, global: local }
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::new(Mat4::identity())
    }
}

/// Mesh and material referenced by a mesh node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInstance {
    /// Geometry
    pub mesh: MeshHandle,
    /// Material
    pub material: MaterialHandle,
}

/// Terrain patch and material referenced by a terrain node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainInstance {
    /// Height field patch
    pub patch: TerrainPatchHandle,
    /// Material
    pub material: MaterialHandle,
}

/// Kind of light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Infinitely distant light, one per zone
    Directional,
    /// Point light with a radius
    Omni,
}

/// Light parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    /// Kind of light
    pub kind: LightKind,
    /// World position, omni lights only
    pub position: Vec3,
    /// Direction of travel, directional lights only
    pub direction: Vec3,
    /// Range of an omni light
    pub radius: f32,
}

impl LightData {
    /// Directional light shining along `direction`
    pub fn directional(direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::zeros(),
            direction,
            radius: 0.0,
        }
    }

    /// Omni light at `position`
    pub fn omni(position: Vec3, radius: f32) -> Self {
        Self {
            kind: LightKind::Omni,
            position,
            direction: Vec3::zeros(),
            radius,
        }
    }
}

/// Lights gathered from a zone's direct children during its hierarchy build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneLighting {
    /// Last directional light found among the children
    pub directional: Option<SceneNodeKey>,
    /// Every omni light among the children
    pub omni: Vec<SceneNodeKey>,
}

/// Zone payload
#[derive(Debug, Clone, Default)]
pub struct ZoneData {
    /// Debug name
    pub name: String,
    /// Owned child nodes
    pub children: Vec<SceneNodeKey>,
    /// Spatial index over the direct children, rebuilt wholesale
    pub region_tree: RegionTree,
    /// Lights found at the last build
    pub lighting: ZoneLighting,
}

impl ZoneData {
    /// Empty zone with an unbuilt region tree
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// What a placement node is
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Transform only
    Empty,
    /// Container with its own region tree
    Zone(ZoneData),
    /// Mesh drawn with its own draw call
    StaticMesh(MeshInstance),
    /// Mesh drawn in an instanced batch
    InstancedStaticMesh(MeshInstance),
    /// Terrain patch
    TerrainPatch(TerrainInstance),
    /// Light source
    Light(LightData),
}

impl NodeKind {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Empty => "empty",
            NodeKind::Zone(_) => "zone",
            NodeKind::StaticMesh(_) => "static mesh",
            NodeKind::InstancedStaticMesh(_) => "instanced static mesh",
            NodeKind::TerrainPatch(_) => "terrain patch",
            NodeKind::Light(_) => "light",
        }
    }
}

/// A placement node
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Local and global transforms
    pub transform: NodeTransform,
    /// World bounds recorded by the last hierarchy build of the parent zone
    pub world_bounds: Bounds,
    /// Payload
    pub kind: NodeKind,
    parent: Option<SceneNodeKey>,
}

impl SceneNode {
    fn new(kind: NodeKind, local: Mat4) -> Self {
        Self {
            transform: NodeTransform::new(local),
            world_bounds: Bounds::empty(),
            kind,
            parent: None,
        }
    }

    /// Zone the node is attached to
    pub fn parent(&self) -> Option<SceneNodeKey> {
        self.parent
    }

    /// Whether the node is a zone
    pub fn is_zone(&self) -> bool {
        matches!(self.kind, NodeKind::Zone(_))
    }

    /// Zone payload, if any
    pub fn zone(&self) -> Option<&ZoneData> {
        match &self.kind {
            NodeKind::Zone(data) => Some(data),
            _ => None,
        }
    }

    /// Mesh and material of a mesh node, instanced or not
    pub fn mesh_instance(&self) -> Option<&MeshInstance> {
        match &self.kind {
            NodeKind::StaticMesh(instance) | NodeKind::InstancedStaticMesh(instance) => Some(instance),
            _ => None,
        }
    }
}

/// Arena of placement nodes under a single root zone
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<SceneNodeKey, SceneNode>,
    root: SceneNodeKey,
    dirty: bool,
}

impl SceneGraph {
    /// Graph containing only a root zone named `name`.
    ///
    /// The root's region tree has infinite bounds until first built.
    pub fn new(name: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(NodeKind::Zone(ZoneData::new(name)), Mat4::identity()));
        Self { nodes, root, dirty: true }
    }

    /// Root zone
    pub fn root(&self) -> SceneNodeKey {
        self.root
    }

    /// Borrow a node
    pub fn node(&self, key: SceneNodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub(crate) fn node_mut(&mut self, key: SceneNodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Whether `key` is live
    pub fn contains(&self, key: SceneNodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds only its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Iterate over every live node
    pub fn iter(&self) -> impl Iterator<Item = (SceneNodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    /// Whether structure or transforms changed since the last full rebuild
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Request a rebuild, e.g. after resources changed bounds
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Children of a zone; empty for other kinds and unknown keys
    pub fn children(&self, key: SceneNodeKey) -> &[SceneNodeKey] {
        self.nodes
            .get(key)
            .and_then(SceneNode::zone)
            .map(|zone| zone.children.as_slice())
            .unwrap_or(&[])
    }

    /// Zone payload of `key`
    pub fn zone(&self, key: SceneNodeKey) -> SceneResult<&ZoneData> {
        let node = self.nodes.get(key).ok_or(SceneError::UnknownNode(key))?;
        node.zone().ok_or(SceneError::NotAZone(key))
    }

    fn insert(&mut self, kind: NodeKind, local: Mat4) -> SceneNodeKey {
        let key = self.nodes.insert(SceneNode::new(kind, local));
        log::trace!("Created {} node {:?}", self.nodes[key].kind.name(), key);
        key
    }

    /// Detached zone
    pub fn create_zone(&mut self, name: impl Into<String>, transform: Mat4) -> SceneNodeKey {
        self.insert(NodeKind::Zone(ZoneData::new(name)), transform)
    }

    /// Detached mesh node drawn on its own
    pub fn create_static_mesh_node(&mut self, mesh: MeshHandle, material: MaterialHandle, transform: Mat4) -> SceneNodeKey {
        self.insert(NodeKind::StaticMesh(MeshInstance { mesh, material }), transform)
    }

    /// Detached mesh node drawn in instanced batches
    pub fn create_instanced_static_mesh_node(
        &mut self,
        mesh: MeshHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> SceneNodeKey {
        self.insert(NodeKind::InstancedStaticMesh(MeshInstance { mesh, material }), transform)
    }

    /// Detached terrain node
    pub fn create_terrain_patch_node(
        &mut self,
        patch: TerrainPatchHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> SceneNodeKey {
        self.insert(NodeKind::TerrainPatch(TerrainInstance { patch, material }), transform)
    }

    /// Detached light with an identity transform
    pub fn create_light_node(&mut self, light: LightData) -> SceneNodeKey {
        self.insert(NodeKind::Light(light), Mat4::identity())
    }

    /// Detached node carrying only a transform
    pub fn create_empty_node(&mut self, transform: Mat4) -> SceneNodeKey {
        self.insert(NodeKind::Empty, transform)
    }

    /// Make `child` owned by the zone `parent`
    pub fn attach_child(&mut self, parent: SceneNodeKey, child: SceneNodeKey) -> SceneResult<()> {
        if child == self.root {
            return Err(SceneError::CannotReparentRoot);
        }

        let child_node = self.nodes.get(child).ok_or(SceneError::UnknownNode(child))?;
        if child_node.parent.is_some() {
            return Err(SceneError::NodeAlreadyAttached(child));
        }

        let parent_node = self.nodes.get(parent).ok_or(SceneError::UnknownNode(parent))?;
        if !parent_node.is_zone() {
            log::error!("Cannot attach {:?} under {} node {:?}", child, parent_node.kind.name(), parent);
            return Err(SceneError::NotAZone(parent));
        }

        let mut ancestor = Some(parent);
        while let Some(key) = ancestor {
            if key == child {
                return Err(SceneError::WouldCreateCycle { parent, child });
            }
            ancestor = self.nodes.get(key).and_then(|n| n.parent);
        }

        if let Some(NodeKind::Zone(zone)) = self.nodes.get_mut(parent).map(|n| &mut n.kind) {
            zone.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.dirty = true;
        Ok(())
    }

    /// Create a zone and attach it under `parent`
    pub fn add_zone(&mut self, parent: SceneNodeKey, name: impl Into<String>, transform: Mat4) -> SceneResult<SceneNodeKey> {
        let key = self.create_zone(name, transform);
        self.attach_or_discard(parent, key)
    }

    /// Create a static mesh node and attach it under `parent`
    pub fn add_static_mesh(
        &mut self,
        parent: SceneNodeKey,
        mesh: MeshHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> SceneResult<SceneNodeKey> {
        let key = self.create_static_mesh_node(mesh, material, transform);
        self.attach_or_discard(parent, key)
    }

    /// Create an instanced static mesh node and attach it under `parent`
    pub fn add_instanced_static_mesh(
        &mut self,
        parent: SceneNodeKey,
        mesh: MeshHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> SceneResult<SceneNodeKey> {
        let key = self.create_instanced_static_mesh_node(mesh, material, transform);
        self.attach_or_discard(parent, key)
    }

    /// Create a terrain node and attach it under `parent`
    pub fn add_terrain_patch(
        &mut self,
        parent: SceneNodeKey,
        patch: TerrainPatchHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> SceneResult<SceneNodeKey> {
        let key = self.create_terrain_patch_node(patch, material, transform);
        self.attach_or_discard(parent, key)
    }

    /// Create a light and attach it under `parent`
    pub fn add_light(&mut self, parent: SceneNodeKey, light: LightData) -> SceneResult<SceneNodeKey> {
        let key = self.create_light_node(light);
        self.attach_or_discard(parent, key)
    }

    fn attach_or_discard(&mut self, parent: SceneNodeKey, key: SceneNodeKey) -> SceneResult<SceneNodeKey> {
        match self.attach_child(parent, key) {
            Ok(()) => Ok(key),
            Err(err) => {
                self.nodes.remove(key);
                Err(err)
            }
        }
    }

    /// Destroy `key` and, for zones, everything below it.
    ///
    /// Region trees of the destroyed zones go with them. Trees of surviving
    /// zones may still reference destroyed nodes until the next rebuild; the
    /// graph is marked dirty so that happens on the next frame.
    pub fn destroy_node(&mut self, key: SceneNodeKey) -> SceneResult<()> {
        if key == self.root {
            return Err(SceneError::CannotDestroyRoot);
        }
        let parent = self.nodes.get(key).ok_or(SceneError::UnknownNode(key))?.parent;

        if let Some(NodeKind::Zone(zone)) = parent.and_then(|p| self.nodes.get_mut(p)).map(|n| &mut n.kind) {
            zone.children.retain(|c| *c != key);
            if zone.lighting.directional == Some(key) {
                zone.lighting.directional = None;
            }
            zone.lighting.omni.retain(|c| *c != key);
        }

        let mut stack = vec![key];
        let mut destroyed = 0usize;
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                if let NodeKind::Zone(zone) = node.kind {
                    stack.extend(zone.children);
                }
                destroyed += 1;
            }
        }

        log::debug!("Destroyed {} scene nodes under {:?}", destroyed, key);
        self.dirty = true;
        Ok(())
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, key: SceneNodeKey, local: Mat4) -> SceneResult<()> {
        let node = self.nodes.get_mut(key).ok_or(SceneError::UnknownNode(key))?;
        node.transform.local = local;
        self.dirty = true;
        Ok(())
    }

    /// Global transforms of `start` and its subtree given its parent's global transform
    pub fn compute_global_transforms(&self, start: SceneNodeKey, parent_transform: &Mat4) -> Vec<(SceneNodeKey, Mat4)> {
        compute_global_transforms(self, start, parent_transform)
    }

    /// Store previously computed global transforms. Unknown keys are ignored.
    pub fn apply_global_transforms(&mut self, updates: &[(SceneNodeKey, Mat4)]) {
        for (key, global) in updates {
            if let Some(node) = self.nodes.get_mut(*key) {
                node.transform.global = *global;
            }
        }
    }

    /// Recompute every global transform from the root down
    pub fn update_transforms(&mut self) {
        let updates = compute_global_transforms(self, self.root, &Mat4::identity());
        self.apply_global_transforms(&updates);
    }
}

/// Compose local transforms top-down, starting at `start` whose parent has
/// global transform `parent_transform`. Returns `(node, global)` pairs in
/// depth-first order without touching the graph.
pub fn compute_global_transforms(
    graph: &SceneGraph,
    start: SceneNodeKey,
    parent_transform: &Mat4,
) -> Vec<(SceneNodeKey, Mat4)> {
    let mut updates = Vec::new();
    let mut stack = vec![(start, *parent_transform)];

    while let Some((key, parent_global)) = stack.pop() {
        let Some(node) = graph.node(key) else {
            log::warn!("Skipping transform update for unknown node {:?}", key);
            continue;
        };
        let global = parent_global * node.transform.local;
        updates.push((key, global));

        for child in graph.children(key).iter().rev() {
            stack.push((*child, global));
        }
    }

    updates
}
