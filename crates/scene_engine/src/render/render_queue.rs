//! # Render Queue
//!
//! Turns a [`VisibleSet`] into draw items and orders them for batching.
//!
//! ## Ordering
//!
//! Mesh lists are ordered, outermost key first, by:
//!
//! 1. opaque before transparent
//! 2. material handle
//! 3. mesh handle
//! 4. squared camera distance, nearest first
//!
//! This is produced by an unstable distance sort followed by stable sorts on
//! mesh, material and command type, so each later pass keeps the order the
//! earlier ones established inside its groups. Terrain is sorted nearest
//! first, then opaque before transparent.

use crate::core::TransparentOrdering;
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::{NodeKind, SceneGraph, SceneNodeKey, VisibleSet};

use super::resources::{MaterialHandle, MeshHandle, ResourceRegistry, TerrainPatchHandle};

/// Partition of a draw item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandType {
    /// Depth-writing geometry, drawn first
    Opaque,
    /// Alpha-blended geometry, drawn after every opaque item
    Transparent,
}

/// One mesh node ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    /// Source node
    pub node: SceneNodeKey,
    /// Geometry
    pub mesh: MeshHandle,
    /// Material
    pub material: MaterialHandle,
    /// Opaque or transparent
    pub command_type: CommandType,
    /// Squared distance from the camera to the node's bounds center
    pub distance_sq: f32,
    /// World transform
    pub transform: Mat4,
}

/// One terrain node ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainDrawItem {
    /// Source node
    pub node: SceneNodeKey,
    /// Height field patch
    pub patch: TerrainPatchHandle,
    /// Material
    pub material: MaterialHandle,
    /// Opaque or transparent
    pub command_type: CommandType,
    /// Squared distance from the camera to the node's bounds center
    pub distance_sq: f32,
    /// World transform
    pub transform: Mat4,
}

/// Sort mesh draw items into batching order
pub fn sort_for_batching(items: &mut [DrawItem], ordering: TransparentOrdering) {
    items.sort_unstable_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
    items.sort_by_key(|item| item.mesh);
    items.sort_by_key(|item| item.material);
    items.sort_by_key(|item| item.command_type);

    if ordering == TransparentOrdering::BackToFront {
        let split = items.partition_point(|item| item.command_type == CommandType::Opaque);
        items[split..].sort_by(|a, b| b.distance_sq.total_cmp(&a.distance_sq));
    }
}

/// Sort terrain draw items opaque first, nearest first within each group
pub fn sort_terrain_by_distance(items: &mut [TerrainDrawItem]) {
    items.sort_unstable_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
    items.sort_by_key(|item| item.command_type);
}

fn command_type_of(transparent: bool) -> CommandType {
    if transparent {
        CommandType::Transparent
    } else {
        CommandType::Opaque
    }
}

/// Per-frame draw lists
#[derive(Debug, Default)]
pub struct RenderQueue {
    static_meshes: Vec<DrawItem>,
    instanced_meshes: Vec<DrawItem>,
    terrain_patches: Vec<TerrainDrawItem>,
    skipped: usize,
}

impl RenderQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue with room for `capacity` items per list
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            static_meshes: Vec::with_capacity(capacity),
            instanced_meshes: Vec::with_capacity(capacity),
            terrain_patches: Vec::with_capacity(capacity / 4),
            skipped: 0,
        }
    }

    /// Replace the queue contents with draw items for `visible`.
    ///
    /// Nodes whose material is missing, or whose kind does not match the list
    /// they were collected into, are logged and skipped.
    pub fn build(
        &mut self,
        graph: &SceneGraph,
        resources: &ResourceRegistry,
        visible: &VisibleSet,
        camera_position: Vec3,
    ) {
        self.clear();

        for key in &visible.static_meshes {
            if let Some(item) = self.mesh_item(graph, resources, *key, camera_position) {
                self.static_meshes.push(item);
            }
        }
        for key in &visible.instanced_meshes {
            if let Some(item) = self.mesh_item(graph, resources, *key, camera_position) {
                self.instanced_meshes.push(item);
            }
        }
        for key in &visible.terrain_patches {
            if let Some(item) = self.terrain_item(graph, resources, *key, camera_position) {
                self.terrain_patches.push(item);
            }
        }
    }

    fn mesh_item(
        &mut self,
        graph: &SceneGraph,
        resources: &ResourceRegistry,
        key: SceneNodeKey,
        camera_position: Vec3,
    ) -> Option<DrawItem> {
        let Some(node) = graph.node(key) else {
            log::warn!("Visible node {:?} no longer exists", key);
            self.skipped += 1;
            return None;
        };
        let Some(instance) = node.mesh_instance() else {
            log::error!("Node {:?} is a {}, not a mesh", key, node.kind.name());
            self.skipped += 1;
            return None;
        };
        let Some(material) = resources.material(instance.material) else {
            log::warn!("Material {:?} of node {:?} is not registered, skipping", instance.material, key);
            self.skipped += 1;
            return None;
        };

        Some(DrawItem {
            node: key,
            mesh: instance.mesh,
            material: instance.material,
            command_type: command_type_of(material.is_transparent()),
            distance_sq: (node.world_bounds.center() - camera_position).norm_squared(),
            transform: node.transform.global,
        })
    }

    // A missing terrain material is reported by the submitter, so it only
    // decides the phase here.
    fn terrain_item(
        &mut self,
        graph: &SceneGraph,
        resources: &ResourceRegistry,
        key: SceneNodeKey,
        camera_position: Vec3,
    ) -> Option<TerrainDrawItem> {
        match graph.node(key).map(|n| (n, &n.kind)) {
            Some((node, NodeKind::TerrainPatch(instance))) => Some(TerrainDrawItem {
                node: key,
                patch: instance.patch,
                material: instance.material,
                command_type: command_type_of(
                    resources.material(instance.material).is_some_and(|m| m.is_transparent()),
                ),
                distance_sq: (node.world_bounds.center() - camera_position).norm_squared(),
                transform: node.transform.global,
            }),
            Some((node, _)) => {
                log::error!("Node {:?} is a {}, not a terrain patch", key, node.kind.name());
                self.skipped += 1;
                None
            }
            None => {
                log::warn!("Visible node {:?} no longer exists", key);
                self.skipped += 1;
                None
            }
        }
    }

    /// Sort every list for submission
    pub fn sort(&mut self, ordering: TransparentOrdering) {
        sort_for_batching(&mut self.static_meshes, ordering);
        sort_for_batching(&mut self.instanced_meshes, ordering);
        sort_terrain_by_distance(&mut self.terrain_patches);
    }

    /// Non-instanced mesh items
    pub fn static_meshes(&self) -> &[DrawItem] {
        &self.static_meshes
    }

    /// Instanced mesh items
    pub fn instanced_meshes(&self) -> &[DrawItem] {
        &self.instanced_meshes
    }

    /// Terrain items
    pub fn terrain_patches(&self) -> &[TerrainDrawItem] {
        &self.terrain_patches
    }

    /// Visible nodes dropped while building
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Total number of items
    pub fn command_count(&self) -> usize {
        self.static_meshes.len() + self.instanced_meshes.len() + self.terrain_patches.len()
    }

    /// Clear all items for the next frame
    pub fn clear(&mut self) {
        self.static_meshes.clear();
        self.instanced_meshes.clear();
        self.terrain_patches.clear();
        self.skipped = 0;
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.command_count() == 0
    }
}
