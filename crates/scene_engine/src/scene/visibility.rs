//! Frustum traversal of zone region trees

use bitflags::bitflags;

use crate::spatial::{Frustum, RegionId, RegionTree};

use super::scene_graph::{NodeKind, SceneError, SceneGraph, SceneNodeKey, SceneResult};

bitflags! {
    /// Node kinds gathered by [`collect_visible_nodes`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollectMask: u32 {
        /// Non-instanced static meshes
        const STATIC_MESH = 1 << 0;
        /// Instanced static meshes
        const INSTANCED_MESH = 1 << 1;
        /// Terrain patches
        const TERRAIN_PATCH = 1 << 2;
    }
}

impl Default for CollectMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Potentially visible nodes, one list per kind
#[derive(Debug, Clone, Default)]
pub struct VisibleSet {
    /// Visible static meshes
    pub static_meshes: Vec<SceneNodeKey>,
    /// Visible instanced static meshes
    pub instanced_meshes: Vec<SceneNodeKey>,
    /// Visible terrain patches
    pub terrain_patches: Vec<SceneNodeKey>,
    /// Region nodes tested against the frustum
    pub regions_tested: usize,
    /// Region nodes rejected by the frustum, pruning their subtrees
    pub regions_culled: usize,
}

impl VisibleSet {
    /// Empty every list, keeping their allocations
    pub fn clear(&mut self) {
        self.static_meshes.clear();
        self.instanced_meshes.clear();
        self.terrain_patches.clear();
        self.regions_tested = 0;
        self.regions_culled = 0;
    }

    /// Total number of collected nodes
    pub fn len(&self) -> usize {
        self.static_meshes.len() + self.instanced_meshes.len() + self.terrain_patches.len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append the nodes of `zone` that may intersect `frustum` to `out`.
///
/// Nested zones are entered through their own region trees. Only kinds in
/// `mask` are gathered; lights never are. Calling this on a node that is not
/// a zone logs an error and leaves `out` untouched.
pub fn collect_visible_nodes(
    graph: &SceneGraph,
    zone: SceneNodeKey,
    frustum: &Frustum,
    mask: CollectMask,
    out: &mut VisibleSet,
) -> SceneResult<()> {
    let node = graph.node(zone).ok_or(SceneError::UnknownNode(zone))?;
    let Some(data) = node.zone() else {
        log::error!("Attempted visibility collection on {} node {:?}", node.kind.name(), zone);
        return Err(SceneError::NotAZone(zone));
    };

    let tree = &data.region_tree;
    collect_region(graph, tree, tree.root(), frustum, mask, out);
    Ok(())
}

fn collect_region(
    graph: &SceneGraph,
    tree: &RegionTree,
    id: RegionId,
    frustum: &Frustum,
    mask: CollectMask,
    out: &mut VisibleSet,
) {
    let region = tree.node(id);
    out.regions_tested += 1;
    if frustum.is_outside(&region.bounds) {
        out.regions_culled += 1;
        return;
    }

    if let Some(key) = region.leaf {
        match graph.node(key) {
            Some(node) => match &node.kind {
                NodeKind::Zone(data) => {
                    let nested = &data.region_tree;
                    collect_region(graph, nested, nested.root(), frustum, mask, out);
                }
                NodeKind::StaticMesh(_) => {
                    if mask.contains(CollectMask::STATIC_MESH) {
                        out.static_meshes.push(key);
                    }
                }
                NodeKind::InstancedStaticMesh(_) => {
                    if mask.contains(CollectMask::INSTANCED_MESH) {
                        out.instanced_meshes.push(key);
                    }
                }
                NodeKind::TerrainPatch(_) => {
                    if mask.contains(CollectMask::TERRAIN_PATCH) {
                        out.terrain_patches.push(key);
                    }
                }
                NodeKind::Light(_) | NodeKind::Empty => {
                    log::warn!("No visibility handler for {} node {:?}, skipping", node.kind.name(), key);
                }
            },
            None => {
                log::warn!("Region leaf references destroyed node {:?}, skipping", key);
            }
        }
    }

    for child in region.child_ids() {
        collect_region(graph, tree, child, frustum, mask, out);
    }
}
