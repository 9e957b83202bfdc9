//! Zone-level region tree rebuilds
//!
//! A zone's tree indexes its direct children only. Nested zones enter their
//! parent's tree as single leaves bounded by their own root box, so they must
//! be built first for those bounds to be tight.

use crate::render::ResourceRegistry;
use crate::spatial::{create_hierarchy_from_blob, transform_bounds, Bounds, RegionTree};

use super::scene_graph::{
    LightKind, NodeKind, SceneError, SceneGraph, SceneNodeKey, SceneResult, ZoneLighting,
};

impl SceneGraph {
    /// Rebuild the region tree of `zone` from scratch.
    ///
    /// The previous tree is dropped. With `rebuild_children` nested zones are
    /// rebuilt first; otherwise their current root bounds are used as-is.
    /// Children whose resources are missing are logged and left out of the
    /// tree.
    pub fn build_zone_hierarchy(
        &mut self,
        zone: SceneNodeKey,
        rebuild_children: bool,
        resources: &ResourceRegistry,
    ) -> SceneResult<()> {
        let children = match self.node(zone).map(|n| &n.kind) {
            Some(NodeKind::Zone(data)) => data.children.clone(),
            Some(other) => {
                log::error!("Scene node {:?} is a {}, not a zone", zone, other.name());
                return Err(SceneError::NotAZone(zone));
            }
            None => return Err(SceneError::UnknownNode(zone)),
        };

        let mut tree = RegionTree::new();
        let mut leaves = Vec::with_capacity(children.len());
        let mut lighting = ZoneLighting::default();

        for child in children {
            if rebuild_children && self.node(child).is_some_and(|n| n.is_zone()) {
                self.build_zone_hierarchy(child, true, resources)?;
            }

            let Some(node) = self.node(child) else {
                log::warn!("Zone {:?} lists unknown child {:?}", zone, child);
                continue;
            };

            let bounds = match &node.kind {
                NodeKind::Zone(data) => data.region_tree.root_bounds(),
                NodeKind::StaticMesh(instance) | NodeKind::InstancedStaticMesh(instance) => {
                    match resources.mesh(instance.mesh) {
                        Some(mesh) => transform_bounds(&node.transform.global, &mesh.bounds),
                        None => {
                            let err = SceneError::MissingMesh { node: child, mesh: instance.mesh };
                            log::warn!("{}, leaving it out of the region tree", err);
                            continue;
                        }
                    }
                }
                NodeKind::TerrainPatch(instance) => match resources.terrain_patch(instance.patch) {
                    Some(patch) => transform_bounds(&node.transform.global, &patch.bounds()),
                    None => {
                        let err = SceneError::MissingTerrainPatch { node: child, patch: instance.patch };
                        log::warn!("{}, leaving it out of the region tree", err);
                        continue;
                    }
                },
                NodeKind::Light(light) => {
                    match light.kind {
                        LightKind::Directional => lighting.directional = Some(child),
                        LightKind::Omni => lighting.omni.push(child),
                    }
                    continue;
                }
                NodeKind::Empty => continue,
            };

            if let Some(node) = self.node_mut(child) {
                node.world_bounds = bounds;
            }
            leaves.push(tree.push_leaf(child, bounds));
        }

        let root = tree.root();
        create_hierarchy_from_blob(&mut tree, root, &leaves);

        log::debug!(
            "Built region tree for zone {:?}: {} leaves, {} internal nodes, depth {}",
            zone,
            tree.leaf_count(),
            tree.internal_count(),
            tree.depth()
        );

        let root_bounds = tree.root_bounds();
        if let Some(node) = self.node_mut(zone) {
            node.world_bounds = root_bounds;
            if let NodeKind::Zone(data) = &mut node.kind {
                data.region_tree = tree;
                data.lighting = lighting;
            }
        }
        Ok(())
    }

    /// Rebuild every zone from the root down and clear the dirty flag
    pub fn rebuild_all(&mut self, resources: &ResourceRegistry) -> SceneResult<()> {
        self.build_zone_hierarchy(self.root(), true, resources)?;
        self.mark_clean();
        Ok(())
    }

    /// World bounds of a built zone, or infinite bounds if it was never built
    pub fn zone_bounds(&self, zone: SceneNodeKey) -> SceneResult<Bounds> {
        Ok(self.zone(zone)?.region_tree.root_bounds())
    }
}
