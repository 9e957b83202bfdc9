//! Scene management
//!
//! Placement nodes arranged in zones, the per-zone region trees built over
//! them, and the frustum traversal that turns a camera view into per-kind
//! lists of potentially visible nodes.
//!
//! ```text
//! SceneGraph (zones own children)
//!      ↓ build_zone_hierarchy
//! RegionTree per zone
//!      ↓ collect_visible_nodes
//! VisibleSet (static / instanced / terrain)
//! ```

mod scene_graph;
mod visibility;
mod zone_builder;

pub use scene_graph::{
    compute_global_transforms, LightData, LightKind, MeshInstance, NodeKind, NodeTransform, SceneError,
    SceneGraph, SceneNode, SceneNodeKey, SceneResult, TerrainInstance, ZoneData, ZoneLighting,
};
pub use visibility::{collect_visible_nodes, CollectMask, VisibleSet};
