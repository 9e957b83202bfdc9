//! Spatial partitioning data structures
//!
//! Bounding volumes, view frustums and the per-zone ternary region tree used
//! for conservative visibility queries.

mod bounds;
mod frustum;
mod region_tree;
mod hierarchy_builder;

pub use bounds::{Axis, Bounds, transform_bounds};
pub use frustum::{Frustum, FrustumPlane, Plane, construct_frustum};
pub use region_tree::{RegionId, RegionNode, RegionTree};
pub use hierarchy_builder::create_hierarchy_from_blob;
