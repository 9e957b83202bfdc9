//! # Rendering Front End
//!
//! Everything between a collected visible set and a graphics backend.
//!
//! ## Architecture
//!
//! - **Resources**: generational handles for meshes, materials and terrain patches
//! - **Render Queue**: per-frame draw items sorted for batching
//! - **Draw Submitter**: groups sorted items into material, mesh and instanced draws
//! - **Draw Sink**: backend seam receiving binds and draws
//! - **Scene Renderer**: per-frame driver tying the scene and batching together
//!
//! No GPU API is touched here. A backend implements [`DrawSink`] and
//! receives already-grouped work.

pub mod batch_renderer;
pub mod primitives;
pub mod render_queue;
pub mod resources;
pub mod scene_renderer;
pub mod sink;
pub mod terrain;

#[cfg(test)]
mod tests;

pub use batch_renderer::{BatchError, BatchResult, BatchStats, DrawSubmitter};
pub use primitives::{Camera, SphericalCamera, ViewCamera};
pub use render_queue::{sort_for_batching, sort_terrain_by_distance, CommandType, DrawItem, RenderQueue, TerrainDrawItem};
pub use resources::{
    AlphaMode, BufferId, IndexFormat, MaterialHandle, MaterialResource, MaterialType, MeshHandle, MeshResource,
    ResourceRegistry, TerrainPatchHandle,
};
pub use scene_renderer::{FrameError, FrameStats, SceneRenderer};
pub use sink::{DrawCommand, DrawSink, InstanceTransform, RecordingSink};
pub use terrain::{HeightBounds, HeightField, TerrainError, TerrainGpuMesh, TerrainMeshData, TerrainPatch};
