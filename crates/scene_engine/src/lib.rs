//! # Scene Engine
//!
//! Zone-based visibility culling and draw batching for a real-time 3D renderer.
//!
//! ## Features
//!
//! - **Zones**: scene graph of zones, each owning a ternary region tree
//! - **Frustum Culling**: conservative box-versus-frustum rejection
//! - **Batching**: draw items sorted so material and mesh changes are minimized
//! - **Instancing**: one instanced draw per mesh group
//! - **Backend Agnostic**: submission goes through the [`render::DrawSink`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_engine::prelude::*;
//!
//! let mut registry = ResourceRegistry::new();
//! let unit = Bounds::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
//! let cube = registry.add_mesh(MeshResource::new(BufferId(0), BufferId(1), 36, unit));
//! let stone = registry.add_material(MaterialResource::standard());
//!
//! let mut graph = SceneGraph::new("world");
//! let root = graph.root();
//! for x in 0..4 {
//!     let transform = Mat4::translation(Vec3::new(x as f32 * 2.0, 0.0, 10.0));
//!     graph.add_instanced_static_mesh(root, cube, stone, transform)?;
//! }
//!
//! let mut camera = Camera::perspective(Vec3::zeros(), 60.0, 16.0 / 9.0, 0.1, 100.0);
//! camera.look_at(Vec3::new(3.0, 0.0, 10.0), Vec3::y());
//!
//! let mut renderer = SceneRenderer::new(RendererConfig::default())?;
//! let mut sink = RecordingSink::new();
//! let stats = renderer.render_frame(&mut graph, &registry, &camera, &mut sink)?;
//! assert_eq!(stats.batch.instanced_draws, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::{RendererConfig, TransparentOrdering},
        foundation::math::{Mat4, Mat4Ext, Vec3},
        render::{
            BufferId, Camera, DrawSink, FrameError, FrameStats, MaterialHandle, MaterialResource, MeshHandle,
            MeshResource, RecordingSink, ResourceRegistry, SceneRenderer, SphericalCamera, TerrainPatch,
            ViewCamera,
        },
        scene::{CollectMask, LightData, SceneError, SceneGraph, SceneNodeKey},
        spatial::{construct_frustum, Bounds, Frustum},
    };
}
