//! Scene Renderer - per-frame visibility and submission driver
//!
//! Runs the whole pass for one camera view:
//!
//! 1. recompute global transforms
//! 2. rebuild region trees if the graph changed and auto-rebuild is on
//! 3. build the camera frustum and collect potentially visible nodes
//! 4. build and sort draw items
//! 5. submit opaque meshes and terrain, then transparent meshes and terrain

use std::time::Instant;

use crate::config::ConfigError;
use crate::core::RendererConfig;
use crate::scene::{collect_visible_nodes, SceneError, SceneGraph, VisibleSet};

use super::batch_renderer::{BatchError, BatchStats, DrawSubmitter};
use super::primitives::ViewCamera;
use super::render_queue::{CommandType, RenderQueue};
use super::resources::ResourceRegistry;
use super::sink::DrawSink;

/// Errors that abort a frame
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Renderer configuration rejected
    #[error("Invalid renderer configuration: {0}")]
    Config(#[from] ConfigError),

    /// Scene graph could not be traversed or rebuilt
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Submission failed
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

/// Statistics for one rendered frame
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    /// Whether region trees were rebuilt this frame
    pub rebuilt: bool,
    /// Visible static meshes
    pub visible_static_meshes: usize,
    /// Visible instanced static meshes
    pub visible_instanced_meshes: usize,
    /// Visible terrain patches
    pub visible_terrain_patches: usize,
    /// Region nodes tested against the frustum
    pub regions_tested: usize,
    /// Region nodes culled
    pub regions_culled: usize,
    /// Submission counters
    pub batch: BatchStats,
    /// Wall time of the whole pass (microseconds)
    pub frame_time_us: u64,
}

/// Split a sorted list into its opaque and transparent runs
fn split_transparent<T>(items: &[T], command_type: impl Fn(&T) -> CommandType) -> (&[T], &[T]) {
    let split = items.partition_point(|item| command_type(item) == CommandType::Opaque);
    items.split_at(split)
}

/// Visibility and batching pipeline with reusable per-frame storage
#[derive(Debug)]
pub struct SceneRenderer {
    config: RendererConfig,
    visible: VisibleSet,
    queue: RenderQueue,
    submitter: DrawSubmitter,
    frame_count: u64,
}

impl SceneRenderer {
    /// Create a renderer after validating `config`
    pub fn new(config: RendererConfig) -> Result<Self, FrameError> {
        config.validate()?;
        let submitter = DrawSubmitter::new(config.batching.instance_cache_capacity)?;
        log::info!(
            "Scene renderer created: instance cache {} slots, {:?} transparent ordering",
            config.batching.instance_cache_capacity,
            config.batching.transparent_ordering
        );
        Ok(Self {
            config,
            visible: VisibleSet::default(),
            queue: RenderQueue::new(),
            submitter,
            frame_count: 0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Visible set of the last frame
    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    /// Sorted draw lists of the last frame
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Render one frame of `graph` from `camera` into `sink`.
    ///
    /// Nothing is submitted if collection fails. A submission error aborts
    /// the rest of the frame without calling `end_frame`.
    pub fn render_frame(
        &mut self,
        graph: &mut SceneGraph,
        resources: &ResourceRegistry,
        camera: &dyn ViewCamera,
        sink: &mut dyn DrawSink,
    ) -> Result<FrameStats, FrameError> {
        let start_time = Instant::now();
        self.frame_count += 1;
        let mut stats = FrameStats::default();

        graph.update_transforms();
        let root = graph.root();

        if graph.is_dirty() && self.config.visibility.auto_rebuild {
            graph.build_zone_hierarchy(root, self.config.visibility.rebuild_child_zones, resources)?;
            graph.mark_clean();
            stats.rebuilt = true;
        }

        let frustum = camera.frustum();
        let camera_position = camera.position();

        self.visible.clear();
        collect_visible_nodes(
            graph,
            root,
            &frustum,
            self.config.visibility.collect_mask(),
            &mut self.visible,
        )?;

        self.queue.build(graph, resources, &self.visible, camera_position);
        self.queue.sort(self.config.batching.transparent_ordering);

        self.submitter.reset_stats();
        sink.begin_frame(&camera.view_matrix(), &camera.projection_matrix())?;

        let (static_opaque, static_transparent) = split_transparent(self.queue.static_meshes(), |i| i.command_type);
        let (instanced_opaque, instanced_transparent) =
            split_transparent(self.queue.instanced_meshes(), |i| i.command_type);
        let (terrain_opaque, terrain_transparent) = split_transparent(self.queue.terrain_patches(), |i| i.command_type);

        self.submitter.submit_meshes(static_opaque, false, resources, sink)?;
        self.submitter.submit_meshes(instanced_opaque, true, resources, sink)?;
        self.submitter.submit_terrain(terrain_opaque, resources, sink)?;
        self.submitter.submit_meshes(static_transparent, false, resources, sink)?;
        self.submitter.submit_meshes(instanced_transparent, true, resources, sink)?;
        self.submitter.submit_terrain(terrain_transparent, resources, sink)?;

        sink.end_frame()?;

        stats.visible_static_meshes = self.visible.static_meshes.len();
        stats.visible_instanced_meshes = self.visible.instanced_meshes.len();
        stats.visible_terrain_patches = self.visible.terrain_patches.len();
        stats.regions_tested = self.visible.regions_tested;
        stats.regions_culled = self.visible.regions_culled;
        stats.batch = self.submitter.stats().clone();
        stats.batch.skipped_items += self.queue.skipped();
        stats.frame_time_us = start_time.elapsed().as_micros() as u64;

        log::trace!(
            "Frame {}: {} visible, {} draw calls, {} regions culled of {}",
            self.frame_count,
            self.visible.len(),
            stats.batch.total_draw_calls(),
            stats.regions_culled,
            stats.regions_tested
        );

        Ok(stats)
    }
}
