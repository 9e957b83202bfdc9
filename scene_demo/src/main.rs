//! Zone flythrough demo
//!
//! Builds a world of instanced crates, glass panes, a terrain patch and a
//! nested courtyard zone, then orbits a camera around it and logs what the
//! visibility and batching passes produce each frame.
//!
//! Usage: `zone_flythrough [renderer.toml|renderer.ron]`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::config::{Config, ConfigError};
use scene_engine::core::RendererConfig;
use scene_engine::foundation::logging;
use scene_engine::foundation::math::{constants, Mat4, Mat4Ext, Vec3};
use scene_engine::render::{
    BatchResult, BufferId, DrawSink, FrameError, HeightField, InstanceTransform, MaterialHandle, MaterialResource,
    MaterialType, MeshHandle, MeshResource, ResourceRegistry, SceneRenderer, SphericalCamera, TerrainError,
    TerrainPatch, TerrainPatchHandle,
};
use scene_engine::scene::{LightData, SceneError, SceneGraph, SceneNodeKey};
use scene_engine::spatial::Bounds;

const FRAME_COUNT: usize = 12;
const ORBIT_RADIUS: f32 = 90.0;
const ORBIT_HEIGHT: f32 = 30.0;
const GRID_SIZE: usize = 16;
const GRID_SPACING: f32 = 8.0;
const TERRAIN_EXTENT: usize = 32;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
    #[error("terrain: {0}")]
    Terrain(#[from] TerrainError),
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
}

/// Sink standing in for a GPU backend: logs binds and counts draws
#[derive(Default)]
struct LoggingSink {
    binds: usize,
    draws: usize,
    instances: usize,
}

impl DrawSink for LoggingSink {
    fn begin_frame(&mut self, _view: &Mat4, _projection: &Mat4) -> BatchResult<()> {
        self.binds = 0;
        self.draws = 0;
        self.instances = 0;
        Ok(())
    }

    fn bind_material(&mut self, handle: MaterialHandle, material: &MaterialResource) -> BatchResult<()> {
        log::trace!("bind material {:?} ({})", handle, material.name.as_deref().unwrap_or("unnamed"));
        self.binds += 1;
        Ok(())
    }

    fn bind_mesh(&mut self, handle: MeshHandle, mesh: &MeshResource) -> BatchResult<()> {
        log::trace!("bind mesh {:?} ({} indices)", handle, mesh.index_count);
        self.binds += 1;
        Ok(())
    }

    fn draw(&mut self, _mesh: MeshHandle, _material: MaterialHandle, _transform: &Mat4) -> BatchResult<()> {
        self.draws += 1;
        Ok(())
    }

    fn draw_instanced(
        &mut self,
        mesh: MeshHandle,
        _material: MaterialHandle,
        instances: &[InstanceTransform],
    ) -> BatchResult<()> {
        log::trace!("draw {} instances of {:?}", instances.len(), mesh);
        self.draws += 1;
        self.instances += instances.len();
        Ok(())
    }

    fn draw_terrain(
        &mut self,
        handle: TerrainPatchHandle,
        patch: &TerrainPatch,
        _material: MaterialHandle,
        _transform: &Mat4,
    ) -> BatchResult<()> {
        log::trace!("draw terrain {:?} at mip {}", handle, patch.current_mip);
        self.draws += 1;
        Ok(())
    }

    fn end_frame(&mut self) -> BatchResult<()> {
        log::debug!("Sink: {} binds, {} draws, {} instances", self.binds, self.draws, self.instances);
        Ok(())
    }
}

struct World {
    graph: SceneGraph,
    registry: ResourceRegistry,
    courtyard: SceneNodeKey,
}

fn rolling_heights(rng: &mut StdRng) -> Result<HeightField, TerrainError> {
    let phase: f32 = rng.gen_range(0.0..constants::PI);
    let mut heights = Vec::with_capacity(TERRAIN_EXTENT * TERRAIN_EXTENT);
    for y in 0..TERRAIN_EXTENT {
        for x in 0..TERRAIN_EXTENT {
            let wave = (x as f32 * 0.3 + phase).sin() * (y as f32 * 0.2).cos();
            heights.push(wave + rng.gen_range(-0.1..0.1));
        }
    }
    HeightField::from_heights(TERRAIN_EXTENT, TERRAIN_EXTENT, heights)
}

fn build_world(rng: &mut StdRng) -> Result<World, DemoError> {
    let mut registry = ResourceRegistry::new();
    let unit = Bounds::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
    let crate_mesh = registry.add_mesh(MeshResource::new(BufferId(1), BufferId(2), 36, unit));
    let pillar_mesh = registry.add_mesh(MeshResource::new(
        BufferId(3),
        BufferId(4),
        96,
        Bounds::from_center_extents(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.5, 2.0, 0.5)),
    ));
    let pane_mesh = registry.add_mesh(MeshResource::new(BufferId(5), BufferId(6), 6, unit));

    let wood = registry.add_material(MaterialResource::standard().with_name("wood"));
    let stone = registry.add_material(MaterialResource::standard().with_name("stone"));
    let glass = registry.add_material(MaterialResource::transparent().with_name("glass"));
    let grass = registry.add_material(
        MaterialResource::standard()
            .with_name("grass")
            .with_material_type(MaterialType::Unlit),
    );

    let mut patch = TerrainPatch::new(TERRAIN_EXTENT, TERRAIN_EXTENT, Vec3::new(4.0, 3.0, 4.0), 4)?;
    patch.set_heights(rolling_heights(rng)?)?;
    let mesh = patch.generate_mesh(1)?;
    log::info!(
        "Terrain mip 1: {} vertices, {} indices",
        mesh.vertices.len(),
        mesh.indices.len()
    );
    let terrain = registry.add_terrain_patch(patch);

    let mut graph = SceneGraph::new("world");
    let root = graph.root();
    graph.add_light(root, LightData::directional(Vec3::new(-0.3, -1.0, 0.2)))?;

    let half = GRID_SIZE as f32 * GRID_SPACING * 0.5;
    for row in 0..GRID_SIZE {
        for column in 0..GRID_SIZE {
            let jitter = Vec3::new(rng.gen_range(-1.5..1.5), 0.0, rng.gen_range(-1.5..1.5));
            let position = Vec3::new(
                column as f32 * GRID_SPACING - half,
                0.5,
                row as f32 * GRID_SPACING - half,
            ) + jitter;
            let transform = Mat4::translation(position) * Mat4::rotation_y(rng.gen_range(0.0..constants::PI));
            graph.add_instanced_static_mesh(root, crate_mesh, wood, transform)?;
        }
    }

    for _ in 0..12 {
        let position = Vec3::new(rng.gen_range(-half..half), 0.0, rng.gen_range(-half..half));
        graph.add_static_mesh(root, pillar_mesh, stone, Mat4::translation(position))?;
    }
    for _ in 0..6 {
        let position = Vec3::new(rng.gen_range(-half..half), 2.0, rng.gen_range(-half..half));
        graph.add_static_mesh(root, pane_mesh, glass, Mat4::translation_scale(position, 3.0))?;
    }

    let terrain_origin = -(TERRAIN_EXTENT as f32 * 2.0);
    graph.add_terrain_patch(
        root,
        terrain,
        grass,
        Mat4::translation(Vec3::new(terrain_origin, -4.0, terrain_origin)),
    )?;

    let courtyard = graph.add_zone(root, "courtyard", Mat4::translation(Vec3::new(0.0, 0.0, half + 20.0)))?;
    graph.add_light(courtyard, LightData::omni(Vec3::new(0.0, 6.0, 0.0), 25.0))?;
    for ring in 0..10 {
        let angle = ring as f32 / 10.0 * 2.0 * constants::PI;
        let position = Vec3::new(angle.cos() * 12.0, 0.5, angle.sin() * 12.0);
        graph.add_instanced_static_mesh(courtyard, crate_mesh, stone, Mat4::translation(position))?;
    }
    graph.add_static_mesh(courtyard, pane_mesh, glass, Mat4::translation_scale(Vec3::new(0.0, 3.0, 0.0), 4.0))?;

    log::info!("World built: {} nodes, {} meshes, {} materials", graph.len(), registry.mesh_count(), registry.material_count());
    Ok(World {
        graph,
        registry,
        courtyard,
    })
}

fn load_config() -> Result<RendererConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => RendererConfig::load_from_file(&path),
        None => Ok(RendererConfig::default()),
    }
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.logging.log_level);
    log::info!("Starting zone flythrough with {:?}", config.batching.transparent_ordering);

    let mut rng = StdRng::seed_from_u64(0x5EED);
    let World {
        mut graph,
        registry,
        courtyard,
    } = build_world(&mut rng)?;

    let mut renderer = SceneRenderer::new(config)?;
    let mut camera = SphericalCamera::default().with_aspect_ratio(16.0 / 9.0);
    let mut sink = LoggingSink::default();

    for frame in 0..FRAME_COUNT {
        let angle = frame as f32 / FRAME_COUNT as f32 * 2.0 * constants::PI;
        camera.position = Vec3::new(angle.cos() * ORBIT_RADIUS, ORBIT_HEIGHT, angle.sin() * ORBIT_RADIUS);
        camera.look_at(Vec3::zeros());

        // Halfway round, slide the courtyard sideways to force a rebuild
        if frame == FRAME_COUNT / 2 {
            let shifted = Mat4::translation(Vec3::new(40.0, 0.0, GRID_SIZE as f32 * GRID_SPACING * 0.5 + 20.0));
            graph.set_local_transform(courtyard, shifted)?;
        }

        let stats = renderer.render_frame(&mut graph, &registry, &camera, &mut sink)?;
        log::info!(
            "Frame {:2}: visible {:3} static / {:3} instanced / {} terrain, {:3} draw calls ({:.1} instances per draw), culled {}/{} regions{}, {}us",
            frame,
            stats.visible_static_meshes,
            stats.visible_instanced_meshes,
            stats.visible_terrain_patches,
            stats.batch.total_draw_calls(),
            stats.batch.avg_instances_per_draw(),
            stats.regions_culled,
            stats.regions_tested,
            if stats.rebuilt { ", rebuilt" } else { "" },
            stats.frame_time_us,
        );
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("zone_flythrough failed: {}", e);
        eprintln!("zone_flythrough failed: {}", e);
        std::process::exit(1);
    }
}
