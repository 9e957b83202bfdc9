//! Integration tests for a full visibility and submission frame
//!
//! Scene graph, region trees, collection, sorting and submission running
//! together through `SceneRenderer` into a recording sink.

use crate::core::{RendererConfig, TransparentOrdering};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::{
    BufferId, DrawCommand, FrameError, MaterialHandle, MaterialResource, MeshHandle, MeshResource, RecordingSink,
    ResourceRegistry, SceneRenderer, TerrainPatch,
};
use crate::render::primitives::Camera;
use crate::scene::{SceneGraph, SceneNodeKey};
use crate::spatial::Bounds;

struct Frame {
    registry: ResourceRegistry,
    graph: SceneGraph,
    cube: MeshHandle,
    stone: MaterialHandle,
    glass: MaterialHandle,
    behind: SceneNodeKey,
}

fn at(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::translation(Vec3::new(x, y, z))
}

/// Camera at the origin looking down +Z
fn camera() -> Camera {
    let mut camera = Camera::perspective(Vec3::zeros(), 90.0, 1.0, 0.1, 100.0);
    camera.look_at(Vec3::z(), Vec3::y());
    camera
}

fn frame() -> Frame {
    let mut registry = ResourceRegistry::new();
    let unit = Bounds::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
    let cube = registry.add_mesh(MeshResource::new(BufferId(1), BufferId(2), 36, unit));
    let pane = registry.add_mesh(MeshResource::new(BufferId(3), BufferId(4), 6, unit));
    let stone = registry.add_material(MaterialResource::standard().with_name("stone"));
    let glass = registry.add_material(MaterialResource::transparent().with_name("glass"));
    let patch = registry.add_terrain_patch(TerrainPatch::new(2, 2, Vec3::repeat(1.0), 1).unwrap());

    let mut graph = SceneGraph::new("world");
    let root = graph.root();

    for x in [-1.0, 0.0, 1.0] {
        graph.add_instanced_static_mesh(root, cube, stone, at(x, 0.0, 10.0)).unwrap();
    }
    // Closest to the camera, so it sorts first by distance
    graph.add_static_mesh(root, pane, glass, at(0.0, 0.0, 5.0)).unwrap();
    graph.add_static_mesh(root, cube, stone, at(0.0, 0.0, 8.0)).unwrap();
    graph.add_terrain_patch(root, patch, stone, at(-1.0, -1.0, 15.0)).unwrap();
    let behind = graph.add_static_mesh(root, cube, stone, at(0.0, 0.0, -10.0)).unwrap();

    Frame {
        registry,
        graph,
        cube,
        stone,
        glass,
        behind,
    }
}

fn draw_materials(sink: &RecordingSink) -> Vec<MaterialHandle> {
    sink.draws().filter_map(DrawCommand::material).collect()
}

#[test]
fn test_instanced_group_and_transparent_last() {
    let Frame {
        registry,
        mut graph,
        cube,
        stone,
        glass,
        ..
    } = frame();
    let mut renderer = SceneRenderer::new(RendererConfig::default()).unwrap();
    let mut sink = RecordingSink::new();

    let stats = renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();

    let instanced: Vec<_> = sink
        .draws()
        .filter_map(|c| match c {
            DrawCommand::DrawInstanced { mesh, material, instances } => Some((*mesh, *material, instances.len())),
            _ => None,
        })
        .collect();
    assert_eq!(instanced, vec![(cube, stone, 3)]);

    let materials = draw_materials(&sink);
    let first_glass = materials.iter().position(|m| *m == glass).unwrap();
    let last_stone = materials.iter().rposition(|m| *m == stone).unwrap();
    assert!(last_stone < first_glass);
    assert_eq!(materials.len(), 4);

    assert!(stats.rebuilt);
    assert_eq!(stats.visible_instanced_meshes, 3);
    assert_eq!(stats.visible_static_meshes, 2);
    assert_eq!(stats.visible_terrain_patches, 1);
    assert_eq!(stats.batch.instanced_draws, 1);
    assert_eq!(stats.batch.instances, 3);
    assert_eq!(stats.batch.draw_calls, 2);
    assert_eq!(stats.batch.terrain_draws, 1);
    assert_eq!(stats.batch.skipped_items, 0);
}

#[test]
fn test_frame_is_bracketed() {
    let Frame { registry, mut graph, .. } = frame();
    let mut renderer = SceneRenderer::new(RendererConfig::default()).unwrap();
    let mut sink = RecordingSink::new();
    renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();

    assert_eq!(sink.commands.first(), Some(&DrawCommand::BeginFrame));
    assert_eq!(sink.commands.last(), Some(&DrawCommand::EndFrame));
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn test_rebuild_only_when_dirty() {
    let Frame {
        registry,
        mut graph,
        behind,
        ..
    } = frame();
    let mut renderer = SceneRenderer::new(RendererConfig::default()).unwrap();
    let mut sink = RecordingSink::new();

    assert!(renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap().rebuilt);
    assert!(!graph.is_dirty());

    sink.clear();
    let stats = renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();
    assert!(!stats.rebuilt);
    assert_eq!(stats.visible_static_meshes, 2);

    // Moving the node in front of the camera dirties the graph
    graph.set_local_transform(behind, at(3.0, 0.0, 20.0)).unwrap();
    sink.clear();
    let stats = renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();
    assert!(stats.rebuilt);
    assert_eq!(stats.visible_static_meshes, 3);
    assert!(renderer.queue().static_meshes().iter().any(|item| item.node == behind));
}

#[test]
fn test_culled_nodes_are_not_drawn() {
    let Frame {
        registry,
        mut graph,
        behind,
        ..
    } = frame();
    let mut renderer = SceneRenderer::new(RendererConfig::default()).unwrap();
    let mut sink = RecordingSink::new();
    let stats = renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();

    assert!(!renderer.visible().static_meshes.contains(&behind));
    assert!(stats.regions_culled > 0);
    assert!(stats.regions_culled <= stats.regions_tested);

    // Turning around sees only the node behind
    let mut back = camera();
    back.look_at(-Vec3::z(), Vec3::y());
    sink.clear();
    let stats = renderer.render_frame(&mut graph, &registry, &back, &mut sink).unwrap();
    assert_eq!(stats.visible_static_meshes, 1);
    assert_eq!(renderer.visible().static_meshes, vec![behind]);
    assert_eq!(sink.draws().count(), 1);
}

#[test]
fn test_auto_rebuild_disabled_draws_nothing_until_built() {
    let Frame { registry, mut graph, .. } = frame();
    let mut config = RendererConfig::default();
    config.visibility.auto_rebuild = false;
    let mut renderer = SceneRenderer::new(config).unwrap();
    let mut sink = RecordingSink::new();

    let stats = renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();
    assert!(!stats.rebuilt);
    assert_eq!(sink.draws().count(), 0);
    assert!(graph.is_dirty());

    graph.rebuild_all(&registry).unwrap();
    sink.clear();
    renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();
    assert_eq!(sink.draws().count(), 4);
}

#[test]
fn test_back_to_front_transparent_ordering() {
    let Frame {
        mut registry,
        mut graph,
        glass,
        ..
    } = frame();
    let unit = Bounds::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
    let far_pane = registry.add_mesh(MeshResource::new(BufferId(5), BufferId(6), 6, unit));
    let root = graph.root();
    graph.add_static_mesh(root, far_pane, glass, at(0.0, 0.0, 30.0)).unwrap();

    let mut config = RendererConfig::default();
    config.batching.transparent_ordering = TransparentOrdering::BackToFront;
    let mut renderer = SceneRenderer::new(config).unwrap();
    let mut sink = RecordingSink::new();
    renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();

    let glass_draws: Vec<_> = sink
        .draws()
        .filter_map(|c| match c {
            DrawCommand::Draw { mesh, material, .. } if *material == glass => Some(*mesh),
            _ => None,
        })
        .collect();
    assert_eq!(glass_draws.len(), 2);
    assert_eq!(glass_draws[0], far_pane);
}

#[test]
fn test_transparent_terrain_drawn_after_transparent_meshes() {
    let Frame {
        mut registry,
        mut graph,
        stone,
        glass,
        ..
    } = frame();
    let water = registry.add_terrain_patch(TerrainPatch::new(2, 2, Vec3::repeat(1.0), 1).unwrap());
    let root = graph.root();
    graph.add_terrain_patch(root, water, glass, at(-1.0, -1.0, 12.0)).unwrap();

    let mut renderer = SceneRenderer::new(RendererConfig::default()).unwrap();
    let mut sink = RecordingSink::new();
    let stats = renderer.render_frame(&mut graph, &registry, &camera(), &mut sink).unwrap();
    assert_eq!(stats.batch.terrain_draws, 2);

    let draws: Vec<_> = sink.draws().collect();
    let stone_terrain = draws
        .iter()
        .position(|c| matches!(c, DrawCommand::DrawTerrain { material, .. } if *material == stone))
        .unwrap();
    let glass_pane = draws
        .iter()
        .position(|c| matches!(c, DrawCommand::Draw { material, .. } if *material == glass))
        .unwrap();
    assert!(stone_terrain < glass_pane);
    assert_eq!(
        draws.last(),
        Some(&&DrawCommand::DrawTerrain {
            patch: water,
            material: glass
        })
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = RendererConfig::default();
    config.batching.instance_cache_capacity = 0;
    assert!(matches!(SceneRenderer::new(config), Err(FrameError::Config(_))));
}
