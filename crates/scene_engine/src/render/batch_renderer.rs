//! # Batch Renderer
//!
//! Walks sorted draw lists and hands them to a [`DrawSink`] with as few state
//! changes as the ordering allows.
//!
//! ## Grouping
//!
//! - **Material groups**: contiguous items sharing a material, one bind each
//! - **Mesh groups**: contiguous items inside a material group sharing a mesh,
//!   one bind each
//! - **Instanced mesh groups**: transforms gathered in the instance cache and
//!   drawn with a single instanced call
//!
//! Terrain patches are drawn one at a time in the order given.

use std::time::Instant;

use crate::foundation::collections::{CacheError, InstanceCache};

use super::render_queue::{DrawItem, TerrainDrawItem};
use super::resources::ResourceRegistry;
use super::sink::{DrawSink, InstanceTransform};

/// Result type for batch rendering operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur during batch submission
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The instance cache could not grow; the batch was not submitted
    #[error("Instance cache error: {0}")]
    Cache(#[from] CacheError),

    /// The draw sink rejected a call
    #[error("Draw submission failed: {0}")]
    SubmissionFailed(String),
}

/// Statistics for batch submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Items handed to the sink
    pub submitted_items: usize,

    /// Items dropped because a resource was missing
    pub skipped_items: usize,

    /// Single draws
    pub draw_calls: usize,

    /// Instanced draws
    pub instanced_draws: usize,

    /// Instances across all instanced draws
    pub instances: usize,

    /// Terrain patch draws
    pub terrain_draws: usize,

    /// Material binds
    pub material_binds: usize,

    /// Mesh binds
    pub mesh_binds: usize,

    /// Time spent submitting (microseconds)
    pub submission_time_us: u64,
}

impl BatchStats {
    /// Every draw call issued, instanced or not
    pub fn total_draw_calls(&self) -> usize {
        self.draw_calls + self.instanced_draws + self.terrain_draws
    }

    /// Calculate average instances per instanced draw
    pub fn avg_instances_per_draw(&self) -> f32 {
        if self.instanced_draws == 0 {
            0.0
        } else {
            self.instances as f32 / self.instanced_draws as f32
        }
    }
}

/// End of the run of items starting at `start` for which `same` holds
fn group_end(items: &[DrawItem], start: usize, end: usize, same: impl Fn(&DrawItem) -> bool) -> usize {
    items[start..end]
        .iter()
        .position(|item| !same(item))
        .map_or(end, |offset| start + offset)
}

/// Submits sorted draw lists, owning the instance cache
#[derive(Debug)]
pub struct DrawSubmitter {
    instance_cache: InstanceCache<InstanceTransform>,
    stats: BatchStats,
}

impl DrawSubmitter {
    /// Create a submitter whose instance cache starts with `instance_capacity` slots
    pub fn new(instance_capacity: usize) -> BatchResult<Self> {
        Ok(Self {
            instance_cache: InstanceCache::new(instance_capacity)?,
            stats: BatchStats::default(),
        })
    }

    /// Submit a list sorted by [`sort_for_batching`](super::sort_for_batching).
    ///
    /// With `instanced` every mesh group becomes one instanced draw;
    /// otherwise every item gets its own draw.
    pub fn submit_meshes(
        &mut self,
        items: &[DrawItem],
        instanced: bool,
        resources: &ResourceRegistry,
        sink: &mut dyn DrawSink,
    ) -> BatchResult<()> {
        let start_time = Instant::now();
        let mut start = 0;

        while start < items.len() {
            let material = items[start].material;
            let material_end = group_end(items, start, items.len(), |item| item.material == material);

            let Some(material_resource) = resources.material(material) else {
                log::warn!("Material {:?} is not registered, skipping {} items", material, material_end - start);
                self.stats.skipped_items += material_end - start;
                start = material_end;
                continue;
            };
            sink.bind_material(material, material_resource)?;
            self.stats.material_binds += 1;

            while start < material_end {
                let mesh = items[start].mesh;
                let mesh_end = group_end(items, start, material_end, |item| item.mesh == mesh);
                let group = &items[start..mesh_end];
                start = mesh_end;

                let Some(mesh_resource) = resources.mesh(mesh) else {
                    log::warn!("Mesh {:?} is not registered, skipping {} items", mesh, group.len());
                    self.stats.skipped_items += group.len();
                    continue;
                };
                sink.bind_mesh(mesh, mesh_resource)?;
                self.stats.mesh_binds += 1;

                if instanced {
                    self.instance_cache.clear();
                    for item in group {
                        self.instance_cache.push(InstanceTransform::from(&item.transform))?;
                    }
                    sink.draw_instanced(mesh, material, self.instance_cache.as_slice())?;
                    self.stats.instanced_draws += 1;
                    self.stats.instances += group.len();
                } else {
                    for item in group {
                        sink.draw(mesh, material, &item.transform)?;
                    }
                    self.stats.draw_calls += group.len();
                }
                self.stats.submitted_items += group.len();
            }
        }

        self.stats.submission_time_us += start_time.elapsed().as_micros() as u64;
        Ok(())
    }

    /// Submit terrain patches one draw each
    pub fn submit_terrain(
        &mut self,
        items: &[TerrainDrawItem],
        resources: &ResourceRegistry,
        sink: &mut dyn DrawSink,
    ) -> BatchResult<()> {
        let start_time = Instant::now();

        for item in items {
            let (Some(patch), Some(material)) = (resources.terrain_patch(item.patch), resources.material(item.material))
            else {
                log::warn!("Terrain node {:?} references unregistered resources, skipping", item.node);
                self.stats.skipped_items += 1;
                continue;
            };

            sink.bind_material(item.material, material)?;
            self.stats.material_binds += 1;
            sink.draw_terrain(item.patch, patch, item.material, &item.transform)?;
            self.stats.terrain_draws += 1;
            self.stats.submitted_items += 1;
        }

        self.stats.submission_time_us += start_time.elapsed().as_micros() as u64;
        Ok(())
    }

    /// Instance cache, e.g. to inspect its capacity
    pub fn instance_cache(&self) -> &InstanceCache<InstanceTransform> {
        &self.instance_cache
    }

    /// Get current submission statistics
    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = BatchStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransparentOrdering;
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
    use crate::render::render_queue::{sort_for_batching, CommandType};
    use crate::render::resources::{BufferId, MaterialHandle, MaterialResource, MeshHandle, MeshResource};
    use crate::render::sink::{DrawCommand, RecordingSink};
    use crate::scene::SceneNodeKey;
    use crate::spatial::Bounds;
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    struct Fixture {
        registry: ResourceRegistry,
        nodes: SlotMap<SceneNodeKey, ()>,
        meshes: Vec<MeshHandle>,
        materials: Vec<MaterialHandle>,
    }

    fn fixture() -> Fixture {
        let mut registry = ResourceRegistry::new();
        let bounds = Bounds::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        let meshes = (0..2)
            .map(|i| registry.add_mesh(MeshResource::new(BufferId(i * 2), BufferId(i * 2 + 1), 36, bounds)))
            .collect();
        let materials = vec![
            registry.add_material(MaterialResource::standard().with_name("a")),
            registry.add_material(MaterialResource::standard().with_name("b")),
        ];
        Fixture {
            registry,
            nodes: SlotMap::with_key(),
            meshes,
            materials,
        }
    }

    fn item(f: &mut Fixture, mesh: usize, material: usize, x: f32) -> DrawItem {
        DrawItem {
            node: f.nodes.insert(()),
            mesh: f.meshes[mesh],
            material: f.materials[material],
            command_type: CommandType::Opaque,
            distance_sq: x * x,
            transform: Mat4::translation(Vec3::new(x, 0.0, 0.0)),
        }
    }

    #[test]
    fn test_instanced_groups() {
        let mut f = fixture();
        let mut items = vec![
            item(&mut f, 0, 0, 3.0),
            item(&mut f, 1, 0, 1.0),
            item(&mut f, 0, 0, 2.0),
            item(&mut f, 0, 1, 4.0),
        ];
        sort_for_batching(&mut items, TransparentOrdering::Grouped);

        let mut submitter = DrawSubmitter::new(1).unwrap();
        let mut sink = RecordingSink::new();
        submitter.submit_meshes(&items, true, &f.registry, &mut sink).unwrap();

        let stats = submitter.stats();
        assert_eq!(stats.material_binds, 2);
        assert_eq!(stats.mesh_binds, 3);
        assert_eq!(stats.instanced_draws, 3);
        assert_eq!(stats.instances, 4);
        assert_eq!(stats.draw_calls, 0);
        assert_relative_eq!(stats.avg_instances_per_draw(), 4.0 / 3.0);

        // First instanced draw is mesh 0 / material 0 with the nearer instance first
        let first = sink.draws().next().cloned().unwrap();
        match first {
            DrawCommand::DrawInstanced { mesh, material, instances } => {
                assert_eq!(mesh, f.meshes[0]);
                assert_eq!(material, f.materials[0]);
                let xs: Vec<f32> = instances.iter().map(|i| i.model[3][0]).collect();
                assert_eq!(xs, vec![2.0, 3.0]);
            }
            other => panic!("unexpected command {:?}", other),
        }

        // Cache grew from one slot to hold the pair
        assert!(submitter.instance_cache().reserved() >= 2);
    }

    #[test]
    fn test_non_instanced_draws_each_item() {
        let mut f = fixture();
        let mut items = vec![item(&mut f, 0, 0, 1.0), item(&mut f, 0, 0, 2.0), item(&mut f, 1, 1, 3.0)];
        sort_for_batching(&mut items, TransparentOrdering::Grouped);

        let mut submitter = DrawSubmitter::new(4).unwrap();
        let mut sink = RecordingSink::new();
        submitter.submit_meshes(&items, false, &f.registry, &mut sink).unwrap();

        assert_eq!(submitter.stats().draw_calls, 3);
        assert_eq!(submitter.stats().mesh_binds, 2);
        let kinds: Vec<_> = sink
            .commands
            .iter()
            .map(|c| match c {
                DrawCommand::BindMaterial(_) => "material",
                DrawCommand::BindMesh(_) => "mesh",
                DrawCommand::Draw { .. } => "draw",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["material", "mesh", "draw", "draw", "material", "mesh", "draw"]);
    }

    #[test]
    fn test_missing_resources_are_skipped() {
        let mut f = fixture();
        let items = vec![item(&mut f, 0, 0, 1.0), item(&mut f, 1, 0, 2.0)];
        f.registry.remove_mesh(f.meshes[1]);

        let mut submitter = DrawSubmitter::new(4).unwrap();
        let mut sink = RecordingSink::new();
        submitter.submit_meshes(&items, true, &f.registry, &mut sink).unwrap();

        assert_eq!(submitter.stats().skipped_items, 1);
        assert_eq!(submitter.stats().submitted_items, 1);
        assert_eq!(sink.draws().count(), 1);

        submitter.reset_stats();
        assert_eq!(submitter.stats(), &BatchStats::default());
    }

    struct FailingSink;

    impl DrawSink for FailingSink {
        fn begin_frame(&mut self, _: &Mat4, _: &Mat4) -> BatchResult<()> {
            Ok(())
        }
        fn bind_material(&mut self, _: MaterialHandle, _: &MaterialResource) -> BatchResult<()> {
            Ok(())
        }
        fn bind_mesh(&mut self, _: MeshHandle, _: &MeshResource) -> BatchResult<()> {
            Err(BatchError::SubmissionFailed("device lost".into()))
        }
        fn draw(&mut self, _: MeshHandle, _: MaterialHandle, _: &Mat4) -> BatchResult<()> {
            Ok(())
        }
        fn draw_instanced(&mut self, _: MeshHandle, _: MaterialHandle, _: &[InstanceTransform]) -> BatchResult<()> {
            Ok(())
        }
        fn draw_terrain(
            &mut self,
            _: crate::render::TerrainPatchHandle,
            _: &crate::render::TerrainPatch,
            _: MaterialHandle,
            _: &Mat4,
        ) -> BatchResult<()> {
            Ok(())
        }
        fn end_frame(&mut self) -> BatchResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_errors_propagate() {
        let mut f = fixture();
        let items = vec![item(&mut f, 0, 0, 1.0)];
        let mut submitter = DrawSubmitter::new(4).unwrap();
        let err = submitter.submit_meshes(&items, false, &f.registry, &mut FailingSink).unwrap_err();
        assert!(matches!(err, BatchError::SubmissionFailed(_)));
    }
}
