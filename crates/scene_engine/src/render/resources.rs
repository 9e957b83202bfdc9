//! GPU resource handles consumed by the scene
//!
//! The visibility and batching passes never look inside these resources. They
//! only compare handles for identity and ordering, and hand them back to the
//! [`DrawSink`](super::DrawSink) when submitting.

use slotmap::{new_key_type, SlotMap};

use crate::spatial::Bounds;
use super::terrain::TerrainPatch;

new_key_type! {
    /// Handle to a registered mesh
    pub struct MeshHandle;
    /// Handle to a registered material
    pub struct MaterialHandle;
    /// Handle to a registered terrain patch
    pub struct TerrainPatchHandle;
}

/// Opaque id of a GPU buffer owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Width of index buffer elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexFormat {
    /// Size of one index in bytes
    pub fn size_in_bytes(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// GPU-resident geometry
#[derive(Debug, Clone)]
pub struct MeshResource {
    /// Vertex buffer
    pub vertex_buffer: BufferId,
    /// Index buffer
    pub index_buffer: BufferId,
    /// Number of indices to draw
    pub index_count: u32,
    /// First index to draw
    pub index_offset: u32,
    /// Index element width
    pub index_format: IndexFormat,
    /// Local-space bounds
    pub bounds: Bounds,
}

impl MeshResource {
    /// Mesh drawing `index_count` 32-bit indices from the start of its buffers
    pub fn new(vertex_buffer: BufferId, index_buffer: BufferId, index_count: u32, bounds: Bounds) -> Self {
        Self {
            vertex_buffer,
            index_buffer,
            index_count,
            index_offset: 0,
            index_format: IndexFormat::U32,
            bounds,
        }
    }

    /// Use 16-bit indices
    pub fn with_index_format(mut self, format: IndexFormat) -> Self {
        self.index_format = format;
        self
    }

    /// Start drawing at `offset`
    pub fn with_index_offset(mut self, offset: u32) -> Self {
        self.index_offset = offset;
        self
    }
}

/// Shading model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialType {
    /// Lit material
    #[default]
    Standard,
    /// Unlit color/texture material
    Unlit,
}

/// Alpha blending modes for materials
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlphaMode {
    /// No transparency
    #[default]
    Opaque,
    /// Alpha testing with cutoff value
    Mask(f32),
    /// Alpha blending
    Blend,
}

/// Material bindings as seen by the batcher
#[derive(Debug, Clone, Default)]
pub struct MaterialResource {
    /// Shading model
    pub material_type: MaterialType,
    /// Blending mode
    pub alpha_mode: AlphaMode,
    /// Optional name for debugging
    pub name: Option<String>,
}

impl MaterialResource {
    /// Opaque standard material
    pub fn standard() -> Self {
        Self::default()
    }

    /// Alpha-blended standard material
    pub fn transparent() -> Self {
        Self {
            alpha_mode: AlphaMode::Blend,
            ..Self::default()
        }
    }

    /// Set the material name for debugging
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the shading model
    pub fn with_material_type(mut self, material_type: MaterialType) -> Self {
        self.material_type = material_type;
        self
    }

    /// Whether draws using this material go in the transparent partition.
    /// Alpha-tested materials write depth and stay opaque.
    pub fn is_transparent(&self) -> bool {
        matches!(self.alpha_mode, AlphaMode::Blend)
    }
}

/// Registry for mesh, material and terrain resources
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    meshes: SlotMap<MeshHandle, MeshResource>,
    materials: SlotMap<MaterialHandle, MaterialResource>,
    terrain_patches: SlotMap<TerrainPatchHandle, TerrainPatch>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh
    pub fn add_mesh(&mut self, mesh: MeshResource) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    /// Register a material
    pub fn add_material(&mut self, material: MaterialResource) -> MaterialHandle {
        self.materials.insert(material)
    }

    /// Register a terrain patch
    pub fn add_terrain_patch(&mut self, patch: TerrainPatch) -> TerrainPatchHandle {
        self.terrain_patches.insert(patch)
    }

    /// Look up a mesh
    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshResource> {
        self.meshes.get(handle)
    }

    /// Look up a material
    pub fn material(&self, handle: MaterialHandle) -> Option<&MaterialResource> {
        self.materials.get(handle)
    }

    /// Look up a terrain patch
    pub fn terrain_patch(&self, handle: TerrainPatchHandle) -> Option<&TerrainPatch> {
        self.terrain_patches.get(handle)
    }

    /// Mutable access to a terrain patch, e.g. to switch its mip level
    pub fn terrain_patch_mut(&mut self, handle: TerrainPatchHandle) -> Option<&mut TerrainPatch> {
        self.terrain_patches.get_mut(handle)
    }

    /// Remove a mesh. Nodes still referencing it are skipped with a warning.
    pub fn remove_mesh(&mut self, handle: MeshHandle) -> Option<MeshResource> {
        self.meshes.remove(handle)
    }

    /// Remove a material
    pub fn remove_material(&mut self, handle: MaterialHandle) -> Option<MaterialResource> {
        self.materials.remove(handle)
    }

    /// Number of registered meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of registered materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
