//! Submission collaborator interface
//!
//! The core never talks to a graphics API. It hands bind and draw requests to
//! a [`DrawSink`], guaranteeing that all draws for one material and mesh group
//! arrive contiguously.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Mat4;

use super::batch_renderer::BatchResult;
use super::resources::{MaterialHandle, MaterialResource, MeshHandle, MeshResource, TerrainPatchHandle};
use super::terrain::TerrainPatch;

/// Per-instance vertex data: a column-major model matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    /// Model matrix columns
    pub model: [[f32; 4]; 4],
}

impl From<&Mat4> for InstanceTransform {
    fn from(matrix: &Mat4) -> Self {
        Self { model: (*matrix).into() }
    }
}

impl From<InstanceTransform> for Mat4 {
    fn from(instance: InstanceTransform) -> Self {
        Mat4::from(instance.model)
    }
}

/// Receiver of the ordered draw stream
pub trait DrawSink {
    /// Start a frame with the camera matrices
    fn begin_frame(&mut self, view: &Mat4, projection: &Mat4) -> BatchResult<()>;

    /// Bind shader and texture state for the draws that follow
    fn bind_material(&mut self, handle: MaterialHandle, material: &MaterialResource) -> BatchResult<()>;

    /// Bind vertex and index buffers for the draws that follow
    fn bind_mesh(&mut self, handle: MeshHandle, mesh: &MeshResource) -> BatchResult<()>;

    /// Draw the bound mesh once
    fn draw(&mut self, mesh: MeshHandle, material: MaterialHandle, transform: &Mat4) -> BatchResult<()>;

    /// Draw the bound mesh once per instance.
    ///
    /// `instances` borrows the submitter's instance cache and is only valid
    /// for the duration of the call.
    fn draw_instanced(
        &mut self,
        mesh: MeshHandle,
        material: MaterialHandle,
        instances: &[InstanceTransform],
    ) -> BatchResult<()>;

    /// Draw one terrain patch with its own buffers
    fn draw_terrain(
        &mut self,
        handle: TerrainPatchHandle,
        patch: &TerrainPatch,
        material: MaterialHandle,
        transform: &Mat4,
    ) -> BatchResult<()>;

    /// Finish the frame
    fn end_frame(&mut self) -> BatchResult<()>;
}

/// A call received by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// `begin_frame`
    BeginFrame,
    /// `bind_material`
    BindMaterial(MaterialHandle),
    /// `bind_mesh`
    BindMesh(MeshHandle),
    /// `draw`
    Draw {
        /// Mesh drawn
        mesh: MeshHandle,
        /// Material bound
        material: MaterialHandle,
        /// Model matrix
        transform: Mat4,
    },
    /// `draw_instanced`
    DrawInstanced {
        /// Mesh drawn
        mesh: MeshHandle,
        /// Material bound
        material: MaterialHandle,
        /// Model matrices in submission order
        instances: Vec<InstanceTransform>,
    },
    /// `draw_terrain`
    DrawTerrain {
        /// Patch drawn
        patch: TerrainPatchHandle,
        /// Material used
        material: MaterialHandle,
    },
    /// `end_frame`
    EndFrame,
}

impl DrawCommand {
    /// Whether the command issues geometry
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DrawCommand::Draw { .. } | DrawCommand::DrawInstanced { .. } | DrawCommand::DrawTerrain { .. }
        )
    }

    /// Material of a draw command
    pub fn material(&self) -> Option<MaterialHandle> {
        match self {
            DrawCommand::Draw { material, .. }
            | DrawCommand::DrawInstanced { material, .. }
            | DrawCommand::DrawTerrain { material, .. } => Some(*material),
            _ => None,
        }
    }
}

/// Sink that stores every call, for tests and tooling
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Calls in arrival order
    pub commands: Vec<DrawCommand>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the draw commands
    pub fn draws(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(|c| c.is_draw())
    }

    /// Forget recorded calls
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawSink for RecordingSink {
    fn begin_frame(&mut self, _view: &Mat4, _projection: &Mat4) -> BatchResult<()> {
        self.commands.push(DrawCommand::BeginFrame);
        Ok(())
    }

    fn bind_material(&mut self, handle: MaterialHandle, _material: &MaterialResource) -> BatchResult<()> {
        self.commands.push(DrawCommand::BindMaterial(handle));
        Ok(())
    }

    fn bind_mesh(&mut self, handle: MeshHandle, _mesh: &MeshResource) -> BatchResult<()> {
        self.commands.push(DrawCommand::BindMesh(handle));
        Ok(())
    }

    fn draw(&mut self, mesh: MeshHandle, material: MaterialHandle, transform: &Mat4) -> BatchResult<()> {
        self.commands.push(DrawCommand::Draw {
            mesh,
            material,
            transform: *transform,
        });
        Ok(())
    }

    fn draw_instanced(
        &mut self,
        mesh: MeshHandle,
        material: MaterialHandle,
        instances: &[InstanceTransform],
    ) -> BatchResult<()> {
        self.commands.push(DrawCommand::DrawInstanced {
            mesh,
            material,
            instances: instances.to_vec(),
        });
        Ok(())
    }

    fn draw_terrain(
        &mut self,
        handle: TerrainPatchHandle,
        _patch: &TerrainPatch,
        material: MaterialHandle,
        _transform: &Mat4,
    ) -> BatchResult<()> {
        self.commands.push(DrawCommand::DrawTerrain { patch: handle, material });
        Ok(())
    }

    fn end_frame(&mut self) -> BatchResult<()> {
        self.commands.push(DrawCommand::EndFrame);
        Ok(())
    }
}
