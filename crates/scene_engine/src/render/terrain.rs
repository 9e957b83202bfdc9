//! Height-field terrain patches
//!
//! A patch stores a chain of power-of-two height fields, one per mip level.
//! The visibility pass only needs [`TerrainPatch::bounds`]; the mesh data
//! generators produce interleaved CPU-side geometry for the backend to upload.

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::spatial::Bounds;
use super::resources::BufferId;

/// Terrain construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    /// Patch extents must be powers of two
    #[error("Terrain extent {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// Requested more mip levels than the extents allow
    #[error("Mip level {level} would have a zero extent")]
    MipChainTooLong {
        /// First level that would be empty
        level: usize,
    },

    /// Mip level index past the end of the chain
    #[error("Mip level {level} out of range, patch has {count}")]
    MipLevelOutOfRange {
        /// Requested level
        level: usize,
        /// Number of levels
        count: usize,
    },

    /// Height data does not match the field's extents
    #[error("Expected {expected} heights, got {actual}")]
    HeightCountMismatch {
        /// extent_x * extent_y
        expected: usize,
        /// Provided height count
        actual: usize,
    },

    /// Too many vertices for 16-bit indices
    #[error("Mip level has {0} vertices, more than 16-bit indices can address")]
    TooManyVertices(usize),
}

/// Lowest and highest sample of a height field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightBounds {
    /// Highest sample
    pub max: f32,
    /// Lowest sample
    pub min: f32,
}

/// Row-major grid of height samples
#[derive(Debug, Clone)]
pub struct HeightField {
    /// `extent_x * extent_y` samples, row by row
    pub heights: Vec<f32>,
    /// Samples per row
    pub extent_x: usize,
    /// Number of rows
    pub extent_y: usize,
    /// Cached by [`HeightField::compute_height_bounds`]
    pub height_bounds: HeightBounds,
}

impl HeightField {
    /// Flat field of zeros
    pub fn new(extent_x: usize, extent_y: usize) -> Self {
        Self {
            heights: vec![0.0; extent_x * extent_y],
            extent_x,
            extent_y,
            height_bounds: HeightBounds { max: 0.0, min: 0.0 },
        }
    }

    /// Field from existing samples; height bounds are computed
    pub fn from_heights(extent_x: usize, extent_y: usize, heights: Vec<f32>) -> Result<Self, TerrainError> {
        let expected = extent_x * extent_y;
        if heights.len() != expected {
            return Err(TerrainError::HeightCountMismatch {
                expected,
                actual: heights.len(),
            });
        }

        let mut field = Self {
            heights,
            extent_x,
            extent_y,
            height_bounds: HeightBounds { max: 0.0, min: 0.0 },
        };
        field.compute_height_bounds();
        Ok(field)
    }

    /// Refresh the cached min and max. An empty field gets `+inf`/`-inf`.
    pub fn compute_height_bounds(&mut self) {
        let (min, max) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), h| (min.min(*h), max.max(*h)));
        self.height_bounds = HeightBounds { max, min };
    }

    /// Sample at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.heights[y * self.extent_x + x]
    }

    /// Overwrite a sample. Call [`HeightField::compute_height_bounds`] afterwards.
    pub fn set(&mut self, x: usize, y: usize, height: f32) {
        self.heights[y * self.extent_x + x] = height;
    }

    /// Half-resolution copy, each sample the mean of a 2x2 block.
    /// Blocks on an odd or unit-width edge reuse the last row or column.
    fn downsample(&self) -> HeightField {
        let extent_x = (self.extent_x / 2).max(1);
        let extent_y = (self.extent_y / 2).max(1);
        let last_x = self.extent_x.saturating_sub(1);
        let last_y = self.extent_y.saturating_sub(1);
        let mut heights = Vec::with_capacity(extent_x * extent_y);
        for y in 0..extent_y {
            let (y0, y1) = ((y * 2).min(last_y), (y * 2 + 1).min(last_y));
            for x in 0..extent_x {
                let (x0, x1) = ((x * 2).min(last_x), (x * 2 + 1).min(last_x));
                let sum = self.get(x0, y0) + self.get(x1, y0) + self.get(x0, y1) + self.get(x1, y1);
                heights.push(sum * 0.25);
            }
        }
        let mut field = HeightField {
            heights,
            extent_x,
            extent_y,
            height_bounds: self.height_bounds,
        };
        field.compute_height_bounds();
        field
    }
}

/// Buffers the backend created for the current mip level
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerrainGpuMesh {
    /// Vertex buffer, if uploaded
    pub vertex_buffer: Option<BufferId>,
    /// Index buffer, if uploaded
    pub index_buffer: Option<BufferId>,
    /// Vertices in the vertex buffer
    pub vertex_count: usize,
    /// Indices in the index buffer
    pub index_count: usize,
}

/// CPU-side mesh for one mip level, positions and normals interleaved
#[derive(Debug, Clone, Default)]
pub struct TerrainMeshData {
    /// `[position, normal]` pairs
    pub vertices: Vec<[Vec3; 2]>,
    /// Triangle list
    pub indices: Vec<u16>,
}

/// Terrain patch placed in the world at `mesh_offset`
#[derive(Debug, Clone)]
pub struct TerrainPatch {
    /// Level 0 is full resolution, each next level halves both extents
    pub mip_levels: Vec<HeightField>,
    /// Mip level currently uploaded
    pub current_mip: usize,
    /// World size of one cell; `y` scales heights
    pub cell_size: Vec3,
    /// World position of sample (0, 0) at height zero
    pub mesh_offset: Vec3,
    /// Uploaded geometry
    pub gpu_mesh: TerrainGpuMesh,
}

fn is_power_of_two(x: usize) -> bool {
    x != 0 && x & (x - 1) == 0
}

impl TerrainPatch {
    /// Flat patch with `mip_count` levels
    pub fn new(extent_x: usize, extent_y: usize, cell_size: Vec3, mip_count: usize) -> Result<Self, TerrainError> {
        for extent in [extent_x, extent_y] {
            if !is_power_of_two(extent) {
                return Err(TerrainError::NotPowerOfTwo(extent));
            }
        }

        let mut mip_levels = Vec::with_capacity(mip_count);
        let (mut mip_x, mut mip_y) = (extent_x, extent_y);
        for level in 0..mip_count {
            if mip_x == 0 || mip_y == 0 {
                return Err(TerrainError::MipChainTooLong { level });
            }
            mip_levels.push(HeightField::new(mip_x, mip_y));
            mip_x /= 2;
            mip_y /= 2;
        }

        Ok(Self {
            mip_levels,
            current_mip: 0,
            cell_size,
            mesh_offset: Vec3::zeros(),
            gpu_mesh: TerrainGpuMesh::default(),
        })
    }

    /// Place the patch
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.mesh_offset = offset;
        self
    }

    /// Replace level 0 and regenerate the lower levels from it
    pub fn set_heights(&mut self, field: HeightField) -> Result<(), TerrainError> {
        let Some(base) = self.mip_levels.first() else {
            return Err(TerrainError::MipLevelOutOfRange { level: 0, count: 0 });
        };
        if field.extent_x != base.extent_x || field.extent_y != base.extent_y {
            return Err(TerrainError::HeightCountMismatch {
                expected: base.extent_x * base.extent_y,
                actual: field.heights.len(),
            });
        }

        let count = self.mip_levels.len();
        let mut levels = Vec::with_capacity(count);
        levels.push(field);
        while levels.len() < count {
            let next = levels[levels.len() - 1].downsample();
            levels.push(next);
        }
        self.mip_levels = levels;
        Ok(())
    }

    /// Samples per row at full resolution
    pub fn patch_extent_x(&self) -> usize {
        self.mip_levels.first().map_or(0, |m| m.extent_x)
    }

    /// Rows at full resolution
    pub fn patch_extent_y(&self) -> usize {
        self.mip_levels.first().map_or(0, |m| m.extent_y)
    }

    /// Local-space bounds of the full-resolution field
    pub fn bounds(&self) -> Bounds {
        let Some(base) = self.mip_levels.first() else {
            return Bounds::empty();
        };

        let mut lower = self.mesh_offset;
        lower.y += self.cell_size.y * base.height_bounds.min;

        let mut upper = lower;
        upper.x += self.cell_size.x * base.extent_x as f32;
        upper.y += self.cell_size.y * base.height_bounds.max;
        upper.z += self.cell_size.z * base.extent_y as f32;

        Bounds::new(lower, upper)
    }

    /// Build the mesh for `mip_level` and make it current.
    ///
    /// The backend uploads the result and records its buffers in
    /// [`TerrainPatch::gpu_mesh`].
    pub fn generate_mesh(&mut self, mip_level: usize) -> Result<TerrainMeshData, TerrainError> {
        let data = TerrainMeshData {
            vertices: self.generate_vertices(mip_level)?,
            indices: self.generate_indices(mip_level)?,
        };
        self.current_mip = mip_level;
        self.gpu_mesh = TerrainGpuMesh {
            vertex_count: data.vertices.len(),
            index_count: data.indices.len(),
            ..TerrainGpuMesh::default()
        };
        Ok(data)
    }

    fn level(&self, mip_level: usize) -> Result<&HeightField, TerrainError> {
        self.mip_levels.get(mip_level).ok_or(TerrainError::MipLevelOutOfRange {
            level: mip_level,
            count: self.mip_levels.len(),
        })
    }

    /// Positions and smoothed normals for one mip level
    pub fn generate_vertices(&self, mip_level: usize) -> Result<Vec<[Vec3; 2]>, TerrainError> {
        let field = self.level(mip_level)?;
        let (extent_x, extent_y) = (field.extent_x, field.extent_y);

        let mut positions = Vec::with_capacity(extent_x * extent_y);
        for y in 0..extent_y {
            for x in 0..extent_x {
                let local = Vec3::new(
                    x as f32 * self.cell_size.x,
                    field.get(x, y) * self.cell_size.y,
                    y as f32 * self.cell_size.z,
                );
                positions.push(local + self.mesh_offset);
            }
        }

        let mut vertices = Vec::with_capacity(positions.len());
        for y in 0..extent_y {
            for x in 0..extent_x {
                let i = y * extent_x + x;
                let current = positions[i];
                let edge = |j: usize| positions[j] - current;

                let x_pos = if x + 1 < extent_x { edge(i + 1) } else { Vec3::zeros() };
                let z_pos = if y + 1 < extent_y { edge(i + extent_x) } else { Vec3::zeros() };
                let x_neg = if x > 0 { edge(i - 1) } else { Vec3::zeros() };
                let z_neg = if y > 0 { edge(i - extent_x) } else { Vec3::zeros() };

                let normal = z_pos.cross(&x_pos)
                    + x_pos.cross(&z_neg)
                    + z_neg.cross(&x_neg)
                    + x_neg.cross(&z_pos);
                let normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);

                vertices.push([current, normal]);
            }
        }

        Ok(vertices)
    }

    /// Triangle list with alternating diagonals for one mip level
    pub fn generate_indices(&self, mip_level: usize) -> Result<Vec<u16>, TerrainError> {
        let field = self.level(mip_level)?;
        let vertex_count = field.extent_x * field.extent_y;
        if vertex_count > usize::from(u16::MAX) + 1 {
            return Err(TerrainError::TooManyVertices(vertex_count));
        }

        let extent_x = field.extent_x;
        let rows = field.extent_y.saturating_sub(1);
        let cells = extent_x.saturating_sub(1) * rows;
        let mut indices = Vec::with_capacity(cells * 6);
        let index = |x: usize, y: usize| (x + y * extent_x) as u16;

        for y in 0..rows {
            let mut flipped = y % 2 == 1;
            for x in 1..extent_x {
                if flipped {
                    indices.extend_from_slice(&[
                        index(x - 1, y + 1),
                        index(x, y + 1),
                        index(x - 1, y),
                        index(x - 1, y),
                        index(x, y + 1),
                        index(x, y),
                    ]);
                } else {
                    indices.extend_from_slice(&[
                        index(x - 1, y),
                        index(x - 1, y + 1),
                        index(x, y),
                        index(x, y),
                        index(x - 1, y + 1),
                        index(x, y + 1),
                    ]);
                }
                flipped = !flipped;
            }
        }

        Ok(indices)
    }
}
