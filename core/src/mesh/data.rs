//! CPU-side mesh data structures.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How indices are assembled into primitives
//! - [`IndexFormat`] - Index data format
//! - [`IndexRange`] / [`ColumnIndexRanges`] - Named sub-ranges of an index buffer
//! - [`ColumnMesh`] - Tesselated column geometry (positions, normals, indices)

use std::sync::Arc;

use crate::error::{GeometryError, GeometryResult};
use crate::pool::Poolable;

use super::layout::VertexLayout;

/// Primitive topology describing how indices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Every two indices form a line.
    LineList,
    /// Every three indices form a triangle.
    #[default]
    TriangleList,
}

impl PrimitiveTopology {
    /// Get the number of indices per primitive.
    pub fn vertices_per_primitive(&self) -> u32 {
        match self {
            Self::LineList => 2,
            Self::TriangleList => 3,
        }
    }
}

/// Index format for indexed drawing.
///
/// Column meshes are small (a handful of vertices per radial step), so they
/// always use 16-bit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
        }
    }

    /// Largest vertex count addressable with this format.
    pub fn max_vertices(&self) -> usize {
        match self {
            Self::Uint16 => u16::MAX as usize + 1,
        }
    }
}

/// A `(start, count)` window into an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexRange {
    /// First index in the window.
    pub start: u32,
    /// Number of indices in the window.
    pub count: u32,
}

impl IndexRange {
    /// Create a new index range.
    pub const fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// One past the last index in the window. Widened so that it cannot
    /// overflow.
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.count)
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Byte offset of the window for the given index format.
    pub fn byte_offset(&self, format: IndexFormat) -> u64 {
        self.start as u64 * format.size() as u64
    }

    /// Join two adjacent windows into one covering both.
    ///
    /// The windows must be contiguous (in either order); gaps are not bridged.
    pub fn merged(&self, other: &IndexRange) -> Option<IndexRange> {
        if self.is_empty() {
            return Some(*other);
        }
        if other.is_empty() {
            return Some(*self);
        }
        if self.end() == u64::from(other.start) || other.end() == u64::from(self.start) {
            let count = self.count.checked_add(other.count)?;
            Some(IndexRange::new(self.start.min(other.start), count))
        } else {
            None
        }
    }
}

/// Named index sub-ranges of a column mesh, in buffer order.
///
/// `wireframe` always starts at 0; `side` follows it and `top` follows `side`.
/// For a flat (non-extruded) column both `wireframe` and `side` are empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColumnIndexRanges {
    /// Line-list edges (top loop, verticals, bottom loop).
    pub wireframe: IndexRange,
    /// Side wall triangles.
    pub side: IndexRange,
    /// Top cap triangles.
    pub top: IndexRange,
}

impl ColumnIndexRanges {
    /// Lay the three ranges out back to back.
    pub fn contiguous(wireframe: u32, side: u32, top: u32) -> Self {
        Self {
            wireframe: IndexRange::new(0, wireframe),
            side: IndexRange::new(wireframe, side),
            top: IndexRange::new(wireframe + side, top),
        }
    }

    /// Total number of indices covered.
    pub fn total(&self) -> u32 {
        self.top.start + self.top.count
    }
}

/// Tesselated column geometry.
///
/// Owns the three buffers handed to the renderer (`positions`, `normals`,
/// `indices`) plus the named index sub-ranges used to issue separate
/// wireframe / fill / stroke passes.
///
/// A mesh is overwritten in place on re-tesselation; its allocations are
/// kept (see [`Poolable`]).
#[derive(Clone)]
pub struct ColumnMesh {
    layout: Arc<VertexLayout>,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u16>,
    ranges: ColumnIndexRanges,
    resolution: u32,
    edge_distance: f32,
}

impl ColumnMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            layout: VertexLayout::column(),
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            ranges: ColumnIndexRanges::default(),
            resolution: 0,
            edge_distance: 0.0,
        }
    }

    /// Get the vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Vertex normals (same length as positions).
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// The full index buffer.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Index format of [`indices`](Self::indices).
    pub fn index_format(&self) -> IndexFormat {
        IndexFormat::Uint16
    }

    /// Named index sub-ranges.
    pub fn index_ranges(&self) -> &ColumnIndexRanges {
        &self.ranges
    }

    /// Indices of a sub-range, bounds-checked against the index buffer.
    pub fn indices_in(&self, range: IndexRange) -> GeometryResult<&[u16]> {
        let start = range.start as usize;
        let end = usize::try_from(range.end()).unwrap_or(usize::MAX);
        self.indices.get(start..end).ok_or_else(|| {
            GeometryError::out_of_range("indices", start, range.count as usize, self.indices.len())
        })
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Radial resolution the mesh was tesselated with.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Mean centre-to-vertex distance scaled by `cos(PI / resolution)`.
    ///
    /// Opaque to this crate; the renderer uses it to inset anti-aliased edges.
    pub fn edge_distance(&self) -> f32 {
        self.edge_distance
    }

    /// Whether the mesh holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Raw position bytes for upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw normal bytes for upload.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Raw index bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Clear the buffers and size them for a new tesselation pass.
    ///
    /// Positions and normals are zero-filled to `vertex_count`; indices are
    /// cleared with room for `index_count`.
    pub(crate) fn prepare(&mut self, vertex_count: usize, index_count: usize) {
        self.positions.clear();
        self.positions.resize(vertex_count, [0.0; 3]);
        self.normals.clear();
        self.normals.resize(vertex_count, [0.0; 3]);
        self.indices.clear();
        self.indices.reserve(index_count);
    }

    pub(crate) fn buffers_mut(&mut self) -> (&mut [[f32; 3]], &mut [[f32; 3]], &mut Vec<u16>) {
        (&mut self.positions, &mut self.normals, &mut self.indices)
    }

    pub(crate) fn finish(
        &mut self,
        ranges: ColumnIndexRanges,
        resolution: u32,
        edge_distance: f32,
    ) {
        self.ranges = ranges;
        self.resolution = resolution;
        self.edge_distance = edge_distance;
    }
}

impl Default for ColumnMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Poolable for ColumnMesh {
    fn new_empty() -> Self {
        Self::new()
    }

    fn reset(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.indices.clear();
        self.ranges = ColumnIndexRanges::default();
        self.resolution = 0;
        self.edge_distance = 0.0;
    }
}

impl std::fmt::Debug for ColumnMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnMesh")
            .field("resolution", &self.resolution)
            .field("vertex_count", &self.positions.len())
            .field("index_count", &self.indices.len())
            .field("ranges", &self.ranges)
            .field("edge_distance", &self.edge_distance)
            .field("layout", &self.layout.label)
            .finish()
    }
}
