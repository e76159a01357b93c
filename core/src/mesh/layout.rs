//! Vertex layout definitions for tesselated geometry.
//!
//! Layouts tell the rendering side how to bind the buffers this crate
//! produces. Two families exist:
//!
//! - **Column meshes**: per-vertex `positions` and `normals`, one buffer each.
//! - **Path segments**: per-instance neighbour positions read from a single
//!   strided buffer. The `left`, `start`, `end` and `right` attributes all
//!   alias the same backing storage at offsets of 0, 1, 2 and 3 vertices,
//!   because consecutive segments share endpoints.
//!
//! Layouts are shared via `Arc` since there are only a couple of them.
//!
//! # Example
//!
//! ```
//! use vizlayer_core::mesh::{VertexAttributeSemantic, VertexLayout};
//!
//! let layout = VertexLayout::path_segments();
//! let end = layout
//!     .get_attribute(VertexAttributeSemantic::EndPosition)
//!     .unwrap();
//! // `end` reads the same buffer as `start`, one vertex further along.
//! assert_eq!(end.offset, 24);
//! assert_eq!(layout.buffer_stride(end.buffer_index as usize), 12);
//! ```

use std::sync::Arc;

use crate::error::{GeometryError, GeometryResult};

/// Semantic meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    /// Mesh vertex position (float3).
    Position,
    /// Mesh vertex normal (float3).
    Normal,
    /// Per-instance anchor position (float3).
    InstancePosition,
    /// Per-instance elevation (float).
    InstanceElevation,
    /// Segment neighbour before the start point (float3).
    LeftPosition,
    /// Segment start point (float3).
    StartPosition,
    /// Segment end point (float3).
    EndPosition,
    /// Segment neighbour after the end point (float3).
    RightPosition,
    /// Segment flags (uint8).
    SegmentType,
    /// Per-instance fill color (unorm8x4).
    InstanceFillColor,
    /// Per-instance outline color (unorm8x4).
    InstanceLineColor,
    /// Per-instance line width (float).
    InstanceStrokeWidth,
    /// Per-instance path color (unorm8x4).
    InstanceColor,
}

impl VertexAttributeSemantic {
    /// Get a unique index for this semantic (used for matching).
    pub fn index(&self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::InstancePosition => 2,
            Self::InstanceElevation => 3,
            Self::LeftPosition => 4,
            Self::StartPosition => 5,
            Self::EndPosition => 6,
            Self::RightPosition => 7,
            Self::SegmentType => 8,
            Self::InstanceFillColor => 9,
            Self::InstanceLineColor => 10,
            Self::InstanceStrokeWidth => 11,
            Self::InstanceColor => 12,
        }
    }

    /// Shader-facing attribute name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "positions",
            Self::Normal => "normals",
            Self::InstancePosition => "instancePositions",
            Self::InstanceElevation => "instanceElevations",
            Self::LeftPosition => "instanceLeftPositions",
            Self::StartPosition => "instanceStartPositions",
            Self::EndPosition => "instanceEndPositions",
            Self::RightPosition => "instanceRightPositions",
            Self::SegmentType => "instanceTypes",
            Self::InstanceFillColor => "instanceFillColors",
            Self::InstanceLineColor => "instanceLineColors",
            Self::InstanceStrokeWidth => "instanceStrokeWidths",
            Self::InstanceColor => "instanceColors",
        }
    }
}

/// Scalar component type stored in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit float.
    F32,
}

impl ComponentType {
    /// Size in bytes of one component.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }

    /// Human-readable name, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::F32 => "f32",
        }
    }
}

/// Format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Single 8-bit unsigned integer.
    Uint8,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4,
    /// Single 16-bit unsigned integer.
    Uint16,
}

impl VertexAttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> usize {
        self.components() * self.component_type().size()
    }

    /// Number of scalar components per element.
    pub fn components(&self) -> usize {
        match self {
            Self::Float | Self::Uint8 | Self::Uint16 => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Unorm8x4 => 4,
        }
    }

    /// Scalar type of each component.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Float | Self::Float2 | Self::Float3 | Self::Float4 => ComponentType::F32,
            Self::Uint8 | Self::Unorm8x4 => ComponentType::U8,
            Self::Uint16 => ComponentType::U16,
        }
    }
}

/// How the vertex buffer advances: per-vertex or per-instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    /// Buffer advances once per vertex (default).
    #[default]
    Vertex,
    /// Buffer advances once per instance (for instanced rendering).
    Instance,
}

/// Describes a single vertex buffer binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    /// Stride in bytes between consecutive elements.
    pub stride: u32,
    /// How the buffer advances (per-vertex or per-instance).
    pub step_mode: VertexStepMode,
}

impl VertexBufferLayout {
    /// Create a new vertex buffer layout with the given stride.
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            step_mode: VertexStepMode::Vertex,
        }
    }

    /// Create a per-instance buffer layout.
    pub fn per_instance(stride: u32) -> Self {
        Self {
            stride,
            step_mode: VertexStepMode::Instance,
        }
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexAttributeSemantic,
    /// Data format of this attribute.
    pub format: VertexAttributeFormat,
    /// Byte offset within the vertex buffer.
    pub offset: u32,
    /// Index of the vertex buffer this attribute reads from.
    pub buffer_index: u32,
}

impl VertexAttribute {
    /// Create a new vertex attribute.
    pub fn new(
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
        offset: u32,
        buffer_index: u32,
    ) -> Self {
        Self {
            semantic,
            format,
            offset,
            buffer_index,
        }
    }
}

/// Describes the layout of vertex data across one or more buffers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Descriptions of each vertex buffer binding.
    pub buffers: Vec<VertexBufferLayout>,
    /// The vertex attributes, each referencing a buffer by index.
    pub attributes: Vec<VertexAttribute>,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl VertexLayout {
    /// Create a new empty vertex layout.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            attributes: Vec::new(),
            label: None,
        }
    }

    /// Add a vertex buffer binding.
    pub fn with_buffer(mut self, buffer: VertexBufferLayout) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Add a vertex attribute.
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the number of vertex buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Get the stride for a specific buffer.
    pub fn buffer_stride(&self, buffer_index: usize) -> u32 {
        self.buffers
            .get(buffer_index)
            .map(|b| b.stride)
            .unwrap_or(0)
    }

    /// Get an attribute by semantic.
    pub fn get_attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.semantic == semantic)
    }

    /// Get all attributes for a specific buffer.
    pub fn attributes_for_buffer(
        &self,
        buffer_index: u32,
    ) -> impl Iterator<Item = &VertexAttribute> {
        self.attributes
            .iter()
            .filter(move |attr| attr.buffer_index == buffer_index)
    }

    /// Check that every attribute references a declared buffer.
    pub fn validate(&self) -> GeometryResult<()> {
        for attr in &self.attributes {
            if attr.buffer_index as usize >= self.buffers.len() {
                return Err(GeometryError::invalid(format!(
                    "{} reads buffer {} of {}",
                    attr.semantic.name(),
                    attr.buffer_index,
                    self.buffers.len()
                )));
            }
        }
        Ok(())
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexLayout {
    /// Column mesh layout: positions in buffer 0, normals in buffer 1.
    pub fn column() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_buffer(VertexBufferLayout::new(12))
                .with_buffer(VertexBufferLayout::new(12))
                .with_attribute(VertexAttribute::new(
                    VertexAttributeSemantic::Position,
                    VertexAttributeFormat::Float3,
                    0,
                    0,
                ))
                .with_attribute(VertexAttribute::new(
                    VertexAttributeSemantic::Normal,
                    VertexAttributeFormat::Float3,
                    0,
                    1,
                ))
                .with_label("column"),
        )
    }

    /// Per-instance buffers of a column layer, one per attribute, in the
    /// order the layer declares its channels.
    pub fn column_instances() -> Arc<Self> {
        let attributes = [
            (VertexAttributeSemantic::InstancePosition, VertexAttributeFormat::Float3),
            (VertexAttributeSemantic::InstanceElevation, VertexAttributeFormat::Float),
            (VertexAttributeSemantic::InstanceFillColor, VertexAttributeFormat::Unorm8x4),
            (VertexAttributeSemantic::InstanceLineColor, VertexAttributeFormat::Unorm8x4),
            (VertexAttributeSemantic::InstanceStrokeWidth, VertexAttributeFormat::Float),
        ];
        Arc::new(Self::per_instance(&attributes).with_label("column_instances"))
    }

    fn per_instance(attributes: &[(VertexAttributeSemantic, VertexAttributeFormat)]) -> Self {
        attributes
            .iter()
            .enumerate()
            .fold(Self::new(), |layout, (buffer, &(semantic, format))| {
                layout
                    .with_buffer(VertexBufferLayout::per_instance(format.size() as u32))
                    .with_attribute(VertexAttribute::new(semantic, format, 0, buffer as u32))
            })
    }

    /// Path segment layout.
    ///
    /// - Buffer 0 (per instance, stride 12): the shared position backing,
    ///   read four times at vertex offsets 0..=3.
    /// - Buffer 1 (per instance, stride 1): segment flags.
    /// - Buffers 2 and 3 (per instance): widths and colors, repeated over
    ///   every row of a path.
    pub fn path_segments() -> Arc<Self> {
        let stride = VertexAttributeFormat::Float3.size() as u32;
        let neighbours = [
            VertexAttributeSemantic::LeftPosition,
            VertexAttributeSemantic::StartPosition,
            VertexAttributeSemantic::EndPosition,
            VertexAttributeSemantic::RightPosition,
        ];
        let mut layout = Self::new()
            .with_buffer(VertexBufferLayout::per_instance(stride))
            .with_buffer(VertexBufferLayout::per_instance(1));
        for (vertex_offset, semantic) in neighbours.into_iter().enumerate() {
            layout = layout.with_attribute(VertexAttribute::new(
                semantic,
                VertexAttributeFormat::Float3,
                vertex_offset as u32 * stride,
                0,
            ));
        }
        Arc::new(
            layout
                .with_attribute(VertexAttribute::new(
                    VertexAttributeSemantic::SegmentType,
                    VertexAttributeFormat::Uint8,
                    0,
                    1,
                ))
                .with_buffer(VertexBufferLayout::per_instance(4))
                .with_attribute(VertexAttribute::new(
                    VertexAttributeSemantic::InstanceStrokeWidth,
                    VertexAttributeFormat::Float,
                    0,
                    2,
                ))
                .with_buffer(VertexBufferLayout::per_instance(4))
                .with_attribute(VertexAttribute::new(
                    VertexAttributeSemantic::InstanceColor,
                    VertexAttributeFormat::Unorm8x4,
                    0,
                    3,
                ))
                .with_label("path_segments"),
        )
    }
}
