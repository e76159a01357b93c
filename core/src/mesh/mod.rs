//! CPU-side mesh types and the column tesselator.
//!
//! This module provides GPU-agnostic mesh data structures:
//!
//! - [`VertexLayout`] - Describes how the produced buffers are bound
//! - [`RingProfile`] - Counter-clockwise cross-section of a column
//! - [`ColumnMesh`] - Positions, normals, indices and named index ranges
//! - [`tesselate_column`] - Extrudes a ring profile into a capped prism

mod column;
mod data;
mod layout;
mod ring;

pub use column::{
    ColumnTopology, MIN_RESOLUTION, Shading, tesselate_column, tesselate_column_into,
};
pub use data::{ColumnIndexRanges, ColumnMesh, IndexFormat, IndexRange, PrimitiveTopology};
pub use layout::{
    ComponentType, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic,
    VertexBufferLayout, VertexLayout, VertexStepMode,
};
pub use ring::{RingProfile, RingSource};
