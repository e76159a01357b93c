//! # VizLayer Layers
//!
//! Layer-side state built on `vizlayer-core`. Each layer owns its geometry:
//! configuration comes in, change flags decide what to rebuild, and the
//! results are exposed as buffers plus draw descriptions for a renderer.

pub mod column_layer;
pub mod config;
pub mod error;
pub mod path_layer;

pub use column_layer::{
    ColumnAccessors, ColumnLayerState, ColumnUniforms, ColumnUpdate, DrawPass, DrawPassKind,
};
pub use config::{ColumnConfig, LayerConfig, PathConfig, Units};
pub use error::{LayerError, LayerResult};
pub use path_layer::{PathLayerState, PathStyles, PathUniforms};
