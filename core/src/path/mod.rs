//! Instanced path segments.
//!
//! A [`PathTesselator`] reads polylines from a [`PathSource`] and writes one
//! instance row per segment: the segment's start and end, their outer
//! neighbours for joint computation, and [`SegmentFlags`]. The renderer
//! draws [`SegmentTemplate`] once per row.
//!
//! ```
//! use vizlayer_core::cache::ChangeFlags;
//! use vizlayer_core::path::{PathTesselator, PathTesselatorOptions, PathType};
//!
//! let paths = vec![vec![[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0]]];
//! let mut tesselator = PathTesselator::new(PathTesselatorOptions {
//!     path_type: Some(PathType::Open),
//!     resolution: None,
//! });
//! tesselator.update(paths.as_slice(), &ChangeFlags::all_data()).unwrap();
//!
//! assert_eq!(tesselator.segment_count(), 2);
//! let first = tesselator.segment(0).unwrap();
//! assert_eq!(first.left, first.start);
//! ```

mod segment;
mod source;
mod template;
mod tesselator;

pub use segment::{SegmentFlags, SegmentRecord};
pub use source::{AccessorPaths, FlatPaths, PathSource};
pub use template::SegmentTemplate;
pub use tesselator::{
    POSITIONS_CHANNEL, PathTesselator, PathTesselatorOptions, PathType, SEGMENT_TYPES_CHANNEL,
};
