//! # VizLayer Core
//!
//! Geometry engine for instanced visualization layers.
//!
//! - [`mesh`] - Ring profiles and the column tesselator
//! - [`path`] - Per-segment instance rows for polylines
//! - [`buffer`] - Growable named attribute channels with dirty tracking
//! - [`cache`] - Structural change detection
//!
//! Nothing here touches a GPU: every output is plain CPU memory plus layout
//! metadata describing how to bind it.

pub mod buffer;
pub mod cache;
pub mod error;
pub mod math;
pub mod mesh;
pub mod path;
pub mod pool;
pub mod profiling;

pub use error::{GeometryError, GeometryResult};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
