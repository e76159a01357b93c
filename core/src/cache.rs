//! Structural change detection.
//!
//! Layers re-run a tesselator only when something that shapes the topology
//! changes. Per-instance data never invalidates a cached mesh; it only
//! triggers buffer repacking, described by [`ChangeFlags`].

use std::ops::Range;
use std::sync::Arc;

/// What changed since the previous update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeFlags {
    /// Instance data (or its length) changed.
    pub data_changed: bool,
    /// A topology-shaping setting changed; everything must be rebuilt.
    pub structural_flags_changed: bool,
    /// Instances whose data changed. `None` means all of them.
    pub affected: Option<Range<usize>>,
}

impl ChangeFlags {
    /// Nothing changed.
    pub fn none() -> Self {
        Self::default()
    }

    /// All instance data changed.
    pub fn all_data() -> Self {
        Self {
            data_changed: true,
            ..Self::default()
        }
    }

    /// Only instances in `range` changed.
    pub fn data_range(range: Range<usize>) -> Self {
        Self {
            data_changed: true,
            structural_flags_changed: false,
            affected: Some(range),
        }
    }

    /// Structural settings changed.
    pub fn structural() -> Self {
        Self {
            data_changed: false,
            structural_flags_changed: true,
            affected: None,
        }
    }

    /// Whether anything has to be recomputed.
    pub fn needs_update(&self) -> bool {
        self.data_changed || self.structural_flags_changed
    }

    /// The range to repack when only some instances changed.
    pub fn partial_range(&self) -> Option<Range<usize>> {
        if self.structural_flags_changed {
            None
        } else {
            self.affected.clone()
        }
    }
}

/// Remembers the structural key of the last tesselation.
#[derive(Debug, Clone)]
pub struct GeometryCache<K> {
    key: Option<K>,
    hits: u64,
    misses: u64,
}

impl<K> Default for GeometryCache<K> {
    fn default() -> Self {
        Self {
            key: None,
            hits: 0,
            misses: 0,
        }
    }
}

impl<K: PartialEq + Clone> GeometryCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` differs from the cached one. Counts the outcome.
    pub fn should_retesselate(&mut self, key: &K) -> bool {
        let stale = self.key.as_ref() != Some(key);
        if stale {
            self.misses += 1;
        } else {
            self.hits += 1;
            log::trace!("Geometry cache hit ({} so far)", self.hits);
        }
        stale
    }

    /// Record `key` after a successful tesselation.
    pub fn store(&mut self, key: K) {
        self.key = Some(key);
    }

    /// The cached key, if any geometry has been built.
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Forget the cached key so the next check misses.
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// The settings that shape a column mesh.
///
/// Explicit vertices compare by identity: handing the same `Arc` back is a
/// hit, a new allocation with equal contents is a miss.
#[derive(Debug, Clone)]
pub struct ColumnGeometryKey {
    pub resolution: u32,
    pub vertices: Option<Arc<[[f32; 2]]>>,
    /// Side wall present (extruded or stroked).
    pub has_thickness: bool,
    /// Flat shaded side wall.
    pub flat: bool,
}

impl ColumnGeometryKey {
    pub fn new(
        resolution: u32,
        vertices: Option<&Arc<[[f32; 2]]>>,
        extruded: bool,
        stroked: bool,
        flat_shading: bool,
    ) -> Self {
        Self {
            resolution,
            vertices: vertices.cloned(),
            has_thickness: extruded || stroked,
            flat: extruded && flat_shading,
        }
    }
}

impl PartialEq for ColumnGeometryKey {
    fn eq(&self, other: &Self) -> bool {
        let same_vertices = match (&self.vertices, &other.vertices) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.resolution == other.resolution
            && same_vertices
            && self.has_thickness == other.has_thickness
            && self.flat == other.flat
    }
}
