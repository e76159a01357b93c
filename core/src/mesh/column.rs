//! Column tesselation: a ring profile extruded into a capped prism.
//!
//! ```text
//! Smooth shading (2 side vertices per ring position):
//!
//!    - 0 - 2 - 4 -  ... top
//!    / | / | / | /
//!    - 1 - 3 - 5 -  ... bottom
//!
//! Flat shading (4 side vertices per ring position):
//!
//!    - 02 - 46 - 8A -  ... top
//!    / || / || / || /
//!    - 13 - 57 - 9B -  ... bottom
//! ```
//!
//! Side vertices come first, followed by one top-cap vertex per ring
//! position. Index order is wireframe, side, top.

use crate::error::{GeometryError, GeometryResult};
use crate::math::Vec2;
use crate::profiling::profile_function;

use super::data::{ColumnIndexRanges, ColumnMesh, IndexFormat};
use super::ring::RingProfile;

/// Smallest ring that produces a closed cap.
pub const MIN_RESOLUTION: u32 = 3;

/// Side-wall shading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shading {
    /// One vertex per ring position per ring; normals point radially out.
    #[default]
    Smooth,
    /// Vertices duplicated per face; each face gets its own normal.
    Flat,
}

/// Offsets of the side vertices emitted at one ring position.
///
/// `leading_*` vertices belong to the face that starts at this position,
/// `trailing_*` vertices to the face that ends here. With smooth shading
/// they coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SideVertexRoles {
    stride: u16,
    leading_top: u16,
    leading_bottom: u16,
    trailing_top: u16,
    trailing_bottom: u16,
}

impl SideVertexRoles {
    const SMOOTH: Self = Self {
        stride: 2,
        leading_top: 0,
        leading_bottom: 1,
        trailing_top: 0,
        trailing_bottom: 1,
    };

    // Flat: vertices 0/1 face the previous edge, 2/3 the next edge.
    const FLAT: Self = Self {
        stride: 4,
        leading_top: 0,
        leading_bottom: 1,
        trailing_top: 2,
        trailing_bottom: 3,
    };

    fn base(&self, j: usize) -> u16 {
        j as u16 * self.stride
    }
}

/// Vertex and index budget of a column, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnTopology {
    resolution: u32,
    side: Option<SideVertexRoles>,
}

impl ColumnTopology {
    /// Derive the topology; `shading` only matters when `extruded`.
    pub fn new(resolution: u32, extruded: bool, shading: Shading) -> Self {
        let side = extruded.then_some(match shading {
            Shading::Smooth => SideVertexRoles::SMOOTH,
            Shading::Flat => SideVertexRoles::FLAT,
        });
        Self { resolution, side }
    }

    /// Whether a side wall is emitted.
    pub fn is_extruded(&self) -> bool {
        self.side.is_some()
    }

    /// Side vertices per ring position (0 when not extruded).
    pub fn side_vertices_per_position(&self) -> u32 {
        self.side.map(|s| s.stride as u32).unwrap_or(0)
    }

    /// Total vertex count: side vertices plus one top vertex per position.
    pub fn vertex_count(&self) -> u32 {
        self.resolution * (self.side_vertices_per_position() + 1)
    }

    /// Top loop, vertical and bottom loop edge per radial step.
    pub fn wireframe_index_count(&self) -> u32 {
        if self.is_extruded() {
            self.resolution * 2 * 3
        } else {
            0
        }
    }

    /// Two triangles per radial step.
    pub fn side_index_count(&self) -> u32 {
        if self.is_extruded() {
            self.resolution * 2 * 3
        } else {
            0
        }
    }

    /// Fan of `resolution - 2` triangles.
    pub fn top_index_count(&self) -> u32 {
        self.resolution.saturating_sub(2) * 3
    }

    /// Named ranges for this budget.
    pub fn index_ranges(&self) -> ColumnIndexRanges {
        ColumnIndexRanges::contiguous(
            self.wireframe_index_count(),
            self.side_index_count(),
            self.top_index_count(),
        )
    }
}

/// Tesselate a column into a fresh mesh.
///
/// See [`tesselate_column_into`].
pub fn tesselate_column(
    profile: &RingProfile,
    height: f32,
    shading: Shading,
) -> GeometryResult<ColumnMesh> {
    let mut mesh = ColumnMesh::new();
    tesselate_column_into(profile, height, shading, &mut mesh)?;
    Ok(mesh)
}

/// Tesselate a column, overwriting `mesh` in place.
///
/// The column is centred on z = 0: the top ring sits at `+height / 2` and the
/// bottom ring at `-height / 2`. A zero height produces only the top cap.
/// Rings below [`MIN_RESOLUTION`] produce an empty mesh.
///
/// All validation happens before `mesh` is touched, so on error the previous
/// contents survive.
pub fn tesselate_column_into(
    profile: &RingProfile,
    height: f32,
    shading: Shading,
    mesh: &mut ColumnMesh,
) -> GeometryResult<()> {
    profile_function!();

    if !height.is_finite() || height < 0.0 {
        return Err(GeometryError::invalid(format!(
            "column height must be finite and non-negative, got {height}"
        )));
    }

    let resolution = profile.resolution();
    if resolution < MIN_RESOLUTION {
        log::debug!("Column resolution {resolution} below minimum, emitting empty mesh");
        mesh.prepare(0, 0);
        mesh.finish(ColumnIndexRanges::default(), resolution, 0.0);
        return Ok(());
    }

    let topology = ColumnTopology::new(resolution, height > 0.0, shading);
    let vertex_count = topology.vertex_count() as usize;
    if vertex_count > IndexFormat::Uint16.max_vertices() {
        return Err(GeometryError::invalid(format!(
            "column needs {vertex_count} vertices, more than 16-bit indices can address"
        )));
    }

    let ranges = topology.index_ranges();
    mesh.prepare(vertex_count, ranges.total() as usize);

    let points = profile.points();
    let n = points.len();
    let half = height / 2.0;
    let (positions, normals, indices) = mesh.buffers_mut();

    let mut next_vertex = 0usize;

    if let Some(roles) = topology.side {
        // wireframe
        for j in 0..n {
            let here = roles.base(j);
            let next = roles.base((j + 1) % n);
            // top loop
            indices.extend_from_slice(&[here + roles.leading_top, next + roles.leading_top]);
            // side vertical
            indices.extend_from_slice(&[here + roles.leading_top, here + roles.leading_bottom]);
            // bottom loop
            indices.extend_from_slice(&[
                here + roles.leading_bottom,
                next + roles.leading_bottom,
            ]);
        }

        // side wall
        let mut prev_j = n - 1;
        for j in 0..n {
            let next_j = (j + 1) % n;
            let p = points[j];

            for k in 0..roles.stride {
                let top = k % 2 == 0;
                positions[next_vertex] = [p.x, p.y, if top { half } else { -half }];
                normals[next_vertex] = match shading {
                    Shading::Flat => {
                        let (left, right) = if k < 2 { (prev_j, j) } else { (j, next_j) };
                        let normal = face_normal(points[left], points[right]);
                        [normal.x, normal.y, 0.0]
                    }
                    Shading::Smooth => [p.x, p.y, 0.0],
                };
                next_vertex += 1;
            }

            let here = roles.base(j);
            let next = roles.base(next_j);
            indices.extend_from_slice(&[
                here + roles.trailing_top,
                here + roles.trailing_bottom,
                next + roles.leading_top,
            ]);
            indices.extend_from_slice(&[
                here + roles.trailing_bottom,
                next + roles.leading_bottom,
                next + roles.leading_top,
            ]);

            prev_j = j;
        }
    }

    // top cap
    let top_base = next_vertex as u16;
    for (j, p) in points.iter().enumerate() {
        positions[next_vertex] = [p.x, p.y, half];
        normals[next_vertex] = [0.0, 0.0, 1.0];
        next_vertex += 1;

        if j >= 2 {
            let j = j as u16;
            indices.extend_from_slice(&[top_base, top_base + j - 1, top_base + j]);
        }
    }

    debug_assert_eq!(next_vertex, vertex_count);
    debug_assert_eq!(indices.len(), ranges.total() as usize);

    mesh.finish(ranges, resolution, profile.edge_distance());

    log::debug!(
        "Tesselated column: resolution={resolution}, extruded={}, shading={shading:?}, vertices={vertex_count}, indices={}",
        topology.is_extruded(),
        ranges.total()
    );
    Ok(())
}

/// Outward normal of the edge from `left` to `right` on a counter-clockwise
/// ring: `(dy, -dx)`.
fn face_normal(left: Vec2, right: Vec2) -> Vec2 {
    Vec2::new(right.y - left.y, left.x - right.x)
}
