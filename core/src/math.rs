//! Math type aliases and planar polygon helpers.
//!
//! All tesselation output is `f32` (it ends up in GPU buffers), so the
//! aliases here are fixed to `f32` as well.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// Orientation of a closed planar ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    /// Positive signed area.
    CounterClockwise,
    /// Negative signed area.
    Clockwise,
    /// Zero area (collinear or fewer than three points).
    Degenerate,
}

/// Signed area of a closed ring (shoelace formula).
///
/// Positive for counter-clockwise rings in a y-up coordinate system.
pub fn signed_area(points: &[Vec2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    let mut prev = points[points.len() - 1];
    for p in points {
        twice_area += prev.x * p.y - p.x * prev.y;
        prev = *p;
    }
    twice_area * 0.5
}

/// Winding direction of a closed ring.
pub fn winding(points: &[Vec2]) -> Winding {
    let area = signed_area(points);
    if area > 0.0 {
        Winding::CounterClockwise
    } else if area < 0.0 {
        Winding::Clockwise
    } else {
        Winding::Degenerate
    }
}

/// Reorder `points` in place so the ring winds counter-clockwise.
///
/// Returns `true` if the ring was reversed. Counter-clockwise and degenerate
/// rings are left untouched, so the operation is idempotent.
pub fn make_counter_clockwise(points: &mut [Vec2]) -> bool {
    if winding(points) == Winding::Clockwise {
        points.reverse();
        true
    } else {
        false
    }
}

/// Arithmetic mean of the ring's vertices.
pub fn centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::zeros();
    }
    let sum = points.iter().fold(Vec2::zeros(), |acc, p| acc + p);
    sum / points.len() as f32
}

/// Check that every component is finite (no NaN or infinity).
pub fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// A position with two or three coordinates, as returned by accessors.
pub trait Position: Copy {
    /// Widen to three coordinates; two-component positions get `z = 0`.
    fn to_xyz(self) -> [f32; 3];
}

impl Position for [f32; 2] {
    fn to_xyz(self) -> [f32; 3] {
        [self[0], self[1], 0.0]
    }
}

impl Position for [f32; 3] {
    fn to_xyz(self) -> [f32; 3] {
        self
    }
}

impl Position for Vec2 {
    fn to_xyz(self) -> [f32; 3] {
        [self.x, self.y, 0.0]
    }
}

impl Position for Vec3 {
    fn to_xyz(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}
