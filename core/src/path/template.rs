/// Geometry instanced once per path segment.
///
/// Each vertex is `(along, side)`: `along` is 0 at the segment start and 1 at
/// its end, `side` is -1 / +1 for the two edges and 0 on the center line.
/// The triangles cover the start bevel corner, the body, and the end bevel
/// corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTemplate {
    pub positions: [[f32; 2]; 6],
    pub indices: [u16; 12],
}

impl SegmentTemplate {
    pub const fn new() -> Self {
        Self {
            positions: [
                [0.0, 0.0],
                [0.0, -1.0],
                [0.0, 1.0],
                [1.0, -1.0],
                [1.0, 1.0],
                [1.0, 0.0],
            ],
            indices: [0, 1, 2, 1, 4, 2, 1, 3, 4, 3, 5, 4],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

impl Default for SegmentTemplate {
    fn default() -> Self {
        Self::new()
    }
}
