//! Offset views into a shared float channel.

/// A window of `len` elements starting at element `offset` of a float
/// channel.
///
/// Path segments read their left, start, end and right points from the same
/// positions storage at offsets 0, 1, 2 and 3, so row `i` of the view at
/// offset `k` is element `i + k` of the backing channel. The GPU binding for
/// such a view is the backing buffer with [`byte_offset`](Self::byte_offset)
/// and [`stride`](Self::stride).
#[derive(Debug, Clone, Copy)]
pub struct AliasedView<'a> {
    values: &'a [f32],
    components: usize,
    offset: usize,
    stride: usize,
}

impl<'a> AliasedView<'a> {
    pub(crate) fn new(values: &'a [f32], components: usize, offset: usize, stride: usize) -> Self {
        Self {
            values,
            components,
            offset,
            stride,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len() / self.components.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element offset into the backing channel.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset into the backing channel.
    pub fn byte_offset(&self) -> usize {
        self.offset * self.stride
    }

    /// Bytes between consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Components of row `row`.
    pub fn get(&self, row: usize) -> Option<&'a [f32]> {
        let start = row * self.components;
        self.values.get(start..start + self.components)
    }

    /// Row `row` as a three component point, zero-padding narrower channels.
    pub fn point(&self, row: usize) -> Option<[f32; 3]> {
        self.get(row).map(|c| {
            let mut p = [0.0; 3];
            for (dst, src) in p.iter_mut().zip(c) {
                *dst = *src;
            }
            p
        })
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &'a [f32]> + 'a {
        self.values.chunks_exact(self.components.max(1))
    }
}
