use std::ops::Range;

use crate::error::{GeometryError, GeometryResult};
use crate::mesh::{ComponentType, VertexAttributeFormat};

use super::aliased::AliasedView;

/// Scalar types that can be stored in an [`AttributeChannel`].
pub trait Component: bytemuck::Pod + Default {
    /// The matching runtime component type.
    const TYPE: ComponentType;

    #[doc(hidden)]
    fn slice(storage: &ChannelStorage) -> Option<&[Self]>;

    #[doc(hidden)]
    fn slice_mut(storage: &mut ChannelStorage) -> Option<&mut [Self]>;
}

/// Typed backing storage. Always sized to the channel's full capacity.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub enum ChannelStorage {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

macro_rules! impl_component {
    ($t:ty, $variant:ident, $ty:expr) => {
        impl Component for $t {
            const TYPE: ComponentType = $ty;

            fn slice(storage: &ChannelStorage) -> Option<&[Self]> {
                match storage {
                    ChannelStorage::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(storage: &mut ChannelStorage) -> Option<&mut [Self]> {
                match storage {
                    ChannelStorage::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_component!(u8, U8, ComponentType::U8);
impl_component!(u16, U16, ComponentType::U16);
impl_component!(f32, F32, ComponentType::F32);

impl ChannelStorage {
    fn new(ty: ComponentType) -> Self {
        match ty {
            ComponentType::U8 => Self::U8(Vec::new()),
            ComponentType::U16 => Self::U16(Vec::new()),
            ComponentType::F32 => Self::F32(Vec::new()),
        }
    }

    /// Reallocate to `components` values, copying the first `live` forward
    /// and zero-filling the rest.
    fn reallocate(&mut self, components: usize, live: usize) {
        fn grow<T: Copy + Default>(old: &mut Vec<T>, components: usize, live: usize) {
            let mut next = Vec::with_capacity(components);
            next.extend_from_slice(&old[..live]);
            next.resize(components, T::default());
            *old = next;
        }
        match self {
            Self::U8(v) => grow(v, components, live),
            Self::U16(v) => grow(v, components, live),
            Self::F32(v) => grow(v, components, live),
        }
    }

    fn copy_within(&mut self, src: Range<usize>, dest: usize) {
        match self {
            Self::U8(v) => v.copy_within(src, dest),
            Self::U16(v) => v.copy_within(src, dest),
            Self::F32(v) => v.copy_within(src, dest),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U8(v) => v,
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::F32(v) => bytemuck::cast_slice(v),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::U8(v) => *v = Vec::new(),
            Self::U16(v) => *v = Vec::new(),
            Self::F32(v) => *v = Vec::new(),
        }
    }
}

/// A named, typed, fixed-stride buffer of per-instance data.
///
/// ## Length and capacity
///
/// The logical element count (`len`) may be smaller than the allocated
/// capacity. Capacity only grows: [`ensure_capacity`](Self::ensure_capacity)
/// reallocates when asked for more than it has and is a no-op otherwise, and
/// shrinking the logical length never gives memory back. Only
/// [`reset`](Self::reset) releases the allocation.
///
/// ## Change tracking
///
/// Every write widens a dirty element range so the consumer can upload only
/// what changed. [`take_dirty`](Self::take_dirty) hands it out and clears it.
#[derive(Debug, Clone)]
pub struct AttributeChannel {
    name: String,
    format: VertexAttributeFormat,
    storage: ChannelStorage,
    len: usize,
    capacity: usize,
    dirty: Option<Range<usize>>,
    reallocations: usize,
}

impl AttributeChannel {
    /// Create an empty per-instance channel.
    pub fn new(name: impl Into<String>, format: VertexAttributeFormat) -> Self {
        Self {
            name: name.into(),
            format,
            storage: ChannelStorage::new(format.component_type()),
            len: 0,
            capacity: 0,
            dirty: None,
            reallocations: 0,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element format.
    pub fn format(&self) -> VertexAttributeFormat {
        self.format
    }

    /// Scalar components per element.
    pub fn components(&self) -> usize {
        self.format.components()
    }

    /// Bytes per element.
    pub fn stride(&self) -> usize {
        self.format.size()
    }

    /// Logical element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the logical length is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated element capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many times the backing storage has been reallocated.
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Make room for at least `elements` elements.
    ///
    /// Reallocates (copying the live region forward) only when `elements`
    /// exceeds the current capacity; grows by at least half the current
    /// capacity to amortise repeated growth. Returns `true` if it reallocated.
    pub fn ensure_capacity(&mut self, elements: usize) -> bool {
        if elements <= self.capacity {
            return false;
        }
        let capacity = elements.max(self.capacity + self.capacity / 2);
        let components = self.components();
        self.storage
            .reallocate(capacity * components, self.len * components);
        log::debug!(
            "Channel `{}` grew from {} to {} elements",
            self.name,
            self.capacity,
            capacity
        );
        self.capacity = capacity;
        self.reallocations += 1;
        true
    }

    /// Set the logical length without touching the allocation.
    ///
    /// Fails with `OutOfRange` if `len` exceeds capacity. Elements exposed by
    /// growing the length keep whatever the storage last held.
    pub fn set_len(&mut self, len: usize) -> GeometryResult<()> {
        if len > self.capacity {
            return Err(GeometryError::out_of_range(&self.name, 0, len, self.capacity));
        }
        self.len = len;
        if let Some(dirty) = &mut self.dirty {
            dirty.end = dirty.end.min(len);
            if dirty.start >= dirty.end {
                self.dirty = None;
            }
        }
        Ok(())
    }

    /// Shrink the logical length; capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            // Cannot fail: len < self.len <= capacity.
            let _ = self.set_len(len);
        }
    }

    /// Grow capacity if needed and set the logical length.
    pub fn resize(&mut self, len: usize) -> GeometryResult<()> {
        self.ensure_capacity(len);
        self.set_len(len)
    }

    /// Overwrite elements starting at element `offset`.
    ///
    /// `values` holds flattened components and must be a whole number of
    /// elements. Writing past the logical length extends it; writing past
    /// capacity fails with `OutOfRange`.
    pub fn write<T: Component>(&mut self, offset: usize, values: &[T]) -> GeometryResult<()> {
        let components = self.components();
        if values.len() % components != 0 {
            return Err(GeometryError::ChannelMismatch {
                channel: self.name.clone(),
                expected: format!("a multiple of {components} components"),
                found: format!("{} components", values.len()),
            });
        }
        let count = values.len() / components;
        let end = self.checked_end(offset, count, self.capacity)?;
        let storage = self.storage_mut::<T>()?;
        storage[offset * components..end * components].copy_from_slice(values);

        self.len = self.len.max(end);
        self.mark_dirty(offset..end);
        Ok(())
    }

    /// Overwrite whole elements given as fixed-size arrays.
    pub fn write_elements<T: Component, const N: usize>(
        &mut self,
        offset: usize,
        elements: &[[T; N]],
    ) -> GeometryResult<()> {
        if N != self.components() {
            return Err(self.mismatch::<T>(N));
        }
        self.write(offset, elements.as_flattened())
    }

    /// Read `count` elements starting at `start`, as flattened components.
    ///
    /// Bounds-checked against the logical length.
    pub fn view<T: Component>(&self, start: usize, count: usize) -> GeometryResult<&[T]> {
        let end = self.checked_end(start, count, self.len)?;
        let components = self.components();
        let storage = self.storage::<T>()?;
        Ok(&storage[start * components..end * components])
    }

    /// Read elements as fixed-size arrays.
    pub fn view_elements<T: Component, const N: usize>(
        &self,
        start: usize,
        count: usize,
    ) -> GeometryResult<&[[T; N]]> {
        if N != self.components() {
            return Err(self.mismatch::<T>(N));
        }
        let flat = self.view::<T>(start, count)?;
        Ok(bytemuck::cast_slice(flat))
    }

    /// Read a single element.
    pub fn element<T: Component, const N: usize>(&self, index: usize) -> GeometryResult<[T; N]> {
        Ok(self.view_elements::<T, N>(index, 1)?[0])
    }

    /// The whole live region as flattened components.
    pub fn values<T: Component>(&self) -> GeometryResult<&[T]> {
        self.view(0, self.len)
    }

    /// View of `count` elements starting at element `offset`, over `f32`
    /// storage, sharing this channel's memory.
    ///
    /// Several views at different offsets alias the same storage; see
    /// [`AliasedView`].
    pub fn aliased(&self, offset: usize, count: usize) -> GeometryResult<AliasedView<'_>> {
        let components = self.components();
        let values = self.view::<f32>(offset, count)?;
        Ok(AliasedView::new(values, components, offset, self.stride()))
    }

    /// Move elements `src` to start at element `dest`, like
    /// [`slice::copy_within`]. Both ranges must lie within capacity; the
    /// logical length grows to cover the destination.
    pub fn copy_within(&mut self, src: Range<usize>, dest: usize) -> GeometryResult<()> {
        let count = src.end.saturating_sub(src.start);
        if src.end > self.capacity || src.start > src.end {
            return Err(GeometryError::out_of_range(
                &self.name,
                src.start,
                count,
                self.capacity,
            ));
        }
        let dest_end = self.checked_end(dest, count, self.capacity)?;
        if count == 0 {
            return Ok(());
        }
        let components = self.components();
        self.storage
            .copy_within(src.start * components..src.end * components, dest * components);
        self.len = self.len.max(dest_end);
        self.mark_dirty(dest..dest_end);
        Ok(())
    }

    /// Raw bytes of the live region, for upload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage.as_bytes()[..self.len * self.stride()]
    }

    /// Mark the whole live region dirty.
    pub fn invalidate(&mut self) {
        if self.len > 0 {
            self.dirty = Some(0..self.len);
        }
    }

    /// Whether anything changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// The element range changed since the last [`take_dirty`](Self::take_dirty).
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Hand out the dirty range and clear it.
    pub fn take_dirty(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }

    /// Drop all data and release the allocation.
    pub fn reset(&mut self) {
        self.storage.clear();
        self.len = 0;
        self.capacity = 0;
        self.dirty = None;
    }

    fn mark_dirty(&mut self, range: Range<usize>) {
        if range.start >= range.end {
            return;
        }
        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(range.start)..d.end.max(range.end),
            None => range,
        });
    }

    /// `offset + count` if it stays within `bound`.
    fn checked_end(&self, offset: usize, count: usize, bound: usize) -> GeometryResult<usize> {
        offset
            .checked_add(count)
            .filter(|&end| end <= bound)
            .ok_or_else(|| GeometryError::out_of_range(&self.name, offset, count, bound))
    }

    fn storage<T: Component>(&self) -> GeometryResult<&[T]> {
        T::slice(&self.storage).ok_or_else(|| self.mismatch::<T>(self.components()))
    }

    fn storage_mut<T: Component>(&mut self) -> GeometryResult<&mut [T]> {
        if T::TYPE != self.format.component_type() {
            return Err(self.mismatch::<T>(self.components()));
        }
        Ok(T::slice_mut(&mut self.storage).unwrap_or_default())
    }

    fn mismatch<T: Component>(&self, components: usize) -> GeometryError {
        GeometryError::ChannelMismatch {
            channel: self.name.clone(),
            expected: format!("{:?}", self.format),
            found: format!("{} x {}", T::TYPE.name(), components),
        }
    }
}
