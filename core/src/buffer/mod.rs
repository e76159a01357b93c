//! Growable per-instance attribute storage.
//!
//! An [`InstanceAttributeBuffer`] is a set of named [`AttributeChannel`]s
//! sharing one logical instance count. Channels grow but never shrink, track
//! the element range written since the last upload, and can be repacked
//! partially when only some rows changed.
//!
//! ```
//! use vizlayer_core::buffer::InstanceAttributeBuffer;
//! use vizlayer_core::mesh::VertexAttributeFormat;
//!
//! let mut buffer = InstanceAttributeBuffer::new()
//!     .with_channel("instancePositions", VertexAttributeFormat::Float3)
//!     .with_channel("instanceElevations", VertexAttributeFormat::Float);
//!
//! buffer.set_instance_count(2).unwrap();
//! buffer
//!     .write_elements("instancePositions", 0, &[[0.0f32, 0.0, 0.0], [1.0, 2.0, 0.0]])
//!     .unwrap();
//! assert_eq!(buffer.channel("instancePositions").unwrap().len(), 2);
//! ```

mod aliased;
mod channel;

use std::ops::Range;

pub use aliased::AliasedView;
pub use channel::{AttributeChannel, Component};

use crate::error::{GeometryError, GeometryResult};
use crate::mesh::VertexAttributeFormat;
use crate::profiling::profile_plot;

/// Named channels sized to a shared instance count.
#[derive(Debug, Clone, Default)]
pub struct InstanceAttributeBuffer {
    channels: Vec<AttributeChannel>,
    instance_count: usize,
}

impl InstanceAttributeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a per-instance channel (builder form).
    pub fn with_channel(mut self, name: impl Into<String>, format: VertexAttributeFormat) -> Self {
        self.add_channel(AttributeChannel::new(name, format));
        self
    }

    /// Add a channel, replacing any channel with the same name.
    ///
    /// The channel is sized to the current instance count.
    pub fn add_channel(&mut self, mut channel: AttributeChannel) {
        channel.ensure_capacity(self.instance_count);
        // Cannot fail: capacity was just ensured.
        let _ = channel.set_len(self.instance_count);
        match self.channels.iter_mut().find(|c| c.name() == channel.name()) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> GeometryResult<&AttributeChannel> {
        self.channels
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| GeometryError::UnknownChannel {
                name: name.to_string(),
            })
    }

    /// Look up a channel by name, mutably.
    pub fn channel_mut(&mut self, name: &str) -> GeometryResult<&mut AttributeChannel> {
        self.channels
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| GeometryError::UnknownChannel {
                name: name.to_string(),
            })
    }

    /// All channels in insertion order.
    pub fn channels(&self) -> impl Iterator<Item = &AttributeChannel> {
        self.channels.iter()
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Smallest capacity across channels.
    pub fn capacity(&self) -> usize {
        self.channels.iter().map(|c| c.capacity()).min().unwrap_or(0)
    }

    /// Grow every channel to hold `instances`. Returns `true` if any channel
    /// reallocated.
    pub fn ensure_capacity(&mut self, instances: usize) -> bool {
        let mut grew = false;
        for channel in &mut self.channels {
            grew |= channel.ensure_capacity(instances);
        }
        grew
    }

    /// Set the instance count, growing capacity when needed.
    ///
    /// Shrinking keeps every channel's allocation.
    pub fn set_instance_count(&mut self, instances: usize) -> GeometryResult<()> {
        self.ensure_capacity(instances);
        for channel in &mut self.channels {
            channel.set_len(instances)?;
        }
        profile_plot!("instance_count", instances);
        self.instance_count = instances;
        Ok(())
    }

    /// Write flattened components into a channel.
    pub fn write<T: Component>(
        &mut self,
        name: &str,
        offset: usize,
        values: &[T],
    ) -> GeometryResult<()> {
        self.channel_mut(name)?.write(offset, values)
    }

    /// Write whole elements into a channel.
    pub fn write_elements<T: Component, const N: usize>(
        &mut self,
        name: &str,
        offset: usize,
        elements: &[[T; N]],
    ) -> GeometryResult<()> {
        self.channel_mut(name)?.write_elements(offset, elements)
    }

    /// Repack `rows` of a channel from `data` through `accessor`.
    ///
    /// Row `i` receives `accessor(&data[i])`. The range must lie within both
    /// `data` and the instance count; other rows are left untouched, which is
    /// what makes partial updates cheap.
    pub fn pack<D, T: Component, const N: usize>(
        &mut self,
        name: &str,
        data: &[D],
        rows: Range<usize>,
        mut accessor: impl FnMut(&D) -> [T; N],
    ) -> GeometryResult<()> {
        let bound = data.len().min(self.instance_count);
        if rows.start > rows.end || rows.end > bound {
            return Err(GeometryError::out_of_range(
                name,
                rows.start,
                rows.end.saturating_sub(rows.start),
                bound,
            ));
        }
        let start = rows.start;
        let packed: Vec<[T; N]> = data[rows].iter().map(&mut accessor).collect();
        self.write_elements(name, start, &packed)
    }

    /// Mark one channel entirely dirty.
    pub fn invalidate(&mut self, name: &str) -> GeometryResult<()> {
        self.channel_mut(name)?.invalidate();
        Ok(())
    }

    /// Mark every channel entirely dirty.
    pub fn invalidate_all(&mut self) {
        for channel in &mut self.channels {
            channel.invalidate();
        }
    }

    /// Channel names and dirty ranges, clearing them.
    pub fn take_dirty(&mut self) -> Vec<(String, Range<usize>)> {
        self.channels
            .iter_mut()
            .filter_map(|c| c.take_dirty().map(|r| (c.name().to_string(), r)))
            .collect()
    }

    /// Drop all data and release every allocation.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.instance_count = 0;
    }
}
