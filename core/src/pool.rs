//! Allocation reuse for regenerated geometry.
//!
//! Layers rebuild meshes and packing scratch whenever their inputs change.
//! [`Pooled<T>`] keeps a value's allocations alive between rebuilds: instead
//! of dropping, a released value is cleared but keeps its `Vec` capacity, so
//! the next rebuild writes into memory that is already there.
//!
//! # Example
//!
//! ```
//! use vizlayer_core::pool::{Poolable, Pooled};
//!
//! #[derive(Debug, Default)]
//! struct Scratch {
//!     rows: Vec<[f32; 3]>,
//! }
//!
//! impl Poolable for Scratch {
//!     fn new_empty() -> Self {
//!         Self::default()
//!     }
//!     fn reset(&mut self) {
//!         self.rows.clear();
//!     }
//! }
//!
//! let mut spare = Pooled::<Scratch>::default();
//! spare.activate().rows.push([1.0, 2.0, 3.0]);
//!
//! // Publish the rebuilt value; the previous one comes back cleared.
//! let mut current = Scratch::default();
//! spare.commit_into(&mut current);
//! assert_eq!(current.rows.len(), 1);
//! assert!(spare.is_pooled());
//! ```

/// Values that can be cleared for reuse without losing their allocations.
pub trait Poolable {
    /// Empty value used to seed a pool.
    fn new_empty() -> Self;

    /// Clear contents, keeping capacity (`Vec::clear`, not `Vec::new`).
    fn reset(&mut self);
}

/// A value that is either in use or parked with its allocations intact.
#[derive(Debug)]
pub enum Pooled<T: Poolable> {
    /// Holds valid data.
    Active(T),
    /// Cleared; memory retained for the next activation.
    Pooled(T),
}

impl<T: Poolable> Pooled<T> {
    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled(_))
    }

    /// Clear the value and park it. No-op when already pooled.
    pub fn release(&mut self) {
        if let Self::Active(t) = self {
            t.reset();
            let parked = std::mem::replace(t, T::new_empty());
            *self = Self::Pooled(parked);
        }
    }

    /// Switch to the active state and hand out the (cleared) value to fill.
    ///
    /// An already active value is returned as is.
    pub fn activate(&mut self) -> &mut T {
        if let Self::Pooled(t) = self {
            let value = std::mem::replace(t, T::new_empty());
            *self = Self::Active(value);
        }
        self.inner_mut()
    }

    /// Swap the active value into `target` and park whatever `target` held.
    ///
    /// Returns `false` (and leaves `target` alone) when nothing is active.
    pub fn commit_into(&mut self, target: &mut T) -> bool {
        match self {
            Self::Active(t) => {
                std::mem::swap(t, target);
                self.release();
                true
            }
            Self::Pooled(_) => false,
        }
    }

    fn inner_mut(&mut self) -> &mut T {
        match self {
            Self::Active(t) | Self::Pooled(t) => t,
        }
    }
}

impl<T: Poolable> Default for Pooled<T> {
    fn default() -> Self {
        Self::Pooled(T::new_empty())
    }
}
