//! Geometry error types.

/// Errors raised while tesselating geometry or accessing attribute buffers.
///
/// A tesselation call that returns an error has not published anything:
/// the previously written buffers are left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// The input cannot be turned into valid topology.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// A buffer access fell outside the logical length or allocated capacity.
    #[error("channel `{channel}`: range {offset}..{offset}+{count} exceeds bound {bound}")]
    OutOfRange {
        channel: String,
        offset: usize,
        count: usize,
        bound: usize,
    },

    /// Typed access did not match the channel's declared format.
    #[error("channel `{channel}`: expected {expected}, found {found}")]
    ChannelMismatch {
        channel: String,
        expected: String,
        found: String,
    },

    /// No channel with the given name was declared.
    #[error("unknown channel `{name}`")]
    UnknownChannel { name: String },
}

impl GeometryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(channel: &str, offset: usize, count: usize, bound: usize) -> Self {
        Self::OutOfRange {
            channel: channel.to_string(),
            offset,
            count,
            bound,
        }
    }
}

/// Result alias used throughout the crate.
pub type GeometryResult<T> = Result<T, GeometryError>;
