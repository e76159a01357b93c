//! Layer error types.

use vizlayer_core::GeometryError;

/// Errors raised while configuring or updating a layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    /// Tesselation or buffer packing failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A configuration value is outside its allowed range.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl LayerError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LayerError::config("opacity", "must be within [0, 1], got 2");
        assert_eq!(
            err.to_string(),
            "invalid config `opacity`: must be within [0, 1], got 2"
        );

        let err: LayerError = GeometryError::UnknownChannel {
            name: "colors".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown channel `colors`");
    }
}
