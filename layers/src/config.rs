//! Layer configuration.
//!
//! Each layer kind has one immutable configuration struct built from a
//! shared [`LayerConfig`] plus its own fields. Defaults match what a layer
//! gets when nothing is specified; `with_*` methods override single values.

use std::sync::Arc;

use vizlayer_core::cache::ColumnGeometryKey;
use vizlayer_core::mesh::Shading;
use vizlayer_core::path::PathType;

use crate::error::{LayerError, LayerResult};

/// Smallest disk resolution a column layer accepts.
pub const MIN_DISK_RESOLUTION: u32 = 4;

/// How a radius or width is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Units {
    /// World-space units of the projection.
    Common,
    #[default]
    Meters,
    /// Screen pixels.
    Pixels,
}

impl Units {
    /// Value handed to the shader.
    pub fn as_uniform(self) -> i32 {
        match self {
            Self::Common => 0,
            Self::Meters => 1,
            Self::Pixels => 2,
        }
    }
}

/// Settings shared by every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub id: String,
    pub visible: bool,
    /// Within `[0, 1]`.
    pub opacity: f32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            id: String::from("layer"),
            visible: true,
            opacity: 1.0,
        }
    }
}

impl LayerConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn validate(&self) -> LayerResult<()> {
        check_unit("opacity", self.opacity)
    }
}

fn check_unit(field: &'static str, value: f32) -> LayerResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LayerError::config(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}

fn check_non_negative(field: &'static str, value: f32) -> LayerResult<()> {
    if value >= 0.0 && !value.is_nan() {
        Ok(())
    } else {
        Err(LayerError::config(
            field,
            format!("must be non-negative, got {value}"),
        ))
    }
}

fn check_pixel_range(field: &'static str, min: f32, max: f32) -> LayerResult<()> {
    check_non_negative(field, min)?;
    check_non_negative(field, max)?;
    if min > max {
        return Err(LayerError::config(
            field,
            format!("minimum {min} exceeds maximum {max}"),
        ));
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f32) -> LayerResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayerError::config(field, format!("must be finite, got {value}")))
    }
}

/// Extruded (or flat) polygon columns placed at each datum.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    pub base: LayerConfig,
    /// Number of ring points.
    pub disk_resolution: u32,
    /// Explicit ring; replaces the regular polygon when set. Compared by
    /// identity when deciding whether to rebuild the mesh.
    pub vertices: Option<Arc<[[f32; 2]]>>,
    pub radius: f32,
    pub radius_units: Units,
    /// Rotation in degrees.
    pub angle: f32,
    pub offset: [f32; 2],
    /// Scale of the ring relative to `radius`, within `[0, 1]`.
    pub coverage: f32,
    pub elevation_scale: f32,
    pub line_width_units: Units,
    pub line_width_scale: f32,
    pub line_width_min_pixels: f32,
    pub line_width_max_pixels: f32,
    pub extruded: bool,
    pub wireframe: bool,
    pub filled: bool,
    pub stroked: bool,
    pub flat_shading: bool,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            base: LayerConfig::default(),
            disk_resolution: 20,
            vertices: None,
            radius: 1000.0,
            radius_units: Units::Meters,
            angle: 0.0,
            offset: [0.0, 0.0],
            coverage: 1.0,
            elevation_scale: 1.0,
            line_width_units: Units::Meters,
            line_width_scale: 1.0,
            line_width_min_pixels: 0.0,
            line_width_max_pixels: f32::MAX,
            extruded: true,
            wireframe: false,
            filled: true,
            stroked: false,
            flat_shading: false,
        }
    }
}

impl ColumnConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: LayerConfig::new(id),
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: LayerConfig) -> Self {
        self.base = base;
        self
    }

    pub fn with_disk_resolution(mut self, disk_resolution: u32) -> Self {
        self.disk_resolution = disk_resolution;
        self
    }

    pub fn with_vertices(mut self, vertices: Arc<[[f32; 2]]>) -> Self {
        self.vertices = Some(vertices);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_radius_units(mut self, radius_units: Units) -> Self {
        self.radius_units = radius_units;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_offset(mut self, offset: [f32; 2]) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_coverage(mut self, coverage: f32) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_elevation_scale(mut self, elevation_scale: f32) -> Self {
        self.elevation_scale = elevation_scale;
        self
    }

    pub fn with_line_width_units(mut self, units: Units) -> Self {
        self.line_width_units = units;
        self
    }

    pub fn with_line_width_scale(mut self, scale: f32) -> Self {
        self.line_width_scale = scale;
        self
    }

    pub fn with_line_width_pixels(mut self, min: f32, max: f32) -> Self {
        self.line_width_min_pixels = min;
        self.line_width_max_pixels = max;
        self
    }

    pub fn with_extruded(mut self, extruded: bool) -> Self {
        self.extruded = extruded;
        self
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn with_filled(mut self, filled: bool) -> Self {
        self.filled = filled;
        self
    }

    pub fn with_stroked(mut self, stroked: bool) -> Self {
        self.stroked = stroked;
        self
    }

    pub fn with_flat_shading(mut self, flat_shading: bool) -> Self {
        self.flat_shading = flat_shading;
        self
    }

    pub fn validate(&self) -> LayerResult<()> {
        self.base.validate()?;
        if self.disk_resolution < MIN_DISK_RESOLUTION {
            return Err(LayerError::config(
                "disk_resolution",
                format!(
                    "must be at least {MIN_DISK_RESOLUTION}, got {}",
                    self.disk_resolution
                ),
            ));
        }
        check_non_negative("radius", self.radius)?;
        check_finite("radius", self.radius)?;
        check_finite("angle", self.angle)?;
        check_finite("offset", self.offset[0])?;
        check_finite("offset", self.offset[1])?;
        check_unit("coverage", self.coverage)?;
        check_non_negative("elevation_scale", self.elevation_scale)?;
        check_non_negative("line_width_scale", self.line_width_scale)?;
        check_pixel_range(
            "line_width_min_pixels",
            self.line_width_min_pixels,
            self.line_width_max_pixels,
        )?;
        Ok(())
    }

    /// Copy with out-of-range numbers clamped into range.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.disk_resolution < MIN_DISK_RESOLUTION {
            log::warn!(
                "Layer `{}`: disk_resolution {} raised to {MIN_DISK_RESOLUTION}",
                config.base.id,
                config.disk_resolution
            );
            config.disk_resolution = MIN_DISK_RESOLUTION;
        }
        let id = config.base.id.clone();
        config.base.opacity = clamp_logged(&id, "opacity", config.base.opacity, 0.0, 1.0);
        config.coverage = clamp_logged(&id, "coverage", config.coverage, 0.0, 1.0);
        config.radius = clamp_logged(&id, "radius", config.radius, 0.0, f32::MAX);
        config.elevation_scale =
            clamp_logged(&id, "elevation_scale", config.elevation_scale, 0.0, f32::MAX);
        config.line_width_scale =
            clamp_logged(&id, "line_width_scale", config.line_width_scale, 0.0, f32::MAX);
        config
    }

    /// Side wall height the mesh is built with; the renderer scales it.
    pub fn geometry_height(&self) -> f32 {
        if self.extruded || self.stroked { 2.0 } else { 0.0 }
    }

    /// Shading of the built mesh. Flat only applies to extruded columns.
    pub fn shading(&self) -> Shading {
        if self.extruded && self.flat_shading {
            Shading::Flat
        } else {
            Shading::Smooth
        }
    }

    /// The settings that decide whether the mesh must be rebuilt.
    pub fn geometry_key(&self) -> ColumnGeometryKey {
        ColumnGeometryKey::new(
            self.disk_resolution,
            self.vertices.as_ref(),
            self.extruded,
            self.stroked,
            self.flat_shading,
        )
    }
}

fn clamp_logged(id: &str, field: &str, value: f32, min: f32, max: f32) -> f32 {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != value {
        log::warn!("Layer `{id}`: {field} {value} clamped to {clamped}");
    }
    clamped
}

/// Polylines drawn as instanced segments.
#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    pub base: LayerConfig,
    /// `None` detects closed paths from their points.
    pub path_type: Option<PathType>,
    pub width_units: Units,
    pub width_scale: f32,
    pub width_min_pixels: f32,
    pub width_max_pixels: f32,
    /// Round joints and caps instead of mitered ones.
    pub rounded: bool,
    pub miter_limit: f32,
    pub billboard: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            base: LayerConfig::default(),
            path_type: None,
            width_units: Units::Meters,
            width_scale: 1.0,
            width_min_pixels: 0.0,
            width_max_pixels: f32::MAX,
            rounded: false,
            miter_limit: 4.0,
            billboard: false,
        }
    }
}

impl PathConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: LayerConfig::new(id),
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: LayerConfig) -> Self {
        self.base = base;
        self
    }

    pub fn with_path_type(mut self, path_type: PathType) -> Self {
        self.path_type = Some(path_type);
        self
    }

    pub fn with_width_units(mut self, width_units: Units) -> Self {
        self.width_units = width_units;
        self
    }

    pub fn with_width_scale(mut self, width_scale: f32) -> Self {
        self.width_scale = width_scale;
        self
    }

    pub fn with_width_pixels(mut self, min: f32, max: f32) -> Self {
        self.width_min_pixels = min;
        self.width_max_pixels = max;
        self
    }

    pub fn with_rounded(mut self, rounded: bool) -> Self {
        self.rounded = rounded;
        self
    }

    pub fn with_miter_limit(mut self, miter_limit: f32) -> Self {
        self.miter_limit = miter_limit;
        self
    }

    pub fn with_billboard(mut self, billboard: bool) -> Self {
        self.billboard = billboard;
        self
    }

    pub fn validate(&self) -> LayerResult<()> {
        self.base.validate()?;
        check_non_negative("width_scale", self.width_scale)?;
        check_pixel_range("width_min_pixels", self.width_min_pixels, self.width_max_pixels)?;
        check_non_negative("miter_limit", self.miter_limit)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_column_defaults() {
        let config = ColumnConfig::default();
        assert_eq!(config.disk_resolution, 20);
        assert_eq!(config.radius, 1000.0);
        assert!(config.extruded && config.filled);
        assert!(!config.wireframe && !config.stroked && !config.flat_shading);
        assert_eq!(config.radius_units, Units::Meters);
        assert_eq!(config.line_width_units.as_uniform(), 1);
        assert_eq!(config.line_width_max_pixels, f32::MAX);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::resolution(ColumnConfig::default().with_disk_resolution(3), "disk_resolution")]
    #[case::coverage(ColumnConfig::default().with_coverage(1.5), "coverage")]
    #[case::radius(ColumnConfig::default().with_radius(-1.0), "radius")]
    #[case::elevation(ColumnConfig::default().with_elevation_scale(-2.0), "elevation_scale")]
    #[case::line_width_scale(
        ColumnConfig::default().with_line_width_scale(-1.0),
        "line_width_scale"
    )]
    #[case::line_width_pixels(
        ColumnConfig::default().with_line_width_pixels(8.0, 2.0),
        "line_width_min_pixels"
    )]
    #[case::opacity(
        ColumnConfig::default().with_base(LayerConfig::new("c").with_opacity(2.0)),
        "opacity"
    )]
    fn test_column_validation(#[case] config: ColumnConfig, #[case] expected: &str) {
        match config.validate() {
            Err(LayerError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_column_normalized_clamps() {
        let config = ColumnConfig::new("columns")
            .with_disk_resolution(2)
            .with_coverage(-0.5)
            .with_radius(f32::NAN)
            .normalized();
        assert_eq!(config.disk_resolution, MIN_DISK_RESOLUTION);
        assert_eq!(config.coverage, 0.0);
        assert_eq!(config.radius, 0.0);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::extruded(true, false, false, 2.0, Shading::Smooth)]
    #[case::extruded_flat(true, false, true, 2.0, Shading::Flat)]
    #[case::stroked_2d(false, true, true, 2.0, Shading::Smooth)]
    #[case::flat_2d(false, false, true, 0.0, Shading::Smooth)]
    fn test_column_geometry_settings(
        #[case] extruded: bool,
        #[case] stroked: bool,
        #[case] flat_shading: bool,
        #[case] height: f32,
        #[case] shading: Shading,
    ) {
        let config = ColumnConfig::default()
            .with_extruded(extruded)
            .with_stroked(stroked)
            .with_flat_shading(flat_shading);
        assert_eq!(config.geometry_height(), height);
        assert_eq!(config.shading(), shading);
    }

    #[test]
    fn test_path_defaults_and_validation() {
        let config = PathConfig::new("paths");
        assert_eq!(config.path_type, None);
        assert_eq!(config.miter_limit, 4.0);
        assert_eq!(config.width_units, Units::Meters);
        assert!(config.validate().is_ok());

        let bad = config.clone().with_width_pixels(10.0, 2.0);
        assert!(matches!(
            bad.validate(),
            Err(LayerError::InvalidConfig {
                field: "width_min_pixels",
                ..
            })
        ));
        assert!(config.with_miter_limit(-1.0).validate().is_err());
    }
}
