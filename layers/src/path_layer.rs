//! Path layer state: per-segment instance rows over a shared template.

use std::ops::Range;

use vizlayer_core::GeometryError;
use vizlayer_core::buffer::InstanceAttributeBuffer;
use vizlayer_core::cache::{ChangeFlags, GeometryCache};
use vizlayer_core::mesh::VertexAttributeFormat;
use vizlayer_core::path::{
    PathSource, PathTesselator, PathTesselatorOptions, PathType, SegmentTemplate,
};

use crate::column_layer::{DEFAULT_COLOR, DEFAULT_LINE_WIDTH, INSTANCE_STROKE_WIDTHS};
use crate::config::{PathConfig, Units};
use crate::error::LayerResult;

/// Per-row path color channel.
pub const INSTANCE_COLORS: &str = "instanceColors";

/// Uniform values for a path draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathUniforms {
    pub width_units: Units,
    pub width_scale: f32,
    pub width_min_pixels: f32,
    pub width_max_pixels: f32,
    pub joint_rounded: bool,
    pub cap_rounded: bool,
    pub miter_limit: f32,
    pub billboard: bool,
    pub opacity: f32,
}

/// Width and color of each path, looked up by path index.
///
/// Every row of a path carries its path's values; gap rows get the
/// defaults.
pub struct PathStyles<'a> {
    width: Box<dyn Fn(usize) -> f32 + 'a>,
    color: Box<dyn Fn(usize) -> [u8; 4] + 'a>,
}

impl Default for PathStyles<'_> {
    fn default() -> Self {
        Self {
            width: Box::new(|_: usize| DEFAULT_LINE_WIDTH),
            color: Box::new(|_: usize| DEFAULT_COLOR),
        }
    }
}

impl<'a> PathStyles<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Styles read from the data the paths came from: path `i` uses
    /// `data[i]`.
    pub fn from_data<D>(
        data: &'a [D],
        width: impl Fn(&D) -> f32 + 'a,
        color: impl Fn(&D) -> [u8; 4] + 'a,
    ) -> Self {
        Self {
            width: Box::new(move |i| data.get(i).map_or(DEFAULT_LINE_WIDTH, &width)),
            color: Box::new(move |i| data.get(i).map_or(DEFAULT_COLOR, &color)),
        }
    }

    pub fn with_width(mut self, width: impl Fn(usize) -> f32 + 'a) -> Self {
        self.width = Box::new(width);
        self
    }

    pub fn with_color(mut self, color: impl Fn(usize) -> [u8; 4] + 'a) -> Self {
        self.color = Box::new(color);
        self
    }
}

/// Tesselated paths owned by one path layer.
#[derive(Debug)]
pub struct PathLayerState {
    config: PathConfig,
    cache: GeometryCache<Option<PathType>>,
    tesselator: PathTesselator,
    template: SegmentTemplate,
    styles: InstanceAttributeBuffer,
}

impl Default for PathLayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PathLayerState {
    pub fn new() -> Self {
        Self {
            config: PathConfig::default(),
            cache: GeometryCache::new(),
            tesselator: PathTesselator::default(),
            template: SegmentTemplate::default(),
            styles: InstanceAttributeBuffer::new()
                .with_channel(INSTANCE_STROKE_WIDTHS, VertexAttributeFormat::Float)
                .with_channel(INSTANCE_COLORS, VertexAttributeFormat::Unorm8x4),
        }
    }

    /// Apply a configuration, path data and per-path styles.
    ///
    /// A different path type turns the update structural and repacks every
    /// path; otherwise `changes` decides between a full and a partial repack.
    /// `resolution` is the viewport's, handed through to the tesselator.
    /// Widths are checked before any row is written.
    pub fn update<S: PathSource + ?Sized>(
        &mut self,
        config: PathConfig,
        source: &S,
        styles: &PathStyles<'_>,
        changes: &ChangeFlags,
        resolution: Option<f32>,
    ) -> LayerResult<()> {
        config.validate()?;
        for path in 0..source.path_count() {
            let width = (styles.width)(path);
            if !width.is_finite() {
                return Err(GeometryError::InvalidGeometry {
                    reason: format!("path {path} has a non-finite width {width}"),
                }
                .into());
            }
        }

        let structural = self.cache.should_retesselate(&config.path_type);
        let mut changes = changes.clone();
        if structural {
            changes.structural_flags_changed = true;
        }

        let previous = self.tesselator.options();
        self.tesselator.set_options(PathTesselatorOptions {
            path_type: config.path_type,
            resolution,
        });
        if let Err(err) = self.tesselator.update(source, &changes) {
            self.tesselator.set_options(previous);
            return Err(err.into());
        }

        let row_count = self.tesselator.instance_count();
        let rows = match changes.partial_range() {
            _ if row_count != self.styles.instance_count() => Some(0..row_count),
            _ if !changes.needs_update() => None,
            Some(paths) => self.row_span(paths),
            None => Some(0..row_count),
        };
        if let Some(rows) = rows {
            self.restyle(rows, styles)?;
        }

        if structural {
            log::debug!(
                "Layer `{}`: paths retesselated as {:?}",
                config.base.id,
                config.path_type
            );
            self.cache.store(config.path_type);
        }
        self.config = config;
        Ok(())
    }

    /// Rows covered by `paths`, or `None` when they have no segments.
    fn row_span(&self, paths: Range<usize>) -> Option<Range<usize>> {
        paths
            .filter_map(|path| self.tesselator.path_range(path))
            .filter(|&(_, count)| count > 0)
            .map(|(start, count)| start..start + count)
            .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end))
    }

    fn restyle(&mut self, rows: Range<usize>, styles: &PathStyles<'_>) -> LayerResult<()> {
        let row_count = self.tesselator.instance_count();
        let mut owners = vec![None; row_count];
        for path in 0..self.tesselator.path_count() {
            match self.tesselator.path_range(path) {
                Some((start, count)) if count > 0 => owners[start..start + count].fill(Some(path)),
                _ => {}
            }
        }

        self.styles.set_instance_count(row_count)?;
        self.styles.pack(INSTANCE_STROKE_WIDTHS, &owners, rows.clone(), |owner| {
            [owner.map_or(DEFAULT_LINE_WIDTH, |path| (styles.width)(path))]
        })?;
        self.styles.pack(INSTANCE_COLORS, &owners, rows.clone(), |owner| {
            owner.map_or(DEFAULT_COLOR, |path| (styles.color)(path))
        })?;
        log::trace!("Restyled path rows {rows:?}");
        Ok(())
    }

    pub fn uniforms(&self) -> PathUniforms {
        let config = &self.config;
        PathUniforms {
            width_units: config.width_units,
            width_scale: config.width_scale,
            width_min_pixels: config.width_min_pixels,
            width_max_pixels: config.width_max_pixels,
            joint_rounded: config.rounded,
            cap_rounded: config.rounded,
            miter_limit: config.miter_limit,
            billboard: config.billboard,
            opacity: config.base.opacity,
        }
    }

    /// Instances to draw; zero when the layer is hidden.
    pub fn draw_instance_count(&self) -> usize {
        if self.config.base.visible {
            self.tesselator.instance_count()
        } else {
            0
        }
    }

    /// `(start_row, row_count)` of path `index`.
    pub fn path_range(&self, index: usize) -> Option<(usize, usize)> {
        self.tesselator.path_range(index)
    }

    pub fn tesselator(&self) -> &PathTesselator {
        &self.tesselator
    }

    /// Per-row width and color channels.
    pub fn styles(&self) -> &InstanceAttributeBuffer {
        &self.styles
    }

    pub fn template(&self) -> &SegmentTemplate {
        &self.template
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// Channels written since the last call, for upload.
    pub fn take_dirty(&mut self) -> Vec<(String, Range<usize>)> {
        let mut dirty = self.tesselator.take_dirty();
        dirty.extend(self.styles.take_dirty());
        dirty
    }
}
