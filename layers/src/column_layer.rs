//! Column layer state: one shared mesh instanced per datum.

use std::ops::Range;
use std::sync::Arc;

use vizlayer_core::GeometryError;
use vizlayer_core::buffer::InstanceAttributeBuffer;
use vizlayer_core::cache::{ChangeFlags, ColumnGeometryKey, GeometryCache};
use vizlayer_core::math::{self, Position};
use vizlayer_core::mesh::{
    ColumnMesh, IndexRange, PrimitiveTopology, RingProfile, VertexAttributeFormat, VertexLayout,
    tesselate_column_into,
};
use vizlayer_core::pool::Pooled;

use crate::config::{ColumnConfig, Units};
use crate::error::LayerResult;

/// Per-instance center position channel.
pub const INSTANCE_POSITIONS: &str = "instancePositions";
/// Per-instance elevation channel.
pub const INSTANCE_ELEVATIONS: &str = "instanceElevations";
/// Per-instance fill color channel.
pub const INSTANCE_FILL_COLORS: &str = "instanceFillColors";
/// Per-instance outline color channel.
pub const INSTANCE_LINE_COLORS: &str = "instanceLineColors";
/// Per-instance outline width channel.
pub const INSTANCE_STROKE_WIDTHS: &str = "instanceStrokeWidths";

/// Color used when no color accessor is given.
pub const DEFAULT_COLOR: [u8; 4] = [0, 0, 0, 255];
/// Elevation used when no elevation accessor is given.
pub const DEFAULT_ELEVATION: f32 = 1000.0;
/// Line width used when no width accessor is given.
pub const DEFAULT_LINE_WIDTH: f32 = 1.0;

/// What a draw pass renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPassKind {
    Wireframe,
    Fill,
    Stroke,
}

/// One draw call over a sub-range of the column index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPass {
    pub kind: DrawPassKind,
    pub topology: PrimitiveTopology,
    pub range: IndexRange,
}

impl DrawPass {
    /// Whether the pass draws with line colors and widths.
    pub fn is_stroke(&self) -> bool {
        matches!(self.kind, DrawPassKind::Wireframe | DrawPassKind::Stroke)
    }
}

/// Uniform values for a column draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnUniforms {
    pub radius: f32,
    pub radius_units: Units,
    /// Rotation in radians.
    pub angle: f32,
    pub offset: [f32; 2],
    pub extruded: bool,
    pub coverage: f32,
    pub elevation_scale: f32,
    pub edge_distance: f32,
    pub width_units: Units,
    pub width_scale: f32,
    pub width_min_pixels: f32,
    pub width_max_pixels: f32,
    pub opacity: f32,
}

/// What an update did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnUpdate {
    /// The mesh was rebuilt.
    pub retesselated: bool,
    /// Instance rows that were rewritten.
    pub repacked: Option<Range<usize>>,
}

/// Reads each instance channel from a datum.
///
/// Only the position is required; every other channel falls back to a
/// constant.
pub struct ColumnAccessors<'a, D> {
    position: Box<dyn Fn(&D) -> [f32; 3] + 'a>,
    elevation: Box<dyn Fn(&D) -> f32 + 'a>,
    fill_color: Box<dyn Fn(&D) -> [u8; 4] + 'a>,
    line_color: Box<dyn Fn(&D) -> [u8; 4] + 'a>,
    line_width: Box<dyn Fn(&D) -> f32 + 'a>,
}

impl<'a, D> ColumnAccessors<'a, D> {
    pub fn new<P: Position>(position: impl Fn(&D) -> P + 'a) -> Self {
        Self {
            position: Box::new(move |d: &D| position(d).to_xyz()),
            elevation: Box::new(|_: &D| DEFAULT_ELEVATION),
            fill_color: Box::new(|_: &D| DEFAULT_COLOR),
            line_color: Box::new(|_: &D| DEFAULT_COLOR),
            line_width: Box::new(|_: &D| DEFAULT_LINE_WIDTH),
        }
    }

    pub fn with_elevation(mut self, elevation: impl Fn(&D) -> f32 + 'a) -> Self {
        self.elevation = Box::new(elevation);
        self
    }

    pub fn with_fill_color(mut self, fill_color: impl Fn(&D) -> [u8; 4] + 'a) -> Self {
        self.fill_color = Box::new(fill_color);
        self
    }

    pub fn with_line_color(mut self, line_color: impl Fn(&D) -> [u8; 4] + 'a) -> Self {
        self.line_color = Box::new(line_color);
        self
    }

    pub fn with_line_width(mut self, line_width: impl Fn(&D) -> f32 + 'a) -> Self {
        self.line_width = Box::new(line_width);
        self
    }

    /// Reject rows whose numeric channels are not finite.
    fn validate(&self, data: &[D], rows: Range<usize>) -> LayerResult<()> {
        let Some(slice) = data.get(rows.clone()) else {
            return Err(GeometryError::OutOfRange {
                channel: INSTANCE_POSITIONS.to_string(),
                offset: rows.start,
                count: rows.len(),
                bound: data.len(),
            }
            .into());
        };
        for (i, datum) in slice.iter().enumerate() {
            let finite = math::all_finite(&(self.position)(datum))
                && (self.elevation)(datum).is_finite()
                && (self.line_width)(datum).is_finite();
            if !finite {
                return Err(GeometryError::InvalidGeometry {
                    reason: format!(
                        "instance {} has a non-finite position, elevation or line width",
                        rows.start + i
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Geometry and instance buffers owned by one column layer.
#[derive(Debug)]
pub struct ColumnLayerState {
    config: ColumnConfig,
    cache: GeometryCache<ColumnGeometryKey>,
    mesh: ColumnMesh,
    spare: Pooled<ColumnMesh>,
    attributes: InstanceAttributeBuffer,
}

impl Default for ColumnLayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnLayerState {
    pub fn new() -> Self {
        Self {
            config: ColumnConfig::default(),
            cache: GeometryCache::new(),
            mesh: ColumnMesh::new(),
            spare: Pooled::default(),
            attributes: InstanceAttributeBuffer::new()
                .with_channel(INSTANCE_POSITIONS, VertexAttributeFormat::Float3)
                .with_channel(INSTANCE_ELEVATIONS, VertexAttributeFormat::Float)
                .with_channel(INSTANCE_FILL_COLORS, VertexAttributeFormat::Unorm8x4)
                .with_channel(INSTANCE_LINE_COLORS, VertexAttributeFormat::Unorm8x4)
                .with_channel(INSTANCE_STROKE_WIDTHS, VertexAttributeFormat::Float),
        }
    }

    /// Apply a configuration and instance data.
    ///
    /// The mesh is rebuilt only when the structural settings differ from the
    /// last build; instance rows are repacked as `changes` describes, or
    /// entirely when the instance count changed. The new mesh is built aside
    /// and swapped in only once the instance rows are written, so a failed
    /// call leaves mesh, cache and configuration as they were.
    pub fn update<D>(
        &mut self,
        config: ColumnConfig,
        data: &[D],
        changes: &ChangeFlags,
        accessors: &ColumnAccessors<'_, D>,
    ) -> LayerResult<ColumnUpdate> {
        config.validate()?;

        let count_changed = data.len() != self.attributes.instance_count();
        let rows = match changes.partial_range() {
            _ if count_changed => Some(0..data.len()),
            _ if !changes.needs_update() => None,
            Some(range) => Some(range),
            None => Some(0..data.len()),
        };
        if let Some(rows) = &rows {
            accessors.validate(data, rows.clone())?;
        }

        let key = config.geometry_key();
        let retesselated = self.cache.should_retesselate(&key);
        if retesselated {
            self.build_spare(&config)?;
        }
        if let Some(rows) = &rows {
            if let Err(err) = self.repack(data, rows.clone(), accessors) {
                self.spare.release();
                return Err(err);
            }
        }

        if retesselated {
            self.spare.commit_into(&mut self.mesh);
            self.cache.store(key);
            log::debug!(
                "Layer `{}`: column mesh rebuilt ({} vertices, {} indices)",
                config.base.id,
                self.mesh.vertex_count(),
                self.mesh.index_count()
            );
        }
        self.config = config;

        Ok(ColumnUpdate {
            retesselated,
            repacked: rows,
        })
    }

    /// Tesselate into the spare mesh without publishing it.
    fn build_spare(&mut self, config: &ColumnConfig) -> LayerResult<()> {
        let resolution = config.disk_resolution;
        let profile = match &config.vertices {
            Some(vertices) => RingProfile::from_vertices(vertices, resolution)?,
            None => RingProfile::regular(1.0, resolution)?,
        };

        let target = self.spare.activate();
        if let Err(err) = tesselate_column_into(
            &profile,
            config.geometry_height(),
            config.shading(),
            target,
        ) {
            self.spare.release();
            return Err(err.into());
        }
        Ok(())
    }

    fn repack<D>(
        &mut self,
        data: &[D],
        rows: Range<usize>,
        accessors: &ColumnAccessors<'_, D>,
    ) -> LayerResult<()> {
        let attributes = &mut self.attributes;
        attributes.set_instance_count(data.len())?;
        attributes.pack(INSTANCE_POSITIONS, data, rows.clone(), |d| (accessors.position)(d))?;
        attributes.pack(INSTANCE_ELEVATIONS, data, rows.clone(), |d| [(accessors.elevation)(d)])?;
        attributes.pack(INSTANCE_FILL_COLORS, data, rows.clone(), |d| (accessors.fill_color)(d))?;
        attributes.pack(INSTANCE_LINE_COLORS, data, rows.clone(), |d| (accessors.line_color)(d))?;
        attributes.pack(INSTANCE_STROKE_WIDTHS, data, rows.clone(), |d| {
            [(accessors.line_width)(d)]
        })?;
        log::trace!("Repacked column instances {rows:?}");
        Ok(())
    }

    /// Draw calls in submission order.
    ///
    /// An extruded wireframe goes first so depth testing does not hide it;
    /// a flat outline goes last so it sits on top of the fill. Empty ranges
    /// are skipped.
    pub fn draw_passes(&self) -> Vec<DrawPass> {
        let config = &self.config;
        if !config.base.visible || self.mesh.is_empty() {
            return Vec::new();
        }
        let ranges = self.mesh.index_ranges();
        let mut passes = Vec::with_capacity(3);

        if config.extruded && config.wireframe {
            passes.push(DrawPass {
                kind: DrawPassKind::Wireframe,
                topology: PrimitiveTopology::LineList,
                range: ranges.wireframe,
            });
        }
        if config.filled {
            // Side and top are adjacent, so one call covers both.
            let range = if config.extruded {
                ranges.side.merged(&ranges.top).unwrap_or(ranges.top)
            } else {
                ranges.top
            };
            passes.push(DrawPass {
                kind: DrawPassKind::Fill,
                topology: PrimitiveTopology::TriangleList,
                range,
            });
        }
        if !config.extruded && config.stroked {
            passes.push(DrawPass {
                kind: DrawPassKind::Stroke,
                topology: PrimitiveTopology::TriangleList,
                range: ranges.side,
            });
        }

        passes.retain(|pass| !pass.range.is_empty());
        passes
    }

    pub fn uniforms(&self) -> ColumnUniforms {
        let config = &self.config;
        ColumnUniforms {
            radius: config.radius,
            radius_units: config.radius_units,
            angle: config.angle.to_radians(),
            offset: config.offset,
            extruded: config.extruded,
            coverage: config.coverage,
            elevation_scale: config.elevation_scale,
            edge_distance: self.mesh.edge_distance(),
            width_units: config.line_width_units,
            width_scale: config.line_width_scale,
            width_min_pixels: config.line_width_min_pixels,
            width_max_pixels: config.line_width_max_pixels,
            opacity: config.base.opacity,
        }
    }

    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    pub fn mesh(&self) -> &ColumnMesh {
        &self.mesh
    }

    pub fn attributes(&self) -> &InstanceAttributeBuffer {
        &self.attributes
    }

    /// Binding layout of [`attributes`](Self::attributes), one buffer per
    /// channel in the same order.
    pub fn instance_layout(&self) -> Arc<VertexLayout> {
        VertexLayout::column_instances()
    }

    /// Channels written since the last call, for upload.
    pub fn take_dirty(&mut self) -> Vec<(String, Range<usize>)> {
        self.attributes.take_dirty()
    }

    pub fn instance_count(&self) -> usize {
        self.attributes.instance_count()
    }

    pub fn cache(&self) -> &GeometryCache<ColumnGeometryKey> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayerError;
    use std::sync::Arc;

    struct Tower {
        position: [f32; 2],
        height: f32,
    }

    fn towers(n: usize) -> Vec<Tower> {
        (0..n)
            .map(|i| Tower {
                position: [i as f32, -(i as f32)],
                height: 10.0 * i as f32,
            })
            .collect()
    }

    fn accessors<'a>() -> ColumnAccessors<'a, Tower> {
        ColumnAccessors::new(|t: &Tower| t.position).with_elevation(|t| t.height)
    }

    fn update(
        state: &mut ColumnLayerState,
        config: ColumnConfig,
        data: &[Tower],
        changes: &ChangeFlags,
    ) -> LayerResult<ColumnUpdate> {
        state.update(config, data, changes, &accessors())
    }

    #[test]
    fn test_first_update_builds_everything() {
        let mut state = ColumnLayerState::new();
        let data = towers(3);
        let result =
            update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();

        assert!(result.retesselated);
        assert_eq!(result.repacked, Some(0..3));
        assert_eq!(state.mesh().resolution(), 20);
        assert_eq!(state.instance_count(), 3);
        let positions = state.attributes().channel(INSTANCE_POSITIONS).unwrap();
        assert_eq!(positions.element::<f32, 3>(2).unwrap(), [2.0, -2.0, 0.0]);
    }

    #[test]
    fn test_data_change_keeps_mesh() {
        let mut state = ColumnLayerState::new();
        let mut data = towers(4);
        update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();
        let indices = state.mesh().indices().to_vec();

        data[1].height = 99.0;
        let result = update(
            &mut state,
            ColumnConfig::default(),
            &data,
            &ChangeFlags::data_range(1..2),
        )
        .unwrap();

        assert!(!result.retesselated);
        assert_eq!(result.repacked, Some(1..2));
        assert_eq!(state.mesh().indices(), indices.as_slice());
        assert_eq!(state.cache().hits(), 1);
        let elevations = state.attributes().channel(INSTANCE_ELEVATIONS).unwrap();
        assert_eq!(elevations.values::<f32>().unwrap(), &[0.0, 99.0, 20.0, 30.0]);
    }

    #[test]
    fn test_instance_count_change_repacks_all() {
        let mut state = ColumnLayerState::new();
        update(&mut state, ColumnConfig::default(), &towers(2), &ChangeFlags::all_data()).unwrap();
        let result = update(
            &mut state,
            ColumnConfig::default(),
            &towers(5),
            &ChangeFlags::data_range(0..1),
        )
        .unwrap();
        assert_eq!(result.repacked, Some(0..5));
        assert_eq!(state.instance_count(), 5);
    }

    #[test]
    fn test_structural_change_rebuilds() {
        let mut state = ColumnLayerState::new();
        let data = towers(1);
        update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();
        let smooth_vertices = state.mesh().vertex_count();

        let flat = ColumnConfig::default().with_flat_shading(true);
        let result = update(&mut state, flat, &data, &ChangeFlags::none()).unwrap();
        assert!(result.retesselated);
        assert_eq!(result.repacked, None);
        assert_eq!(smooth_vertices, 3 * 20);
        assert_eq!(state.mesh().vertex_count(), 5 * 20);
    }

    #[test]
    fn test_failed_structural_update_publishes_nothing() {
        let mut state = ColumnLayerState::new();
        let mut data = towers(2);
        update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();
        let vertices = state.mesh().vertex_count();
        let indices = state.mesh().indices().to_vec();

        data[1].height = f32::NAN;
        let flat = ColumnConfig::default().with_flat_shading(true);
        let err = update(&mut state, flat.clone(), &data, &ChangeFlags::all_data()).unwrap_err();
        assert!(matches!(
            err,
            LayerError::Geometry(GeometryError::InvalidGeometry { .. })
        ));
        assert_eq!(state.mesh().vertex_count(), vertices);
        assert_eq!(state.mesh().indices(), indices.as_slice());
        assert!(!state.config().flat_shading);
        assert!(state.cache().key().is_some_and(|k| !k.flat));
        let ranges = state.mesh().index_ranges();
        assert_eq!(state.draw_passes()[0].range, ranges.side.merged(&ranges.top).unwrap());

        // The same change goes through once the data is valid.
        data[1].height = 5.0;
        let result = update(&mut state, flat, &data, &ChangeFlags::all_data()).unwrap();
        assert!(result.retesselated);
        assert_eq!(state.mesh().vertex_count(), 5 * 20);
    }

    #[test]
    fn test_style_channels_default_and_override() {
        let mut state = ColumnLayerState::new();
        let data = towers(2);
        update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();
        let fills = state.attributes().channel(INSTANCE_FILL_COLORS).unwrap();
        assert_eq!(fills.values::<u8>().unwrap(), &[0, 0, 0, 255, 0, 0, 0, 255]);
        let widths = state.attributes().channel(INSTANCE_STROKE_WIDTHS).unwrap();
        assert_eq!(widths.values::<f32>().unwrap(), &[1.0, 1.0]);

        let styled = ColumnAccessors::new(|t: &Tower| t.position)
            .with_fill_color(|t| [t.height as u8, 0, 0, 255])
            .with_line_color(|_| [255, 255, 255, 128])
            .with_line_width(|t| t.height / 10.0 + 1.0);
        state
            .update(ColumnConfig::default(), &data, &ChangeFlags::all_data(), &styled)
            .unwrap();
        let attributes = state.attributes();
        let fills = attributes.channel(INSTANCE_FILL_COLORS).unwrap();
        assert_eq!(fills.element::<u8, 4>(1).unwrap(), [10, 0, 0, 255]);
        let lines = attributes.channel(INSTANCE_LINE_COLORS).unwrap();
        assert_eq!(lines.element::<u8, 4>(0).unwrap(), [255, 255, 255, 128]);
        let widths = attributes.channel(INSTANCE_STROKE_WIDTHS).unwrap();
        assert_eq!(widths.values::<f32>().unwrap(), &[1.0, 2.0]);
        let elevations = attributes.channel(INSTANCE_ELEVATIONS).unwrap();
        assert_eq!(elevations.values::<f32>().unwrap(), &[DEFAULT_ELEVATION; 2]);
    }

    #[test]
    fn test_non_finite_line_width_rejected() {
        let mut state = ColumnLayerState::new();
        let data = towers(1);
        let accessors = ColumnAccessors::new(|t: &Tower| t.position).with_line_width(|_| f32::NAN);
        assert!(
            state
                .update(ColumnConfig::default(), &data, &ChangeFlags::all_data(), &accessors)
                .is_err()
        );
        assert_eq!(state.instance_count(), 0);
        assert!(state.mesh().is_empty());
    }

    #[test]
    fn test_instance_layout_matches_channels() {
        let state = ColumnLayerState::new();
        let layout = state.instance_layout();
        let names: Vec<&str> = state.attributes().channels().map(|c| c.name()).collect();
        let semantics: Vec<&str> = layout.attributes.iter().map(|a| a.semantic.name()).collect();
        assert_eq!(names, semantics);
        for (channel, attribute) in state.attributes().channels().zip(&layout.attributes) {
            assert_eq!(channel.format(), attribute.format);
            assert_eq!(
                channel.stride() as u32,
                layout.buffer_stride(attribute.buffer_index as usize)
            );
        }
    }

    #[test]
    fn test_explicit_vertices_too_short_keeps_previous_mesh() {
        let mut state = ColumnLayerState::new();
        let data = towers(1);
        update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();

        let ring: Arc<[[f32; 2]]> = Arc::from(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let config = ColumnConfig::default().with_vertices(ring);
        let err = update(&mut state, config, &data, &ChangeFlags::none()).unwrap_err();

        assert!(matches!(
            err,
            LayerError::Geometry(GeometryError::InvalidGeometry { .. })
        ));
        assert_eq!(state.mesh().resolution(), 20);
        assert!(state.cache().key().is_some_and(|k| k.vertices.is_none()));
    }

    #[test]
    fn test_non_finite_instance_rejected() {
        let mut state = ColumnLayerState::new();
        let mut data = towers(2);
        update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data()).unwrap();

        data[0].height = f32::INFINITY;
        let err = update(&mut state, ColumnConfig::default(), &data, &ChangeFlags::all_data());
        assert!(err.is_err());
        let elevations = state.attributes().channel(INSTANCE_ELEVATIONS).unwrap();
        assert_eq!(elevations.values::<f32>().unwrap(), &[0.0, 10.0]);
    }

    #[test]
    fn test_draw_passes_extruded_wireframe() {
        let mut state = ColumnLayerState::new();
        let config = ColumnConfig::default()
            .with_disk_resolution(4)
            .with_wireframe(true);
        update(&mut state, config, &towers(1), &ChangeFlags::all_data()).unwrap();

        let passes = state.draw_passes();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].kind, DrawPassKind::Wireframe);
        assert_eq!(passes[0].topology, PrimitiveTopology::LineList);
        assert_eq!(passes[0].range, IndexRange::new(0, 24));
        assert!(passes[0].is_stroke());
        // Side and top merged into one fill.
        assert_eq!(passes[1].kind, DrawPassKind::Fill);
        assert_eq!(passes[1].range, IndexRange::new(24, 24 + 6));
    }

    #[test]
    fn test_draw_passes_flat_stroked() {
        let mut state = ColumnLayerState::new();
        let config = ColumnConfig::default()
            .with_disk_resolution(4)
            .with_extruded(false)
            .with_stroked(true)
            .with_wireframe(true);
        update(&mut state, config, &towers(1), &ChangeFlags::all_data()).unwrap();

        let kinds: Vec<_> = state.draw_passes().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![DrawPassKind::Fill, DrawPassKind::Stroke]);
        let passes = state.draw_passes();
        assert_eq!(passes[0].range, state.mesh().index_ranges().top);
        assert_eq!(passes[1].range, state.mesh().index_ranges().side);
    }

    #[test]
    fn test_hidden_layer_draws_nothing() {
        let mut state = ColumnLayerState::new();
        let config = ColumnConfig::default()
            .with_base(crate::config::LayerConfig::new("hidden").with_visible(false));
        update(&mut state, config, &towers(1), &ChangeFlags::all_data()).unwrap();
        assert!(state.draw_passes().is_empty());
    }

    #[test]
    fn test_uniforms() {
        let mut state = ColumnLayerState::new();
        let config = ColumnConfig::default()
            .with_disk_resolution(4)
            .with_angle(180.0)
            .with_line_width_units(Units::Pixels)
            .with_line_width_scale(2.0);
        update(&mut state, config, &towers(1), &ChangeFlags::all_data()).unwrap();

        let uniforms = state.uniforms();
        assert!((uniforms.angle - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(uniforms.radius_units, Units::Meters);
        assert_eq!(uniforms.width_max_pixels, f32::MAX);
        let apothem = (std::f32::consts::PI / 4.0).cos();
        assert!((uniforms.edge_distance - apothem).abs() < 1e-5);
        assert_eq!(uniforms.width_units.as_uniform(), 2);
        assert_eq!(uniforms.width_scale, 2.0);
    }
}
