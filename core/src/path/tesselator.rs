use std::ops::Range;
use std::sync::Arc;

use crate::buffer::{AliasedView, AttributeChannel};
use crate::cache::ChangeFlags;
use crate::error::{GeometryError, GeometryResult};
use crate::math;
use crate::mesh::{VertexAttributeFormat, VertexLayout};
use crate::profiling::profile_function;

use super::segment::{SegmentFlags, SegmentRecord};
use super::source::PathSource;

/// Name of the packed point channel the four neighbour views alias.
pub const POSITIONS_CHANNEL: &str = "positions";
/// Name of the per-row segment flags channel.
pub const SEGMENT_TYPES_CHANNEL: &str = "segmentTypes";

/// Rows between the last segment of one path and the first of the next.
const GAP_ROWS: usize = 3;

/// How a path's last point connects to its first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathType {
    Open,
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathTesselatorOptions {
    /// `None` detects loops: three or more points whose first and last
    /// coincide become a loop without the repeated point.
    pub path_type: Option<PathType>,
    /// Viewport resolution, passed through untouched.
    pub resolution: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PathEntry {
    slot_start: usize,
    slot_count: usize,
    segments: usize,
    closed: bool,
}

impl PathEntry {
    fn slot_end(&self) -> usize {
        self.slot_start + self.slot_count
    }
}

/// Turns paths into per-segment instance rows.
///
/// ## Layout
///
/// Every path with at least one segment writes `segments + 3` consecutive
/// points into the positions channel: a left pad, its `segments + 1` points
/// (a loop repeats its first point at the end), and a right pad. Row `r`
/// reads points `r`, `r + 1`, `r + 2` and `r + 3` as left, start, end and
/// right, so the four neighbour views are the same storage at element
/// offsets 0 to 3.
///
/// Open paths pad with their own end points, so the first segment's left
/// neighbour is its start and the last segment's right neighbour is its
/// end. Loops pad with the wrapped neighbours instead.
///
/// The three rows that straddle two paths are flagged
/// [`SegmentFlags::GAP`]. The instance count is the total point count minus
/// three.
#[derive(Debug, Clone)]
pub struct PathTesselator {
    options: PathTesselatorOptions,
    positions: AttributeChannel,
    segment_types: AttributeChannel,
    paths: Vec<PathEntry>,
    slot_count: usize,
    points: Vec<[f32; 3]>,
    slots: Vec<[f32; 3]>,
}

impl Default for PathTesselator {
    fn default() -> Self {
        Self::new(PathTesselatorOptions::default())
    }
}

impl PathTesselator {
    pub fn new(options: PathTesselatorOptions) -> Self {
        Self {
            options,
            positions: AttributeChannel::new(POSITIONS_CHANNEL, VertexAttributeFormat::Float3),
            segment_types: AttributeChannel::new(
                SEGMENT_TYPES_CHANNEL,
                VertexAttributeFormat::Uint8,
            ),
            paths: Vec::new(),
            slot_count: 0,
            points: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn options(&self) -> PathTesselatorOptions {
        self.options
    }

    /// Replace the options. Returns `true` when the path type changed, in
    /// which case the next update must be structural.
    pub fn set_options(&mut self, options: PathTesselatorOptions) -> bool {
        let structural = options.path_type != self.options.path_type;
        self.options = options;
        structural
    }

    /// Viewport resolution as given.
    pub fn resolution(&self) -> Option<f32> {
        self.options.resolution
    }

    /// Bring the rows in line with `source`.
    ///
    /// Structural changes, a different path count, or an unspecified affected
    /// range repack everything. Otherwise only the affected paths are
    /// repacked; rows of other paths are kept, shifted if the affected paths
    /// changed length. Every point is validated before anything is written,
    /// so an error leaves the previous rows intact.
    pub fn update<S: PathSource + ?Sized>(
        &mut self,
        source: &S,
        changes: &ChangeFlags,
    ) -> GeometryResult<()> {
        profile_function!();

        if !changes.needs_update() {
            return Ok(());
        }
        match changes.partial_range() {
            Some(range) if source.path_count() == self.paths.len() => {
                self.repack_range(source, range)
            }
            _ => self.repack_all(source),
        }
    }

    fn repack_all<S: PathSource + ?Sized>(&mut self, source: &S) -> GeometryResult<()> {
        let count = source.path_count();
        let mut entries = Vec::with_capacity(count);
        pack_paths(
            source,
            0..count,
            self.options.path_type,
            0,
            &mut self.points,
            &mut self.slots,
            &mut entries,
        )?;

        let slot_count = self.slots.len();
        self.positions.ensure_capacity(slot_count);
        self.positions.write_elements(0, &self.slots)?;
        self.positions.set_len(slot_count)?;
        self.paths = entries;
        self.slot_count = slot_count;

        let rows = self.instance_count();
        self.segment_types.resize(rows)?;
        self.write_types(0..rows)?;

        log::debug!(
            "Tesselated {} paths into {} segments ({} rows)",
            self.paths.len(),
            self.segment_count(),
            rows
        );
        Ok(())
    }

    fn repack_range<S: PathSource + ?Sized>(
        &mut self,
        source: &S,
        range: Range<usize>,
    ) -> GeometryResult<()> {
        if range.start > range.end || range.end > self.paths.len() {
            return Err(GeometryError::out_of_range(
                "paths",
                range.start,
                range.end.saturating_sub(range.start),
                self.paths.len(),
            ));
        }
        if range.is_empty() {
            return Ok(());
        }

        let old_start = self.paths[range.start].slot_start;
        let old_end = self.paths[range.end - 1].slot_end();
        let mut entries = Vec::with_capacity(range.len());
        pack_paths(
            source,
            range.clone(),
            self.options.path_type,
            old_start,
            &mut self.points,
            &mut self.slots,
            &mut entries,
        )?;
        let new_end = old_start + self.slots.len();

        let shifted = new_end != old_end;
        if shifted {
            let total = self.slot_count - old_end + new_end;
            self.positions.ensure_capacity(total);
            self.positions
                .copy_within(old_end..self.slot_count, new_end)?;
            self.positions.set_len(total)?;
            for entry in &mut self.paths[range.end..] {
                entry.slot_start = entry.slot_start - old_end + new_end;
            }
            self.slot_count = total;
        }
        self.positions.write_elements(old_start, &self.slots)?;
        let first_path = range.start;
        self.paths.splice(range, entries);

        let rows = self.instance_count();
        self.segment_types.resize(rows)?;
        // The previous path's gap rows may have been clipped before.
        let type_rows = if shifted {
            old_start.saturating_sub(GAP_ROWS)..rows
        } else {
            old_start..new_end
        };
        self.write_types(type_rows)?;

        log::trace!(
            "Repacked paths from {first_path}: points {old_start}..{old_end} -> {old_start}..{new_end}"
        );
        Ok(())
    }

    fn write_types(&mut self, rows: Range<usize>) -> GeometryResult<()> {
        let rows = rows.start..rows.end.min(self.instance_count());
        if rows.is_empty() {
            return Ok(());
        }
        let mut types = vec![SegmentFlags::GAP.bits(); rows.len()];
        let first = self.paths.partition_point(|e| e.slot_end() <= rows.start);
        for entry in self.paths[first..]
            .iter()
            .take_while(|e| e.slot_start < rows.end)
        {
            for k in 0..entry.segments {
                let row = entry.slot_start + k;
                if rows.contains(&row) {
                    types[row - rows.start] =
                        SegmentFlags::for_segment(k, entry.segments, entry.closed).bits();
                }
            }
        }
        self.segment_types.write(rows.start, &types)
    }

    /// Number of paths.
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Total rows, gaps included.
    pub fn instance_count(&self) -> usize {
        self.slot_count.saturating_sub(GAP_ROWS)
    }

    /// Drawable rows.
    pub fn segment_count(&self) -> usize {
        self.paths.iter().map(|e| e.segments).sum()
    }

    /// `(start_row, row_count)` of path `index`.
    pub fn path_range(&self, index: usize) -> Option<(usize, usize)> {
        self.paths.get(index).map(|e| (e.slot_start, e.segments))
    }

    /// First row of every path.
    pub fn start_indices(&self) -> Vec<usize> {
        self.paths.iter().map(|e| e.slot_start).collect()
    }

    /// Whether path `index` was treated as a loop.
    pub fn is_closed(&self, index: usize) -> Option<bool> {
        self.paths.get(index).map(|e| e.closed)
    }

    /// Everything the shader reads for row `row`.
    pub fn segment(&self, row: usize) -> GeometryResult<SegmentRecord> {
        if row >= self.instance_count() {
            return Err(GeometryError::out_of_range(
                SEGMENT_TYPES_CHANNEL,
                row,
                1,
                self.instance_count(),
            ));
        }
        let points = self.positions.view_elements::<f32, 3>(row, 4)?;
        let flags = self.segment_types.element::<u8, 1>(row)?[0];
        Ok(SegmentRecord {
            left: points[0],
            start: points[1],
            end: points[2],
            right: points[3],
            flags: SegmentFlags::from_bits_truncate(flags),
        })
    }

    pub fn left_positions(&self) -> GeometryResult<AliasedView<'_>> {
        self.neighbour_view(0)
    }

    pub fn start_positions(&self) -> GeometryResult<AliasedView<'_>> {
        self.neighbour_view(1)
    }

    pub fn end_positions(&self) -> GeometryResult<AliasedView<'_>> {
        self.neighbour_view(2)
    }

    pub fn right_positions(&self) -> GeometryResult<AliasedView<'_>> {
        self.neighbour_view(3)
    }

    fn neighbour_view(&self, offset: usize) -> GeometryResult<AliasedView<'_>> {
        let rows = self.instance_count();
        if rows == 0 {
            return self.positions.aliased(0, 0);
        }
        self.positions.aliased(offset, rows)
    }

    /// Segment flags per row.
    pub fn segment_types(&self) -> GeometryResult<&[u8]> {
        self.segment_types.values()
    }

    /// The packed points backing the four neighbour views.
    pub fn positions(&self) -> &AttributeChannel {
        &self.positions
    }

    pub fn segment_types_channel(&self) -> &AttributeChannel {
        &self.segment_types
    }

    /// Binding layout for [`positions`](Self::positions) and
    /// [`segment_types_channel`](Self::segment_types_channel).
    pub fn layout(&self) -> Arc<VertexLayout> {
        VertexLayout::path_segments()
    }

    /// Channel names and element ranges written since the last call.
    pub fn take_dirty(&mut self) -> Vec<(String, Range<usize>)> {
        [&mut self.positions, &mut self.segment_types]
            .into_iter()
            .filter_map(|c| c.take_dirty().map(|r| (c.name().to_string(), r)))
            .collect()
    }
}

/// Read, validate and lay out paths `range`, starting at point `first_slot`.
fn pack_paths<S: PathSource + ?Sized>(
    source: &S,
    range: Range<usize>,
    path_type: Option<PathType>,
    first_slot: usize,
    points: &mut Vec<[f32; 3]>,
    slots: &mut Vec<[f32; 3]>,
    entries: &mut Vec<PathEntry>,
) -> GeometryResult<()> {
    slots.clear();
    let mut slot = first_slot;
    for index in range {
        points.clear();
        source.read_path(index, points)?;
        if let Some(bad) = points.iter().position(|p| !math::all_finite(p)) {
            return Err(GeometryError::invalid(format!(
                "path {index} point {bad} is not finite"
            )));
        }
        let closed = normalize(points, path_type);
        let entry = lay_out(points, closed, slot, slots);
        slot += entry.slot_count;
        entries.push(entry);
    }
    Ok(())
}

fn normalize(points: &mut Vec<[f32; 3]>, path_type: Option<PathType>) -> bool {
    match path_type {
        Some(PathType::Open) => false,
        Some(PathType::Loop) => true,
        None => {
            let closed = points.len() >= 3 && points.first() == points.last();
            if closed {
                points.pop();
            }
            closed
        }
    }
}

fn lay_out(
    points: &[[f32; 3]],
    closed: bool,
    slot_start: usize,
    out: &mut Vec<[f32; 3]>,
) -> PathEntry {
    let n = points.len();
    let segments = match (closed, n) {
        (true, n) if n >= 2 => n,
        (true, _) => 0,
        (false, n) => n.saturating_sub(1),
    };
    if segments == 0 {
        return PathEntry {
            slot_start,
            slot_count: 0,
            segments: 0,
            closed,
        };
    }

    if closed {
        out.push(points[n - 1]);
        out.extend_from_slice(points);
        out.push(points[0]);
        out.push(points[1]);
    } else {
        out.push(points[0]);
        out.extend_from_slice(points);
        out.push(points[n - 1]);
    }
    PathEntry {
        slot_start,
        slot_count: segments + GAP_ROWS,
        segments,
        closed,
    }
}
