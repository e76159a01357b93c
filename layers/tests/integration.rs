use std::sync::Arc;

use rstest::rstest;
use vizlayer_core::cache::ChangeFlags;
use vizlayer_core::mesh::{PrimitiveTopology, VertexLayout};
use vizlayer_core::path::{AccessorPaths, FlatPaths, SegmentFlags};
use vizlayer_layers::column_layer::{
    INSTANCE_ELEVATIONS, INSTANCE_FILL_COLORS, INSTANCE_LINE_COLORS, INSTANCE_POSITIONS,
    INSTANCE_STROKE_WIDTHS,
};
use vizlayer_layers::path_layer::INSTANCE_COLORS;
use vizlayer_layers::{
    ColumnAccessors, ColumnConfig, ColumnLayerState, DrawPassKind, LayerError, PathConfig,
    PathLayerState, PathStyles,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Station {
    position: [f32; 3],
    riders: f32,
}

fn stations(n: usize) -> Vec<Station> {
    (0..n)
        .map(|i| Station {
            position: [i as f32 * 100.0, 0.0, 5.0],
            riders: i as f32,
        })
        .collect()
}

fn columns<'a>() -> ColumnAccessors<'a, Station> {
    ColumnAccessors::new(|s: &Station| s.position).with_elevation(|s| s.riders)
}

// ---------------------------------------------------------------------------
// Columns: update cycles
// ---------------------------------------------------------------------------

#[test]
fn test_column_update_cycle() {
    init_logging();
    let mut state = ColumnLayerState::new();
    let mut data = stations(8);
    let config = ColumnConfig::new("stations").with_disk_resolution(6);

    let first = state
        .update(config.clone(), &data, &ChangeFlags::all_data(), &columns())
        .unwrap();
    assert!(first.retesselated);
    let dirty = state.take_dirty();
    assert_eq!(dirty.len(), 5);
    assert!(dirty.iter().all(|(_, range)| *range == (0..8)));

    // Ten frames of data-only changes never touch the mesh.
    for frame in 0..10 {
        data[frame % 8].riders += 1.0;
        let update = state
            .update(
                config.clone(),
                &data,
                &ChangeFlags::data_range(frame % 8..frame % 8 + 1),
                &columns(),
            )
            .unwrap();
        assert!(!update.retesselated);
        let row = frame % 8..frame % 8 + 1;
        let expected: Vec<_> = [
            INSTANCE_POSITIONS,
            INSTANCE_ELEVATIONS,
            INSTANCE_FILL_COLORS,
            INSTANCE_LINE_COLORS,
            INSTANCE_STROKE_WIDTHS,
        ]
        .iter()
        .map(|name| (name.to_string(), row.clone()))
        .collect();
        assert_eq!(state.take_dirty(), expected);
    }
    assert_eq!(state.cache().hits(), 10);
    assert_eq!(state.cache().misses(), 1);
}

#[test]
fn test_column_shrinking_data_keeps_capacity() {
    init_logging();
    let mut state = ColumnLayerState::new();
    let config = ColumnConfig::default();
    state
        .update(
            config.clone(),
            &stations(64),
            &ChangeFlags::all_data(),
            &columns(),
        )
        .unwrap();
    state
        .update(
            config.clone(),
            &stations(3),
            &ChangeFlags::all_data(),
            &columns(),
        )
        .unwrap();
    state
        .update(config, &stations(40), &ChangeFlags::all_data(), &columns())
        .unwrap();

    assert_eq!(state.instance_count(), 40);
    assert!(state.attributes().capacity() >= 64);
    for channel in state.attributes().channels() {
        assert_eq!(channel.reallocations(), 1);
    }
}

#[test]
fn test_column_same_vertices_arc_hits_cache() {
    init_logging();
    let ring: Arc<[[f32; 2]]> = Arc::from(vec![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]]);
    let mut state = ColumnLayerState::new();
    let data = stations(1);
    let config = ColumnConfig::default()
        .with_disk_resolution(4)
        .with_vertices(ring.clone());

    for _ in 0..3 {
        state
            .update(config.clone(), &data, &ChangeFlags::none(), &columns())
            .unwrap();
    }
    assert_eq!(state.cache().misses(), 1);

    // Equal contents in a new allocation is a different ring.
    let copy: Arc<[[f32; 2]]> = Arc::from(ring.to_vec());
    let update = state
        .update(
            config.with_vertices(copy),
            &data,
            &ChangeFlags::none(),
            &columns(),
        )
        .unwrap();
    assert!(update.retesselated);
}

#[rstest]
#[case::extruded_filled(true, true, false, false, &[DrawPassKind::Fill])]
#[case::extruded_wireframe(true, true, false, true, &[DrawPassKind::Wireframe, DrawPassKind::Fill])]
#[case::flat_filled(false, true, false, false, &[DrawPassKind::Fill])]
#[case::flat_outline(false, true, true, false, &[DrawPassKind::Fill, DrawPassKind::Stroke])]
#[case::outline_only(false, false, true, true, &[DrawPassKind::Stroke])]
fn test_column_draw_pass_order(
    #[case] extruded: bool,
    #[case] filled: bool,
    #[case] stroked: bool,
    #[case] wireframe: bool,
    #[case] expected: &[DrawPassKind],
) {
    init_logging();
    let mut state = ColumnLayerState::new();
    let config = ColumnConfig::default()
        .with_extruded(extruded)
        .with_filled(filled)
        .with_stroked(stroked)
        .with_wireframe(wireframe);
    state
        .update(config, &stations(2), &ChangeFlags::all_data(), &columns())
        .unwrap();

    let passes = state.draw_passes();
    let kinds: Vec<_> = passes.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, expected);
    for pass in &passes {
        let indices = state.mesh().indices_in(pass.range).unwrap();
        assert_eq!(indices.len() as u32, pass.range.count);
        let per_primitive = pass.topology.vertices_per_primitive() as usize;
        assert_eq!(indices.len() % per_primitive, 0);
        if pass.kind == DrawPassKind::Wireframe {
            assert_eq!(pass.topology, PrimitiveTopology::LineList);
        }
    }
}

#[test]
fn test_column_invalid_config() {
    let mut state = ColumnLayerState::new();
    let err = state
        .update(
            ColumnConfig::default().with_coverage(2.0),
            &stations(1),
            &ChangeFlags::all_data(),
            &columns(),
        )
        .unwrap_err();
    assert!(matches!(err, LayerError::InvalidConfig { field: "coverage", .. }));
    assert!(state.mesh().is_empty());
}

#[test]
fn test_column_mesh_matches_layout() {
    let mut state = ColumnLayerState::new();
    state
        .update(
            ColumnConfig::default(),
            &stations(1),
            &ChangeFlags::all_data(),
            &columns(),
        )
        .unwrap();
    let mesh = state.mesh();
    let layout = VertexLayout::column();
    assert_eq!(mesh.layout().as_ref(), layout.as_ref());
    assert_eq!(
        mesh.position_bytes().len(),
        mesh.vertex_count() * layout.buffer_stride(0) as usize
    );
    assert_eq!(mesh.index_bytes().len(), mesh.index_count() * 2);
}

// ---------------------------------------------------------------------------
// Paths: update cycles
// ---------------------------------------------------------------------------

struct Route {
    name: &'static str,
    path: Vec<[f32; 2]>,
}

fn routes() -> Vec<Route> {
    vec![
        Route {
            name: "loop",
            path: vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]],
        },
        Route {
            name: "stub",
            path: vec![[9.0, 9.0]],
        },
        Route {
            name: "line",
            path: vec![[0.0, 10.0], [5.0, 10.0], [10.0, 12.0]],
        },
    ]
}

#[test]
fn test_path_accessor_and_flat_sources_agree() {
    init_logging();
    let data = routes();
    let accessor = AccessorPaths::new(data.as_slice(), |r: &Route| r.path.as_slice());

    let coords: Vec<f32> = data.iter().flat_map(|r| r.path.iter().flatten().copied()).collect();
    let mut starts = Vec::new();
    let mut next = 0;
    for route in &data {
        starts.push(next);
        next += route.path.len();
    }
    let flat = FlatPaths::new(&coords, 2, &starts).unwrap();

    let mut a = PathLayerState::new();
    let mut b = PathLayerState::new();
    let styles = PathStyles::new();
    a.update(PathConfig::new("a"), &accessor, &styles, &ChangeFlags::all_data(), None)
        .unwrap();
    b.update(PathConfig::new("b"), &flat, &styles, &ChangeFlags::all_data(), None)
        .unwrap();

    assert_eq!(a.tesselator().instance_count(), b.tesselator().instance_count());
    for row in 0..a.tesselator().instance_count() {
        assert_eq!(
            a.tesselator().segment(row).unwrap(),
            b.tesselator().segment(row).unwrap()
        );
    }
    assert_eq!(data[0].name, "loop");
    assert_eq!(a.tesselator().is_closed(0), Some(true));
    assert_eq!(a.path_range(1).map(|(_, count)| count), Some(0));
}

fn paths_of(data: &[Route]) -> Vec<Vec<[f32; 2]>> {
    data.iter().map(|r| r.path.clone()).collect()
}

#[test]
fn test_path_partial_update_matches_full() {
    init_logging();
    let mut data = routes();
    let mut state = PathLayerState::new();
    state
        .update(
            PathConfig::new("routes"),
            paths_of(&data).as_slice(),
            &PathStyles::new(),
            &ChangeFlags::all_data(),
            None,
        )
        .unwrap();
    state.take_dirty();

    data[1].path.push([9.0, 12.0]);
    data[1].path.push([12.0, 12.0]);
    state
        .update(
            PathConfig::new("routes"),
            paths_of(&data).as_slice(),
            &PathStyles::new(),
            &ChangeFlags::data_range(1..2),
            None,
        )
        .unwrap();
    assert!(!state.take_dirty().is_empty());

    let mut fresh = PathLayerState::new();
    fresh
        .update(
            PathConfig::new("routes"),
            paths_of(&data).as_slice(),
            &PathStyles::new(),
            &ChangeFlags::all_data(),
            None,
        )
        .unwrap();

    let (partial, full) = (state.tesselator(), fresh.tesselator());
    assert_eq!(partial.start_indices(), full.start_indices());
    assert_eq!(partial.segment_types().unwrap(), full.segment_types().unwrap());
    for row in 0..full.instance_count() {
        assert_eq!(partial.segment(row).unwrap(), full.segment(row).unwrap());
    }
    // Open stub now has two segments.
    let (row, count) = partial.path_range(1).unwrap();
    assert_eq!(count, 2);
    assert_eq!(partial.segment(row).unwrap().flags, SegmentFlags::START);
}

#[test]
fn test_path_rows_skip_gaps_when_drawn() {
    let data = routes();
    let mut state = PathLayerState::new();
    let accessor = AccessorPaths::new(data.as_slice(), |r: &Route| r.path.as_slice());
    state
        .update(
            PathConfig::new("routes"),
            &accessor,
            &PathStyles::new(),
            &ChangeFlags::all_data(),
            None,
        )
        .unwrap();

    let tesselator = state.tesselator();
    let drawable = tesselator
        .segment_types()
        .unwrap()
        .iter()
        .filter(|&&t| SegmentFlags::from_bits_truncate(t).is_drawable())
        .count();
    assert_eq!(drawable, tesselator.segment_count());
    assert_eq!(tesselator.segment_count(), 3 + 2);
    assert_eq!(state.draw_instance_count(), tesselator.instance_count());
    assert_eq!(state.template().triangle_count(), 4);
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn route_color(route: &Route) -> [u8; 4] {
    if route.name == "line" { RED } else { BLUE }
}

#[test]
fn test_path_styles_follow_route_data() {
    init_logging();
    let data = routes();
    let accessor = AccessorPaths::new(data.as_slice(), |r: &Route| r.path.as_slice());
    let styles = PathStyles::from_data(
        data.as_slice(),
        |r: &Route| r.path.len() as f32,
        route_color,
    );
    let mut state = PathLayerState::new();
    state
        .update(PathConfig::new("routes"), &accessor, &styles, &ChangeFlags::all_data(), None)
        .unwrap();

    let widths = state.styles().channel(INSTANCE_STROKE_WIDTHS).unwrap();
    let colors = state.styles().channel(INSTANCE_COLORS).unwrap();
    let widths = widths.values::<f32>().unwrap();
    let colors = colors.view_elements::<u8, 4>(0, colors.len()).unwrap();
    for path in [0, 2] {
        let (row, count) = state.path_range(path).unwrap();
        for r in row..row + count {
            assert_eq!(widths[r], data[path].path.len() as f32);
        }
        assert_eq!(colors[row], route_color(&data[path]));
    }
    assert_eq!(widths.len(), state.tesselator().instance_count());
}
