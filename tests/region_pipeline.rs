//! End-to-end coverage of the full voxel pipeline: filters, compaction,
//! distance field, and all three region builders running together, the way
//! a real caller would chain them.

use recast_regions::compact::build_compact_heightfield;
use recast_regions::distance_field::build_distance_field;
use recast_regions::filters::{
    filter_ledge_spans, filter_low_hanging_walkable_obstacles, filter_walkable_low_height_spans,
};
use recast_regions::heightfield::{Heightfield, NULL_AREA};
use recast_regions::regions::{layer, monotone, watershed, BORDER_REG};
use recast_regions::RegionConfig;

fn run_filters(hf: &mut Heightfield, config: &RegionConfig) {
    filter_low_hanging_walkable_obstacles(hf, config.walkable_climb);
    filter_ledge_spans(hf, config.walkable_height, config.walkable_climb);
    filter_walkable_low_height_spans(hf, config.walkable_height);
}

fn flat_plane(size: i32) -> Heightfield {
    let mut hf = Heightfield::new(size, size);
    for y in 0..size {
        for x in 0..size {
            hf.add_span(x, y, 0, 1, 1, 0);
        }
    }
    hf
}

#[test]
fn single_walkable_voxel_becomes_one_region() {
    let config = RegionConfig::default();
    let mut hf = Heightfield::new(3, 3);
    hf.add_span(1, 1, 0, 1, 1, 0);
    run_filters(&mut hf, &config);

    let mut chf = build_compact_heightfield(&hf, config.walkable_height, config.walkable_climb).unwrap();
    build_distance_field(&mut chf);
    watershed::build_regions(&mut chf, 0, config.min_region_area, config.merge_region_area).unwrap();

    assert_eq!(chf.max_regions, 1);
}

#[test]
fn ten_by_one_row_is_one_monotone_region() {
    let config = RegionConfig::default().with_region_area(1, 0);
    let mut hf = Heightfield::new(10, 1);
    for x in 0..10 {
        hf.add_span(x, 0, 0, 1, 1, 0);
    }
    run_filters(&mut hf, &config);

    let mut chf = build_compact_heightfield(&hf, config.walkable_height, config.walkable_climb).unwrap();
    monotone::build_regions(&mut chf, 0, config.min_region_area, config.merge_region_area).unwrap();

    assert_eq!(chf.max_regions, 1);
}

#[test]
fn ten_by_ten_flat_plane_with_border_two_yields_five_regions() {
    let config = RegionConfig::default().with_border_size(2).with_region_area(1, 0);
    let mut hf = flat_plane(10);
    run_filters(&mut hf, &config);

    let mut chf = build_compact_heightfield(&hf, config.walkable_height, config.walkable_climb).unwrap();
    build_distance_field(&mut chf);
    watershed::build_regions(&mut chf, config.border_size, config.min_region_area, config.merge_region_area).unwrap();

    let mut border_ids = std::collections::HashSet::new();
    let mut interior_ids = std::collections::HashSet::new();
    for i in 0..chf.span_count() {
        let reg = chf.span(i).reg;
        if reg & BORDER_REG != 0 {
            border_ids.insert(reg & !BORDER_REG);
        } else if reg != 0 {
            interior_ids.insert(reg);
        }
    }
    assert_eq!(border_ids.len(), 4);
    assert_eq!(interior_ids.len(), 1);
}

#[test]
fn two_plateaus_separated_by_a_cliff_stay_disconnected() {
    let config = RegionConfig::default().with_region_area(1, 0);
    let mut hf = Heightfield::new(11, 5);
    // Two 5x5 plateaus at different heights separated by one empty column,
    // which the ledge filter should keep from ever linking.
    for y in 0..5 {
        for x in 0..5 {
            hf.add_span(x, y, 0, 1, 1, 0);
        }
        for x in 6..11 {
            hf.add_span(x, y, 10, 11, 1, 0);
        }
    }
    run_filters(&mut hf, &config);

    let mut chf = build_compact_heightfield(&hf, config.walkable_height, config.walkable_climb).unwrap();
    build_distance_field(&mut chf);
    watershed::build_regions(&mut chf, 0, config.min_region_area, config.merge_region_area).unwrap();

    let left_reg = chf.span(chf.cell(2, 2).index as usize).reg;
    let right_reg = chf.span(chf.cell(8, 2).index as usize).reg;
    assert_ne!(left_reg, 0);
    assert_ne!(right_reg, 0);
    assert_ne!(left_reg, right_reg);
}

#[test]
fn width_one_corridor_gets_merged_into_one_region() {
    // A corridor one voxel wide connects two small rooms; with a merge
    // threshold large enough to absorb the corridor, the whole shape should
    // collapse into a single region.
    let config = RegionConfig::default().with_region_area(1, 50);
    let mut hf = Heightfield::new(3, 9);
    for y in 0..9 {
        hf.add_span(1, y, 0, 1, 1, 0);
    }
    for x in 0..3 {
        hf.add_span(x, 0, 0, 1, 1, 0);
        hf.add_span(x, 8, 0, 1, 1, 0);
    }
    run_filters(&mut hf, &config);

    let mut chf = build_compact_heightfield(&hf, config.walkable_height, config.walkable_climb).unwrap();
    build_distance_field(&mut chf);
    watershed::build_regions(&mut chf, 0, config.min_region_area, config.merge_region_area).unwrap();

    let first = chf.span(0).reg;
    assert_ne!(first, 0);
    for i in 0..chf.span_count() {
        assert_eq!(chf.span(i).reg, first);
    }
}

#[test]
fn three_span_column_never_merges_its_floors_into_one_layer() {
    let mut hf = Heightfield::new(1, 1);
    hf.add_span(0, 0, 0, 2, 1, 0);
    hf.add_span(0, 0, 4, 6, 1, 0);
    hf.add_span(0, 0, 8, 10, 1, 0);

    let mut chf = build_compact_heightfield(&hf, 2, 0).unwrap();
    layer::build_layer_regions(&mut chf, 0, 1).unwrap();

    let regs: std::collections::HashSet<_> = (0..chf.span_count()).map(|i| chf.span(i).reg).collect();
    assert_eq!(regs.len(), 3);
}

#[test]
fn unwalkable_span_never_gets_a_region() {
    let config = RegionConfig::default();
    let mut hf = Heightfield::new(1, 1);
    hf.add_span(0, 0, 0, 1, NULL_AREA, 0);

    let mut chf = build_compact_heightfield(&hf, config.walkable_height, config.walkable_climb).unwrap();
    assert_eq!(chf.span_count(), 0);
}
