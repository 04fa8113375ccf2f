//! Layer region builder: runs the monotone sweep for an initial
//! partition, then merges overlapping (vertically stacked) runs into
//! non-overlapping 2-D layers instead of contour-walking for adjacency.
//! Grounded on upstream `rcBuildLayerRegions` / `mergeAndFilterLayerRegions`,
//! since the teacher crate never implemented layer regions.

use crate::compact::CompactHeightfield;
use crate::error::Result;

use super::monotone::sweep;
use super::BORDER_REG;

/// Per-region bookkeeping distinct from [`super::Region`]: layer building
/// tracks a `floors` set of regions that occupy the same column (and so can
/// never share a layer) plus plain 4-neighbor `connections`, rather than a
/// contour-walked connection ring.
#[derive(Clone, Debug, Default)]
struct LayerRegion {
    id: u16,
    span_count: usize,
    overlap: bool,
    connects_to_border: bool,
    connections: Vec<u16>,
    floors: Vec<u16>,
}

fn add_unique(values: &mut Vec<u16>, value: u16) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Builds regions by running the monotone sweep, then merging runs that
/// never vertically overlap (don't share a `floors` entry) into the same
/// layer via a connectivity search, removing any resulting layer smaller
/// than `min_region_area` unless it touches the border.
pub fn build_layer_regions(chf: &mut CompactHeightfield, border_size: u16, min_region_area: u16) -> Result<()> {
    tracing::debug!(span_count = chf.span_count(), border_size, "building layer regions");

    let (mut src_reg, max_region_id) = sweep(chf, border_size)?;

    let max_regions = merge_and_filter_layer_regions(chf, &mut src_reg, max_region_id, min_region_area);

    for i in 0..chf.span_count() {
        chf.span_mut(i).reg = src_reg[i];
    }
    chf.max_regions = max_regions;

    Ok(())
}

fn merge_and_filter_layer_regions(
    chf: &CompactHeightfield,
    src_reg: &mut [u16],
    max_region_id: u16,
    min_region_area: u16,
) -> u16 {
    let nreg = max_region_id as usize + 1;
    let mut regions: Vec<LayerRegion> = (0..nreg)
        .map(|i| LayerRegion {
            id: i as u16,
            ..Default::default()
        })
        .collect();

    let width = chf.width;
    let height = chf.height;

    for y in 0..height {
        for x in 0..width {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                let ri = src_reg[index];
                if ri == 0 || ri as usize >= nreg {
                    continue;
                }

                regions[ri as usize].span_count += 1;

                for other in cell.index..(cell.index + cell.count) {
                    let other = other as usize;
                    if other == index {
                        continue;
                    }
                    let other_reg = src_reg[other];
                    if other_reg == 0 || other_reg as usize >= nreg {
                        continue;
                    }
                    if other_reg == ri {
                        regions[ri as usize].overlap = true;
                    }
                    add_unique(&mut regions[ri as usize].floors, other_reg);
                }

                for dir in 0..4 {
                    let Some(neighbor_index) = chf.neighbor_index(x, y, index, dir) else {
                        continue;
                    };
                    let nr = src_reg[neighbor_index];
                    if nr & BORDER_REG != 0 {
                        regions[ri as usize].connects_to_border = true;
                        continue;
                    }
                    if nr > 0 && (nr as usize) < nreg && nr != ri {
                        add_unique(&mut regions[ri as usize].connections, nr);
                    }
                }
            }
        }
    }

    let overlap_count = regions.iter().filter(|r| r.overlap).count();
    if overlap_count > 0 {
        tracing::warn!(overlap_count, "same-cell region id collision seen while building layer adjacency");
    }

    // Merge mutually non-overlapping regions into layers via a connectivity
    // search seeded at each unvisited region, excluding neighbors already
    // recorded as a floor (vertically stacked) of the growing layer.
    let mut layer_id: u16 = 1;
    let mut assigned = vec![0u16; nreg];

    for seed in 1..nreg {
        if assigned[seed] != 0 {
            continue;
        }

        assigned[seed] = layer_id;
        let mut stack = vec![seed];
        let mut root_floors = regions[seed].floors.clone();
        let mut root_span_count = regions[seed].span_count;
        let mut root_connects_to_border = regions[seed].connects_to_border;

        while let Some(current) = stack.pop() {
            let connections = regions[current].connections.clone();
            for nei in connections {
                let nei_idx = nei as usize;
                if nei_idx >= nreg || assigned[nei_idx] != 0 {
                    continue;
                }
                if root_floors.contains(&nei) {
                    continue;
                }

                assigned[nei_idx] = layer_id;
                for floor in regions[nei_idx].floors.clone() {
                    add_unique(&mut root_floors, floor);
                }
                root_span_count += regions[nei_idx].span_count;
                regions[nei_idx].span_count = 0;
                root_connects_to_border = root_connects_to_border || regions[nei_idx].connects_to_border;

                stack.push(nei_idx);
            }
        }

        regions[seed].span_count = root_span_count;
        regions[seed].connects_to_border = root_connects_to_border;

        layer_id += 1;
    }

    for i in 1..nreg {
        regions[i].id = assigned[i];
    }

    // Remove small layers that never touch the border. A layer's surviving
    // span count lives only on its seed entry (non-seed members were zeroed
    // during the merge above), but every member still carries the layer id,
    // so dropping the id from one member drops it from all.
    for i in 1..nreg {
        if regions[i].span_count > 0 && regions[i].span_count < min_region_area as usize && !regions[i].connects_to_border {
            let dead = regions[i].id;
            for region in regions.iter_mut() {
                if region.id == dead {
                    region.id = 0;
                }
            }
        }
    }

    let max_regions = compact_layer_ids(&mut regions);

    for reg in src_reg.iter_mut() {
        if *reg & BORDER_REG == 0 && (*reg as usize) < regions.len() {
            *reg = regions[*reg as usize].id;
        }
    }

    max_regions
}

fn compact_layer_ids(regions: &mut [LayerRegion]) -> u16 {
    let mut remap = vec![false; regions.len()];
    for (i, region) in regions.iter().enumerate() {
        remap[i] = region.id != 0;
    }

    let mut next_id = 0u16;
    for i in 0..regions.len() {
        if !remap[i] {
            continue;
        }
        next_id += 1;
        let old_id = regions[i].id;
        let new_id = next_id;
        for j in i..regions.len() {
            if regions[j].id == old_id {
                regions[j].id = new_id;
                remap[j] = false;
            }
        }
    }

    next_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::build_compact_heightfield;
    use crate::heightfield::Heightfield;

    #[test]
    fn three_span_column_keeps_floors_in_separate_layers() {
        // Three stacked walkable floors in one column, each wide enough to
        // form its own monotone run with no lateral neighbors: none may
        // merge into the others' layer since they share a floors entry.
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 0, 2, 1, 0);
        hf.add_span(0, 0, 4, 6, 1, 0);
        hf.add_span(0, 0, 8, 10, 1, 0);
        let mut chf = build_compact_heightfield(&hf, 2, 0).unwrap();

        build_layer_regions(&mut chf, 0, 1).unwrap();

        let regs: Vec<u16> = (0..chf.span_count()).map(|i| chf.span(i).reg).collect();
        assert_eq!(regs.len(), 3);
        let unique: std::collections::HashSet<_> = regs.iter().collect();
        assert_eq!(unique.len(), 3, "stacked floors must not share a layer");
    }

    #[test]
    fn flat_plane_collapses_to_one_layer() {
        let mut hf = Heightfield::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                hf.add_span(x, y, 0, 1, 1, 0);
            }
        }
        let mut chf = build_compact_heightfield(&hf, 2, 1).unwrap();

        build_layer_regions(&mut chf, 0, 1).unwrap();

        let first = chf.span(0).reg;
        for i in 0..chf.span_count() {
            assert_eq!(chf.span(i).reg, first);
        }
    }

    #[test]
    fn small_non_border_layer_below_threshold_is_dropped() {
        let mut hf = Heightfield::new(4, 1);
        hf.add_span(0, 0, 0, 1, 1, 0);
        hf.add_span(2, 0, 0, 1, 1, 0);
        let mut chf = build_compact_heightfield(&hf, 2, 1).unwrap();

        build_layer_regions(&mut chf, 0, 5).unwrap();

        for i in 0..chf.span_count() {
            assert_eq!(chf.span(i).reg, 0);
        }
    }
}
