//! Two-pass chamfer distance transform and box blur. Grounded directly on
//! the teacher's `calculate_distance_field`/`filter_tile` (itself a
//! faithful port of upstream `calculateDistanceField`/`boxBlur`), adapted
//! to the spec's `(index,count)` compact heightfield instead of the
//! teacher's `OpenTile`.
//!
//! Never fails: every span either gets a distance or keeps the sentinel.

use crate::compact::CompactHeightfield;
use crate::grid::next_dir;

/// Seeds boundary spans at distance 0, relaxes the chamfer transform in two
/// passes, records `max_distance`, then box-blurs with `thr = 1`.
pub fn build_distance_field(chf: &mut CompactHeightfield) {
    seed_boundaries(chf);
    chamfer_transform(chf);

    chf.max_distance = chf.dist.iter().copied().max().unwrap_or(0);

    chf.dist = box_blur(chf, 1);
}

/// A compact span is a boundary (distance 0) if any of its 4 neighbors is
/// unconnected, or the connected neighbor has a different area.
fn seed_boundaries(chf: &mut CompactHeightfield) {
    let width = chf.width;
    let height = chf.height;

    for y in 0..height {
        for x in 0..width {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                let area = chf.areas[index];

                let mut is_boundary = false;
                for dir in 0..4 {
                    match chf.neighbor_index(x, y, index, dir) {
                        None => {
                            is_boundary = true;
                            break;
                        }
                        Some(neighbor_index) => {
                            if chf.areas[neighbor_index] != area {
                                is_boundary = true;
                                break;
                            }
                        }
                    }
                }

                chf.dist[index] = if is_boundary { 0 } else { 0xFFFF };
            }
        }
    }
}

fn chamfer_transform(chf: &mut CompactHeightfield) {
    let width = chf.width;
    let height = chf.height;

    // Forward pass: row-major, relax from dirs 0 (-x) and 3 (-y).
    for y in 0..height {
        for x in 0..width {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                let mut distance = chf.dist[index];

                if let Some(other) = chf.neighbor_index(x, y, index, 0) {
                    distance = distance.min(chf.dist[other].saturating_add(2));

                    // (-1,-1) via dir 0 then dir 3.
                    let (ox, oy) = (x - 1, y);
                    if let Some(diag) = chf.neighbor_index(ox, oy, other, 3) {
                        distance = distance.min(chf.dist[diag].saturating_add(3));
                    }
                }

                if let Some(other) = chf.neighbor_index(x, y, index, 3) {
                    distance = distance.min(chf.dist[other].saturating_add(2));

                    // (+1,-1) via dir 3 then dir 2.
                    let (ox, oy) = (x, y - 1);
                    if let Some(diag) = chf.neighbor_index(ox, oy, other, 2) {
                        distance = distance.min(chf.dist[diag].saturating_add(3));
                    }
                }

                chf.dist[index] = distance;
            }
        }
    }

    // Backward pass: reverse row-major, relax from dirs 2 (+x) and 1 (+y).
    for y in (0..height).rev() {
        for x in (0..width).rev() {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                let mut distance = chf.dist[index];

                if let Some(other) = chf.neighbor_index(x, y, index, 2) {
                    distance = distance.min(chf.dist[other].saturating_add(2));

                    // (+1,+1) via dir 2 then dir 1.
                    let (ox, oy) = (x + 1, y);
                    if let Some(diag) = chf.neighbor_index(ox, oy, other, 1) {
                        distance = distance.min(chf.dist[diag].saturating_add(3));
                    }
                }

                if let Some(other) = chf.neighbor_index(x, y, index, 1) {
                    distance = distance.min(chf.dist[other].saturating_add(2));

                    // (-1,+1) via dir 1 then dir 0.
                    let (ox, oy) = (x, y + 1);
                    if let Some(diag) = chf.neighbor_index(ox, oy, other, 0) {
                        distance = distance.min(chf.dist[diag].saturating_add(3));
                    }
                }

                chf.dist[index] = distance;
            }
        }
    }
}

/// 3x3 box blur with threshold `thr` (doubled internally). Spans at or
/// below `2*thr` pass through unchanged to preserve boundary sharpness.
pub fn box_blur(chf: &CompactHeightfield, thr: u16) -> Vec<u16> {
    let threshold = thr * 2;
    let width = chf.width;
    let height = chf.height;
    let mut blurred = chf.dist.clone();

    for y in 0..height {
        for x in 0..width {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                let cd = chf.dist[index];
                if cd <= threshold {
                    blurred[index] = cd;
                    continue;
                }

                let mut d = cd as u32;
                for dir in 0..4 {
                    match chf.neighbor_index(x, y, index, dir) {
                        None => {
                            d += cd as u32 * 2;
                        }
                        Some(other) => {
                            d += chf.dist[other] as u32;

                            let (ox, oy) = neighbor_coord(x, y, dir);
                            match chf.neighbor_index(ox, oy, other, next_dir(dir)) {
                                None => d += cd as u32,
                                Some(diag) => d += chf.dist[diag] as u32,
                            }
                        }
                    }
                }

                blurred[index] = ((d + 5) / 9) as u16;
            }
        }
    }

    blurred
}

fn neighbor_coord(x: i32, y: i32, dir: usize) -> (i32, i32) {
    (x + crate::grid::dir_offset_x(dir), y + crate::grid::dir_offset_y(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::build_compact_heightfield;
    use crate::heightfield::Heightfield;

    fn flat_plane(size: i32) -> CompactHeightfield {
        let mut hf = Heightfield::new(size, size);
        for y in 0..size {
            for x in 0..size {
                hf.add_span(x, y, 0, 1, 1, 0);
            }
        }
        build_compact_heightfield(&hf, 2, 1).unwrap()
    }

    #[test]
    fn boundary_spans_get_zero_distance() {
        let mut chf = flat_plane(5);
        build_distance_field(&mut chf);

        // Corners and edges are boundaries (an unconnected direction) so
        // their pre-blur distance would be 0; after the blur it may rise
        // slightly but should stay well below an interior span's distance.
        let corner_cell = chf.cell(0, 0);
        let corner_dist = chf.dist[corner_cell.index as usize];
        let center_cell = chf.cell(2, 2);
        let center_dist = chf.dist[center_cell.index as usize];
        assert!(corner_dist < center_dist);
    }

    #[test]
    fn max_distance_is_interior_maximum() {
        let mut chf = flat_plane(7);
        build_distance_field(&mut chf);
        assert!(chf.max_distance > 0);
        assert!(chf.dist.iter().all(|&d| d <= chf.max_distance));
    }

    #[test]
    fn chamfer_lipschitz_bound_holds_for_connected_same_area_pairs() {
        let mut chf = flat_plane(9);
        build_distance_field(&mut chf);

        for y in 0..chf.height {
            for x in 0..chf.width {
                let cell = chf.cell(x, y);
                for local in 0..cell.count {
                    let index = (cell.index + local) as usize;
                    for dir in 0..4 {
                        if let Some(other) = chf.neighbor_index(x, y, index, dir) {
                            let diff = chf.dist[index].abs_diff(chf.dist[other]);
                            assert!(diff <= 3, "dist Lipschitz bound violated: {diff}");
                        }
                    }
                }
            }
        }
    }
}
