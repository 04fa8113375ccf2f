//! Monotone row-sweep region builder. Cheaper and more regular than
//! watershed at the cost of long, thin regions; grounded directly on
//! upstream `rcBuildRegionsMonotone`, since the teacher crate never
//! implemented this algorithm.

use crate::error::{RegionError, Result};
use crate::heightfield::NULL_AREA;

use super::{merge_and_filter_regions, paint_border_regions, BORDER_REG, NULL_NEI};
use crate::compact::CompactHeightfield;

#[derive(Clone, Copy, Default)]
struct SweepSpan {
    /// Provisional row-local id assigned to this run.
    rid: u16,
    /// The single candidate neighbor region seen below this run, or
    /// [`NULL_NEI`] once a second, conflicting neighbor is seen.
    nei: u16,
    /// Count of spans in this run that saw `nei` as their south neighbor.
    ns: u16,
}

/// Builds regions with a single top-to-bottom, left-to-right sweep: each
/// row is segmented into runs sharing the same west neighbor, then runs are
/// merged into the row below's region when exactly one south neighbor
/// candidate dominates every span in the run.
pub fn build_regions(
    chf: &mut CompactHeightfield,
    border_size: u16,
    min_region_area: u16,
    merge_region_area: u16,
) -> Result<()> {
    tracing::debug!(span_count = chf.span_count(), border_size, "building monotone regions");

    let (src_reg, max_region_id) = sweep(chf, border_size)?;

    for i in 0..chf.span_count() {
        chf.span_mut(i).reg = src_reg[i];
    }

    let max_regions = merge_and_filter_regions(chf, min_region_area, merge_region_area, max_region_id);
    chf.max_regions = max_regions;

    Ok(())
}

/// The row-sweep proper, shared by [`build_regions`] and
/// [`super::layer::build_layer_regions`]: assigns every walkable span a
/// provisional region id and returns the id buffer alongside the highest id
/// used, without running either merge pass.
pub(super) fn sweep(chf: &mut CompactHeightfield, border_size: u16) -> Result<(Vec<u16>, u16)> {
    let width = chf.width;
    let height = chf.height;
    let bs = border_size as i32;

    let mut src_reg = vec![0u16; chf.span_count()];
    paint_border_regions(chf, border_size, &mut src_reg);
    chf.border_size = border_size;

    let mut id: u16 = if border_size > 0 { 5 } else { 1 };

    let nsweeps = width.max(height) as usize + 1;
    let mut sweeps = vec![SweepSpan::default(); nsweeps];
    let mut prev: Vec<u32> = Vec::new();

    for y in bs..(height - bs) {
        let capacity = id as usize + 1;
        prev.clear();
        prev.resize(capacity, 0);

        let mut rid: u16 = 1;

        for x in bs..(width - bs) {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                if chf.areas[index] == NULL_AREA {
                    continue;
                }

                let area = chf.areas[index];

                let mut prev_id = 0u16;
                if let Some(west) = chf.neighbor_index(x, y, index, 0) {
                    if src_reg[west] & BORDER_REG == 0 && chf.areas[west] == area {
                        prev_id = src_reg[west];
                    }
                }

                if prev_id == 0 {
                    prev_id = rid;
                    rid += 1;
                    if rid as usize >= sweeps.len() {
                        sweeps.resize(rid as usize + 1, SweepSpan::default());
                    }
                    sweeps[prev_id as usize] = SweepSpan {
                        rid: prev_id,
                        nei: 0,
                        ns: 0,
                    };
                }

                if let Some(south) = chf.neighbor_index(x, y, index, 3) {
                    let south_reg = src_reg[south];
                    if south_reg != 0 && south_reg & BORDER_REG == 0 && chf.areas[south] == area {
                        let entry = &mut sweeps[prev_id as usize];
                        if entry.nei == 0 || entry.nei == south_reg {
                            entry.nei = south_reg;
                            entry.ns += 1;
                            if (south_reg as usize) >= prev.len() {
                                prev.resize(south_reg as usize + 1, 0);
                            }
                            prev[south_reg as usize] += 1;
                        } else {
                            entry.nei = NULL_NEI;
                        }
                    }
                }

                src_reg[index] = prev_id;
            }
        }

        // Promote each run to a unique id, or adopt its south neighbor's id
        // when every span in the run agreed on that single neighbor.
        for i in 1..rid as usize {
            let nei = sweeps[i].nei;
            if nei != NULL_NEI && nei != 0 && prev.get(nei as usize).copied().unwrap_or(0) == sweeps[i].ns as u32 {
                sweeps[i].rid = nei;
            } else {
                sweeps[i].rid = id;
                if id == 0xFFFF {
                    tracing::error!("monotone sweep region id overflowed 0xFFFF");
                    return Err(RegionError::RegionIdOverflow);
                }
                id += 1;
            }
        }

        for x in bs..(width - bs) {
            let cell = chf.cell(x, y);
            for local in 0..cell.count {
                let index = (cell.index + local) as usize;
                let r = src_reg[index];
                if r > 0 && (r as usize) < rid as usize {
                    src_reg[index] = sweeps[r as usize].rid;
                }
            }
        }
    }

    Ok((src_reg, id.saturating_sub(1)))
}
