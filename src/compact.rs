//! Compact heightfield construction — the "(external compaction step)" the
//! distilled interface treats as a collaborator, brought in-scope here
//! because every downstream pass needs it to be testable from the public
//! API. Grounded in the teacher's `build_open_heightfield_tile` /
//! `link_neighbours`, re-expressed against the spec's literal
//! `(index, count)` + packed-6-bit-connection layout (upstream
//! `rcCompactHeightfield` / `rcCompactSpan` / `rcGetCon`).

use crate::heightfield::{Heightfield, MAX_HEIGHT};
use crate::grid::{dir_offset_x, dir_offset_y};
use crate::error::{RegionError, Result};

/// Sentinel meaning "no neighbor link in this direction".
pub const NOT_CONNECTED: u32 = 63;

/// A walkable floor interval, with one packed 6-bit neighbor link per
/// direction.
#[derive(Clone, Copy, Debug)]
pub struct CompactSpan {
    /// Floor elevation (the `smax` of the source solid span).
    pub y: u16,
    /// Region id; 0 means unassigned. High bit is [`crate::regions::BORDER_REG`].
    pub reg: u16,
    con: u32,
}

impl CompactSpan {
    #[inline]
    pub fn con(&self, dir: usize) -> u32 {
        (self.con >> (dir * 6)) & 0x3f
    }

    #[inline]
    pub fn set_con(&mut self, dir: usize, value: u32) {
        let shift = dir * 6;
        let mask = 0x3f << shift;
        self.con = (self.con & !mask) | ((value & 0x3f) << shift);
    }

    #[inline]
    pub fn is_connected(&self, dir: usize) -> bool {
        self.con(dir) != NOT_CONNECTED
    }
}

/// A `(index, count)` pointer into the compact span array for one grid cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompactCell {
    pub index: u32,
    pub count: u32,
}

/// Packed representation of a heightfield's walkable surface: one
/// `(index, count)` cell per grid column, a flat array of [`CompactSpan`]s,
/// and the parallel `areas`/`dist` arrays the downstream passes fill in.
pub struct CompactHeightfield {
    pub width: i32,
    pub height: i32,
    pub walkable_height: u16,
    pub walkable_climb: u16,
    pub border_size: u16,
    pub max_distance: u16,
    pub max_regions: u16,

    cells: Vec<CompactCell>,
    spans: Vec<CompactSpan>,
    pub areas: Vec<u8>,
    pub dist: Vec<u16>,
}

impl CompactHeightfield {
    #[inline]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> CompactCell {
        self.cells[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn span(&self, index: usize) -> &CompactSpan {
        &self.spans[index]
    }

    #[inline]
    pub fn span_mut(&mut self, index: usize) -> &mut CompactSpan {
        &mut self.spans[index]
    }

    #[inline]
    pub fn spans(&self) -> &[CompactSpan] {
        &self.spans
    }

    /// Index of the span reachable in direction `dir` from span `index`,
    /// whose owning cell is `(x, y)`. `None` if not connected.
    pub fn neighbor_index(&self, x: i32, y: i32, index: usize, dir: usize) -> Option<usize> {
        let span = &self.spans[index];
        let con = span.con(dir);
        if con == NOT_CONNECTED {
            return None;
        }
        let nx = x + dir_offset_x(dir);
        let ny = y + dir_offset_y(dir);
        let neighbor_cell = self.cell(nx, ny);
        Some((neighbor_cell.index + con) as usize)
    }
}

/// Builds a [`CompactHeightfield`] from a filtered [`Heightfield`].
///
/// A compact span is produced for each open interval above a solid span
/// that is walkable (area not [`crate::heightfield::NULL_AREA`]) and at
/// least `walkable_height` voxels tall. Two compact spans in adjacent
/// columns are linked in a direction when their floor elevations differ by
/// at most `walkable_climb` and the shorter of the two ceilings still
/// leaves `walkable_height` of headroom above the higher floor — the same
/// gap test as the teacher's `link_neighbours`.
///
/// Fails with [`RegionError::OutOfMemory`] if the backing arrays can't be
/// reserved up front.
pub fn build_compact_heightfield(
    heightfield: &Heightfield,
    walkable_height: u16,
    walkable_climb: u16,
) -> Result<CompactHeightfield> {
    let width = heightfield.width;
    let height = heightfield.height;
    let cell_count = (width as usize) * (height as usize);

    let mut cells = Vec::new();
    cells
        .try_reserve_exact(cell_count)
        .map_err(|_| RegionError::OutOfMemory { requested: cell_count * std::mem::size_of::<CompactCell>() })?;
    cells.resize(cell_count, CompactCell::default());

    let mut spans = Vec::new();
    let mut areas = Vec::new();
    let mut ceilings: Vec<u16> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let column = heightfield.column(x, y);
            let cell_index = (y * width + x) as usize;
            cells[cell_index].index = spans.len() as u32;

            let col_spans = column.spans();
            for (i, span) in col_spans.iter().enumerate() {
                if !span.is_walkable() {
                    continue;
                }
                let bot = span.smax;
                let top = col_spans
                    .get(i + 1)
                    .map(|s| s.smin)
                    .unwrap_or(MAX_HEIGHT);

                if top.saturating_sub(bot) < walkable_height {
                    continue;
                }

                spans.push(CompactSpan {
                    y: bot,
                    reg: 0,
                    con: (NOT_CONNECTED | (NOT_CONNECTED << 6) | (NOT_CONNECTED << 12) | (NOT_CONNECTED << 18)),
                });
                areas.push(span.area);
                ceilings.push(top);
            }

            cells[cell_index].count = spans.len() as u32 - cells[cell_index].index;
        }
    }

    let span_count = spans.len();
    let mut dist = Vec::new();
    dist.try_reserve_exact(span_count)
        .map_err(|_| RegionError::OutOfMemory { requested: span_count * std::mem::size_of::<u16>() })?;
    dist.resize(span_count, 0xFFFF);

    let mut chf = CompactHeightfield {
        width,
        height,
        walkable_height,
        walkable_climb,
        border_size: 0,
        max_distance: 0,
        max_regions: 0,
        cells,
        spans,
        areas,
        dist,
    };

    link_neighbours(&mut chf, &ceilings);
    Ok(chf)
}

fn link_neighbours(chf: &mut CompactHeightfield, ceilings: &[u16]) {
    let width = chf.width;
    let height = chf.height;

    for y in 0..height {
        for x in 0..width {
            let cell = chf.cell(x, y);

            for dir in 0..4 {
                let nx = x + dir_offset_x(dir);
                let ny = y + dir_offset_y(dir);
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let neighbor_cell = chf.cell(nx, ny);

                for local_index in 0..cell.count {
                    let span_index = (cell.index + local_index) as usize;
                    let floor = chf.span(span_index).y;
                    let ceiling = ceilings[span_index];

                    let mut found = None;
                    for neighbor_local in 0..neighbor_cell.count {
                        let neighbor_index = (neighbor_cell.index + neighbor_local) as usize;
                        let neighbor_floor = chf.span(neighbor_index).y;
                        let neighbor_ceiling = ceilings[neighbor_index];

                        let overlap = ceiling.min(neighbor_ceiling) as i32 - floor.max(neighbor_floor) as i32;
                        if overlap < chf.walkable_height as i32 {
                            continue;
                        }

                        if neighbor_floor.abs_diff(floor) <= chf.walkable_climb {
                            found = Some(neighbor_local);
                            break;
                        }
                    }

                    if let Some(neighbor_local) = found {
                        chf.span_mut(span_index).set_con(dir, neighbor_local);
                    }
                }
            }
        }
    }
}
