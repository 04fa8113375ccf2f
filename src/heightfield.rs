//! The sparse column-of-spans heightfield: storage and construction.
//!
//! Triangle-to-heightfield rasterization is out of scope for this crate —
//! callers build a [`Heightfield`] however they produce solid voxel spans
//! (rasterized triangles, a height map, procedural geometry) and hand it to
//! [`crate::filters`] and [`crate::compact::build_compact_heightfield`].

use smallvec::SmallVec;

/// Sentinel area tag meaning "not walkable".
pub const NULL_AREA: u8 = 0;
/// Sentinel elevation meaning "unbounded above".
pub const MAX_HEIGHT: u16 = 0xFFFF;

/// A contiguous solid voxel interval within one column, `[smin, smax)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub smin: u16,
    pub smax: u16,
    pub area: u8,
}

impl Span {
    #[inline]
    pub fn is_walkable(&self) -> bool {
        self.area != NULL_AREA
    }
}

/// One column's spans, bottom to top, non-overlapping.
#[derive(Clone, Debug, Default)]
pub struct Column {
    spans: SmallVec<[Span; 2]>,
}

impl Column {
    #[inline]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    #[inline]
    pub fn spans_mut(&mut self) -> &mut [Span] {
        &mut self.spans
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The floor of the gap above `index` (`span.smax`), and the ceiling of
    /// that gap (`next.smin`, or [`MAX_HEIGHT`] if `index` is the top span).
    pub fn gap_above(&self, index: usize) -> (u16, u16) {
        let bot = self.spans[index].smax;
        let top = self
            .spans
            .get(index + 1)
            .map(|next| next.smin)
            .unwrap_or(MAX_HEIGHT);
        (bot, top)
    }
}

/// A 2-D grid of sparse columns of solid voxel spans.
#[derive(Clone, Debug)]
pub struct Heightfield {
    pub width: i32,
    pub height: i32,
    columns: Vec<Column>,
}

impl Heightfield {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "heightfield dimensions must be positive");
        Self {
            width,
            height,
            columns: vec![Column::default(); (width * height) as usize],
        }
    }

    #[inline]
    pub fn column(&self, x: i32, y: i32) -> &Column {
        &self.columns[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn column_mut(&mut self, x: i32, y: i32) -> &mut Column {
        &mut self.columns[(y * self.width + x) as usize]
    }

    pub fn columns(&self) -> impl Iterator<Item = (i32, i32, &Column)> {
        let width = self.width;
        self.columns
            .iter()
            .enumerate()
            .map(move |(i, column)| (i as i32 % width, i as i32 / width, column))
    }

    /// Inserts a solid span `[smin, smax)` tagged `area` into column `(x, y)`.
    ///
    /// Any existing span that truly overlaps or touches the new range (no
    /// gap between them) is merged into it: the merged span spans the union
    /// of the ranges. The merged area tag only takes the higher of the two
    /// areas when the resulting ceiling (`smax`) is within
    /// `flag_merge_threshold` of the span being absorbed — two spans can
    /// touch at very different heights, and `flag_merge_threshold` is what
    /// decides whether that's still "the same surface" for area-tagging
    /// purposes. Matches the teacher's voxelization merge-on-insert
    /// behavior and upstream `rcAddSpan`.
    pub fn add_span(&mut self, x: i32, y: i32, smin: u16, smax: u16, area: u8, flag_merge_threshold: u16) {
        assert!(smin < smax);
        let column = self.column_mut(x, y);

        let mut new_span = Span { smin, smax, area };
        let mut i = 0;
        while i < column.spans.len() {
            let existing = column.spans[i];
            if existing.smin > new_span.smax {
                break;
            }
            if existing.smax < new_span.smin {
                i += 1;
                continue;
            }

            new_span.smin = new_span.smin.min(existing.smin);
            new_span.smax = new_span.smax.max(existing.smax);
            if new_span.smax.abs_diff(existing.smax) <= flag_merge_threshold {
                new_span.area = new_span.area.max(existing.area);
            }
            column.spans.remove(i);
        }

        let insert_at = column
            .spans
            .iter()
            .position(|s| s.smin > new_span.smin)
            .unwrap_or(column.spans.len());
        column.spans.insert(insert_at, new_span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_span_keeps_column_sorted_and_non_overlapping() {
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 10, 20, 1, 0);
        hf.add_span(0, 0, 0, 5, 1, 0);
        hf.add_span(0, 0, 30, 40, 1, 0);

        let spans: Vec<_> = hf.column(0, 0).spans().to_vec();
        assert_eq!(spans.len(), 3);
        assert!(spans.windows(2).all(|w| w[0].smax <= w[1].smin));
    }

    #[test]
    fn add_span_merges_overlapping_ranges_keeping_higher_area() {
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 0, 10, 1, 0);
        hf.add_span(0, 0, 5, 15, 3, 0);

        let spans = hf.column(0, 0).spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0], Span { smin: 0, smax: 15, area: 3 });
    }

    #[test]
    fn add_span_does_not_merge_across_a_real_gap_even_with_a_large_threshold() {
        // flag_merge_threshold gates the area tag, not the touch test: a
        // genuine empty-space gap must never get welded shut.
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 0, 10, 1, 0);
        hf.add_span(0, 0, 11, 20, 1, 5);

        assert_eq!(hf.column(0, 0).len(), 2);
    }

    #[test]
    fn add_span_area_merge_is_gated_by_flag_merge_threshold() {
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 0, 10, 5, 0);
        hf.add_span(0, 0, 10, 30, 1, 0);

        let spans = hf.column(0, 0).spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].area, 1, "ceilings are far apart, so the lower span's own area wins");
    }

    #[test]
    fn add_span_area_merge_applies_when_ceilings_are_within_threshold() {
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 0, 10, 5, 3);
        hf.add_span(0, 0, 8, 12, 1, 3);

        let spans = hf.column(0, 0).spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].area, 5, "ceilings close enough for the higher area tag to carry over");
    }

    #[test]
    fn gap_above_top_span_is_unbounded() {
        let mut hf = Heightfield::new(1, 1);
        hf.add_span(0, 0, 0, 10, 1, 0);
        assert_eq!(hf.column(0, 0).gap_above(0), (10, MAX_HEIGHT));
    }
}
