//! Row index -> pixel mapping. Heights start as per-row-kind estimates and
//! are corrected as the host reports real measurements; cumulative offsets
//! are computed lazily and only the suffix after a changed height is ever
//! recomputed.

use crate::rows::{Row, RowKind};

pub const DEFAULT_BAR_HEIGHT: f32 = 28.0;
pub const DEFAULT_DETAIL_HEIGHT: f32 = 161.0;
pub const DEFAULT_DETAIL_WITH_LOGS_HEIGHT: f32 = 197.0;

/// Height assumed for a row that has not been measured yet.
pub fn estimate_height(row: &Row) -> f32 {
    match row.kind {
        RowKind::Bar => DEFAULT_BAR_HEIGHT,
        RowKind::Detail { has_logs: false } => DEFAULT_DETAIL_HEIGHT,
        RowKind::Detail { has_logs: true } => DEFAULT_DETAIL_WITH_LOGS_HEIGHT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub y: f32,
    pub height: f32,
}

#[derive(Debug)]
pub struct PositionIndex {
    estimates: Vec<f32>,
    measured: Vec<Option<f32>>,
    ys: Vec<f32>,
    heights: Vec<f32>,

    /// Number of leading entries of `ys`/`heights` that are trusted.
    computed: usize,
}

impl PositionIndex {
    pub fn new(estimates: Vec<f32>) -> Self {
        let len = estimates.len();
        Self {
            estimates,
            measured: vec![None; len],
            ys: vec![0.0; len],
            heights: vec![0.0; len],
            computed: 0,
        }
    }

    pub fn for_rows(rows: &[Row]) -> Self {
        Self::new(rows.iter().map(estimate_height).collect())
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    pub fn height_of(&self, i: usize) -> f32 {
        self.measured[i].unwrap_or(self.estimates[i])
    }

    /// Record a real measured height. Out-of-range indices are rows that
    /// unmounted before their measurement landed; those are dropped. An
    /// unchanged height leaves the computed prefix intact.
    pub fn record_measured(&mut self, i: usize, observed: f32) {
        if i >= self.len() {
            return;
        }
        if self.height_of(i) == observed {
            self.measured[i] = Some(observed);
            return;
        }
        self.measured[i] = Some(observed);
        self.computed = self.computed.min(i);
    }

    fn compute_until(&mut self, i: usize) {
        while self.computed <= i {
            let at = self.computed;
            self.ys[at] = if at == 0 {
                0.0
            } else {
                self.ys[at - 1] + self.heights[at - 1]
            };
            self.heights[at] = self.height_of(at);
            self.computed += 1;
        }
    }

    /// Offset and height of row `i`. Amortized O(1) over sequential calls:
    /// only rows past the last clean boundary are walked.
    ///
    /// # Panics
    /// If `i` is out of range. Unlike [`Self::record_measured`] there is no
    /// row this could belong to, so the caller holds a stale index.
    pub fn position_of(&mut self, i: usize) -> Position {
        assert!(i < self.len(), "row {i} out of range for {} rows", self.len());
        self.compute_until(i);
        Position {
            y: self.ys[i],
            height: self.heights[i],
        }
    }

    /// Greatest row index whose start offset is <= `y`. Extends the
    /// computed prefix on demand, then binary-searches it.
    pub fn row_at_offset(&mut self, y: f32) -> Option<usize> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.compute_until(0);
        while self.computed < len {
            let last = self.computed - 1;
            if self.ys[last] + self.heights[last] > y {
                break;
            }
            self.compute_until(self.computed);
        }
        let i = self.ys[..self.computed].partition_point(|&start| start <= y);
        Some(i.saturating_sub(1))
    }

    pub fn total_height(&mut self) -> f32 {
        let len = self.len();
        if len == 0 {
            return 0.0;
        }
        self.compute_until(len - 1);
        self.ys[len - 1] + self.heights[len - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{Row, RowKind};

    fn bar_row(i: usize) -> Row {
        Row {
            span_index: i,
            span_id: format!("s{i}"),
            depth: 0,
            kind: RowKind::Bar,
            bg_color_index: 0,
        }
    }

    #[test]
    fn estimates_fall_back_per_row_kind() {
        let mut detail = bar_row(0);
        detail.kind = RowKind::Detail { has_logs: false };
        let mut detail_logs = bar_row(0);
        detail_logs.kind = RowKind::Detail { has_logs: true };

        assert_eq!(estimate_height(&bar_row(0)), DEFAULT_BAR_HEIGHT);
        assert_eq!(estimate_height(&detail), DEFAULT_DETAIL_HEIGHT);
        assert_eq!(estimate_height(&detail_logs), DEFAULT_DETAIL_WITH_LOGS_HEIGHT);
    }

    #[test]
    fn positions_are_contiguous() {
        let rows: Vec<Row> = (0..8).map(bar_row).collect();
        let mut index = PositionIndex::for_rows(&rows);
        index.record_measured(3, 50.0);

        for i in 0..7 {
            let cur = index.position_of(i);
            let next = index.position_of(i + 1);
            assert_eq!(cur.y + cur.height, next.y, "gap between rows {i} and {}", i + 1);
        }
    }

    #[test]
    fn measured_height_shifts_later_rows() {
        let mut index = PositionIndex::new(vec![10.0; 4]);
        assert_eq!(index.position_of(3).y, 30.0);

        index.record_measured(1, 25.0);
        assert_eq!(index.position_of(1), Position { y: 10.0, height: 25.0 });
        assert_eq!(index.position_of(2).y, 35.0);
        assert_eq!(index.position_of(3).y, 45.0);
        assert_eq!(index.total_height(), 55.0);
    }

    #[test]
    fn measurement_for_unmounted_row_is_a_no_op() {
        let mut index = PositionIndex::new(vec![10.0; 2]);
        index.record_measured(9, 99.0);
        assert_eq!(index.total_height(), 20.0);
    }

    #[test]
    fn row_at_offset_seeks_by_start_offset() {
        let mut index = PositionIndex::new(vec![10.0; 5]);
        assert_eq!(index.row_at_offset(0.0), Some(0));
        assert_eq!(index.row_at_offset(9.9), Some(0));
        // a row starts exactly at its predecessor's end
        assert_eq!(index.row_at_offset(10.0), Some(1));
        assert_eq!(index.row_at_offset(34.0), Some(3));
        // past the end clamps to the last row
        assert_eq!(index.row_at_offset(500.0), Some(4));
    }

    #[test]
    fn row_at_offset_reflects_new_measurements() {
        let mut index = PositionIndex::new(vec![10.0; 4]);
        // force full computation, then dirty an early row
        assert_eq!(index.row_at_offset(35.0), Some(3));
        index.record_measured(0, 40.0);
        assert_eq!(index.row_at_offset(35.0), Some(0));
        assert_eq!(index.row_at_offset(45.0), Some(1));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn position_of_past_the_end_panics() {
        let mut index = PositionIndex::new(vec![10.0; 2]);
        index.position_of(2);
    }

    #[test]
    fn empty_index() {
        let mut index = PositionIndex::new(Vec::new());
        assert_eq!(index.row_at_offset(10.0), None);
        assert_eq!(index.total_height(), 0.0);
    }
}
