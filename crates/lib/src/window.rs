//! Decides which contiguous row range the host must materialize for the
//! current viewport, with enough over-render that ordinary scrolling does
//! not redraw every frame.

use crate::position::PositionIndex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f32,
    pub height: f32,
}

#[derive(Debug)]
pub struct WindowedView {
    drawn: Option<(usize, usize)>,

    /// Rows added beyond the viewport on each redraw.
    pub view_buffer: usize,
    /// Off-screen rows that must remain in both directions before a redraw
    /// is triggered. Smaller than `view_buffer`, which is the hysteresis.
    pub view_buffer_min: usize,
}

impl Default for WindowedView {
    fn default() -> Self {
        Self {
            drawn: None,
            view_buffer: 90,
            view_buffer_min: 30,
        }
    }
}

impl WindowedView {
    pub fn new(view_buffer: usize, view_buffer_min: usize) -> Self {
        Self {
            drawn: None,
            view_buffer,
            view_buffer_min,
        }
    }

    /// Inclusive row range the host currently has materialized.
    pub fn drawn(&self) -> Option<(usize, usize)> {
        self.drawn
    }

    /// Invalidate the drawn range (row list changed length or order).
    pub fn reset(&mut self) {
        self.drawn = None;
    }

    /// Inclusive row range to materialize for `viewport`. Keeps the
    /// previously drawn range while at least `view_buffer_min` off-screen
    /// rows remain on both sides; otherwise expands the visible range by
    /// `view_buffer` in both directions, clipped to the data.
    pub fn compute_visible_range(
        &mut self,
        viewport: Viewport,
        index: &mut PositionIndex,
    ) -> Option<(usize, usize)> {
        let data_len = index.len();
        if data_len == 0 {
            self.drawn = None;
            return None;
        }

        let start = index.row_at_offset(viewport.scroll_top.max(0.0))?;
        let end = index.row_at_offset(viewport.scroll_top.max(0.0) + viewport.height)?;

        let max_start = start.saturating_sub(self.view_buffer_min);
        let min_end = (end + self.view_buffer_min).min(data_len - 1);

        if let Some((drawn_start, drawn_end)) = self.drawn {
            if max_start >= drawn_start && min_end <= drawn_end {
                return self.drawn;
            }
        }

        let drawn = (
            start.saturating_sub(self.view_buffer),
            (end + self.view_buffer).min(data_len - 1),
        );
        self.drawn = Some(drawn);
        Some(drawn)
    }
}

/// Coalesces scroll-triggered recomputation: at most one flush pending at a
/// time, a burst of requests collapses into it.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    pending: bool,
}

impl RenderScheduler {
    /// Note that a recompute is wanted. Returns true when the caller should
    /// queue a flush; false means one is already pending.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consume the pending flag when the flush runs.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: usize) -> PositionIndex {
        PositionIndex::new(vec![10.0; rows])
    }

    fn viewport(scroll_top: f32) -> Viewport {
        Viewport {
            scroll_top,
            height: 100.0,
        }
    }

    #[test]
    fn first_call_draws_buffered_range() {
        let mut view = WindowedView::default();
        let mut index = index(1000);
        let drawn = view.compute_visible_range(viewport(0.0), &mut index);
        assert_eq!(drawn, Some((0, 100)));
    }

    #[test]
    fn small_scroll_keeps_drawn_range() {
        let mut view = WindowedView::default();
        let mut index = index(1000);
        let first = view.compute_visible_range(viewport(0.0), &mut index);

        // 20 rows of scroll leaves more than view_buffer_min rows drawn
        // past both edges, so nothing is redrawn
        let second = view.compute_visible_range(viewport(200.0), &mut index);
        assert_eq!(first, second);
        assert_eq!(view.drawn(), first);
    }

    #[test]
    fn crossing_the_min_buffer_redraws_once_with_full_buffer() {
        let mut view = WindowedView::default();
        let mut index = index(1000);
        view.compute_visible_range(viewport(0.0), &mut index);

        // visible rows 80..=90; only 10 drawn rows remain past the bottom
        let drawn = view.compute_visible_range(viewport(800.0), &mut index);
        assert_eq!(drawn, Some((0, 180)));

        // an adjacent follow-up scroll coasts on the new range
        let again = view.compute_visible_range(viewport(820.0), &mut index);
        assert_eq!(again, drawn);
    }

    #[test]
    fn range_is_clipped_to_data() {
        let mut view = WindowedView::default();
        let mut index = index(50);
        let drawn = view.compute_visible_range(viewport(400.0), &mut index);
        assert_eq!(drawn, Some((0, 49)));
    }

    #[test]
    fn empty_data_draws_nothing() {
        let mut view = WindowedView::default();
        let mut index = PositionIndex::new(Vec::new());
        assert_eq!(view.compute_visible_range(viewport(0.0), &mut index), None);
        assert_eq!(view.drawn(), None);
    }

    #[test]
    fn scheduler_coalesces_requests() {
        let mut scheduler = RenderScheduler::default();
        assert!(scheduler.request());
        // a burst of scroll events while one flush is queued
        assert!(!scheduler.request());
        assert!(!scheduler.request());

        assert!(scheduler.take());
        assert!(!scheduler.take());
        assert!(scheduler.request());
    }
}
