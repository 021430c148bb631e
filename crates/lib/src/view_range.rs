//! Shared [0,1]-normalized zoom window. Every component that draws against
//! trace time (bars, ticks, the minimap graph) reads the same range.

/// Current zoomed time window plus transient drag state. `current` always
/// satisfies `0 <= start <= end <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRange {
    pub current: (f64, f64),
    /// Cursor position while hovering/dragging, as a trace-time fraction.
    pub cursor: Option<f64>,
    /// In-progress drag of the window start handle.
    pub shift_start: Option<f64>,
    /// In-progress drag of the window end handle.
    pub shift_end: Option<f64>,
}

impl Default for ViewRange {
    fn default() -> Self {
        Self {
            current: (0.0, 1.0),
            cursor: None,
            shift_start: None,
            shift_end: None,
        }
    }
}

/// Partial update applied during a drag; `None` fields are left alone.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ViewRangeUpdate {
    pub cursor: Option<f64>,
    pub shift_start: Option<f64>,
    pub shift_end: Option<f64>,
}

impl ViewRange {
    /// Set the zoom window atomically, clamping into [0,1] and reordering
    /// an inverted drag. Transient drag state is cleared.
    pub fn update_time(&mut self, start: f64, end: f64) {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(0.0, 1.0);
        self.current = if start <= end { (start, end) } else { (end, start) };
        self.cursor = None;
        self.shift_start = None;
        self.shift_end = None;
    }

    /// Merge an in-progress drag update; fields the update does not carry
    /// keep their value.
    pub fn update_next_time(&mut self, update: ViewRangeUpdate) {
        if let Some(cursor) = update.cursor {
            self.cursor = Some(cursor);
        }
        if let Some(shift_start) = update.shift_start {
            self.shift_start = Some(shift_start);
        }
        if let Some(shift_end) = update.shift_end {
            self.shift_end = Some(shift_end);
        }
    }
}

/// Re-scale a span's (offset, width) trace-time fractions into the zoomed
/// window, clipping against it. A span fully outside the window comes back
/// with zero width rather than an error.
pub fn bar_geometry(offset: f64, width: f64, view: (f64, f64)) -> (f64, f64) {
    let (view_min, view_max) = view;
    let window = view_max - view_min;
    if window <= 0.0 {
        return (0.0, 0.0);
    }
    let start = ((offset - view_min) / window).clamp(0.0, 1.0);
    let end = ((offset + width - view_min) / window).clamp(0.0, 1.0);
    (start, (end - start).max(0.0))
}
