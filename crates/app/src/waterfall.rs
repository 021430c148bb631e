use std::collections::BTreeSet;

use eframe::egui::*;

use lib::group::{apply_grouping, rendered_duration, toggle_group, GroupToggle};
use lib::position::PositionIndex;
use lib::rows::{self, generate_rows, Row, RowKind};
use lib::search::{filter_spans, order_matches, MatchCursor};
use lib::view_range::{bar_geometry, ViewRange, ViewRangeUpdate};
use lib::window::{RenderScheduler, Viewport, WindowedView};
use lib::{Span, Trace};

const INDENT_PER_DEPTH: f32 = 15.0;
const BAR_HEIGHT: f32 = 20.0;
const MIN_BAR_WIDTH: f32 = 2.0;

const BAR_COLORS: [Color32; 4] = [
    Color32::from_rgb(0x0B, 0x6E, 0x4F), // Dartmouth Green
    Color32::from_rgb(0xF2, 0x54, 0x5B), // Indian Red
    Color32::from_rgb(0x64, 0x5E, 0x9D), // Ultra Violet
    Color32::from_rgb(0x2D, 0xC2, 0xBD), // Robin Egg Blue
];
const STRIPE_COLORS: [Color32; 2] = [
    Color32::from_rgb(0x16, 0x16, 0x16),
    Color32::from_rgb(0x1E, 0x1E, 0x1E),
];
const MATCH_COLOR: Color32 = Color32::from_rgb(0xE0, 0xA8, 0x00);

/// Per-trace state behind the waterfall tab. Lives as long as the tab and
/// is replaced wholesale when its trace is.
pub(crate) struct Waterfall {
    trace_id: String,
    duration_micros: i64,

    /// Full span list including collapsed group members.
    spans: Vec<Span>,
    /// Span list after grouping; row indices point into this.
    visible_spans: Vec<Span>,

    hidden: BTreeSet<String>,
    detail_expanded: BTreeSet<String>,

    rows: Vec<Row>,
    index: PositionIndex,
    window: WindowedView,
    scheduler: RenderScheduler,
    view_range: ViewRange,

    search: String,
    match_set: BTreeSet<String>,
    ordered_matches: Vec<String>,
    cursor: MatchCursor,

    scroll_to_row: Option<usize>,
}

/// User interaction on a row, applied after the row pass so the row list
/// stays immutable while it is being drawn.
enum RowEvent {
    ToggleChildren(String),
    ToggleDetail(String),
    ToggleGroup(String, GroupToggle),
    OpenSpan(String),
    HoverCursor(f64),
}

#[derive(Clone, Copy)]
struct RowLayout {
    name_width: f32,
    duration_width: f32,
}

impl Waterfall {
    pub(crate) fn new(trace: &Trace) -> Self {
        let spans = trace.spans.clone();
        let hidden = lib::default_hidden_ids(&spans);
        let mut waterfall = Self {
            trace_id: trace.id.clone(),
            duration_micros: trace.duration_micros().max(1),
            spans,
            visible_spans: Vec::new(),
            hidden,
            detail_expanded: BTreeSet::new(),
            rows: Vec::new(),
            index: PositionIndex::new(Vec::new()),
            window: WindowedView::default(),
            scheduler: RenderScheduler::default(),
            view_range: ViewRange::default(),
            search: String::new(),
            match_set: BTreeSet::new(),
            ordered_matches: Vec::new(),
            cursor: MatchCursor::default(),
            scroll_to_row: None,
        };
        waterfall.rebuild();
        waterfall
    }

    pub(crate) fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Re-project spans into rows after any change to grouping, collapse
    /// state, or detail expansion. Grouping narrows the span list first,
    /// then the collapse walk narrows the rows.
    fn rebuild(&mut self) {
        self.visible_spans = apply_grouping(&self.spans);
        self.rows = generate_rows(&self.visible_spans, &self.hidden, &self.detail_expanded);
        self.index = PositionIndex::for_rows(&self.rows);
        self.window.reset();
        self.refresh_matches();
    }

    fn refresh_matches(&mut self) {
        self.match_set = filter_spans(&self.search, &self.visible_spans);
        self.ordered_matches = order_matches(&self.match_set, &self.rows);
        self.cursor.reset();
    }

    fn jump(&mut self, forward: bool) {
        let target = if forward {
            self.cursor.next(&self.ordered_matches)
        } else {
            self.cursor.prev(&self.ordered_matches)
        }
        .map(str::to_string);
        if let Some(id) = target {
            self.scroll_to_row = self
                .rows
                .iter()
                .position(|row| row.kind == RowKind::Bar && row.span_id == id);
        }
    }

    fn toolbar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label("Search");
            if ui.text_edit_singleline(&mut self.search).changed() {
                self.refresh_matches();
            }
            ui.label(format!("{} results", self.ordered_matches.len()));
            if ui.small_button("<").clicked() {
                self.jump(false);
            }
            if ui.small_button(">").clicked() {
                self.jump(true);
            }

            ui.separator();

            if ui.button("Expand all").clicked() {
                self.hidden = rows::expand_all();
                self.scheduler.request();
            }
            if ui.button("Collapse all").clicked() {
                self.hidden = rows::collapse_all(&self.visible_spans);
                self.scheduler.request();
            }
            if ui.button("Expand +1").clicked() {
                self.hidden = rows::expand_one_level(&self.visible_spans, &self.hidden);
                self.scheduler.request();
            }
            if ui.button("Collapse -1").clicked() {
                self.hidden = rows::collapse_one_level(&self.visible_spans, &self.hidden);
                self.scheduler.request();
            }

            ui.separator();

            let (mut view_start, mut view_end) = self.view_range.current;
            ui.label("View");
            let start_changed = ui
                .add(DragValue::new(&mut view_start).clamp_range(0.0..=1.0).speed(0.005))
                .changed();
            let end_changed = ui
                .add(DragValue::new(&mut view_end).clamp_range(0.0..=1.0).speed(0.005))
                .changed();
            if start_changed || end_changed {
                self.view_range.update_time(view_start, view_end);
            }
            if ui.button("Reset zoom").clicked() {
                self.view_range.update_time(0.0, 1.0);
            }
        });
    }

    fn draw_bar_row(
        &self,
        ui: &mut Ui,
        rect: Rect,
        row: &Row,
        layout: RowLayout,
        events: &mut Vec<RowEvent>,
    ) {
        let span = &self.visible_spans[row.span_index];

        let name_rect = Rect::from_min_size(
            rect.left_top(),
            vec2(layout.name_width, rect.height()),
        );
        ui.allocate_ui_at_rect(name_rect, |ui| {
            ui.horizontal(|ui| {
                ui.add_space(row.depth as f32 * INDENT_PER_DEPTH);
                if span.has_children {
                    let symbol = if self.hidden.contains(&span.id) {
                        "\u{25b8}"
                    } else {
                        "\u{25be}"
                    };
                    if ui.small_button(symbol).clicked() {
                        events.push(RowEvent::ToggleChildren(span.id.clone()));
                    }
                }
                if let Some(group) = &span.group {
                    if group.id == span.id {
                        let (label, toggle) = if group.is_expand {
                            ("[-]".to_string(), GroupToggle::Collapse)
                        } else {
                            (format!("[x{}]", group.members.len().max(1)), GroupToggle::Expand)
                        };
                        if ui.small_button(label).clicked() {
                            events.push(RowEvent::ToggleGroup(group.id.clone(), toggle));
                        }
                    }
                }
                if ui.link(&span.name).clicked() {
                    events.push(RowEvent::OpenSpan(span.id.clone()));
                }
                if ui
                    .small_button("\u{2261}")
                    .on_hover_text("span details")
                    .clicked()
                {
                    events.push(RowEvent::ToggleDetail(span.id.clone()));
                }
            });
        });

        let duration_rect = Rect::from_min_size(
            pos2(rect.left() + layout.name_width, rect.top()),
            vec2(layout.duration_width, rect.height()),
        );
        let duration_ms = rendered_duration(span) as f32 / 1000.0;
        ui.allocate_ui_at_rect(duration_rect, |ui| {
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(format!("{duration_ms} ms"));
            });
        });

        // bar, clipped against the zoom window
        let bar_zone = Rect::from_min_max(
            pos2(duration_rect.right() + 4.0, rect.top()),
            rect.right_bottom(),
        );
        let (view_min, view_max) = self.view_range.current;
        let offset_frac = span.offset_micros as f64 / self.duration_micros as f64;
        let width_frac = rendered_duration(span) as f64 / self.duration_micros as f64;

        if offset_frac + width_frac >= view_min && offset_frac <= view_max {
            let (x_frac, w_frac) = bar_geometry(offset_frac, width_frac, self.view_range.current);
            let x = bar_zone.left() + bar_zone.width() * x_frac as f32;
            let width = (bar_zone.width() * w_frac as f32).max(MIN_BAR_WIDTH);
            let y = rect.center().y - BAR_HEIGHT / 2.0;
            let bar = Rect::from_min_size(pos2(x, y), vec2(width, BAR_HEIGHT));
            let color = BAR_COLORS[row.depth % BAR_COLORS.len()];
            ui.painter().rect_filled(bar, Rounding::same(2.0), color);
        }

        if let Some(pointer) = ui.ctx().pointer_hover_pos() {
            if bar_zone.contains(pointer) && bar_zone.width() > 0.0 {
                let frac = f64::from((pointer.x - bar_zone.left()) / bar_zone.width());
                let cursor = view_min + frac.clamp(0.0, 1.0) * (view_max - view_min);
                events.push(RowEvent::HoverCursor(cursor));
            }
        }

        let window = view_max - view_min;
        if let Some(cursor) = self.view_range.cursor {
            if window > 0.0 && (view_min..=view_max).contains(&cursor) {
                let frac = (cursor - view_min) / window;
                let x = bar_zone.left() + bar_zone.width() * frac as f32;
                ui.painter().vline(
                    x,
                    rect.y_range(),
                    Stroke::new(1.0, Color32::from_gray(120)),
                );
            }
        }
    }

    fn draw_detail_row(&self, ui: &mut Ui, rect: Rect, row: &Row) -> f32 {
        let span = &self.visible_spans[row.span_index];
        let inner = ui.allocate_ui_at_rect(rect, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.add_space(row.depth as f32 * INDENT_PER_DEPTH + 20.0);
                ui.vertical(|ui| {
                    Grid::new(("span_detail", &span.id))
                        .num_columns(2)
                        .show(ui, |ui| {
                            ui.label("service:");
                            ui.label(&span.service);
                            ui.end_row();

                            ui.label("kind:");
                            ui.label(format!("{:?}", span.kind));
                            ui.end_row();

                            ui.label("span id:");
                            ui.label(&span.id);
                            ui.end_row();

                            for tag in &span.tags {
                                ui.label(format!("{}:", tag.key));
                                ui.label(if tag.value.is_empty() { "-" } else { &tag.value });
                                ui.end_row();
                            }
                        });

                    for log in &span.logs {
                        let fields = log
                            .fields
                            .iter()
                            .map(|f| format!("{}={}", f.key, f.value))
                            .collect::<Vec<_>>()
                            .join(" ");
                        ui.label(format!(
                            "log +{:.3} ms: {fields}",
                            log.timestamp_micros as f32 / 1000.0
                        ));
                    }
                    ui.add_space(4.0);
                });
            });
        });
        inner.response.rect.height()
    }

    fn apply_events(&mut self, events: Vec<RowEvent>) -> Option<crate::Action> {
        let mut action = None;
        for event in events {
            match event {
                RowEvent::ToggleChildren(id) => {
                    self.hidden = rows::children_toggle(&self.hidden, &id);
                    self.scheduler.request();
                }
                RowEvent::ToggleDetail(id) => {
                    if !self.detail_expanded.remove(&id) {
                        self.detail_expanded.insert(id);
                    }
                    self.scheduler.request();
                }
                RowEvent::ToggleGroup(id, toggle) => {
                    self.spans = toggle_group(&self.spans, &id, toggle);
                    self.scheduler.request();
                }
                RowEvent::OpenSpan(id) => {
                    // span index must refer to the trace's own span list,
                    // not the grouped projection
                    action = self
                        .spans
                        .iter()
                        .position(|span| span.id == id)
                        .map(crate::Action::OpenSpanAttributes);
                }
                RowEvent::HoverCursor(cursor) => {
                    self.view_range.update_next_time(ViewRangeUpdate {
                        cursor: Some(cursor),
                        ..ViewRangeUpdate::default()
                    });
                }
            }
        }
        action
    }
}

impl crate::Panel for Waterfall {
    fn draw(&mut self, ui: &mut Ui) -> Option<crate::Action> {
        // coalesced rebuild from last frame's interactions
        if self.scheduler.take() {
            self.rebuild();
        }

        ui.heading(format!("Trace: {}", self.trace_id));
        self.toolbar(ui);
        ui.separator();

        let mut events: Vec<RowEvent> = Vec::new();
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_viewport(ui, |ui, viewport| {
                let total_height = self.index.total_height();
                ui.set_height(total_height);

                let left = ui.min_rect().left();
                let top = ui.min_rect().top();
                let width = ui.available_width().max(400.0);
                let layout = RowLayout {
                    name_width: (width * 0.35).min(340.0),
                    duration_width: 80.0,
                };

                if let Some(target) = self.scroll_to_row.take() {
                    let pos = self.index.position_of(target);
                    let target_rect =
                        Rect::from_min_size(pos2(left, top + pos.y), vec2(1.0, pos.height));
                    ui.scroll_to_rect(target_rect, Some(Align::Center));
                }

                let range = self.window.compute_visible_range(
                    Viewport {
                        scroll_top: viewport.min.y,
                        height: viewport.height(),
                    },
                    &mut self.index,
                );
                let Some((start, end)) = range else {
                    return;
                };

                for i in start..=end {
                    let pos = self.index.position_of(i);
                    let row = self.rows[i].clone();
                    let rect =
                        Rect::from_min_size(pos2(left, top + pos.y), vec2(width, pos.height));

                    let stripe = STRIPE_COLORS[row.bg_color_index % STRIPE_COLORS.len()];
                    ui.painter().rect_filled(rect, 0.0, stripe);
                    if self.match_set.contains(&row.span_id) {
                        let edge = Rect::from_min_size(rect.left_top(), vec2(3.0, rect.height()));
                        ui.painter().rect_filled(edge, 0.0, MATCH_COLOR);
                    }

                    // newly materialized rows report their real height back
                    let measured = match row.kind {
                        RowKind::Bar => {
                            self.draw_bar_row(ui, rect, &row, layout, &mut events);
                            rect.height()
                        }
                        RowKind::Detail { .. } => self.draw_detail_row(ui, rect, &row),
                    };
                    self.index.record_measured(i, measured);
                }
            });

        let action = self.apply_events(events);
        if action.is_some() {
            ui.ctx().request_repaint();
        }
        action
    }
}
