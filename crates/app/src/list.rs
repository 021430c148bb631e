use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::egui::Grid;
use egui_extras::{Column as EguiColumn, TableBuilder};
use lib::prefs::Prefs;
use lib::Trace;
use tracing::error;

const TABLE_ID: &str = "trace_list";

#[derive(Debug, Default, PartialEq)]
enum Column {
    Id,
    Service,
    Name,
    Duration,
    #[default]
    Start,
}

/// Columns the user can hide. The trace id stays visible since it carries
/// the link that opens the waterfall.
const OPTIONAL_COLUMNS: [&str; 4] = ["Service", "Name", "Duration", "Start"];

#[derive(Debug, Default, PartialEq)]
enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    search: String,
    sort_column: Column,
    sort_direction: Direction,
}

pub(crate) struct TraceList {
    state: State,
    traces: Arc<Mutex<Vec<Trace>>>,
    prefs: Arc<Mutex<Prefs>>,
    prefs_path: PathBuf,
}

impl TraceList {
    pub(crate) fn new(
        traces: Arc<Mutex<Vec<Trace>>>,
        prefs: Arc<Mutex<Prefs>>,
        prefs_path: PathBuf,
    ) -> Self {
        Self {
            state: Default::default(),
            traces,
            prefs,
            prefs_path,
        }
    }
}

impl crate::Panel for TraceList {
    fn draw(&mut self, ui: &mut eframe::egui::Ui) -> Option<crate::Action> {
        // index in original slice is kept to use ensure the correct trace
        // is reported as selected, since caller doesn't know we are
        // filtering
        let traces = self.traces.lock().unwrap();
        let mut visible_traces = traces
            .iter()
            .enumerate()
            .filter(|(_, trace)| {
                let search = self.state.search.as_str();
                trace.spans[0].name.starts_with(search)
                    || trace.spans[0].service.starts_with(search)
                    || trace.id.starts_with(search)
            })
            .collect::<Vec<(usize, &Trace)>>();
        match self.state.sort_column {
            Column::Id => visible_traces.sort_by_key(|(_, trace)| &trace.id),
            Column::Service => visible_traces.sort_by_key(|(_, trace)| &trace.spans[0].service),
            Column::Name => visible_traces.sort_by_key(|(_, trace)| &trace.spans[0].name),
            Column::Duration => visible_traces.sort_by_key(|(_, trace)| trace.duration_micros()),
            Column::Start => visible_traces.sort_by_key(|(_, trace)| trace.spans[0].start),
        }
        if self.state.sort_direction == Direction::Descending {
            visible_traces.reverse();
        }

        let mut prefs = self.prefs.lock().unwrap();
        let mut shown = OPTIONAL_COLUMNS
            .iter()
            .map(|&name| {
                prefs
                    .visible_columns(TABLE_ID)
                    .map_or(true, |columns| columns.iter().any(|c| c == name))
            })
            .collect::<Vec<bool>>();

        ui.collapsing("Filters", |ui| {
            Grid::new("list_filters").num_columns(2).show(ui, |ui| {
                ui.label("Search");
                ui.text_edit_singleline(&mut self.state.search);
                ui.end_row();

                ui.label("Sort");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.state.sort_column, Column::Id, "Trace ID");
                    ui.radio_value(&mut self.state.sort_column, Column::Service, "Service");
                    ui.radio_value(&mut self.state.sort_column, Column::Name, "Name");
                    ui.radio_value(&mut self.state.sort_column, Column::Duration, "Duration");
                    ui.radio_value(&mut self.state.sort_column, Column::Start, "Start Time");
                });
                ui.end_row();

                ui.label("");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.state.sort_direction, Direction::Ascending, "asc");
                    ui.radio_value(
                        &mut self.state.sort_direction,
                        Direction::Descending,
                        "desc",
                    );
                });
                ui.end_row();

                ui.label("Columns");
                ui.horizontal(|ui| {
                    let mut changed = false;
                    for (visible, name) in shown.iter_mut().zip(OPTIONAL_COLUMNS) {
                        changed |= ui.checkbox(visible, name).changed();
                    }
                    if changed {
                        let columns = shown
                            .iter()
                            .zip(OPTIONAL_COLUMNS)
                            .filter(|(visible, _)| **visible)
                            .map(|(_, name)| name.to_string())
                            .collect();
                        prefs.set_visible_columns(TABLE_ID, columns);
                        if let Err(err) = prefs.save(&self.prefs_path) {
                            error!(err, "saving column preferences");
                        }
                    }
                });
                ui.end_row();
            });
        });
        ui.add_space(5.0);

        let mut action = None;
        let mut builder = TableBuilder::new(ui).column(EguiColumn::auto().at_least(220.0));
        for _ in shown.iter().filter(|visible| **visible) {
            builder = builder.column(EguiColumn::auto().at_least(100.0));
        }
        builder
            .column(EguiColumn::remainder())
            .striped(true)
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.heading("Trace ID");
                });
                for (_, name) in shown
                    .iter()
                    .zip(OPTIONAL_COLUMNS)
                    .filter(|(visible, _)| **visible)
                {
                    header.col(|ui| {
                        ui.heading(name);
                    });
                }
                header.col(|ui| {
                    ui.heading("");
                });
            })
            .body(|mut body| {
                for (i, trace) in &visible_traces {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            if ui.link(&trace.id).clicked() {
                                action = Some(crate::Action::OpenTraceDetails(*i));
                            }
                        });
                        for (_, name) in shown
                            .iter()
                            .zip(OPTIONAL_COLUMNS)
                            .filter(|(visible, _)| **visible)
                        {
                            row.col(|ui| match name {
                                "Service" => {
                                    ui.label(&trace.spans[0].service);
                                }
                                "Name" => {
                                    ui.label(&trace.spans[0].name);
                                }
                                "Duration" => {
                                    ui.label(format!("{}ms", trace.duration_micros() / 1000));
                                }
                                _ => {
                                    ui.label(format!(
                                        "{}",
                                        trace.spans[0].start.format("%b %e, %H:%M:%S%.3f")
                                    ));
                                }
                            });
                        }
                        row.col(|ui| {
                            let pinned = prefs.comparison_traces.iter().any(|id| id == &trace.id);
                            if pinned {
                                ui.label("comparing");
                            } else if ui.small_button("Compare").clicked() {
                                prefs.push_comparison(&trace.id);
                                if let Err(err) = prefs.save(&self.prefs_path) {
                                    error!(err, "saving comparison preferences");
                                }
                            }
                        });
                    });
                }
            });
        action
    }
}
