use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::egui::{ComboBox, Grid, Visuals};
use lib::prefs::Prefs;
use tracing::error;

// TODO: add custom colors to edit appearance screen

/// User settings for application. Theme mode is per-session; the
/// comparison list lives in [`Prefs`] and survives restarts.
#[derive(Debug)]
pub(crate) struct Settings {
    mode: Mode,
    prefs: Arc<Mutex<Prefs>>,
    prefs_path: PathBuf,
}

impl Settings {
    pub(crate) fn new(prefs: Arc<Mutex<Prefs>>, prefs_path: PathBuf) -> Self {
        Self {
            mode: Mode::default(),
            prefs,
            prefs_path,
        }
    }
}

impl crate::Panel for Settings {
    fn draw(&mut self, ui: &mut eframe::egui::Ui) -> Option<crate::Action> {
        Grid::new("settings").num_columns(2).show(ui, |ui| {
            ui.label("Theme");
            ComboBox::from_id_source("settings_theme")
                .selected_text(format!("{:?}", self.mode))
                .show_ui(ui, |ui| {
                    if ui
                        .selectable_value(&mut self.mode, Mode::Dark, "Dark")
                        .changed()
                    {
                        ui.ctx().set_visuals(Visuals::dark());
                    };
                    if ui
                        .selectable_value(&mut self.mode, Mode::Light, "Light")
                        .changed()
                    {
                        ui.ctx().set_visuals(Visuals::light());
                    }
                    ui.selectable_value(&mut self.mode, Mode::System, "System");
                });
            ui.end_row();
        });

        ui.add_space(15.0);
        ui.heading("Comparison traces");
        let mut prefs = self.prefs.lock().unwrap();
        if prefs.comparison_traces.is_empty() {
            ui.label("No traces pinned for comparison.");
        } else {
            for id in &prefs.comparison_traces {
                ui.label(id);
            }
            if ui.button("Clear").clicked() {
                prefs.clear_comparisons();
                if let Err(err) = prefs.save(&self.prefs_path) {
                    error!(err, "saving preferences");
                }
            }
        }
        None
    }
}

/// Theme mode for entire application. Use [`System`] to default to
/// system preference.
#[derive(Debug, Default, PartialEq)]
pub(crate) enum Mode {
    Dark,
    Light,
    #[default]
    System,
}
