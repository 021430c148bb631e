use eframe::{
    egui::{Grid, Layout, ScrollArea},
    emath::Align,
};

use lib::Span;

pub(crate) struct Attributes {
    span: Span,
}

impl Attributes {
    pub(crate) fn new(span: Span) -> Self {
        Self { span }
    }
}

impl crate::Panel for Attributes {
    fn draw(&mut self, ui: &mut eframe::egui::Ui) -> Option<crate::Action> {
        ui.heading(&self.span.name);
        ui.separator();

        ScrollArea::vertical().show(ui, |ui| {
            ui.heading("Span");
            Grid::new("span_fields").num_columns(2).show(ui, |ui| {
                for (key, value) in [
                    ("id", self.span.id.clone()),
                    ("service", self.span.service.clone()),
                    ("kind", format!("{:?}", self.span.kind)),
                    ("start", self.span.start.to_rfc3339()),
                    (
                        "duration",
                        format!("{} ms", self.span.duration_micros as f64 / 1000.0),
                    ),
                ] {
                    ui.label(format!("{key}:"));
                    ui.with_layout(Layout::right_to_left(Align::TOP), |ui| {
                        ui.label(value);
                    });
                    ui.end_row();
                }
            });
            ui.add_space(10.0);

            if !self.span.tags.is_empty() {
                ui.heading("Tags");
                Grid::new("span_tags").num_columns(2).show(ui, |ui| {
                    self.span.tags.iter().for_each(|tag| {
                        ui.label(format!("{}:", tag.key));
                        ui.with_layout(Layout::right_to_left(Align::TOP), |ui| {
                            ui.label(if tag.value.is_empty() { "-" } else { &tag.value });
                        });
                        ui.end_row();
                    });
                });
                ui.add_space(10.0);
            }

            if !self.span.logs.is_empty() {
                ui.heading("Logs");
                Grid::new("span_logs").num_columns(2).show(ui, |ui| {
                    self.span.logs.iter().for_each(|log| {
                        ui.label(format!("+{:.3} ms", log.timestamp_micros as f64 / 1000.0));
                        ui.vertical(|ui| {
                            for field in &log.fields {
                                ui.label(format!(
                                    "{}: {}",
                                    field.key,
                                    if field.value.is_empty() { "-" } else { &field.value }
                                ));
                            }
                        });
                        ui.end_row();
                    });
                });
            }
        });
        None
    }
}
