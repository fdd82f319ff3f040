use eframe::egui::{self, Align, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::significance_color;
use crate::data::model::PanelDataset;
use crate::report::{CoefficientTable, FormattedReport, TABLE_HEADERS};
use crate::stats::descriptive::Summary;

const ROW_HEIGHT: f32 = 18.0;
const HEADER_HEIGHT: f32 = 22.0;

fn table(ui: &mut Ui) -> TableBuilder<'_> {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(false)
        .cell_layout(Layout::left_to_right(Align::Center))
}

// ---------------------------------------------------------------------------
// Data previews
// ---------------------------------------------------------------------------

/// First `n_rows` rows of the sheet columns, index first. Factor flags are
/// shown under the column names.
pub fn preview_table(ui: &mut Ui, dataset: &PanelDataset, n_rows: usize) {
    let columns: Vec<_> = dataset.sheet_columns().collect();
    let n_rows = n_rows.min(dataset.len());

    ui.push_id("preview_table", |ui: &mut Ui| {
        table(ui)
            .column(Column::auto().at_least(110.0))
            .columns(Column::auto().at_least(70.0), columns.len())
            .header(HEADER_HEIGHT * 1.6, |mut header| {
                header.col(|ui: &mut Ui| {
                    ui.strong(&dataset.index_name);
                });
                for col in &columns {
                    header.col(|ui: &mut Ui| {
                        ui.vertical(|ui: &mut Ui| {
                            ui.strong(col.name());
                            let kind = if col.meta.is_factor() {
                                format!("{} · factor", col.dtype)
                            } else {
                                col.dtype.to_string()
                            };
                            ui.label(RichText::new(kind).small().weak()).on_hover_text(format!(
                                "flag: '{}', {} missing",
                                col.meta.factor_flag,
                                col.null_count()
                            ));
                        });
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, n_rows, |mut row| {
                    let i = row.index();
                    row.col(|ui: &mut Ui| {
                        ui.monospace(&dataset.index[i]);
                    });
                    for col in &columns {
                        row.col(|ui: &mut Ui| {
                            ui.label(col.values[i].to_string());
                        });
                    }
                });
            });
    });
}

/// Compound index next to its year / month / region parts.
pub fn index_table(ui: &mut Ui, dataset: &PanelDataset, n_rows: usize) {
    let parts = &dataset.decomposed;
    let n_rows = n_rows.min(parts.len());

    ui.push_id("index_table", |ui: &mut Ui| {
        table(ui)
            .columns(Column::auto().at_least(80.0), 4)
            .header(HEADER_HEIGHT, |mut header| {
                for title in ["Index", "Year", "Month", "Region"] {
                    header.col(|ui: &mut Ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, n_rows, |mut row| {
                    let i = row.index();
                    for cell in [
                        &dataset.index[i],
                        &parts.years[i],
                        &parts.months[i],
                        &parts.regions[i],
                    ] {
                        row.col(|ui: &mut Ui| {
                            ui.monospace(cell);
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

pub fn describe_table(ui: &mut Ui, summary: &Summary, variable: &str) {
    ui.push_id("describe_table", |ui: &mut Ui| {
        table(ui)
            .column(Column::auto().at_least(70.0))
            .column(Column::auto().at_least(100.0))
            .header(HEADER_HEIGHT, |mut header| {
                header.col(|ui: &mut Ui| {
                    ui.strong("");
                });
                header.col(|ui: &mut Ui| {
                    ui.strong(variable);
                });
            })
            .body(|mut body| {
                for (label, value) in summary.rows() {
                    body.row(ROW_HEIGHT, |mut row| {
                        row.col(|ui: &mut Ui| {
                            ui.label(label);
                        });
                        row.col(|ui: &mut Ui| {
                            let text = if label == "count" {
                                format!("{value:.0}")
                            } else {
                                format!("{value:.4}")
                            };
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui: &mut Ui| {
                                ui.monospace(text);
                            });
                        });
                    });
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Regression output
// ---------------------------------------------------------------------------

pub fn coefficient_table(ui: &mut Ui, coefficients: &CoefficientTable) {
    ui.strong(coefficients.title);
    ui.push_id(coefficients.title, |ui: &mut Ui| {
        table(ui)
            .column(Column::auto().at_least(140.0))
            .columns(Column::auto().at_least(90.0), TABLE_HEADERS.len() - 1)
            .header(HEADER_HEIGHT, |mut header| {
                for title in TABLE_HEADERS {
                    header.col(|ui: &mut Ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for r in &coefficients.rows {
                    body.row(ROW_HEIGHT, |mut row| {
                        row.col(|ui: &mut Ui| {
                            ui.label(&r.term);
                        });
                        for value in [&r.estimate, &r.std_error, &r.p_value] {
                            row.col(|ui: &mut Ui| {
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui: &mut Ui| {
                                    ui.monospace(value);
                                });
                            });
                        }
                        row.col(|ui: &mut Ui| {
                            ui.label(
                                RichText::new(r.significance)
                                    .strong()
                                    .color(significance_color(r.significance)),
                            );
                        });
                    });
                }
            });
    });
}

pub fn metrics_grid(ui: &mut Ui, report: &FormattedReport) {
    egui::Grid::new("fit_metrics")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for (label, value) in report.metrics() {
                ui.strong(label);
                ui.monospace(value);
                ui.end_row();
            }
            ui.strong("Observations");
            ui.monospace(report.n_obs.to_string());
            ui.end_row();
        });
}
