use eframe::egui::{self, ScrollArea, Ui};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::ui::{panels, plot, tables};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ZinbApp {
    pub state: AppState,
}

impl ZinbApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl Default for ZinbApp {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl eframe::App for ZinbApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: model setup ----
        egui::SidePanel::left("model_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: data, statistics, results ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    central_panel(ctx, ui, &self.state);
                });
        });
    }
}

fn central_panel(ctx: &egui::Context, ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a panel data file to begin  (File → Open…)");
        });
        return;
    };
    let preview_rows = state.config.preview_rows;

    ui.heading("Data preview");
    tables::preview_table(ui, dataset, preview_rows);
    ui.add_space(12.0);

    ui.heading("Index decomposition");
    tables::index_table(ui, dataset, preview_rows);
    ui.add_space(12.0);

    if let (Some(dep), Some(summary), Some(hist)) =
        (&state.dependent, &state.summary, &state.histogram)
    {
        ui.heading(format!("Descriptive statistics: {dep}"));
        ui.horizontal_top(|ui: &mut Ui| {
            ui.vertical(|ui: &mut Ui| {
                tables::describe_table(ui, summary, dep);
            });
            ui.vertical(|ui: &mut Ui| {
                plot::histogram_plot(ui, hist, dep);
            });
        });
        ui.add_space(12.0);
    }

    let Some(report) = &state.report else {
        return;
    };

    ui.separator();
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("ZINB regression");
        if ui.button("Copy results").clicked() {
            ctx.copy_text(report.to_string());
        }
    });
    ui.label(egui::RichText::new(&report.formula).monospace());
    ui.add_space(6.0);

    tables::coefficient_table(ui, &report.conditional);
    ui.add_space(10.0);
    tables::coefficient_table(ui, &report.inflation);
    ui.add_space(10.0);

    tables::metrics_grid(ui, report);
    ui.label(egui::RichText::new(crate::report::SIGNIFICANCE_LEGEND).small().weak());
}
