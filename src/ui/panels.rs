use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – variable selection
// ---------------------------------------------------------------------------

/// Render the left model-setup panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Model");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        ui.label(RichText::new("File → Open… or Download template…").weak());
        return;
    };

    // Collect what the widgets need so state can be mutated below.
    let dependent_options: Vec<String> = dataset
        .numeric_columns()
        .map(|c| c.name().to_string())
        .collect();
    let candidates: Vec<(String, bool, bool)> = state
        .explanatory_candidates()
        .into_iter()
        .map(|name| {
            let col = dataset.column(&name);
            let is_factor = col.is_some_and(|c| c.meta.is_factor());
            let is_text = col.is_some_and(|c| !c.is_numeric());
            (name, is_factor, is_text)
        })
        .collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Dependent variable ----
            ui.strong("Dependent variable (counts)");
            let current = state.dependent.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("dependent")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &dependent_options {
                        if ui.selectable_label(current == *col, col).clicked() {
                            state.set_dependent(col);
                        }
                    }
                });
            ui.separator();

            // ---- Explanatory variables ----
            ui.strong("Explanatory variables");
            for (name, is_factor, is_text) in &candidates {
                let mut checked = state.explanatory.contains(name);
                let mut text = RichText::new(name);
                if *is_text {
                    text = text.italics();
                }
                let response = ui.checkbox(&mut checked, text);
                let response = if *is_factor {
                    response.on_hover_text("flagged as a factor in the sheet")
                } else if *is_text {
                    response.on_hover_text("text column, always categorical")
                } else {
                    response
                };
                if response.changed() {
                    state.toggle_explanatory(name);
                }
            }
            ui.separator();

            let mut apply = state.apply_factor_flags;
            if ui
                .checkbox(&mut apply, "Treat flagged columns as factors")
                .changed()
            {
                state.set_apply_factor_flags(apply);
            }

            ui.add_space(8.0);
            let can_run = state.dependent.is_some() && !state.explanatory.is_empty();
            if ui
                .add_enabled(can_run, egui::Button::new("Run ZINB"))
                .clicked()
            {
                state.run_regression();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Download template…").clicked() {
                save_template_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.result.is_some(), egui::Button::new("Export results…"))
                .clicked()
            {
                export_results_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(name)) = (&state.dataset, &state.source_name) {
            ui.label(format!(
                "{name}: {} rows, {} variables",
                ds.len(),
                ds.sheet_columns().count()
            ));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if let Some(msg) = &state.info_message {
            ui.label(RichText::new(msg).weak());
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open panel data")
        .add_filter("Supported files", &["csv", "tsv", "txt"])
        .add_filter("CSV", &["csv"])
        .add_filter("Tab separated", &["tsv", "txt"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}

fn save_template_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save template")
        .set_file_name("template.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match AppState::save_template(&path) {
            Ok(()) => {
                state.status_message = None;
                state.info_message = Some(format!("Template saved to {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to save template: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn export_results_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export regression results")
        .set_file_name("zinb_results.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        match state.export_results(&path) {
            Ok(()) => {
                state.status_message = None;
                state.info_message = Some(format!("Results exported to {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to export results: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
