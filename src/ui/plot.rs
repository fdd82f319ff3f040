use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Plot};

use crate::color::histogram_colors;
use crate::stats::descriptive::Histogram;

// ---------------------------------------------------------------------------
// Histogram of the dependent variable
// ---------------------------------------------------------------------------

pub fn histogram_plot(ui: &mut Ui, histogram: &Histogram, variable: &str) {
    let width = histogram.bin_width();
    let colors = histogram_colors(&histogram.counts);

    let bars: Vec<Bar> = histogram
        .centers()
        .zip(&histogram.counts)
        .zip(colors)
        .zip(histogram.edges.windows(2))
        .map(|(((center, &count), color), edge)| {
            Bar::new(center, count as f64)
                .width(width * 0.95)
                .fill(color)
                .name(format!("[{:.2}, {:.2}]", edge[0], edge[1]))
        })
        .collect();

    let chart = BarChart::new(bars).name(variable);

    Plot::new("dependent_histogram")
        .height(240.0)
        .x_axis_label(variable)
        .y_axis_label("Frequency")
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
        });
}
