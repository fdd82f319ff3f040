use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

// ---------------------------------------------------------------------------
// Histogram gradient
// ---------------------------------------------------------------------------

const GRADIENT_LOW: (f32, f32, f32) = (200.0, 0.65, 0.70);
const GRADIENT_HIGH: (f32, f32, f32) = (220.0, 0.70, 0.35);

fn to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// `n` colours running from light to dark blue, one per histogram bar.
pub fn gradient(n: usize) -> Vec<Color32> {
    let low = Hsl::new(GRADIENT_LOW.0, GRADIENT_LOW.1, GRADIENT_LOW.2);
    let high = Hsl::new(GRADIENT_HIGH.0, GRADIENT_HIGH.1, GRADIENT_HIGH.2);
    match n {
        0 => Vec::new(),
        1 => vec![to_color32(low)],
        _ => (0..n)
            .map(|i| to_color32(low.mix(high, i as f32 / (n - 1) as f32)))
            .collect(),
    }
}

/// Bar colours for a histogram; all gray when every bin is empty.
pub fn histogram_colors(counts: &[usize]) -> Vec<Color32> {
    let max = counts.iter().copied().max().unwrap_or(0);
    let mut colors = gradient(counts.len());
    if max == 0 {
        colors.fill(Color32::GRAY);
    }
    colors
}

// ---------------------------------------------------------------------------
// Significance markers
// ---------------------------------------------------------------------------

/// Text colour for a significance marker (`***`, `**`, `*` or empty).
pub fn significance_color(marker: &str) -> Color32 {
    match marker {
        "***" => Color32::from_rgb(0x1b, 0x9e, 0x4b),
        "**" => Color32::from_rgb(0x6a, 0xb0, 0x2f),
        "*" => Color32::from_rgb(0xc9, 0x9a, 0x06),
        _ => Color32::GRAY,
    }
}
