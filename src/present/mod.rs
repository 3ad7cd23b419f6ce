//! Presentation builders: GeoJSON map layers, legend, and the summary chart.

mod chart;
mod map;

pub use chart::{Bar, SummaryChart};
pub use map::{
    category_color, legend, nearest_lines, AnalysisLayers, LegendEntry, MapPresenter,
    NEAREST_COLOR,
};

/// Escape text taken from the dataset before it is placed in HTML markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Radius as a short human label, e.g. "3 km" or "750 m"
pub fn radius_label(radius_m: f64) -> String {
    if radius_m >= 1000.0 {
        let km = radius_m / 1000.0;
        if km.fract() == 0.0 {
            format!("{} km", km)
        } else {
            format!("{:.1} km", km)
        }
    } else {
        format!("{} m", radius_m.trunc())
    }
}
