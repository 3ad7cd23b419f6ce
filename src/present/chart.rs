//! Bar chart of facility types inside the catchment, rendered as SVG.

use serde::Serialize;
use std::fmt::Write;

use super::{category_color, radius_label};
use crate::analysis::CategoryCounts;
use crate::models::Category;

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 48.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub category: Category,
    pub count: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryChart {
    pub title: String,
    pub y_label: String,
    /// Descending by count; equal counts keep category order
    pub bars: Vec<Bar>,
}

/// Tick spacing giving at most ~6 integer ticks
fn tick_step(max: usize) -> usize {
    let mut step = 1;
    while max / step > 6 {
        step = match step.to_string().chars().next() {
            Some('1') => step * 2,
            Some('2') => step / 2 * 5,
            _ => step * 2,
        };
    }
    step
}

impl SummaryChart {
    /// `None` when nothing lies inside the radius
    pub fn from_counts(counts: &CategoryCounts, radius_m: f64) -> Option<Self> {
        let mut bars: Vec<Bar> = counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&category, &count)| Bar {
                category,
                count,
                color: category_color(category),
            })
            .collect();

        if bars.is_empty() {
            return None;
        }
        bars.sort_by(|a, b| b.count.cmp(&a.count));

        Some(Self {
            title: format!("Facility types within {}", radius_label(radius_m)),
            y_label: "Count".to_string(),
            bars,
        })
    }

    pub fn total(&self) -> usize {
        self.bars.iter().map(|b| b.count).sum()
    }

    pub fn render_svg(&self) -> String {
        let max = self.bars.iter().map(|b| b.count).max().unwrap_or(1).max(1);
        let step = tick_step(max);
        let top = max.div_ceil(step) * step;

        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let base_y = MARGIN_TOP + plot_h;
        let slot = plot_w / self.bars.len() as f64;
        let bar_w = slot * 0.6;

        let mut svg = String::new();
        // Writing to a String cannot fail
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = WIDTH,
            h = HEIGHT
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="22" text-anchor="middle" font-size="15" font-weight="bold">{}</text>"#,
            WIDTH / 2.0,
            self.title
        );

        // Y axis with ticks
        let _ = write!(
            svg,
            r##"<line x1="{x}" y1="{t}" x2="{x}" y2="{b}" stroke="#333"/>"##,
            x = MARGIN_LEFT,
            t = MARGIN_TOP,
            b = base_y
        );
        for tick in (0..=top).step_by(step) {
            let y = base_y - plot_h * tick as f64 / top as f64;
            let _ = write!(
                svg,
                r##"<line x1="{x0}" y1="{y}" x2="{x1}" y2="{y}" stroke="#ddd"/><text x="{tx}" y="{ty}" text-anchor="end">{tick}</text>"##,
                x0 = MARGIN_LEFT,
                x1 = WIDTH - MARGIN_RIGHT,
                y = y,
                tx = MARGIN_LEFT - 6.0,
                ty = y + 4.0,
                tick = tick
            );
        }
        let _ = write!(
            svg,
            r#"<text x="16" y="{y}" text-anchor="middle" transform="rotate(-90 16 {y})">{label}</text>"#,
            y = MARGIN_TOP + plot_h / 2.0,
            label = self.y_label
        );

        for (i, bar) in self.bars.iter().enumerate() {
            let h = plot_h * bar.count as f64 / top as f64;
            let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_w) / 2.0;
            let _ = write!(
                svg,
                r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}"><title>{cat}: {n}</title></rect><text x="{cx:.1}" y="{ly:.1}" text-anchor="middle">{cat}</text>"#,
                x = x,
                y = base_y - h,
                w = bar_w,
                h = h,
                fill = bar.color,
                cat = bar.category,
                n = bar.count,
                cx = x + bar_w / 2.0,
                ly = base_y + 18.0
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_counts_have_no_chart() {
        assert!(SummaryChart::from_counts(&CategoryCounts::new(), 3000.0).is_none());
    }

    #[test]
    fn test_bars_sorted_by_count() {
        let mut counts = CategoryCounts::new();
        counts.insert(Category::Hospital, 2);
        counts.insert(Category::Clinic, 5);
        counts.insert(Category::Unknown, 2);

        let chart = SummaryChart::from_counts(&counts, 3000.0).unwrap();
        assert_eq!(chart.title, "Facility types within 3 km");
        assert_eq!(chart.total(), 9);

        let order: Vec<Category> = chart.bars.iter().map(|b| b.category).collect();
        assert_eq!(
            order,
            vec![Category::Clinic, Category::Hospital, Category::Unknown]
        );
        assert_eq!(chart.bars[0].color, "green");
    }

    #[test]
    fn test_render_svg() {
        let mut counts = CategoryCounts::new();
        counts.insert(Category::Hospital, 1);
        counts.insert(Category::Doctors, 3);

        let svg = SummaryChart::from_counts(&counts, 3000.0)
            .unwrap()
            .render_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains(r#"fill="orange""#));
        assert!(svg.contains("Facility types within 3 km"));
    }

    #[test]
    fn test_tick_step() {
        assert_eq!(tick_step(3), 1);
        assert_eq!(tick_step(12), 2);
        assert_eq!(tick_step(30), 5);
        assert_eq!(tick_step(120), 20);
    }
}
