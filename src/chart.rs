//! Bar chart of per-tag totals, written as a standalone SVG document.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::aggregate::TagTotals;

pub const DEFAULT_TITLE: &str = "GPU Signal Tracker — Weighted tag counts (last 7 days)";

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 130.0;

/// Render `totals` as an SVG bar chart. An empty input still yields a valid
/// document with axes and title.
pub fn render_bar_chart_svg(totals: &TagTotals<f64>, title: &str) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let max = totals.iter().map(|(_, v)| v).fold(0.0_f64, f64::max);
    let scale_max = if max > 0.0 { max } else { 1.0 };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="28" text-anchor="middle" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );

    // axes
    let x0 = MARGIN_LEFT;
    let y0 = MARGIN_TOP + plot_h;
    let _ = writeln!(
        svg,
        r#"<line x1="{x0}" y1="{MARGIN_TOP}" x2="{x0}" y2="{y0}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{x0}" y1="{y0}" x2="{}" y2="{y0}" stroke="black"/>"#,
        x0 + plot_w
    );

    // y ticks
    for i in 0..=4 {
        let v = scale_max * f64::from(i) / 4.0;
        let y = y0 - plot_h * f64::from(i) / 4.0;
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            x0 - 6.0,
            y + 4.0,
            format_value(v)
        );
    }

    let n = totals.len().max(1) as f64;
    let slot = plot_w / n;
    let bar_w = slot * 0.7;
    for (i, (tag, value)) in totals.iter().enumerate() {
        let h = plot_h * value / scale_max;
        let x = x0 + slot * i as f64 + (slot - bar_w) / 2.0;
        let y = y0 - h;
        let cx = x + bar_w / 2.0;
        let _ = writeln!(
            svg,
            r##"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{h:.1}" fill="#1f77b4"><title>{}: {}</title></rect>"##,
            escape(tag.as_str()),
            format_value(value)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{:.1}" text-anchor="end" font-size="11" transform="rotate(-45 {cx:.1} {:.1})">{}</text>"#,
            y0 + 14.0,
            y0 + 14.0,
            escape(tag.as_str())
        );
    }

    // axis labels
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13">Tag</text>"#,
        x0 + plot_w / 2.0,
        HEIGHT - 12.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{}" text-anchor="middle" font-size="13" transform="rotate(-90 16 {})">Weighted articles</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );
    svg.push_str("</svg>\n");
    svg
}

pub fn write_bar_chart(path: &Path, totals: &TagTotals<f64>, title: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, render_bar_chart_svg(totals, title))
        .with_context(|| format!("writing chart {}", path.display()))
}

fn format_value(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.2}")
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
