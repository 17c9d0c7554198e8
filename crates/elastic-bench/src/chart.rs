//! Insertion vs. deletion comparison chart.
//!
//! Renders two bars (mean add, mean remove latency) with value labels and
//! an annotated slowdown factor to an SVG file.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use plotters::prelude::*;
use tracing::info;

const INSERT_COLOR: RGBColor = RGBColor(0x2c, 0xa0, 0x2c);
const DELETE_COLOR: RGBColor = RGBColor(0xd6, 0x27, 0x28);
const BAR_HALF_WIDTH: f64 = 0.25;

/// Values and labels for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub add_ms: f64,
    pub remove_ms: f64,
}

impl ChartSpec {
    pub fn new(add_ms: f64, remove_ms: f64) -> Result<Self> {
        if !(add_ms.is_finite() && add_ms > 0.0) {
            bail!("add latency must be a positive number, got {add_ms}");
        }
        if !(remove_ms.is_finite() && remove_ms >= 0.0) {
            bail!("remove latency must be a non-negative number, got {remove_ms}");
        }
        Ok(Self { add_ms, remove_ms })
    }

    pub fn slowdown(&self) -> f64 {
        self.remove_ms / self.add_ms
    }

    /// Headroom above the taller bar for the labels.
    pub fn y_max(&self) -> f64 {
        self.add_ms.max(self.remove_ms) * 1.3
    }

    pub fn annotation(&self) -> String {
        format!("{:.1}x Slower!", self.slowdown())
    }

    pub fn bars(&self) -> [(&'static str, f64, RGBColor); 2] {
        [
            ("Insertion", self.add_ms, INSERT_COLOR),
            ("Deletion", self.remove_ms, DELETE_COLOR),
        ]
    }
}

fn category_label(x: f64) -> &'static str {
    if x.abs() < 0.25 {
        "Insertion"
    } else if (x - 1.0).abs() < 0.25 {
        "Deletion"
    } else {
        ""
    }
}

/// Render `spec` to `path` as SVG, creating the parent directory if absent.
pub fn render_comparison(spec: &ChartSpec, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let root = SVGBackend::new(path, (500, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = spec.y_max();

    let mut chart = ChartBuilder::on(&root)
        .caption("The High Cost of Deletion", ("serif", 22).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..1.5f64, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(5)
        .y_desc("Latency (ms)  [Lower is Better]")
        .x_label_formatter(&|x| category_label(*x).to_string())
        .label_style(("serif", 14))
        .draw()?;

    for (i, (_, value, color)) in spec.bars().into_iter().enumerate() {
        let x = i as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, value)],
            color.mix(0.8).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, value)],
            BLACK.stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{value:.1} ms"),
            (x - 0.12, value + y_max * 0.02),
            ("serif", 12).into_font().color(&BLACK),
        )))?;
    }

    chart.draw_series(std::iter::once(Text::new(
        spec.annotation(),
        (1.0 - 0.2, spec.remove_ms + y_max * 0.09),
        ("serif", 16)
            .into_font()
            .style(FontStyle::Bold)
            .color(&DELETE_COLOR),
    )))?;

    root.present()
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;
    info!(path = ?path, slowdown = spec.slowdown(), "Chart saved");
    Ok(())
}
