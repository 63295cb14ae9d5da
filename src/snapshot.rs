#![cfg(feature = "web")]
//! Static SVG snapshots of the line charts
//!
//! Drawn server-side with plotters so a chart can be saved as an image
//! without the browser. Only the non-animated line charts have snapshots.

use crate::shaping::{ContinentTotal, IndexedTrend, TrendPoint};
use crate::theme;
use plotters::prelude::*;
use std::collections::BTreeMap;

/// Configuration options for snapshot generation
#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    /// Title displayed at the top of the image
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            x_label: "Year".to_string(),
            y_label: "Defense Spending (millions USD)".to_string(),
            width: 900,
            height: 500,
        }
    }
}

/// One named line of `(year, value)` points
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(i32, f64)>,
}

fn group_series<'a>(points: impl Iterator<Item = (&'a str, i32, Option<f64>)>) -> Vec<Series> {
    let mut grouped: BTreeMap<&str, Vec<(i32, f64)>> = BTreeMap::new();
    for (name, year, value) in points {
        let line = grouped.entry(name).or_default();
        if let Some(value) = value {
            line.push((year, value));
        }
    }
    grouped
        .into_iter()
        .filter(|(_, points)| !points.is_empty())
        .map(|(name, points)| Series {
            name: name.to_string(),
            points,
        })
        .collect()
}

/// One line per continent
pub fn continental_series(totals: &[ContinentTotal]) -> Vec<Series> {
    group_series(
        totals
            .iter()
            .map(|t| (t.continent.as_str(), t.year, Some(t.total))),
    )
}

/// One line per country; years without a value are skipped
pub fn country_series(points: &[TrendPoint]) -> Vec<Series> {
    group_series(
        points
            .iter()
            .map(|p| (p.country.as_str(), p.year, p.defense_usd)),
    )
}

/// The computable indexed lines of a trend
pub fn indexed_series(trend: &IndexedTrend) -> Vec<Series> {
    let mut series = Vec::new();
    if trend.defense_computable() {
        series.push(Series {
            name: "Defense (Base 100)".to_string(),
            points: trend
                .points
                .iter()
                .filter_map(|p| Some((p.year, p.defense_index?)))
                .collect(),
        });
    }
    if trend.gdp_computable() {
        series.push(Series {
            name: "GDP (Base 100)".to_string(),
            points: trend
                .points
                .iter()
                .filter_map(|p| Some((p.year, p.gdp_index?)))
                .collect(),
        });
    }
    series
}

fn color(hex: &str) -> RGBColor {
    let (r, g, b) = theme::rgb(hex);
    RGBColor(r, g, b)
}

/// Renders a multi-line chart as an SVG document
///
/// Uses the dashboard's dark theme and palette; series colours match the
/// interactive charts. Axes are scaled to the data, padded so a single point
/// still gets a visible range.
///
/// # Errors
/// * Returns an error if there is nothing to draw
/// * Returns an error if plotters fails to draw
pub fn render_line_chart(
    series: &[Series],
    options: &SnapshotOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let all = series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (i32::MAX, i32::MIN, f64::MAX, f64::MIN);
    for &(x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if x_min > x_max {
        return Err("no data points to draw".into());
    }
    let y_min = y_min.min(0.0);
    let y_pad = ((y_max - y_min) * 0.05).max(1.0);

    let background = color(theme::BACKGROUND);
    let foreground = color(theme::FOREGROUND);
    let grid = color(theme::GRID);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&background)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                &options.title,
                ("sans-serif", 22).into_font().color(&color(theme::ACCENT)),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min.saturating_sub(1)..x_max.saturating_add(1), y_min..y_max + y_pad)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .axis_style(grid)
            .label_style(("sans-serif", 12).into_font().color(&foreground))
            .axis_desc_style(("sans-serif", 13).into_font().color(&foreground))
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .y_label_formatter(&|v| format!("{:.0}", v))
            .draw()?;

        for (i, line) in series.iter().enumerate() {
            let stroke = color(theme::series_color(i));
            chart
                .draw_series(LineSeries::new(line.points.iter().copied(), stroke.stroke_width(2)))?
                .label(&line.name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));
            chart.draw_series(
                line.points
                    .iter()
                    .map(|&point| Circle::new(point, 3, stroke.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(background.mix(0.8))
            .border_style(grid)
            .label_font(("sans-serif", 12).into_font().color(&foreground))
            .draw()?;

        root.present()?;
    }

    Ok(svg)
}
