//! PNG line charts of the year-over-year comparison.

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use tracing::{info, warn};

use crate::{error::Result, reading::Measurement};

use super::{Report, YearSeries};

/// Renders `{short_name}_{measurement}.png` for every series in the report.
/// A chart that fails to render is logged and skipped.
pub fn render_charts(report: &Report, chart_dir: &Path, window: usize) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(chart_dir)?;

    let target_year = report.metadata.target_year.to_string();
    let prev_year = report.metadata.prev_year.to_string();
    let mut written = Vec::new();

    for (short_name, location) in &report.locations {
        for (measurement, years) in &location.series {
            let Some(lines) = year_lines(years, &prev_year, &target_year) else {
                continue;
            };

            let path = chart_dir.join(format!("{}_{}.png", short_name, measurement.as_str()));
            let title = format!(
                "{} {} ({}-day rolling mean)",
                short_name,
                measurement.as_str(),
                window
            );

            match draw_comparison(&path, &title, *measurement, &location.label_dates, lines) {
                Ok(()) => written.push(path),
                Err(e) => warn!("Could not render {}: {}", path.display(), e),
            }
        }
    }

    info!("Saved {} charts to {}", written.len(), chart_dir.display());
    Ok(written)
}

type Line<'a> = (&'a str, &'a [Option<f64>], RGBColor);

fn year_lines<'a>(
    years: &'a YearSeries,
    prev_year: &'a str,
    target_year: &'a str,
) -> Option<[Line<'a>; 2]> {
    let target = years.get(target_year)?;
    let prev = years.get(prev_year)?;

    Some([
        (prev_year, prev.as_slice(), BLUE),
        (target_year, target.as_slice(), RED),
    ])
}

fn draw_comparison(
    path: &Path,
    title: &str,
    measurement: Measurement,
    dates: &[NaiveDate],
    lines: [Line<'_>; 2],
) -> std::result::Result<(), Box<dyn Error>> {
    let (min, max) = lines
        .iter()
        .flat_map(|(_, values, _)| values.iter().flatten())
        .fold(None, |range: Option<(f64, f64)>, &v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or("no values to plot")?;
    let padding = if (max - min).abs() > 1e-6 {
        (max - min) * 0.1
    } else {
        1.0
    };
    let len = lines
        .iter()
        .map(|(_, values, _)| values.len())
        .chain([dates.len()])
        .max()
        .unwrap_or(0)
        .max(1);

    let root = BitMapBackend::new(path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..len, (min - padding)..(max + padding))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(len)
        .x_label_formatter(&|idx: &usize| tick_label(dates, *idx))
        .y_desc(measurement.unit())
        .light_line_style(BLACK.mix(0.15))
        .draw()?;

    for (year, values, colour) in lines {
        let mut labelled = false;
        for segment in segments(values) {
            let series = chart.draw_series(LineSeries::new(segment, colour.stroke_width(2)))?;
            if !labelled {
                series.label(year).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], colour.stroke_width(2))
                });
                labelled = true;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;

    Ok(())
}

/// Tick text for sample `idx`: only the 1st and 15th of each month are labelled.
fn tick_label(dates: &[NaiveDate], idx: usize) -> String {
    dates
        .get(idx)
        .filter(|date| date.day() == 1 || date.day() == 15)
        .map(|date| date.format("%d-%b").to_string())
        .unwrap_or_default()
}

/// Splits a series with gaps into runs of `(position, value)` points.
fn segments(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (idx, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((idx, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

// -- Tests -------------------------------------------------------------------
