//! Year-over-year rolling comparison built from the canonical CSV.
//!
//! For every configured station the rolling mean is taken over the station's
//! whole series, then split into the latest year in the dataset and the year
//! before it. The two years are aligned by position, not by day of year.

pub mod chart;
pub mod rolling;

use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::{ReportConfig, REPORT_FILE},
    error::{ClimateError, Result},
    reading::Measurement,
    table::CanonicalRow,
};

use rolling::rolling_mean;

#[derive(Debug, Serialize)]
pub struct Report {
    pub metadata: Metadata,
    pub locations: BTreeMap<String, LocationReport>,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub target_year: i32,
    pub prev_year: i32,
    pub locations: Vec<String>,
}

/// Year (as a string key) -> rolling series.
pub type YearSeries = BTreeMap<String, Vec<Option<f64>>>;

#[derive(Debug, Default, Serialize)]
pub struct LocationReport {
    #[serde(flatten)]
    pub series: BTreeMap<Measurement, YearSeries>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip)]
    pub label_dates: Vec<NaiveDate>,
}

impl LocationReport {
    pub fn has_data(&self) -> bool {
        self.series.values().any(|years| !years.is_empty())
    }
}

/// First word of a station name, e.g. `PERTH` for `PERTH METRO`.
pub fn short_name(location: &str) -> &str {
    location.split_whitespace().next().unwrap_or(location)
}

pub fn build_report(rows: &[CanonicalRow], config: &ReportConfig) -> Result<Report> {
    let target_year = rows
        .iter()
        .map(|row| row.date.year())
        .max()
        .ok_or_else(|| ClimateError::EmptyDataset(config.input.display().to_string()))?;
    let prev_year = target_year - 1;

    info!("Latest year in dataset: {}", target_year);
    info!("Comparing {} vs {}", prev_year, target_year);

    let by_location = group_by_location(rows);
    let mut locations = BTreeMap::new();

    for location in &config.locations {
        info!("Processing {}...", location);
        let Some(station_rows) = by_location.get(location.as_str()) else {
            warn!("No data for {}", location);
            continue;
        };

        let report = process_location(station_rows, location, target_year, prev_year, config);
        if report.has_data() {
            locations.insert(short_name(location).to_string(), report);
        }
    }

    Ok(Report {
        metadata: Metadata {
            target_year,
            prev_year,
            locations: locations.keys().cloned().collect(),
        },
        locations,
    })
}

fn group_by_location(rows: &[CanonicalRow]) -> HashMap<&str, Vec<&CanonicalRow>> {
    let mut grouped: HashMap<&str, Vec<&CanonicalRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.location.as_str()).or_default().push(row);
    }

    for station_rows in grouped.values_mut() {
        station_rows.sort_by_key(|row| row.date);
    }

    grouped
}

fn process_location(
    rows: &[&CanonicalRow],
    location: &str,
    target_year: i32,
    prev_year: i32,
    config: &ReportConfig,
) -> LocationReport {
    let mut report = LocationReport::default();

    for &measurement in &config.measurements {
        let years = report.series.entry(measurement).or_default();

        let values: Vec<Option<f64>> = rows.iter().map(|row| row.value(measurement)).collect();
        let rolled = rolling_mean(&values, config.window, config.min_periods);

        let mut target = Vec::new();
        let mut prev = Vec::new();
        let mut target_dates = Vec::new();
        for (row, value) in rows.iter().zip(rolled) {
            match row.date.year() {
                year if year == target_year => {
                    target.push(value);
                    target_dates.push(row.date);
                }
                year if year == prev_year => prev.push(value),
                _ => {}
            }
        }

        if target.is_empty() {
            warn!("No data for {} in {}", location, target_year);
            continue;
        }

        years.insert(target_year.to_string(), target);
        years.insert(prev_year.to_string(), prev);

        report.labels = target_dates
            .iter()
            .map(|date| date.format("%d-%b").to_string())
            .collect();
        report.label_dates = target_dates;
    }

    report
}

pub fn write_report_json(report: &Report, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(REPORT_FILE);

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut writer, report)?;
    writer.flush()?;

    Ok(path)
}

// -- Tests -------------------------------------------------------------------
