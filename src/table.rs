//! Reads and writes the canonical all-stations CSV.

use std::{
    fs::{self, File},
    path::Path,
};

use chrono::NaiveDate;
use csv::Writer;
use serde::Deserialize;

use crate::{
    deserialise::MergedTable,
    error::Result,
    reading::Measurement,
};

pub const HEADER: [&str; 6] = [
    "location",
    "date",
    "max_temp",
    "min_temp",
    "max_humidity",
    "min_humidity",
];

/// Writes one row per station and date, after the fixed header. Returns the
/// number of data rows written.
pub fn write_canonical_csv(table: &MergedTable, out_path: &Path) -> Result<usize> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(out_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(HEADER)?;

    let mut rows = 0;
    for (station, date, values) in table.iter() {
        let date = date.format("%Y-%m-%d").to_string();
        let mut record = vec![station, date.as_str()];
        record.extend(Measurement::ALL.iter().map(|m| values[m.index()].as_str()));
        writer.write_record(&record)?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

/// A canonical CSV row with its measurements read as numbers. Blank or
/// non-numeric values become `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CanonicalRow {
    pub location: String,
    pub date: NaiveDate,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub max_temp: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub min_temp: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub max_humidity: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub min_humidity: Option<f64>,
}

impl CanonicalRow {
    pub fn value(&self, measurement: Measurement) -> Option<f64> {
        match measurement {
            Measurement::MaxTemp => self.max_temp,
            Measurement::MinTemp => self.min_temp,
            Measurement::MaxHumidity => self.max_humidity,
            Measurement::MinHumidity => self.min_humidity,
        }
    }
}

pub fn read_canonical_csv(path: &Path) -> Result<Vec<CanonicalRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for row in reader.deserialize::<CanonicalRow>() {
        rows.push(row?);
    }

    Ok(rows)
}

// -- Tests -------------------------------------------------------------------
