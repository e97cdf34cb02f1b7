//! Run configuration for the collect and report stages.

use std::path::PathBuf;

use crate::reading::Measurement;

pub const BOM_URL: &str = "ftp://ftp.bom.gov.au/anon/gen/clim_data/IDCKWCDEA0.tgz";
pub const ARCHIVE_NAME: &str = "IDCKWCDEA0.tgz";
pub const DATA_DIR: &str = "tables";
pub const CANONICAL_CSV: &str = "temp_all.csv";

pub const MIN_ROW_LEN: usize = 9;
pub const PROGRESS_STEP: usize = 100;

pub const ROLLING_WINDOW: usize = 14;
pub const MIN_PERIODS: usize = 1;
pub const REPORT_DIR: &str = "public";
pub const REPORT_FILE: &str = "data.json";
pub const CHART_DIR: &str = "charts";

pub const LOCATIONS: [&str; 16] = [
    "NAMBOUR DAFF - HILLSIDE",
    "SYDNEY (OBSERVATORY HILL)",
    "BRISBANE",
    "CANBERRA AIRPORT",
    "DARWIN AIRPORT",
    "ADELAIDE (WEST TERRACE _ NGAYIRDAPIRA)",
    "HOBART AIRPORT",
    "MELBOURNE (OLYMPIC PARK)",
    "PERTH METRO",
    "ALICE SPRINGS AIRPORT",
    "CAIRNS AIRPORT",
    "TOWNSVILLE AERO",
    "BROOME AIRPORT",
    "GOLD COAST SEAWAY",
    "NEWCASTLE NOBBYS SIGNAL STATION AWS",
    "PORT HEDLAND AIRPORT",
];

/// Column layout of a station file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub min_row_len: usize,
    pub station_col: usize,
    pub date_col: usize,
    /// Index of `max_temp`; the other three measurements follow it.
    pub first_value_col: usize,
    pub date_format: &'static str,
}

impl Default for CsvLayout {
    fn default() -> Self {
        CsvLayout {
            min_row_len: MIN_ROW_LEN,
            station_col: 0,
            date_col: 1,
            first_value_col: 5,
            date_format: "%d/%m/%Y",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub url: String,
    pub archive_path: PathBuf,
    pub work_dir: PathBuf,
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub workers: usize,
    pub progress_step: usize,
    /// Never contact the remote; use whatever is already on disk.
    pub offline: bool,
    pub layout: CsvLayout,
}

impl CollectConfig {
    pub fn in_dir(work_dir: PathBuf) -> Self {
        CollectConfig {
            url: BOM_URL.to_string(),
            archive_path: work_dir.join(ARCHIVE_NAME),
            data_dir: work_dir.join(DATA_DIR),
            output: work_dir.join(CANONICAL_CSV),
            work_dir,
            workers: num_cpus::get(),
            progress_step: PROGRESS_STEP,
            offline: false,
            layout: CsvLayout::default(),
        }
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        CollectConfig::in_dir(PathBuf::from("."))
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub chart_dir: PathBuf,
    pub charts: bool,
    pub window: usize,
    pub min_periods: usize,
    pub locations: Vec<String>,
    pub measurements: Vec<Measurement>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            input: PathBuf::from(CANONICAL_CSV),
            out_dir: PathBuf::from(REPORT_DIR),
            chart_dir: PathBuf::from(CHART_DIR),
            charts: true,
            window: ROLLING_WINDOW,
            min_periods: MIN_PERIODS,
            locations: LOCATIONS.iter().map(|l| l.to_string()).collect(),
            measurements: vec![Measurement::MaxTemp, Measurement::MaxHumidity],
        }
    }
}

// -- Tests -------------------------------------------------------------------
