//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Args, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::{
    config::{self, CollectConfig, ReportConfig},
    reading::Measurement,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the station archive and merge it into one CSV
    Collect(CollectArgs),
    /// Build the year-over-year JSON report and charts from the merged CSV
    Report(ReportArgs),
    /// Collect, then report, with default settings
    All {},
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Archive location (ftp, http or https)
    #[arg(long, default_value = config::BOM_URL)]
    pub url: String,

    /// Directory the archive is kept and unpacked in
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Local archive path [default: <work-dir>/IDCKWCDEA0.tgz]
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Directory searched for station files [default: <work-dir>/tables]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Merged CSV path [default: <work-dir>/temp_all.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Parser threads
    #[arg(long, default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Log progress every N files
    #[arg(long, default_value_t = config::PROGRESS_STEP)]
    pub progress_step: usize,

    /// Use the archive already on disk without contacting the remote
    #[arg(long)]
    pub offline: bool,
}

impl CollectArgs {
    pub fn into_config(self) -> CollectConfig {
        let mut config = CollectConfig::in_dir(self.work_dir);
        config.url = self.url;
        config.workers = self.workers;
        config.progress_step = self.progress_step;
        config.offline = self.offline;

        if let Some(archive) = self.archive {
            config.archive_path = archive;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(output) = self.output {
            config.output = output;
        }

        config
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Merged CSV produced by `collect`
    #[arg(short, long, default_value = config::CANONICAL_CSV)]
    pub input: PathBuf,

    /// Directory for data.json
    #[arg(long, default_value = config::REPORT_DIR)]
    pub out_dir: PathBuf,

    /// Directory for PNG charts
    #[arg(long, default_value = config::CHART_DIR)]
    pub chart_dir: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Rolling window in days
    #[arg(long, default_value_t = config::ROLLING_WINDOW)]
    pub window: usize,

    /// Minimum samples in a window for a value
    #[arg(long, default_value_t = config::MIN_PERIODS)]
    pub min_periods: usize,

    /// Station to report on (repeatable) [default: built-in capital city list]
    #[arg(short, long = "location")]
    pub locations: Vec<String>,

    /// Measurement to report on (repeatable) [default: max_temp, max_humidity]
    #[arg(short, long = "measurement", value_enum)]
    pub measurements: Vec<Measurement>,
}

impl ReportArgs {
    pub fn into_config(self) -> ReportConfig {
        let defaults = ReportConfig::default();

        ReportConfig {
            input: self.input,
            out_dir: self.out_dir,
            chart_dir: self.chart_dir,
            charts: !self.no_charts,
            window: self.window,
            min_periods: self.min_periods,
            locations: if self.locations.is_empty() {
                defaults.locations
            } else {
                self.locations
            },
            measurements: if self.measurements.is_empty() {
                defaults.measurements
            } else {
                self.measurements
            },
        }
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
