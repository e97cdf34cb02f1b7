//! Build the year-over-year JSON report and charts from the merged CSV.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::{
    config::ReportConfig,
    report::{build_report, chart::render_charts, write_report_json},
    table::read_canonical_csv,
};

pub fn report(config: ReportConfig) -> Result<PathBuf> {
    if !config.input.is_file() {
        bail!(
            "{} not found. Please run `collect` first.",
            config.input.display()
        );
    }

    let rows = read_canonical_csv(&config.input)
        .with_context(|| format!("reading {}", config.input.display()))?;
    let report = build_report(&rows, &config)?;

    let json_path = write_report_json(&report, &config.out_dir)
        .with_context(|| format!("writing report to {}", config.out_dir.display()))?;
    info!("Saved {}", json_path.display());

    if config.charts {
        render_charts(&report, &config.chart_dir, config.window)?;
    }

    Ok(json_path)
}

// -- Tests -------------------------------------------------------------------
