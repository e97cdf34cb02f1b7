pub mod collect;
pub mod report;

use std::path::PathBuf;

use anyhow::Result;

pub use collect::collect;
pub use report::report;

use crate::config::{CollectConfig, ReportConfig};

/// Runs `collect` and feeds its CSV into `report`.
pub async fn all(collect_config: CollectConfig, mut report_config: ReportConfig) -> Result<PathBuf> {
    let csv_path = collect(collect_config).await?;
    report_config.input = csv_path;

    report(report_config)
}
