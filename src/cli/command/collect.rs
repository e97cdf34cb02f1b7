//! Fetch the BOM station archive, merge every station file and save the
//! canonical CSV.

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::{
    cli::create_spinner,
    config::CollectConfig,
    deserialise::{discover_files, merge_files},
    download::{ensure_archive_present, extract_archive, RemoteArchive},
    error::ClimateError,
    table::write_canonical_csv,
};

pub async fn collect(config: CollectConfig) -> Result<PathBuf> {
    fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;

    if config.offline {
        info!("Offline: skipping remote archive check");
    } else {
        let source = RemoteArchive::from_url(&config.url)?;
        ensure_archive_present(&source, &config.archive_path, &config.work_dir)
            .await
            .with_context(|| format!("fetching {}", config.url))?;
    }

    if !config.data_dir.is_dir() {
        if !config.archive_path.is_file() {
            bail!(
                "Neither {} nor {} exist",
                config.data_dir.display(),
                config.archive_path.display()
            );
        }
        extract_archive(&config.archive_path, &config.work_dir).await?;
    }

    info!("Searching for data files...");
    let files = discover_files(&config.data_dir)
        .with_context(|| format!("searching {}", config.data_dir.display()))?;
    if files.is_empty() {
        return Err(ClimateError::NoDataFiles(config.data_dir.clone()).into());
    }
    info!("Found {} files to process.", files.len());

    info!(workers = config.workers, "Start Reading Files");
    let layout = config.layout.clone();
    let (workers, progress_step) = (config.workers, config.progress_step);
    let outcome =
        tokio::task::spawn_blocking(move || merge_files(&files, &layout, workers, progress_step))
            .await??;

    if outcome.failed_files > 0 {
        warn!("{} files could not be read and were skipped", outcome.failed_files);
    }
    if outcome.table.is_empty() {
        return Err(ClimateError::EmptyDataset(format!(
            "no rows parsed from {}",
            config.data_dir.display()
        ))
        .into());
    }

    info!("Creating CSV");
    let bar = create_spinner(format!("Writing {}...", config.output.display()));
    let rows = write_canonical_csv(&outcome.table, &config.output)
        .with_context(|| format!("writing {}", config.output.display()))?;
    bar.finish_with_message("CSV written");

    info!(
        rows,
        stations = outcome.table.station_count(),
        failed = outcome.failed_files,
        "Done"
    );

    Ok(config.output)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str = "Station Name,Date,Evapo-Rain,Rain,Pan-Rain,Max Temp,Min Temp,Max Humid,Min Humid";

    fn offline_config(work_dir: &Path) -> CollectConfig {
        let mut config = CollectConfig::in_dir(work_dir.to_path_buf());
        config.offline = true;
        config.workers = 2;
        config
    }

    #[tokio::test]
    async fn should_merge_valid_rows_and_drop_malformed_ones() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());
        fs::create_dir_all(config.data_dir.join("qld")).unwrap();
        fs::write(
            config.data_dir.join("qld/station_a.csv"),
            format!("{}\nSTATION_A,01/01/2020,0,0,0,20.5,10.2,80,40\n", HEADER),
        )
        .unwrap();
        fs::write(
            config.data_dir.join("qld/station_b.csv"),
            format!("{}\nSTATION_B,01/01/2020,0,0,20.5,10.2,80\n", HEADER),
        )
        .unwrap();

        let output = collect(config).await.unwrap();
        let text = fs::read_to_string(output).unwrap();

        assert_eq!(
            text,
            "location,date,max_temp,min_temp,max_humidity,min_humidity\n\
             STATION_A,2020-01-01,20.5,10.2,80,40\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn should_skip_unreadable_files_and_keep_the_rest() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("missing.csv"),
            config.data_dir.join("broken.csv"),
        )
        .unwrap();
        fs::write(
            config.data_dir.join("station_a.csv"),
            format!("{}\nSTATION_A,01/01/2020,0,0,0,20.5,10.2,80,40\n", HEADER),
        )
        .unwrap();

        let output = collect(config).await.unwrap();
        let text = fs::read_to_string(output).unwrap();

        assert!(text.ends_with("STATION_A,2020-01-01,20.5,10.2,80,40\n"));
    }

    #[tokio::test]
    async fn should_fail_when_no_files_found() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();

        let err = collect(config).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClimateError>(),
            Some(ClimateError::NoDataFiles(_))
        ));
    }

    #[tokio::test]
    async fn should_fail_when_nothing_parses() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();
        fs::write(config.data_dir.join("empty.csv"), format!("{}\n", HEADER)).unwrap();

        let err = collect(config).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClimateError>(),
            Some(ClimateError::EmptyDataset(_))
        ));
    }

    #[tokio::test]
    async fn should_fail_offline_without_archive_or_data() {
        let dir = TempDir::new().unwrap();
        let result = collect(offline_config(dir.path())).await;

        assert!(result.is_err());
    }
}
