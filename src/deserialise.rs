//! Discovers station files and merges them into one table on a worker pool.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
};

use chrono::NaiveDate;
use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::{
    config::CsvLayout,
    error::Result,
    reading::{parse_file, Measurements, StationRecord},
};

#[derive(Debug, Clone, PartialEq)]
struct RankedValues {
    rank: usize,
    values: Measurements,
}

/// Station name -> date -> measurements.
///
/// Every value remembers the rank of the file it came from. On a duplicate
/// `(station, date)` the value from the higher (or equal) rank replaces the
/// stored one whole, so a tuple is never a mix of two rows.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergedTable {
    stations: BTreeMap<String, BTreeMap<NaiveDate, RankedValues>>,
}

impl MergedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rank: usize, record: StationRecord) {
        let dates = self.stations.entry(record.station).or_default();
        let incoming = RankedValues {
            rank,
            values: record.values,
        };

        match dates.entry(record.date) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                if rank >= slot.get().rank {
                    slot.insert(incoming);
                }
            }
        }
    }

    pub fn merge_batch(&mut self, rank: usize, records: Vec<StationRecord>) {
        for record in records {
            self.insert(rank, record);
        }
    }

    #[cfg(test)]
    pub fn get(&self, station: &str, date: NaiveDate) -> Option<&Measurements> {
        self.stations
            .get(station)
            .and_then(|dates| dates.get(&date))
            .map(|ranked| &ranked.values)
    }

    /// Rows ordered by station name, then date.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NaiveDate, &Measurements)> + '_ {
        self.stations.iter().flat_map(|(station, dates)| {
            dates
                .iter()
                .map(move |(date, ranked)| (station.as_str(), *date, &ranked.values))
        })
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn row_count(&self) -> usize {
        self.stations.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub table: MergedTable,
    pub failed_files: usize,
}

/// Recursively finds `*.csv` files under `data_dir`, sorted by path. The
/// position of a file in this list is its merge rank. Symlinked directories
/// are not descended into.
pub fn discover_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![data_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Parses `files` on a pool of `workers` threads and merges every batch into
/// one table.
///
/// Each worker parses into its own batch and only takes the table lock to
/// merge that batch. Files that fail to parse are logged and counted.
pub fn merge_files(
    files: &[PathBuf],
    layout: &CsvLayout,
    workers: usize,
    progress_step: usize,
) -> Result<MergeOutcome> {
    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;

    let table = Mutex::new(MergedTable::new());
    let completed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let total = files.len();

    pool.install(|| {
        files.par_iter().enumerate().for_each(|(rank, path)| {
            match parse_file(path, layout) {
                Ok(records) if records.is_empty() => {
                    debug!("No usable rows in {}", path.display());
                }
                Ok(records) => {
                    let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
                    table.merge_batch(rank, records);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if progress_step > 0 && done % progress_step == 0 {
                info!(
                    "Processed {}/{} files ({:.2}%)",
                    done,
                    total,
                    done as f64 / total as f64 * 100.0
                );
            }
        });
    });

    Ok(MergeOutcome {
        table: table.into_inner().unwrap_or_else(PoisonError::into_inner),
        failed_files: failed.into_inner(),
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const HEADER: &str = "Station Name,Date,Evapo-Rain,Rain,Pan-Rain,Max Temp,Min Temp,Max Humid,Min Humid";

    fn write_station_file(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let body = rows.join("\n");
        fs::write(&path, format!("{}\n{}\n", HEADER, body)).unwrap();
        path
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn values(v: [&str; 4]) -> Measurements {
        v.map(str::to_string)
    }

    #[test]
    fn should_discover_nested_csv_files_only() {
        let dir = TempDir::new().unwrap();
        write_station_file(dir.path(), "qld/brisbane.csv", &[]);
        write_station_file(dir.path(), "nsw/sydney/observatory.csv", &[]);
        fs::write(dir.path().join("readme.txt"), "not data").unwrap();
        fs::write(dir.path().join("qld/notes.CSV.bak"), "not data").unwrap();

        let files = discover_files(dir.path()).unwrap();

        assert_eq!(
            files,
            vec![
                dir.path().join("nsw/sydney/observatory.csv"),
                dir.path().join("qld/brisbane.csv"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn should_not_follow_directory_symlinks() {
        let dir = TempDir::new().unwrap();
        write_station_file(dir.path(), "qld/brisbane.csv", &[]);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("qld/loop")).unwrap();

        let files = discover_files(dir.path()).unwrap();

        assert_eq!(files, vec![dir.path().join("qld/brisbane.csv")]);
    }

    #[test]
    fn should_fail_discovery_for_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover_files(&dir.path().join("tables")).is_err());
    }

    #[test]
    fn should_merge_files_from_several_stations() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write_station_file(
                dir.path(),
                "a.csv",
                &[
                    "STATION_A,01/01/2020,,,,20.5,10.2,80,40",
                    "STATION_A,02/01/2020,,,,21.0,11.0,75,35",
                ],
            ),
            write_station_file(dir.path(), "b.csv", &["STATION_B,01/01/2020,,,,30.0, ,60,"]),
        ];

        let outcome = merge_files(&files, &CsvLayout::default(), 2, 1).unwrap();

        assert_eq!(outcome.failed_files, 0);
        assert_eq!(outcome.table.station_count(), 2);
        assert_eq!(outcome.table.row_count(), 3);
        assert_eq!(
            outcome.table.get("STATION_B", date(2020, 1, 1)),
            Some(&values(["30.0", "", "60", ""]))
        );
    }

    #[test]
    fn should_produce_identical_tables_across_runs() {
        let dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = (0..24)
            .map(|i| {
                let row = format!("STATION_{},01/01/2020,,,,{}.0,1.0,50,20", i, i);
                write_station_file(dir.path(), &format!("s{:02}.csv", i), &[row.as_str()])
            })
            .collect();

        let first = merge_files(&files, &CsvLayout::default(), 4, 100).unwrap();
        let second = merge_files(&files, &CsvLayout::default(), 3, 100).unwrap();

        assert_eq!(first.table.row_count(), 24);
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn should_keep_one_whole_tuple_for_duplicate_keys() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write_station_file(dir.path(), "a.csv", &["STATION_A,01/01/2020,,,,20.5,10.2,80,40"]),
            write_station_file(dir.path(), "b.csv", &["STATION_A,01/01/2020,,,,25.0, ,90,"]),
        ];

        for _ in 0..10 {
            let outcome = merge_files(&files, &CsvLayout::default(), 2, 100).unwrap();

            assert_eq!(outcome.table.row_count(), 1);
            assert_eq!(
                outcome.table.get("STATION_A", date(2020, 1, 1)),
                Some(&values(["25.0", "", "90", ""]))
            );
        }
    }

    #[test]
    fn should_not_let_lower_rank_overwrite() {
        let mut table = MergedTable::new();
        let record = |v: &str| StationRecord {
            station: "STATION_A".to_string(),
            date: date(2020, 1, 1),
            values: values([v, v, v, v]),
        };

        table.insert(3, record("late"));
        table.insert(1, record("early"));
        assert_eq!(table.get("STATION_A", date(2020, 1, 1)), Some(&values(["late"; 4])));

        table.insert(3, record("same-file"));
        assert_eq!(
            table.get("STATION_A", date(2020, 1, 1)),
            Some(&values(["same-file"; 4]))
        );
    }

    #[test]
    fn should_count_failed_files_without_aborting() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write_station_file(dir.path(), "a.csv", &["STATION_A,01/01/2020,,,,20.5,10.2,80,40"]),
            dir.path().join("vanished.csv"),
        ];

        let outcome = merge_files(&files, &CsvLayout::default(), 2, 1).unwrap();

        assert_eq!(outcome.failed_files, 1);
        assert_eq!(outcome.table.row_count(), 1);
    }

    #[test]
    fn should_iterate_by_station_then_date() {
        let mut table = MergedTable::new();
        for (station, day) in [("B", 2), ("A", 3), ("B", 1), ("A", 1)] {
            table.insert(
                0,
                StationRecord {
                    station: station.to_string(),
                    date: date(2020, 1, day),
                    values: values(["1", "2", "3", "4"]),
                },
            );
        }

        let keys: Vec<(&str, NaiveDate)> = table.iter().map(|(s, d, _)| (s, d)).collect();
        assert_eq!(
            keys,
            vec![
                ("A", date(2020, 1, 1)),
                ("A", date(2020, 1, 3)),
                ("B", date(2020, 1, 1)),
                ("B", date(2020, 1, 2)),
            ]
        );
    }
}
