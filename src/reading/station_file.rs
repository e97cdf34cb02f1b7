//! Parses one BOM station CSV file into daily records.
//!
//! Station files carry a header row followed by one row per day:
//!
//! ```text
//! Station Name,Date,Evapo-Rain,Rain,Pan-Rain,Max Temp,Min Temp,Max Humid,Min Humid,...
//! BRISBANE,01/01/2020,4.2,0,,30.1,21.7,84,52,...
//! ```
//!
//! Source files are not consistently encoded, so decoding is best-effort and
//! never fails: stray bytes end up as data instead of rejecting the file.

use std::{borrow::Cow, fs, io::Read, path::Path};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::{config::CsvLayout, error::Result};

use super::StationRecord;

/// Reads and parses a station file. Malformed rows are dropped; only I/O and
/// CSV structure failures are reported as errors.
pub fn parse_file(path: &Path, layout: &CsvLayout) -> Result<Vec<StationRecord>> {
    let bytes = fs::read(path)?;
    let text = decode_permissive(&bytes);

    parse_records(text.as_bytes(), layout)
}

/// Decodes as UTF-8 when the bytes are valid, otherwise as Windows-1252,
/// which maps every byte to a character.
pub fn decode_permissive(bytes: &[u8]) -> Cow<'_, str> {
    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text,
        None => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

pub fn parse_records<R: Read>(reader: R, layout: &CsvLayout) -> Result<Vec<StationRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in reader.records() {
        if let Some(record) = parse_row(&row?, layout) {
            records.push(record);
        }
    }

    Ok(records)
}

fn parse_row(row: &StringRecord, layout: &CsvLayout) -> Option<StationRecord> {
    if row.len() < layout.min_row_len {
        return None;
    }

    let field = row.get(layout.date_col)?;
    if !is_day_month_year(field) {
        return None;
    }
    let date = NaiveDate::parse_from_str(field, layout.date_format).ok()?;
    let station = row.get(layout.station_col)?.to_string();
    let values = [0, 1, 2, 3].map(|offset| {
        normalise_blank(row.get(layout.first_value_col + offset).unwrap_or_default())
    });

    Some(StationRecord {
        station,
        date,
        values,
    })
}

/// `dd/mm/yyyy` with one- or two-digit day and month and a four-digit year.
/// chrono alone accepts short years and leading whitespace.
fn is_day_month_year(field: &str) -> bool {
    let parts: Vec<&str> = field.split('/').collect();
    let [day, month, year] = parts[..] else {
        return false;
    };

    let digits = |part: &str, max_len: usize| {
        !part.is_empty() && part.len() <= max_len && part.bytes().all(|b| b.is_ascii_digit())
    };
    digits(day, 2) && digits(month, 2) && year.len() == 4 && digits(year, 4)
}

// A lone space marks a missing reading.
fn normalise_blank(value: &str) -> String {
    if value == " " {
        String::new()
    } else {
        value.to_string()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const HEADER: &str =
        "Station Name,Date,Evapo-Rain,Rain,Pan-Rain,Max Temp,Min Temp,Max Humid,Min Humid,WSpeed";

    fn parse(body: &str) -> Vec<StationRecord> {
        let text = format!("{}\n{}", HEADER, body);
        parse_records(text.as_bytes(), &CsvLayout::default()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_parse_valid_row() {
        let records = parse("STATION_A,01/01/2020,1.2,0,,20.5,10.2,80,40,12\n");

        assert_eq!(
            records,
            vec![StationRecord {
                station: "STATION_A".to_string(),
                date: date(2020, 1, 1),
                values: [
                    "20.5".to_string(),
                    "10.2".to_string(),
                    "80".to_string(),
                    "40".to_string()
                ],
            }]
        );
    }

    #[test]
    fn should_skip_header_row() {
        let records = parse("");
        assert!(records.is_empty());
    }

    #[test]
    fn should_skip_short_rows() {
        let records = parse(
            "STATION_A,01/01/2020,1.2,0,,20.5,10.2\n\
             STATION_A,02/01/2020,1.2,0,,20.5,10.2,80\n\
             STATION_A,03/01/2020,1.2,0,,20.5,10.2,80,40\n",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(2020, 1, 3));
    }

    #[test]
    fn should_skip_rows_with_bad_dates() {
        let records = parse(
            "STATION_A,2020-01-01,1.2,0,,20.5,10.2,80,40\n\
             STATION_A,,1.2,0,,20.5,10.2,80,40\n\
             STATION_A,31/02/2020,1.2,0,,20.5,10.2,80,40\n\
             STATION_A,01/01/20,1.2,0,,20.5,10.2,80,40\n\
             STATION_A, 01/01/2020,1.2,0,,20.5,10.2,80,40\n\
             STATION_A,01/01/2020 ,1.2,0,,20.5,10.2,80,40\n\
             STATION_A,04/01/02020,1.2,0,,20.5,10.2,80,40\n\
             STATION_A,29/02/2020,1.2,0,,20.5,10.2,80,40\n",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(2020, 2, 29));
    }

    #[test]
    fn should_accept_unpadded_day_and_month() {
        let records = parse("STATION_A,3/1/2020,1.2,0,,20.5,10.2,80,40\n");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(2020, 1, 3));
    }

    #[test]
    fn should_normalise_single_space_to_blank() {
        let records = parse("STATION_A,01/01/2020,1.2,0,, ,  ,80,\n");

        assert_eq!(
            records[0].values,
            ["".to_string(), "  ".to_string(), "80".to_string(), "".to_string()]
        );
    }

    #[test]
    fn should_decode_invalid_utf8_as_data() {
        let mut bytes = format!("{}\n", HEADER).into_bytes();
        bytes.extend_from_slice(b"CAF\xC9 STATION,01/01/2020,1.2,0,,20.5,10.2,80,40\n");

        let text = decode_permissive(&bytes);
        let records = parse_records(text.as_bytes(), &CsvLayout::default()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].station, "CAFÉ STATION");
    }

    #[test]
    fn should_keep_valid_utf8_untouched() {
        let text = decode_permissive("NGAYIRDAPIRA ✓".as_bytes());
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, "NGAYIRDAPIRA ✓");
    }

    #[test]
    fn should_read_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("station.csv");
        fs::write(
            &path,
            format!("{}\nSTATION_A,15/06/2021,,,,18.0,7.5,90,55\n", HEADER),
        )
        .unwrap();

        let records = parse_file(&path, &CsvLayout::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(2021, 6, 15));
    }

    #[test]
    fn should_fail_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = parse_file(&dir.path().join("missing.csv"), &CsvLayout::default());

        assert!(result.is_err());
    }
}
