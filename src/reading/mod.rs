pub mod station_file;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

pub use station_file::parse_file;

/// Raw measurement strings in `Measurement` order. A blank reading is `""`.
pub type Measurements = [String; 4];

/// One daily row of a station file.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub station: String,
    pub date: NaiveDate,
    pub values: Measurements,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
/// Daily measurements carried through to the canonical table.
pub enum Measurement {
    #[value(name = "max_temp")]
    MaxTemp,
    #[value(name = "min_temp")]
    MinTemp,
    #[value(name = "max_humidity")]
    MaxHumidity,
    #[value(name = "min_humidity")]
    MinHumidity,
}

impl Measurement {
    pub const ALL: [Measurement; 4] = [
        Measurement::MaxTemp,
        Measurement::MinTemp,
        Measurement::MaxHumidity,
        Measurement::MinHumidity,
    ];

    pub fn index(self) -> usize {
        match self {
            Measurement::MaxTemp => 0,
            Measurement::MinTemp => 1,
            Measurement::MaxHumidity => 2,
            Measurement::MinHumidity => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Measurement::MaxTemp => "max_temp",
            Measurement::MinTemp => "min_temp",
            Measurement::MaxHumidity => "max_humidity",
            Measurement::MinHumidity => "min_humidity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Measurement::MaxTemp | Measurement::MinTemp => "°C",
            Measurement::MaxHumidity | Measurement::MinHumidity => "%",
        }
    }
}
