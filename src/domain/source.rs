//! Source Registry
//!
//! Static description of every raw data source: how its Polish column
//! headers map onto canonical names, which columns are numeric, and how
//! often the publisher updates it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::frame::{FORECAST, TIME, VALUE};

/// Raw date column after renaming
pub const DATE: &str = "DATE";
/// Raw hour column after renaming
pub const HOUR: &str = "HOUR";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    #[error("{0} is unknown")]
    UnknownSource(String),
}

/// Sampling/update frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "H")]
    Hourly,
    #[serde(rename = "D")]
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
        }
    }

    /// Length of one period
    pub fn step(&self) -> chrono::Duration {
        match self {
            Frequency::Hourly => chrono::Duration::hours(1),
            Frequency::Daily => chrono::Duration::days(1),
        }
    }
}

impl FromStr for Frequency {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" | "h" => Ok(Frequency::Hourly),
            "D" | "d" => Ok(Frequency::Daily),
            other => Err(SourceError::UnknownSource(format!("frequency {}", other))),
        }
    }
}

/// Known data sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    EnergyDemand,
    EnergyPrice,
    Weather,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::EnergyDemand, Source::EnergyPrice, Source::Weather];

    pub fn name(&self) -> &'static str {
        match self {
            Source::EnergyDemand => "ENERGY_DEMAND",
            Source::EnergyPrice => "ENERGY_PRICE",
            Source::Weather => "WEATHER",
        }
    }

    /// File name of the source inside the curated folder
    pub fn curated_file(&self) -> &'static str {
        match self {
            Source::EnergyDemand => "ENERGY_DEMAND.csv",
            Source::EnergyPrice => "ENERGY_SETTLEMENT_PRICE.csv",
            Source::Weather => "WEATHER.csv",
        }
    }

    pub fn metadata(&self) -> SourceMetadata {
        match self {
            Source::EnergyDemand => SourceMetadata {
                source: *self,
                numeric_columns: vec![FORECAST, VALUE],
                renames: vec![
                    ("Dobowa prognoza zapotrzebowania KSE", FORECAST),
                    ("Rzeczywiste zapotrzebowanie KSE", VALUE),
                    ("Godz.", HOUR),
                    ("Data", DATE),
                ],
                frequency: Frequency::Daily,
            },
            Source::EnergyPrice => SourceMetadata {
                source: *self,
                numeric_columns: vec![VALUE],
                renames: vec![("RCE", VALUE), ("Godzina", HOUR), ("Data", DATE)],
                frequency: Frequency::Daily,
            },
            Source::Weather => SourceMetadata {
                source: *self,
                numeric_columns: vec![
                    "Precipitation",
                    "Wind_Blow",
                    "Wind_Speed",
                    "Temperature",
                    "Visibility",
                    "Humidity",
                    "Overcast",
                ],
                renames: vec![
                    ("Podmuchy wiatru", "Wind_Blow"),
                    ("Prędkość wiatru", "Wind_Speed"),
                    ("Temperatura", "Temperature"),
                    ("Widoczność", "Visibility"),
                    ("Wilgotność", "Humidity"),
                    ("Zachmurzenie", "Overcast"),
                    ("Opad atmosferyczny", "Precipitation"),
                    ("Time", TIME),
                ],
                frequency: Frequency::Daily,
            },
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Source {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .iter()
            .find(|src| src.name() == s)
            .copied()
            .ok_or_else(|| SourceError::UnknownSource(s.to_string()))
    }
}

/// Per-source reading rules
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    pub source: Source,
    /// Raw header -> canonical name
    pub renames: Vec<(&'static str, &'static str)>,
    pub numeric_columns: Vec<&'static str>,
    pub frequency: Frequency,
}

impl SourceMetadata {
    /// Canonical name for a raw header (unchanged when not mapped)
    pub fn rename<'a>(&self, header: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(raw, _)| *raw == header.trim())
            .map(|(_, canonical)| *canonical)
            .unwrap_or(header)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.contains(&column)
    }
}
