//! Raw source readers
//!
//! - `PseReader`: PSE settlement price and demand reports
//! - `WeatherReader`: weather observation exports

mod csv_file;
pub mod pse;
pub mod weather;

pub use csv_file::load_delimited;
pub use pse::PseReader;
pub use weather::WeatherReader;

use crate::domain::Source;
use crate::ports::SourceReader;

/// Reader able to parse the raw files of a source
pub fn reader_for(source: Source) -> Box<dyn SourceReader> {
    match source {
        Source::EnergyDemand | Source::EnergyPrice => Box::new(PseReader::new(source)),
        Source::Weather => Box::new(WeatherReader::new()),
    }
}
