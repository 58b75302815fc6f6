//! Domain Layer - Core data types for powercast
//!
//! This module contains pure data types and validation with no knowledge of
//! file formats or models. All external interactions happen through the
//! ports layer.
//!
//! - `frame`: time-indexed tables and series
//! - `table`: raw string tables produced by readers
//! - `source`: registry of raw data sources
//! - `checker`: index validation and gap detection
//! - `manifest`: curated bundle manifest

pub mod frame;
pub mod table;
pub mod source;
pub mod checker;
pub mod manifest;

pub use frame::{Column, Frame, FrameError, TimeSeries, ACTUAL, FORECAST, TIME, VALUE};
pub use table::RawTable;
pub use source::{Frequency, Source, SourceError, SourceMetadata, DATE, HOUR};
pub use checker::{check_frame, check_index, find_gaps, CheckError, Gap};
pub use manifest::{Manifest, ManifestEntry, ManifestError, MANIFEST_FILE};
