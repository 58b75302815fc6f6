//! Curated storage adapters

pub mod csv_store;
pub mod bundle;

pub use csv_store::{read_frame_csv, write_frame_csv, CsvUploader};
pub use bundle::{DatasetBundle, HOLIDAYS_FILE};
