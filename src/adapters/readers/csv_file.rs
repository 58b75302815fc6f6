//! Delimited text loading shared by all readers

use std::path::Path;

use crate::domain::RawTable;
use crate::ports::ReadError;

impl From<csv::Error> for ReadError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => ReadError::Io(e),
            other => ReadError::Parse(format!("{:?}", other)),
        }
    }
}

/// Load a delimited file into a raw table.
///
/// Bytes are decoded as UTF-8 lossily so that legacy-encoded exports still
/// load; a leading BOM is stripped from the first header.
pub fn load_delimited(path: &Path, delimiter: u8) -> Result<RawTable, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let headers = reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let header = String::from_utf8_lossy(h).trim().to_string();
            if i == 0 {
                header.trim_start_matches('\u{feff}').to_string()
            } else {
                header
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(
            record
                .iter()
                .map(|cell| String::from_utf8_lossy(cell).to_string())
                .collect(),
        );
    }

    Ok(RawTable::new(headers, rows))
}
