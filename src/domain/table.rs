//! Raw string tables
//!
//! Readers load files into a `RawTable` first; all source-specific cleaning
//! happens on strings before numbers and timestamps are parsed.

/// Header plus string rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value, empty string when the row is short
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Apply a function to every cell of a column
    pub fn map_column<F>(&mut self, col: usize, f: F)
    where
        F: Fn(&str) -> String,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
    }

    /// Keep rows passing the predicate
    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: Fn(&[String]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// Append a column; rows are padded/truncated to match
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.headers.push(name.into());
        let width = self.headers.len();
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.resize(width - 1, String::new());
            row.push(value);
        }
    }

    /// Rename or replace a column in place: an existing column with the new
    /// name is overwritten
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        match self.column_index(name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    if col < row.len() {
                        row[col] = value;
                    } else {
                        row.resize(col, String::new());
                        row.push(value);
                    }
                }
            }
            None => self.push_column(name, values),
        }
    }
}
