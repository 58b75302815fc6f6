//! Dataset Manifest
//!
//! JSON summary of the curated folder: which files it holds, how many rows
//! each has and the time range they cover. The bundle version is bumped
//! whenever any entry changes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name inside the curated folder
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Error, Debug, Clone)]
pub enum ManifestError {
    #[error("Failed to serialize manifest: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize manifest: {0}")]
    DeserializationError(String),

    #[error("Failed to write manifest file: {0}")]
    WriteError(String),

    #[error("Failed to read manifest file: {0}")]
    ReadError(String),

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),
}

/// One curated file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub rows: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub columns: Vec<String>,
}

/// Curated bundle manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Record an entry; returns true (and bumps the version) when it changed
    pub fn record(&mut self, name: &str, entry: ManifestEntry) -> bool {
        if self.entries.get(name) == Some(&entry) {
            return false;
        }
        self.entries.insert(name.to_string(), entry);
        self.version += 1;
        true
    }

    pub fn entry(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.get(name)
    }

    /// Save manifest to disk
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ManifestError::DirectoryError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ManifestError::SerializationError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ManifestError::WriteError(e.to_string()))?;

        tracing::debug!("Manifest v{} saved to {}", self.version, path.display());
        Ok(())
    }

    /// Load manifest from disk; a missing or empty file yields an empty manifest
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ManifestError::ReadError(e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content)
            .map_err(|e| ManifestError::DeserializationError(e.to_string()))
    }

    /// Manifest path for a curated folder
    pub fn default_path(curated_dir: &Path) -> PathBuf {
        curated_dir.join(MANIFEST_FILE)
    }
}
