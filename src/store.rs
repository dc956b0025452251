//! JSON persistence for check results and the discovered group index

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CheckerError, Result};
use crate::models::{GroupIndex, ResultDocument};

/// Holds the single result document of the most recent run
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored document. The previous one survives if this fails.
    pub fn save(&self, doc: &ResultDocument) -> Result<()> {
        write_json_atomic(&self.path, doc)
    }

    /// Load the stored document; missing or unreadable both mean no results
    pub fn load(&self) -> Result<ResultDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Err(CheckerError::NoResults),
            Err(e) => {
                tracing::warn!("Could not read results {}: {}", self.path.display(), e);
                return Err(CheckerError::NoResults);
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            tracing::warn!("Results file {} is corrupt: {}", self.path.display(), e);
            CheckerError::NoResults
        })
    }
}

pub fn save_group_index(path: &Path, index: &GroupIndex) -> Result<()> {
    write_json_atomic(path, index)
}

pub fn load_group_index(path: &Path) -> Option<GroupIndex> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write to a sibling temp file, then rename over the target
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
