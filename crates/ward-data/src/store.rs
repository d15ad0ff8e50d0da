//! Whole-document JSON persistence for the fixture store
//!
//! Single writer assumed; there is no file locking. Writes go to a sibling
//! temp file and are renamed into place so readers never see a torn document.

use std::path::{Path, PathBuf};
use tracing::debug;
use ward_core::Result;

use crate::model::TestData;

/// File-backed fixture store
#[derive(Debug, Clone)]
pub struct FixtureStore {
    path: PathBuf,
}

impl FixtureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the raw document; `None` when the file does not exist
    pub fn load(&self) -> Result<Option<TestData>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let data = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Replace the whole document
    pub fn save(&self, data: &TestData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Saved fixture data to {}", self.path.display());
        Ok(())
    }
}
