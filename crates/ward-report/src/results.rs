//! Run results store (append-only JSONL)
//!
//! One line per finished test. Test processes append, the summary and the
//! global teardown read everything back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use ward_core::{Result, TestStatus};

/// Outcome of one test attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub title: String,
    pub file: String,
    pub project: String,
    pub status: TestStatus,
    /// Milliseconds
    pub duration: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub retry: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
}

impl TestOutcome {
    /// Identity used to collapse retries of the same test
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.file, &self.title, &self.project)
    }
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<reports_dir>/results.jsonl`
    pub fn in_dir(reports_dir: &Path) -> Self {
        Self::new(reports_dir.join("results.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub async fn append(&self, outcome: &TestOutcome) -> Result<()> {
        let line = serde_json::to_string(outcome)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;

        debug!("Recorded outcome of {} to {:?}", outcome.title, self.path);
        Ok(())
    }

    /// Every recorded outcome; unparseable lines are skipped with a warning
    pub async fn load_all(&self) -> Result<Vec<TestOutcome>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut outcomes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Skipping line {} of {:?}: {}", index + 1, self.path, e),
            }
        }
        Ok(outcomes)
    }

    /// Remove the file so the next run starts empty
    pub async fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) fn outcome(title: &str, status: TestStatus, duration: i64) -> TestOutcome {
    let start = Utc::now();
    TestOutcome {
        title: title.to_string(),
        file: "tests/auth.rs".to_string(),
        project: "chromium".to_string(),
        status,
        duration,
        start_time: start,
        end_time: start + chrono::Duration::milliseconds(duration),
        retry: 0,
        error: None,
        screenshots: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempdir().unwrap();
        let store = ResultStore::in_dir(&dir.path().join("reports"));
        assert!(store.load_all().await.unwrap().is_empty());

        store.append(&outcome("login", TestStatus::Passed, 100)).await.unwrap();
        store.append(&outcome("logout", TestStatus::Failed, 50)).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].status, TestStatus::Failed);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let store = ResultStore::in_dir(dir.path());
        store.append(&outcome("login", TestStatus::Passed, 100)).await.unwrap();
        tokio::fs::write(
            store.path(),
            format!(
                "{}\n{{broken\n",
                tokio::fs::read_to_string(store.path()).await.unwrap().trim()
            ),
        )
        .await
        .unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 1);
        store.reset().await.unwrap();
        store.reset().await.unwrap();
        assert!(!store.exists());
    }
}
