//! Network and console activity captured from a page
//!
//! Listeners append into a shared buffer for the lifetime of the page. The
//! per-test file is written when the log is attached and again on every
//! [`ActivityLog::flush`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;
use ward_browser::{Page, PageEvent};
use ward_core::{Result, WardError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Network,
    Console,
}

impl ActivityKind {
    pub fn accepts(&self, event: &PageEvent) -> bool {
        match self {
            Self::Network => matches!(
                event,
                PageEvent::Request { .. } | PageEvent::Response { .. } | PageEvent::RequestFailed { .. }
            ),
            Self::Console => matches!(event, PageEvent::Console { .. } | PageEvent::PageError { .. }),
        }
    }

    /// File name prefix, e.g. `network-<stem>.json`
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Console => "console",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub event: PageEvent,
    pub timestamp: DateTime<Utc>,
}

/// Accumulates one kind of activity and persists it as a JSON array
#[derive(Debug, Clone)]
pub struct ActivityLog {
    kind: ActivityKind,
    path: PathBuf,
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl ActivityLog {
    /// Subscribe to `page` and write the (initially empty) file
    pub fn attach(page: &dyn Page, kind: ActivityKind, reports_dir: &Path, stem: &str) -> Result<Self> {
        let log = Self {
            kind,
            path: reports_dir.join(format!("{}-{}.json", kind.prefix(), stem)),
            entries: Arc::new(Mutex::new(Vec::new())),
        };

        let sink = log.entries.clone();
        page.subscribe(Arc::new(move |event: &PageEvent| {
            if !kind.accepts(event) {
                return;
            }
            if let Ok(mut entries) = sink.lock() {
                entries.push(ActivityEntry {
                    event: event.clone(),
                    timestamp: Utc::now(),
                });
            }
        }));

        log.flush()?;
        Ok(log)
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Rewrite the file with everything captured so far
    pub fn flush(&self) -> Result<()> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| WardError::Report("activity buffer poisoned".to_string()))?
            .clone();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        debug!(
            "Wrote {} {} entries to {}",
            entries.len(),
            self.kind.prefix(),
            self.path.display()
        );
        Ok(())
    }
}
