//! One bracketed unit of test action

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ward_core::TestStatus;

/// Opaque token returned by [`crate::StepReporter::start_step`]
///
/// Completing through the handle is unambiguous even when step names repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepHandle(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub name: String,
    pub status: TestStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds between start and end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TestStep {
    pub(crate) fn open(name: &str, details: Option<serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Passed,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            error: None,
            screenshot: None,
            details,
        }
    }

    /// Started but not yet completed
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub(crate) fn close(&mut self, status: TestStatus, error: Option<&str>) {
        let end = Utc::now();
        self.end_time = Some(end);
        self.duration = Some((end - self.start_time).num_milliseconds());
        self.status = status;
        if let Some(error) = error {
            self.error = Some(error.to_string());
        }
    }
}
