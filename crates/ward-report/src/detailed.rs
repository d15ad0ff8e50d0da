//! Shape of the per-test `detailed-<stem>.json` report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ward_browser::Viewport;
use ward_core::TestStatus;

use crate::metrics::TestMetrics;
use crate::step::TestStep;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedReport {
    pub test_info: ReportTestInfo,
    pub execution: ExecutionInfo,
    pub steps: Vec<TestStep>,
    pub metrics: TestMetrics,
    pub environment: ReportEnvironment,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTestInfo {
    pub title: String,
    pub file: String,
    pub project: String,
    pub status: Option<TestStatus>,
    /// Milliseconds since the reporter was created
    pub duration: i64,
    /// Navigation timeout in milliseconds
    pub timeout: u64,
    pub retry: u32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    /// Last page URL, `page closed` when the page is gone
    pub url: String,
    pub viewport: Option<Viewport>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEnvironment {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub platform: String,
    pub ward_version: String,
    pub ci: bool,
}
