//! Run-level summary: custom JSON/HTML reports and the console tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use ward_core::{Result, TestStatus};

use crate::html::render_summary_html;
use crate::results::TestOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
}

impl RunStats {
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> Self {
        let count = |status: TestStatus| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            total: outcomes.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            timed_out: count(TestStatus::TimedOut),
        }
    }

    /// Percentage of passed tests, rounded; 0 for an empty run
    pub fn success_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.passed as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.timed_out == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    /// Milliseconds from the first start to the last end
    pub total_duration: i64,
    pub status: String,
    pub stats: RunStats,
    pub results: Vec<TestOutcome>,
}

impl RunSummary {
    /// Summarize outcomes, keeping only the last attempt of each retried test
    pub fn from_outcomes(outcomes: Vec<TestOutcome>) -> Self {
        let mut results: Vec<TestOutcome> = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match results.iter_mut().find(|r| r.key() == outcome.key()) {
                Some(existing) => *existing = outcome,
                None => results.push(outcome),
            }
        }

        let stats = RunStats::from_outcomes(&results);
        let total_duration = match (
            results.iter().map(|r| r.start_time).min(),
            results.iter().map(|r| r.end_time).max(),
        ) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            _ => 0,
        };

        Self {
            timestamp: Utc::now(),
            total_duration,
            status: if stats.is_success() { "passed" } else { "failed" }.to_string(),
            stats,
            results,
        }
    }

    /// Write `custom-test-report.json` and `custom-test-summary.html`
    pub fn write(&self, reports_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(reports_dir)?;

        let json_path = reports_dir.join("custom-test-report.json");
        std::fs::write(&json_path, serde_json::to_string_pretty(self)?)?;
        info!("📊 Custom JSON report saved: {}", json_path.display());

        let html_path = reports_dir.join("custom-test-summary.html");
        std::fs::write(&html_path, render_summary_html(self))?;
        info!("📄 Custom HTML summary saved: {}", html_path.display());

        Ok((json_path, html_path))
    }

    pub fn log_console_summary(&self) {
        let rule = "=".repeat(80);
        info!("{}", rule);
        info!("🏁 TEST SUMMARY");
        info!("{}", rule);
        info!("Total Tests: {}", self.stats.total);
        info!("✅ Passed: {}", self.stats.passed);
        info!("❌ Failed: {}", self.stats.failed);
        info!("⏭️ Skipped: {}", self.stats.skipped);
        if self.stats.timed_out > 0 {
            info!("⏱️ Timed out: {}", self.stats.timed_out);
        }
        info!("⏱️ Total Duration: {}s", (self.total_duration as f64 / 1000.0).round());
        info!("📊 Success Rate: {}%", self.stats.success_rate());
        info!("{}", rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::outcome;
    use tempfile::tempdir;

    #[test]
    fn test_stats_and_success_rate() {
        let stats = RunStats::from_outcomes(&[
            outcome("a", TestStatus::Passed, 10),
            outcome("b", TestStatus::Passed, 10),
            outcome("c", TestStatus::Failed, 10),
        ]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.success_rate(), 67);
        assert!(!stats.is_success());
        assert_eq!(RunStats::default().success_rate(), 0);
    }

    #[test]
    fn test_retries_collapse_to_last_attempt() {
        let mut retried = outcome("flaky", TestStatus::Passed, 10);
        retried.retry = 1;
        let summary = RunSummary::from_outcomes(vec![
            outcome("flaky", TestStatus::Failed, 10),
            outcome("stable", TestStatus::Passed, 10),
            retried,
        ]);

        assert_eq!(summary.stats.total, 2);
        assert_eq!(summary.stats.passed, 2);
        assert_eq!(summary.status, "passed");
        assert_eq!(summary.results[0].retry, 1);
    }

    #[test]
    fn test_write_reports() {
        let dir = tempdir().unwrap();
        let summary = RunSummary::from_outcomes(vec![outcome("a", TestStatus::Skipped, 5)]);
        let (json, html) = summary.write(dir.path()).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(parsed["stats"]["skipped"], 1);
        assert_eq!(parsed["stats"]["timedOut"], 0);
        assert!(std::fs::read_to_string(html).unwrap().contains("status-skipped"));
        summary.log_console_summary();
    }
}
