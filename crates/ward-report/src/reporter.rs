//! Per-test step reporter
//!
//! Wraps one page and one [`TestInfo`]. Steps are bracketed with
//! [`StepReporter::start_step`] and [`StepReporter::complete`] (or the
//! name-based [`StepReporter::complete_step`]), and everything is assembled
//! into `reports/detailed-<stem>.json` by [`StepReporter::finalize_test`].
//!
//! Nothing in here returns an error for instrumentation reasons except the
//! explicit report writers, and [`StepReporter::finalize_test`] contains
//! those too.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ward_browser::Page;
use ward_core::fail_open::{fail_open, fail_open_sync};
use ward_core::{Result, TestInfo, TestStatus, WardConfig};

use crate::activity::{ActivityKind, ActivityLog};
use crate::detailed::{DetailedReport, ExecutionInfo, ReportEnvironment, ReportTestInfo};
use crate::html::render_detailed_html;
use crate::metrics::{collect_metrics, TestMetrics};
use crate::results::{ResultStore, TestOutcome};
use crate::step::{StepHandle, TestStep};

pub const BANNER: &str = "═══════════════════════════════════════════════════════════════════";

/// `Nms` below one second, otherwise seconds with two decimals
pub fn format_duration(ms: i64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

pub struct StepReporter {
    page: Arc<dyn Page>,
    info: TestInfo,
    config: Arc<WardConfig>,
    stem: String,
    start_time: DateTime<Utc>,
    steps: Vec<TestStep>,
    metrics: TestMetrics,
    errors: Vec<String>,
    status: Option<TestStatus>,
    screenshots: Vec<String>,
    activity: Vec<ActivityLog>,
}

impl StepReporter {
    pub fn new(page: Arc<dyn Page>, info: TestInfo, config: Arc<WardConfig>) -> Self {
        let stem = info.file_stem();
        Self {
            page,
            info,
            config,
            stem,
            start_time: Utc::now(),
            steps: Vec::new(),
            metrics: TestMetrics::default(),
            errors: Vec::new(),
            status: None,
            screenshots: Vec::new(),
            activity: Vec::new(),
        }
    }

    pub fn info(&self) -> &TestInfo {
        &self.info
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    pub fn metrics(&self) -> &TestMetrics {
        &self.metrics
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn status(&self) -> Option<TestStatus> {
        self.status
    }

    /// `detailed-<stem>.json` in the reports directory
    pub fn detailed_report_path(&self) -> PathBuf {
        self.config
            .settings
            .paths
            .reports_dir
            .join(format!("detailed-{}.json", self.stem))
    }

    pub fn html_report_path(&self) -> PathBuf {
        self.config
            .settings
            .paths
            .reports_dir
            .join(format!("report-{}.html", self.stem))
    }

    /// Open a step; the returned handle completes exactly this step
    pub fn start_step(&mut self, name: &str, details: Option<serde_json::Value>) -> StepHandle {
        if self.steps.is_empty() {
            info!("{}", BANNER);
            info!("🎯 Test: {}", self.info.title);
            info!("{}", BANNER);
        }

        self.steps.push(TestStep::open(name, details));
        info!("{}🚀 Starting step: {}", self.info.retry_label(), name);
        StepHandle(self.steps.len() - 1)
    }

    /// Complete the step behind `handle`; ignored if it is already complete
    pub fn complete(&mut self, handle: StepHandle, status: TestStatus, error: Option<&str>) {
        match self.steps.get(handle.0) {
            Some(step) if step.is_open() => self.close_at(handle.0, status, error),
            _ => debug!("Ignoring completion of step #{}: not open", handle.0),
        }
    }

    /// Complete the most recently opened step named `name` that is still open
    ///
    /// No-op when there is none.
    pub fn complete_step(&mut self, name: &str, status: TestStatus, error: Option<&str>) {
        match self.steps.iter().rposition(|s| s.name == name && s.is_open()) {
            Some(index) => self.close_at(index, status, error),
            None => debug!("Ignoring completion of step {:?}: no open step", name),
        }
    }

    fn close_at(&mut self, index: usize, status: TestStatus, error: Option<&str>) {
        let label = self.info.retry_label();
        let step = &mut self.steps[index];
        step.close(status, error);

        let duration = step.duration.unwrap_or(0);
        match error {
            Some(error) => info!(
                "{}{} Completed step: {} ({}ms) - {}",
                label,
                status.icon(),
                step.name,
                duration,
                error
            ),
            None => info!("{}{} Completed step: {} ({}ms)", label, status.icon(), step.name, duration),
        }

        if let Some(error) = error {
            self.errors.push(format!("{}: {}", self.steps[index].name, error));
        }
    }

    /// Attach a screenshot to the most recent step named `name`
    pub fn add_step_screenshot(&mut self, name: &str, path: impl Into<String>) {
        let path = path.into();
        if let Some(step) = self.steps.iter_mut().rev().find(|s| s.name == name) {
            step.screenshot = Some(path.clone());
        }
        self.screenshots.push(path);
    }

    pub fn attach_screenshot(&mut self, handle: StepHandle, path: impl Into<String>) {
        let path = path.into();
        if let Some(step) = self.steps.get_mut(handle.0) {
            step.screenshot = Some(path.clone());
        }
        self.screenshots.push(path);
    }

    /// Screenshots taken outside of any step, listed in the run summary
    pub fn add_screenshots<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            let path = path.into();
            if !self.screenshots.contains(&path) {
                self.screenshots.push(path);
            }
        }
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn set_status(&mut self, status: TestStatus) {
        self.status = Some(status);
    }

    /// Collect performance metrics from the page, best effort
    pub async fn record_metrics(&mut self) {
        if self.page.is_closed() {
            debug!("Skipping metrics: page already closed");
            return;
        }

        match collect_metrics(self.page.as_ref()).await {
            Ok(metrics) => self.metrics.merge(metrics),
            Err(e) if e.is_page_closed() => debug!("Skipping metrics: {}", e),
            Err(e) => warn!("Could not collect metrics: {}", e),
        }
    }

    pub fn record_network_activity(&mut self) {
        self.record_activity(ActivityKind::Network);
    }

    pub fn record_console_activity(&mut self) {
        self.record_activity(ActivityKind::Console);
    }

    fn record_activity(&mut self, kind: ActivityKind) {
        if self.activity.iter().any(|log| log.kind() == kind) {
            return;
        }
        let reports_dir = self.config.settings.paths.reports_dir.clone();
        let attached = fail_open_sync(kind.prefix(), || {
            ActivityLog::attach(self.page.as_ref(), kind, &reports_dir, &self.stem)
        });
        if let Some(log) = attached {
            self.activity.push(log);
        }
    }

    /// Activity logs attached so far
    pub fn activity(&self) -> &[ActivityLog] {
        &self.activity
    }

    /// Assemble the detailed report from the current state
    pub async fn build_report(&self) -> DetailedReport {
        let end = Utc::now();
        let duration = (end - self.start_time).num_milliseconds();

        let (url, viewport, user_agent) = if self.page.is_closed() {
            ("page closed".to_string(), None, String::new())
        } else {
            (
                self.page.url().await.unwrap_or_else(|_| "page closed".to_string()),
                self.page.viewport().await.ok(),
                self.page.user_agent().await.unwrap_or_default(),
            )
        };

        let mut tags = self.info.title_tags();
        for tag in &self.info.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        DetailedReport {
            test_info: ReportTestInfo {
                title: self.info.title.clone(),
                file: self.info.file.clone(),
                project: self.info.project.clone(),
                status: self.status,
                duration,
                timeout: self.config.page_timeout.as_millis() as u64,
                retry: self.info.retry,
                tags,
            },
            execution: ExecutionInfo {
                start_time: self.start_time,
                end_time: end,
                duration,
                url,
                viewport,
                user_agent,
            },
            steps: self.steps.clone(),
            metrics: self.metrics.clone(),
            environment: ReportEnvironment {
                base_url: self.config.base_url.clone(),
                platform: std::env::consts::OS.to_string(),
                ward_version: env!("CARGO_PKG_VERSION").to_string(),
                ci: self.config.ci,
            },
            errors: self.errors.clone(),
        }
    }

    /// Write `detailed-<stem>.json` and return its path
    pub async fn generate_detailed_report(&self) -> Result<PathBuf> {
        let report = self.build_report().await;
        let path = self.detailed_report_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(&report)?).await?;

        info!("{}", BANNER);
        info!("📊 Detailed report generated: {}", path.display());
        info!("{}", BANNER);
        Ok(path)
    }

    /// Write the HTML rendering of the detailed report
    pub async fn generate_html_report(&self) -> Result<PathBuf> {
        let report = self.build_report().await;
        let path = self.html_report_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, render_detailed_html(&report)).await?;

        info!("   📄 HTML report generated: {}", path.display());
        Ok(path)
    }

    pub fn log_test_completion(&self) {
        let total = (Utc::now() - self.start_time).num_milliseconds();
        let count = |status: TestStatus| {
            self.steps
                .iter()
                .filter(|s| !s.is_open() && s.status == status)
                .count()
        };

        info!("{}", BANNER);
        info!("🏁 Test completed: {}", self.info.title);
        info!("   ⏱️  Total duration: {}", format_duration(total));
        info!(
            "   📊 Steps: {} passed, {} failed, {} skipped",
            count(TestStatus::Passed),
            count(TestStatus::Failed),
            count(TestStatus::Skipped)
        );
        info!("{}", BANNER);
    }

    /// Status used for the run results when none was set explicitly
    fn effective_status(&self) -> TestStatus {
        self.status.unwrap_or_else(|| {
            if self.steps.iter().any(|s| s.status == TestStatus::Failed) || !self.errors.is_empty() {
                TestStatus::Failed
            } else {
                TestStatus::Passed
            }
        })
    }

    fn outcome(&self) -> TestOutcome {
        let end = Utc::now();
        TestOutcome {
            title: self.info.title.clone(),
            file: self.info.file.clone(),
            project: self.info.project.clone(),
            status: self.effective_status(),
            duration: (end - self.start_time).num_milliseconds(),
            start_time: self.start_time,
            end_time: end,
            retry: self.info.retry,
            error: self.errors.first().cloned(),
            screenshots: self.screenshots.clone(),
        }
    }

    /// The single call every test makes at its end
    ///
    /// Collects metrics, flushes activity logs, writes the detailed report,
    /// narrates completion and appends the outcome to the run results.
    /// Returns the report path when it could be written.
    pub async fn finalize_test(&mut self) -> Option<PathBuf> {
        self.record_metrics().await;
        for log in &self.activity {
            fail_open_sync("flush activity", || log.flush());
        }

        let path = fail_open("detailed report", || self.generate_detailed_report()).await;
        self.log_test_completion();

        let store = ResultStore::in_dir(&self.config.settings.paths.reports_dir);
        let outcome = self.outcome();
        fail_open("record outcome", || store.append(&outcome)).await;

        path
    }
}

impl std::fmt::Debug for StepReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepReporter")
            .field("title", &self.info.title)
            .field("steps", &self.steps.len())
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use ward_browser::fake::{FakeDriver, FakePage};
    use ward_browser::PageEvent;
    use ward_core::testing::{config_from, sample_config, sample_environment};
    use ward_core::LoginSelectors;

    fn reporter(root: &std::path::Path) -> (Arc<FakePage>, StepReporter) {
        let config = Arc::new(sample_config(root));
        let page = FakeDriver::new(config.base_url.clone(), LoginSelectors::default()).page();
        let info = TestInfo::new("should create machine @machines").with_file("tests/machines.rs");
        let reporter = StepReporter::new(page.clone(), info, config);
        (page, reporter)
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(999), "999ms");
        assert_eq!(format_duration(1500), "1.50s");
    }

    #[tokio::test]
    async fn test_complete_step_without_open_step_is_noop() {
        let dir = tempdir().unwrap();
        let (_page, mut reporter) = reporter(dir.path());
        reporter.start_step("open dialog", None);
        reporter.complete_step("open dialog", TestStatus::Passed, None);

        reporter.complete_step("open dialog", TestStatus::Failed, Some("late"));
        reporter.complete_step("never started", TestStatus::Passed, None);

        assert_eq!(reporter.steps().len(), 1);
        assert_eq!(reporter.steps()[0].status, TestStatus::Passed);
        assert!(reporter.errors().is_empty());
    }

    #[tokio::test]
    async fn test_handle_completes_exact_step() {
        let dir = tempdir().unwrap();
        let (_page, mut reporter) = reporter(dir.path());
        let first = reporter.start_step("fill form", None);
        let _second = reporter.start_step("fill form", None);

        reporter.complete(first, TestStatus::Failed, Some("field missing"));

        assert!(!reporter.steps()[0].is_open());
        assert!(reporter.steps()[1].is_open());
        assert_eq!(reporter.steps()[0].error.as_deref(), Some("field missing"));
        assert_eq!(reporter.errors(), ["fill form: field missing"]);

        reporter.complete(first, TestStatus::Passed, None);
        assert_eq!(reporter.steps()[0].status, TestStatus::Failed);
    }

    #[tokio::test]
    async fn test_screenshots_attach_to_steps() {
        let dir = tempdir().unwrap();
        let (_page, mut reporter) = reporter(dir.path());
        let handle = reporter.start_step("submit", None);
        reporter.attach_screenshot(handle, "a.png");
        reporter.add_step_screenshot("submit", "b.png");
        reporter.add_step_screenshot("unknown", "c.png");

        assert_eq!(reporter.steps()[0].screenshot.as_deref(), Some("b.png"));
        assert_eq!(reporter.outcome().screenshots, vec!["a.png", "b.png", "c.png"]);
    }

    #[tokio::test]
    async fn test_metrics_skipped_on_closed_page() {
        let dir = tempdir().unwrap();
        let (page, mut reporter) = reporter(dir.path());
        page.set_evaluate_result(serde_json::json!({"resourceCount": 4}));
        reporter.record_metrics().await;
        assert_eq!(reporter.metrics().resource_count, Some(4));

        page.close().await.unwrap();
        page.set_evaluate_result(serde_json::json!({"resourceCount": 9}));
        reporter.record_metrics().await;
        assert_eq!(reporter.metrics().resource_count, Some(4));
    }

    #[tokio::test]
    async fn test_detailed_report_contents() {
        let dir = tempdir().unwrap();
        let (page, mut reporter) = reporter(dir.path());
        page.goto("https://console.example.com/console/machines").await.unwrap();
        let step = reporter.start_step("open machines", Some(serde_json::json!({"team": "Private Team"})));
        reporter.complete(step, TestStatus::Passed, None);
        reporter.set_status(TestStatus::Passed);

        let path = reporter.generate_detailed_report().await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("detailed-"));
        assert!(name.ends_with("_should_create_machine_machines.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["testInfo"]["status"], "passed");
        assert_eq!(json["testInfo"]["tags"][0], "@machines");
        assert_eq!(json["steps"].as_array().unwrap().len(), 1);
        assert_eq!(json["environment"]["baseURL"], "https://console.example.com");
        assert!(json["execution"]["url"].as_str().unwrap().ends_with("/console/login"));

        let html = reporter.generate_html_report().await.unwrap();
        assert!(std::fs::read_to_string(html).unwrap().contains("open machines"));
    }

    #[tokio::test]
    async fn test_finalize_collects_metrics_first() {
        let dir = tempdir().unwrap();
        let (page, mut reporter) = reporter(dir.path());
        page.set_evaluate_result(serde_json::json!({"resourceCount": 12, "pageLoadTime": 340.0}));
        assert!(reporter.metrics().resource_count.is_none());

        let report = reporter.finalize_test().await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(json["metrics"]["resourceCount"], 12);
        assert_eq!(reporter.metrics().resource_count, Some(12));
    }

    #[tokio::test]
    async fn test_report_keeps_base_url_as_given() {
        let dir = tempdir().unwrap();
        let env = sample_environment().with("BASE_URL", "https://console.example.com/");
        let config = Arc::new(config_from(&env, dir.path()));
        let page = FakeDriver::new(config.base_url.clone(), LoginSelectors::default()).page();
        let reporter = StepReporter::new(page, TestInfo::new("base url"), config);

        let report = reporter.build_report().await;
        assert_eq!(report.environment.base_url, "https://console.example.com/");
    }

    #[tokio::test]
    async fn test_finalize_records_outcome_and_activity() {
        let dir = tempdir().unwrap();
        let (page, mut reporter) = reporter(dir.path());
        reporter.record_network_activity();
        reporter.record_network_activity();
        reporter.record_console_activity();
        assert_eq!(reporter.activity().len(), 2);

        page.emit(PageEvent::Response {
            url: "https://console.example.com/api/machines".to_string(),
            status: 200,
        });
        let step = reporter.start_step("load", None);
        reporter.complete(step, TestStatus::Failed, Some("timeout"));
        page.close().await.unwrap();

        let report = reporter.finalize_test().await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(json["execution"]["url"], "page closed");

        let network: Vec<serde_json::Value> = serde_json::from_str(
            &std::fs::read_to_string(reporter.activity()[0].path()).unwrap(),
        )
        .unwrap();
        assert_eq!(network.len(), 1);

        let config = sample_config(dir.path());
        let outcomes = ResultStore::in_dir(&config.settings.paths.reports_dir)
            .load_all()
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, TestStatus::Failed);
        assert_eq!(outcomes[0].error.as_deref(), Some("load: timeout"));
    }
}
