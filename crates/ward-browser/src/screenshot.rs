//! Screenshot capture filed per test case
//!
//! All captures for a test land in
//! `screenshots/<yyyy-MM-dd_HH-mm-ss>_<project>_<sanitized title>/`, created
//! once when the manager is built. Capture failures propagate: a missing
//! screenshot is an infrastructure failure, not an instrumentation glitch.

use chrono::{Local, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use ward_core::{
    file_timestamp, sanitize_file_name, Result, TestInfo, TestStatus, ViewportProfile, WardConfig,
    WardError,
};

use crate::page::{Page, Viewport};

/// Screenshot capture options
#[derive(Debug, Clone)]
pub struct ScreenshotOptions {
    /// Capture the whole document instead of the viewport
    pub full_page: bool,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self { full_page: true }
    }
}

impl ScreenshotOptions {
    pub fn viewport_only() -> Self {
        Self { full_page: false }
    }
}

/// Paths produced by [`ScreenshotManager::capture_comparison`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub before: PathBuf,
    pub after: PathBuf,
}

/// One named step of a page flow; the action runs after its screenshot
pub struct FlowStep<'a> {
    pub name: String,
    pub action: BoxFuture<'a, Result<()>>,
}

impl<'a> FlowStep<'a> {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        Self {
            name: name.into(),
            action: Box::pin(action),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotReport<'a> {
    test_info: ScreenshotReportInfo<'a>,
    screenshots: Vec<String>,
    environment: ScreenshotEnvironment,
    timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotReportInfo<'a> {
    title: &'a str,
    file: &'a str,
    project: &'a str,
    status: Option<TestStatus>,
    duration: Option<u128>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotEnvironment {
    url: String,
    user_agent: String,
    viewport: Option<Viewport>,
}

/// Captures and files screenshots for one test case
pub struct ScreenshotManager {
    page: Arc<dyn Page>,
    info: TestInfo,
    test_case_dir: PathBuf,
    viewports: Vec<ViewportProfile>,
    settle: Duration,
    load_timeout: Duration,
}

impl ScreenshotManager {
    /// Create the per-test directory under the configured screenshots root
    pub fn new(page: Arc<dyn Page>, info: &TestInfo, config: &WardConfig) -> Result<Self> {
        let settings = &config.settings;
        let dir_name = format!(
            "{}_{}_{}",
            file_timestamp(),
            info.project,
            sanitize_file_name(&info.title)
        );
        let test_case_dir = settings.paths.screenshots_dir.join(dir_name);
        std::fs::create_dir_all(&test_case_dir)?;

        debug!("Screenshot directory: {}", test_case_dir.display());
        Ok(Self {
            page,
            info: info.clone(),
            test_case_dir,
            viewports: settings.viewports.clone(),
            settle: Duration::from_millis(settings.browser.viewport_settle_ms),
            load_timeout: config.page_timeout,
        })
    }

    pub fn test_case_dir(&self) -> &Path {
        &self.test_case_dir
    }

    fn stamped_path(&self, suffix: &str) -> PathBuf {
        let stamp = Local::now().format("%H-%M-%S-%3f");
        self.test_case_dir.join(format!("{}_{}", stamp, suffix))
    }

    async fn write(&self, path: PathBuf, bytes: Result<Vec<u8>>) -> Result<PathBuf> {
        let bytes = bytes.map_err(|e| {
            error!("❌ Failed to capture screenshot: {}", e);
            e
        })?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            WardError::ScreenshotFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    /// `HH-mm-ss-SSS_<step>.png`
    pub async fn capture_step(&self, name: &str, options: ScreenshotOptions) -> Result<PathBuf> {
        let path = self.stamped_path(&format!("{}.png", sanitize_file_name(name)));
        let bytes = self.page.screenshot(options.full_page).await;
        self.write(path, bytes).await
    }

    /// `HH-mm-ss-SSS_element_<step>.png`
    pub async fn capture_element_screenshot(&self, selector: &str, name: &str) -> Result<PathBuf> {
        let path = self.stamped_path(&format!("element_{}.png", sanitize_file_name(name)));
        let bytes = self.page.element_screenshot(selector).await;
        self.write(path, bytes).await
    }

    /// Capture, run `before`, wait for the network, capture, run `after`
    pub async fn capture_comparison<B, BF, A, AF>(
        &self,
        name: &str,
        before: B,
        after: A,
    ) -> Result<Comparison>
    where
        B: FnOnce() -> BF,
        BF: Future<Output = Result<()>>,
        A: FnOnce() -> AF,
        AF: Future<Output = Result<()>>,
    {
        let before_path = self
            .capture_step(&format!("{}_before", name), ScreenshotOptions::default())
            .await?;

        before().await?;
        self.page.wait_for_network_idle(self.load_timeout).await?;

        let after_path = self
            .capture_step(&format!("{}_after", name), ScreenshotOptions::default())
            .await?;

        after().await?;

        Ok(Comparison {
            before: before_path,
            after: after_path,
        })
    }

    /// Numbered capture (`01_<name>`) before each step's action
    pub async fn capture_page_flow(&self, steps: Vec<FlowStep<'_>>) -> Result<Vec<PathBuf>> {
        let mut screenshots = Vec::with_capacity(steps.len());

        for (index, step) in steps.into_iter().enumerate() {
            let path = self
                .capture_step(
                    &format!("{:02}_{}", index + 1, step.name),
                    ScreenshotOptions::default(),
                )
                .await?;
            screenshots.push(path);

            step.action.await?;
            self.page.wait_for_network_idle(self.load_timeout).await?;
        }

        Ok(screenshots)
    }

    /// `HH-mm-ss-SSS_ERROR.png` plus a sibling `_error.log`
    pub async fn capture_error(&self, message: &str) -> Result<PathBuf> {
        let stamp = Local::now().format("%H-%M-%S-%3f").to_string();
        let path = self.test_case_dir.join(format!("{}_ERROR.png", stamp));
        let bytes = self.page.screenshot(true).await;
        let path = self.write(path, bytes).await?;

        let url = self.page.url().await.unwrap_or_default();
        let log = format!(
            "Error: {}\nURL: {}\nTimestamp: {}",
            message,
            url,
            Utc::now().to_rfc3339()
        );
        tokio::fs::write(self.test_case_dir.join(format!("{}_error.log", stamp)), log).await?;

        info!("📸 Error screenshot saved: {}", path.display());
        Ok(path)
    }

    /// Resize to each configured device profile and capture
    pub async fn capture_viewports(&self) -> Result<Vec<PathBuf>> {
        let mut screenshots = Vec::with_capacity(self.viewports.len());

        for profile in &self.viewports {
            self.page
                .set_viewport(Viewport::new(profile.width, profile.height))
                .await?;
            tokio::time::sleep(self.settle).await;

            let path = self
                .capture_step(
                    &format!("viewport_{}", profile.name),
                    ScreenshotOptions::default(),
                )
                .await?;
            screenshots.push(path);
        }

        Ok(screenshots)
    }

    /// Sorted file names of the images captured so far
    pub fn screenshots(&self) -> Vec<String> {
        let mut files: Vec<String> = std::fs::read_dir(&self.test_case_dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().to_string())
                    .filter(|name| name.ends_with(".png") || name.ends_with(".jpg"))
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    }

    /// Write `test-report.json` into the test-case directory
    pub async fn generate_test_report(
        &self,
        status: Option<TestStatus>,
        duration: Option<Duration>,
    ) -> Result<PathBuf> {
        let report = ScreenshotReport {
            test_info: ScreenshotReportInfo {
                title: &self.info.title,
                file: &self.info.file,
                project: &self.info.project,
                status,
                duration: duration.map(|d| d.as_millis()),
            },
            screenshots: self.screenshots(),
            environment: ScreenshotEnvironment {
                url: self.page.url().await.unwrap_or_default(),
                user_agent: self.page.user_agent().await.unwrap_or_default(),
                viewport: self.page.viewport().await.ok(),
            },
            timestamp: Utc::now().to_rfc3339(),
        };

        let path = self.test_case_dir.join("test-report.json");
        tokio::fs::write(&path, serde_json::to_string_pretty(&report)?).await?;
        Ok(path)
    }
}
