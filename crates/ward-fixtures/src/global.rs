//! Global setup and teardown around a whole test run
//!
//! Setup creates the output directories, checks that the deployment answers
//! and saves a reusable storage state. Only directory creation can fail the
//! run; the other two steps are best effort because every fixture signs in
//! on its own anyway.
//!
//! Teardown removes the temporary auth-state files and, when tests recorded
//! outcomes, writes the run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use ward_browser::BrowserDriver;
use ward_core::fail_open::{fail_open, fail_open_with_retries};
use ward_core::{Result, WardConfig, WardError};
use ward_report::{ResultStore, RunStats, RunSummary};

use crate::auth::authenticate;

#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Reachability attempts against `BASE_URL`; 0 skips the check
    pub preflight_attempts: usize,
    /// Sign in once and save the storage state for fixtures to reuse
    pub pre_authenticate: bool,
    /// Drop outcomes left over from a previous run
    pub reset_results: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            preflight_attempts: 3,
            pre_authenticate: true,
            reset_results: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub created_dirs: Vec<PathBuf>,
    /// HTTP status of the reachability check, if it ran and got an answer
    pub base_url_status: Option<u16>,
    /// Saved storage state, if pre-authentication succeeded
    pub auth_state: Option<PathBuf>,
}

pub async fn global_setup(
    config: &WardConfig,
    driver: Option<&dyn BrowserDriver>,
    options: &SetupOptions,
) -> Result<SetupReport> {
    info!("🚀 Starting global setup...");
    let mut report = SetupReport::default();

    for dir in config.settings.paths.output_dirs() {
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await?;
            info!("📁 Created directory: {}", dir.display());
            report.created_dirs.push(dir.to_path_buf());
        }
    }

    if options.reset_results {
        let store = ResultStore::in_dir(&config.settings.paths.reports_dir);
        fail_open("reset results", || store.reset()).await;
    }

    if options.preflight_attempts > 0 {
        report.base_url_status =
            fail_open_with_retries("reachability check", || check_reachable(config), options.preflight_attempts)
                .await;
        if let Some(status) = report.base_url_status {
            info!("🌐 {} answered with HTTP {}", config.base_url, status);
        }
    }

    if options.pre_authenticate {
        match driver {
            Some(driver) => {
                info!("🔐 Setting up authentication...");
                report.auth_state = fail_open("pre-authentication", || save_auth_state(driver, config)).await;
                if report.auth_state.is_none() {
                    warn!("⚠️ Authentication setup skipped, fixtures will sign in themselves");
                }
            }
            None => debug!("No browser driver, skipping pre-authentication"),
        }
    }

    info!("✅ Global setup completed");
    Ok(report)
}

/// GET `BASE_URL` and return the status code; any HTTP answer counts
pub async fn check_reachable(config: &WardConfig) -> Result<u16> {
    let client = reqwest::Client::builder()
        .timeout(config.api_timeout)
        .build()
        .map_err(|e| WardError::Config(format!("HTTP client: {}", e)))?;

    let resp = client
        .get(&config.base_url)
        .send()
        .await
        .map_err(|e| WardError::Other(format!("{} unreachable: {}", config.base_url, e)))?;

    Ok(resp.status().as_u16())
}

async fn save_auth_state(driver: &dyn BrowserDriver, config: &WardConfig) -> Result<PathBuf> {
    let page = driver.new_page().await?;

    let saved = async {
        authenticate(page.as_ref(), &config.user, config).await?;
        let path = config.settings.paths.auth_state_file.clone();
        page.storage_state().await?.save(&path)?;
        info!("✅ Authentication state saved to {}", path.display());
        Ok::<_, WardError>(path)
    }
    .await;

    fail_open("close setup page", || page.close()).await;
    saved
}

/// `reports/test-summary.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownSummary {
    pub timestamp: DateTime<Utc>,
    pub stats: RunStats,
    pub environment: SummaryEnvironment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEnvironment {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub browser: String,
    pub ci: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    pub deleted: Vec<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub stats: Option<RunStats>,
}

pub async fn global_teardown(config: &WardConfig) -> TeardownReport {
    info!("🧹 Starting global teardown...");
    let mut report = TeardownReport::default();
    let paths = &config.settings.paths;

    info!("🗑️ Cleaning up temporary files...");
    let temp_files = std::iter::once(&paths.auth_state_file).chain(paths.temp_auth_files.iter());
    for file in temp_files {
        match tokio::fs::remove_file(file).await {
            Ok(()) => {
                info!("🗑️ Deleted: {}", file.display());
                report.deleted.push(file.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not delete {}: {}", file.display(), e),
        }
    }

    let store = ResultStore::in_dir(&paths.reports_dir);
    if store.exists() {
        info!("📊 Generating test summary...");
        if let Some((path, stats)) = fail_open("test summary", || write_run_summaries(config, &store)).await {
            report.summary_path = Some(path);
            report.stats = Some(stats);
        }
    }

    info!("✅ Global teardown completed");
    report
}

/// Write `test-summary.json` plus the custom JSON/HTML summary
pub async fn write_run_summaries(config: &WardConfig, store: &ResultStore) -> Result<(PathBuf, RunStats)> {
    let outcomes = store.load_all().await?;
    let summary = RunSummary::from_outcomes(outcomes);
    let reports_dir = &config.settings.paths.reports_dir;

    let teardown = TeardownSummary {
        timestamp: Utc::now(),
        stats: summary.stats,
        environment: SummaryEnvironment {
            base_url: config.base_url.clone(),
            browser: config.settings.browser.project.clone(),
            ci: config.ci,
        },
    };

    tokio::fs::create_dir_all(reports_dir).await?;
    let path = reports_dir.join("test-summary.json");
    tokio::fs::write(&path, serde_json::to_string_pretty(&teardown)?).await?;
    info!("📊 Test summary saved to {}", path.display());

    summary.write(reports_dir)?;
    summary.log_console_summary();

    Ok((path, summary.stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;
    use ward_browser::fake::FakeDriver;
    use ward_core::testing::sample_config;
    use ward_core::TestStatus;
    use ward_report::TestOutcome;

    fn no_network() -> SetupOptions {
        SetupOptions {
            preflight_attempts: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_setup_creates_dirs_and_saves_state() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let driver = FakeDriver::new(config.base_url.clone(), config.settings.login.clone())
            .with_account(&config.user.email, &config.user.password);

        let report = global_setup(&config, Some(&driver), &no_network()).await.unwrap();

        assert_eq!(report.created_dirs.len(), 4);
        assert!(config.settings.paths.reports_dir.is_dir());
        assert_eq!(report.auth_state.as_ref(), Some(&config.settings.paths.auth_state_file));
        assert!(config.settings.paths.auth_state_file.exists());
        assert_eq!(driver.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_setup_survives_failed_login() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let driver = Arc::new(FakeDriver::new(config.base_url.clone(), config.settings.login.clone()));

        let report = global_setup(&config, Some(driver.as_ref()), &no_network()).await.unwrap();
        assert!(report.auth_state.is_none());
        assert!(!config.settings.paths.auth_state_file.exists());
        assert_eq!(driver.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_teardown_deletes_auth_files_and_summarizes() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let paths = &config.settings.paths;
        std::fs::write(&paths.auth_state_file, "{}").unwrap();

        let store = ResultStore::in_dir(&paths.reports_dir);
        let now = Utc::now();
        store
            .append(&TestOutcome {
                title: "login".to_string(),
                file: "tests/auth.rs".to_string(),
                project: "chromium".to_string(),
                status: TestStatus::Passed,
                duration: 120,
                start_time: now,
                end_time: now,
                retry: 0,
                error: None,
                screenshots: Vec::new(),
            })
            .await
            .unwrap();

        let report = global_teardown(&config).await;
        assert_eq!(report.deleted, vec![paths.auth_state_file.clone()]);
        assert_eq!(report.stats.unwrap().passed, 1);

        let summary: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(report.summary_path.unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["environment"]["baseURL"], "https://console.example.com");
        assert_eq!(summary["environment"]["browser"], "chromium");
        assert!(paths.reports_dir.join("custom-test-report.json").exists());
        assert!(paths.reports_dir.join("custom-test-summary.html").exists());
    }

    #[tokio::test]
    async fn test_teardown_without_results() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let report = global_teardown(&config).await;
        assert!(report.deleted.is_empty());
        assert!(report.summary_path.is_none());
    }
}
