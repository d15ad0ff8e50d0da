//! Configuration management for Ward
//!
//! Two layers:
//! - [`WardConfig`]: values sourced from the environment (credentials, URLs, timeouts).
//!   Built once at process start and shared as `Arc<WardConfig>`.
//! - [`WardSettings`]: repository-level settings loaded from `.ward/config.toml`
//!   (output paths, selector catalogs, viewport profiles, suite runner).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env::Environment;
use crate::{Result, WardError};

/// Login identity sourced from the environment
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
}

impl Account {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Environment-driven configuration
#[derive(Debug, Clone)]
pub struct WardConfig {
    /// Target deployment exactly as `BASE_URL` gives it
    pub base_url: String,
    /// Per-action timeout (`API_TIMEOUT`, ms)
    pub api_timeout: Duration,
    /// Navigation timeout (`PAGE_TIMEOUT`, ms)
    pub page_timeout: Duration,
    /// Standard user (`TEST_USER_EMAIL` / `TEST_USER_PASSWORD`)
    pub user: Account,
    /// Administrator (`ADMIN_USER_*` or `SYSTEM_ADMIN_*`)
    pub admin: Account,
    /// Optional temporary user (`TEMP_USER_EMAIL` / `TEMP_USER_PASSWORD`)
    pub temp_user: Option<Account>,
    pub team_name: String,
    /// `VM_WORKER_IPS`, one machine fixture per entry
    pub worker_ips: Vec<String>,
    pub machine_user: String,
    pub machine_password: String,
    pub repo_name: String,
    pub ci: bool,
    pub screenshot_on_failure: bool,
    /// Raw `RECORD_VIDEO` mode, `None` when off
    pub record_video: Option<String>,
    /// Maximum retries for a failed test file
    pub retries: u32,
    /// Current retry of this process (0 on the first attempt)
    pub retry: u32,
    pub settings: WardSettings,
}

impl WardConfig {
    /// Build the configuration from an environment snapshot with default settings
    pub fn from_env(env: &Environment) -> Result<Self> {
        Self::from_env_with_settings(env, WardSettings::default())
    }

    /// Build the configuration, reading `.ward/config.toml` under `root` if present
    pub fn load(env: &Environment, root: &Path) -> Result<Self> {
        let settings = WardSettings::load_or_default(root)?;
        Self::from_env_with_settings(env, settings)
    }

    pub fn from_env_with_settings(env: &Environment, settings: WardSettings) -> Result<Self> {
        let base_url = env.require("BASE_URL")?;
        let api_timeout = Duration::from_millis(env.require_parsed::<u64>("API_TIMEOUT")?);
        let page_timeout = Duration::from_millis(env.require_parsed::<u64>("PAGE_TIMEOUT")?);

        let user = Account::new(
            env.require("TEST_USER_EMAIL")?,
            env.require("TEST_USER_PASSWORD")?,
        );
        let admin = Account::new(
            env.require_any(&["ADMIN_USER_EMAIL", "SYSTEM_ADMIN_EMAIL"])?,
            env.require_any(&["ADMIN_USER_PASSWORD", "SYSTEM_ADMIN_PASSWORD"])?,
        );
        let temp_user = match env.optional("TEMP_USER_EMAIL") {
            Some(email) => Some(Account::new(email, env.require("TEMP_USER_PASSWORD")?)),
            None => None,
        };

        let ci = env.flag("CI");
        let retries = match env.optional_parsed::<u32>("WARD_RETRIES")? {
            Some(n) => n,
            None if ci => 2,
            None => 0,
        };

        Ok(Self {
            base_url,
            api_timeout,
            page_timeout,
            user,
            admin,
            temp_user,
            team_name: env.require("TEAM_NAME")?,
            worker_ips: env.require_list("VM_WORKER_IPS")?,
            machine_user: env.require("VM_MACHINE_USER")?,
            machine_password: env.require("VM_MACHINE_PASSWORD")?,
            repo_name: env.require("REPO_NAME")?,
            ci,
            screenshot_on_failure: env
                .optional("SCREENSHOT_ON_FAILURE")
                .map(|v| v == "true")
                .unwrap_or(false),
            record_video: env.optional("RECORD_VIDEO").filter(|v| v != "off"),
            retries,
            retry: env.optional_parsed::<u32>("WARD_RETRY")?.unwrap_or(0),
            settings,
        })
    }

    /// Absolute URL for a route on the target deployment
    pub fn url(&self, route: &str) -> String {
        if route.starts_with("http://") || route.starts_with("https://") {
            return route.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

/// Repository-level Ward settings
///
/// Loaded from `.ward/config.toml` in the repo root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardSettings {
    /// Output and state file locations
    #[serde(default)]
    pub paths: OutputPaths,

    /// Login form selector catalog
    #[serde(default)]
    pub login: LoginSelectors,

    /// Client-side flag exposing admin-only UI
    #[serde(default)]
    pub admin_mode: UiModeFlag,

    /// Session-expired modal catalog
    #[serde(default)]
    pub session_modal: SessionModal,

    /// Device profiles for multi-viewport capture
    #[serde(default = "default_viewports")]
    pub viewports: Vec<ViewportProfile>,

    /// Suite runner configuration
    #[serde(default)]
    pub suites: SuiteSettings,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,
}

/// Output directories and state files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPaths {
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,
    #[serde(default = "default_test_results_dir")]
    pub test_results_dir: PathBuf,
    #[serde(default = "default_html_report_dir")]
    pub html_report_dir: PathBuf,
    /// Directory holding `test-data.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Standard user's storage state, written by global setup
    #[serde(default = "default_auth_state_file")]
    pub auth_state_file: PathBuf,
    /// Files removed by global teardown
    #[serde(default = "default_temp_auth_files")]
    pub temp_auth_files: Vec<PathBuf>,
}

/// Login form catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSelectors {
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Protected route probed before authenticating
    #[serde(default = "default_landing_route")]
    pub landing_route: String,
    #[serde(default = "default_email_input")]
    pub email_input: String,
    #[serde(default = "default_password_input")]
    pub password_input: String,
    #[serde(default = "default_submit_button")]
    pub submit_button: String,
    /// URL fragment that proves login completed
    #[serde(default = "default_post_login_marker")]
    pub post_login_marker: String,
    /// URL fragment that means we are still on the login page
    #[serde(default = "default_login_marker")]
    pub login_marker: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,
}

/// localStorage flag switching the console UI mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiModeFlag {
    #[serde(default = "default_ui_mode_key")]
    pub storage_key: String,
    #[serde(default = "default_ui_mode_value")]
    pub value: String,
}

/// Session-expired modal catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionModal {
    #[serde(default = "default_modal_container")]
    pub container: String,
    #[serde(default = "default_modal_marker")]
    pub marker_text: String,
    #[serde(default = "default_modal_close")]
    pub close_selector: String,
    #[serde(default = "default_modal_fallback")]
    pub fallback_button_text: String,
    #[serde(default = "default_modal_poll_ms")]
    pub poll_interval_ms: u64,
}

/// Named device viewport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Suite runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSettings {
    /// JSON document mapping suite names to ordered targets
    #[serde(default = "default_suite_config")]
    pub config_path: PathBuf,
    /// Command run per target; `{target}` is substituted
    #[serde(default = "default_runner_command")]
    pub runner_command: Vec<String>,
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Project name used in reports and screenshot directories
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Pause after a viewport resize before capturing
    #[serde(default = "default_viewport_settle_ms")]
    pub viewport_settle_ms: u64,
}

// Default value providers
fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_screenshots_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

fn default_test_results_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_html_report_dir() -> PathBuf {
    PathBuf::from("reports/html-report")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("utils/data")
}

fn default_auth_state_file() -> PathBuf {
    PathBuf::from("auth.json")
}

fn default_temp_auth_files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("auth.json"),
        PathBuf::from(".auth/user.json"),
        PathBuf::from(".auth/admin.json"),
    ]
}

fn default_login_route() -> String {
    "/console/login".to_string()
}

fn default_landing_route() -> String {
    "/console/machines".to_string()
}

fn default_email_input() -> String {
    "[data-testid=\"login-email-input\"]".to_string()
}

fn default_password_input() -> String {
    "[data-testid=\"login-password-input\"]".to_string()
}

fn default_submit_button() -> String {
    "[data-testid=\"login-submit-button\"]".to_string()
}

fn default_post_login_marker() -> String {
    "/machines".to_string()
}

fn default_login_marker() -> String {
    "/login".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_auth_timeout_ms() -> u64 {
    30_000
}

fn default_ui_mode_key() -> String {
    "uiMode".to_string()
}

fn default_ui_mode_value() -> String {
    "expert".to_string()
}

fn default_modal_container() -> String {
    ".ant-modal-content".to_string()
}

fn default_modal_marker() -> String {
    "Session Expired".to_string()
}

fn default_modal_close() -> String {
    ".ant-modal-close".to_string()
}

fn default_modal_fallback() -> String {
    "Stay Logged Out".to_string()
}

fn default_modal_poll_ms() -> u64 {
    1_000
}

fn default_viewports() -> Vec<ViewportProfile> {
    vec![
        ViewportProfile {
            name: "desktop".to_string(),
            width: 1440,
            height: 900,
        },
        ViewportProfile {
            name: "tablet".to_string(),
            width: 768,
            height: 1024,
        },
        ViewportProfile {
            name: "mobile".to_string(),
            width: 375,
            height: 667,
        },
    ]
}

fn default_suite_config() -> PathBuf {
    PathBuf::from("test-suites.json")
}

fn default_runner_command() -> Vec<String> {
    ["cargo", "test", "--test", "{target}", "--", "--test-threads=1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_project() -> String {
    "chromium".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_viewport_settle_ms() -> u64 {
    1_000
}

impl WardSettings {
    /// Load settings from `.ward/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(".ward/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| WardError::Config(format!("Failed to parse config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write default settings to `.ward/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<PathBuf> {
        let config_dir = repo_root.join(".ward");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| WardError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }
}

impl Default for WardSettings {
    fn default() -> Self {
        Self {
            paths: OutputPaths::default(),
            login: LoginSelectors::default(),
            admin_mode: UiModeFlag::default(),
            session_modal: SessionModal::default(),
            viewports: default_viewports(),
            suites: SuiteSettings::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            screenshots_dir: default_screenshots_dir(),
            test_results_dir: default_test_results_dir(),
            html_report_dir: default_html_report_dir(),
            data_dir: default_data_dir(),
            auth_state_file: default_auth_state_file(),
            temp_auth_files: default_temp_auth_files(),
        }
    }
}

impl OutputPaths {
    /// Re-root every relative path under `root`
    pub fn rooted_at(&self, root: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        Self {
            reports_dir: join(&self.reports_dir),
            screenshots_dir: join(&self.screenshots_dir),
            test_results_dir: join(&self.test_results_dir),
            html_report_dir: join(&self.html_report_dir),
            data_dir: join(&self.data_dir),
            auth_state_file: join(&self.auth_state_file),
            temp_auth_files: self.temp_auth_files.iter().map(join).collect(),
        }
    }

    /// Directories created by global setup
    pub fn output_dirs(&self) -> Vec<&Path> {
        vec![
            self.screenshots_dir.as_path(),
            self.reports_dir.as_path(),
            self.test_results_dir.as_path(),
            self.html_report_dir.as_path(),
        ]
    }
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
            landing_route: default_landing_route(),
            email_input: default_email_input(),
            password_input: default_password_input(),
            submit_button: default_submit_button(),
            post_login_marker: default_post_login_marker(),
            login_marker: default_login_marker(),
            probe_timeout_ms: default_probe_timeout_ms(),
            auth_timeout_ms: default_auth_timeout_ms(),
        }
    }
}

impl Default for UiModeFlag {
    fn default() -> Self {
        Self {
            storage_key: default_ui_mode_key(),
            value: default_ui_mode_value(),
        }
    }
}

impl Default for SessionModal {
    fn default() -> Self {
        Self {
            container: default_modal_container(),
            marker_text: default_modal_marker(),
            close_selector: default_modal_close(),
            fallback_button_text: default_modal_fallback(),
            poll_interval_ms: default_modal_poll_ms(),
        }
    }
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            config_path: default_suite_config(),
            runner_command: default_runner_command(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            project: default_project(),
            headless: default_true(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            viewport_settle_ms: default_viewport_settle_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn full_env() -> Environment {
        Environment::from_pairs([
            ("BASE_URL", "https://console.example.com/"),
            ("API_TIMEOUT", "15000"),
            ("PAGE_TIMEOUT", "30000"),
            ("TEST_USER_EMAIL", "user@example.com"),
            ("TEST_USER_PASSWORD", "user-pw"),
            ("SYSTEM_ADMIN_EMAIL", "admin@example.com"),
            ("SYSTEM_ADMIN_PASSWORD", "admin-pw"),
            ("TEAM_NAME", "Private Team"),
            ("VM_WORKER_IPS", "10.0.0.11,10.0.0.12"),
            ("VM_MACHINE_USER", "runner"),
            ("VM_MACHINE_PASSWORD", "runner-pw"),
            ("REPO_NAME", "test-repo"),
        ])
    }

    #[test]
    fn test_from_env() {
        let config = WardConfig::from_env(&full_env()).unwrap();
        assert_eq!(config.base_url, "https://console.example.com/");
        assert_eq!(config.api_timeout, Duration::from_millis(15000));
        assert_eq!(config.admin.email, "admin@example.com");
        assert_eq!(config.worker_ips.len(), 2);
        assert!(config.temp_user.is_none());
        assert!(!config.ci);
        assert_eq!(config.retries, 0);
        assert_eq!(config.retry, 0);
    }

    #[test]
    fn test_missing_required_fails() {
        let err = WardConfig::from_env(&full_env().without("TEST_USER_PASSWORD")).unwrap_err();
        assert!(matches!(err, WardError::MissingEnv(ref n) if n == "TEST_USER_PASSWORD"));
    }

    #[test]
    fn test_ci_enables_retries() {
        let config = WardConfig::from_env(&full_env().with("CI", "1")).unwrap();
        assert!(config.ci);
        assert_eq!(config.retries, 2);

        let config = WardConfig::from_env(&full_env().with("CI", "1").with("WARD_RETRIES", "5"))
            .unwrap();
        assert_eq!(config.retries, 5);
    }

    #[test]
    fn test_temp_user_requires_password() {
        let env = full_env().with("TEMP_USER_EMAIL", "temp@example.com");
        assert!(WardConfig::from_env(&env).is_err());

        let env = env.with("TEMP_USER_PASSWORD", "temp-pw");
        let config = WardConfig::from_env(&env).unwrap();
        assert_eq!(config.temp_user.unwrap().email, "temp@example.com");
    }

    #[test]
    fn test_url_join() {
        let config = WardConfig::from_env(&full_env()).unwrap();
        assert_eq!(
            config.url("/console/login"),
            "https://console.example.com/console/login"
        );
        assert_eq!(config.url("http://other/x"), "http://other/x");
    }

    #[test]
    fn test_trailing_slash_kept_on_base_url() {
        let env = full_env().with("BASE_URL", "https://console.example.com/");
        let config = WardConfig::from_env(&env).unwrap();
        assert_eq!(config.base_url, "https://console.example.com/");
        assert_eq!(
            config.url("/console/login"),
            "https://console.example.com/console/login"
        );
    }

    #[test]
    fn test_account_debug_redacts_password() {
        let account = Account::new("a@x.com", "secret");
        let debug = format!("{:?}", account);
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_settings_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        assert!(WardSettings::load_or_default(dir.path()).is_ok());

        let path = WardSettings::write_default(dir.path()).unwrap();
        assert!(path.exists());

        let loaded = WardSettings::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.viewports.len(), 3);
        assert_eq!(loaded.login.landing_route, "/console/machines");
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".ward")).unwrap();
        std::fs::write(
            dir.path().join(".ward/config.toml"),
            "[login]\nlanding_route = \"/console/dashboard\"\n",
        )
        .unwrap();

        let settings = WardSettings::load_or_default(dir.path()).unwrap();
        assert_eq!(settings.login.landing_route, "/console/dashboard");
        assert_eq!(settings.login.login_route, "/console/login");
        assert_eq!(settings.session_modal.marker_text, "Session Expired");
    }
}
