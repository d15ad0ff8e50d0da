//! Metadata describing the test a fixture is scoped to

use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::WardConfig;

/// Final status of a test or step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
    Skipped,
    TimedOut,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::TimedOut => write!(f, "timedOut"),
        }
    }
}

impl std::str::FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            "timedout" | "timed_out" => Ok(Self::TimedOut),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

impl TestStatus {
    /// Console icon used in narration lines
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Passed => "✅",
            Self::Failed => "❌",
            Self::Skipped => "⏭️",
            Self::TimedOut => "⏱️",
        }
    }
}

/// Test identity and retry position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    pub title: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub project: String,
    /// Current retry, 0 on the first attempt
    #[serde(default)]
    pub retry: u32,
    /// Retries allowed by the configuration
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TestInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file: String::new(),
            project: "chromium".to_string(),
            retry: 0,
            max_retries: 0,
            tags: Vec::new(),
        }
    }

    /// Fill project and retry position from the process configuration
    pub fn for_config(title: impl Into<String>, config: &WardConfig) -> Self {
        Self {
            project: config.settings.browser.project.clone(),
            retry: config.retry,
            max_retries: config.retries,
            ..Self::new(title)
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_retry(mut self, retry: u32, max_retries: u32) -> Self {
        self.retry = retry;
        self.max_retries = max_retries;
        self
    }

    /// Tags are taken from `@tag` words in the title plus any given explicitly
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// `@tag` words embedded in the title
    pub fn title_tags(&self) -> Vec<String> {
        self.title
            .split_whitespace()
            .filter(|w| w.starts_with('@') && w.len() > 1)
            .map(|w| w.to_string())
            .collect()
    }

    /// `[attempt/total] ` prefix, empty on the first attempt
    pub fn retry_label(&self) -> String {
        if self.retry == 0 {
            return String::new();
        }
        format!("[{}/{}] ", self.retry + 1, self.max_retries + 1)
    }

    /// `<timestamp>_<sanitized lowercase title>`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", file_timestamp(), sanitize_file_name(&self.title))
    }
}

/// Replace anything outside `[a-zA-Z0-9-_.]` with `_`, collapse runs, lowercase
pub fn sanitize_file_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    static RUNS: OnceLock<Regex> = OnceLock::new();

    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\-_.]").expect("static regex"));
    let runs = RUNS.get_or_init(|| Regex::new(r"_+").expect("static regex"));

    let replaced = unsafe_chars.replace_all(name, "_");
    runs.replace_all(&replaced, "_").to_lowercase()
}

/// Local timestamp used in report and screenshot names
pub fn file_timestamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("should login @auth @smoke"),
            "should_login_auth_smoke"
        );
        assert_eq!(sanitize_file_name("Create  Machine!!"), "create_machine_");
        assert_eq!(sanitize_file_name("v1.2-final"), "v1.2-final");
    }

    #[test]
    fn test_retry_label() {
        let info = TestInfo::new("t");
        assert_eq!(info.retry_label(), "");

        let info = info.with_retry(1, 2);
        assert_eq!(info.retry_label(), "[2/3] ");
    }

    #[test]
    fn test_title_tags() {
        let info = TestInfo::new("should activate user @system @users");
        assert_eq!(info.title_tags(), vec!["@system", "@users"]);
    }

    #[test]
    fn test_status_parse_and_icon() {
        assert_eq!("failed".parse::<TestStatus>().unwrap(), TestStatus::Failed);
        assert_eq!("timedOut".parse::<TestStatus>().unwrap(), TestStatus::TimedOut);
        assert!("bogus".parse::<TestStatus>().is_err());
        assert_eq!(TestStatus::Skipped.icon(), "⏭️");
        assert_eq!(
            serde_json::to_string(&TestStatus::TimedOut).unwrap(),
            "\"timedOut\""
        );
    }
}
