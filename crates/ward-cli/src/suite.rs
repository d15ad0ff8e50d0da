//! Sequential suite runner
//!
//! A suite is an ordered list of test targets in `test-suites.json`:
//!
//! ```json
//! { "suites": { "auth": ["auth", "dashboard"], "users": ["users", "permissions"] } }
//! ```
//!
//! Targets run one after another, each through the configured runner
//! command with a single worker. A failing target is retried up to the
//! configured count (the attempt number is exported as `WARD_RETRY`); a
//! target that still fails aborts the rest of the suite.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;
use ward_report::BANNER;

#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    pub suites: BTreeMap<String, Vec<String>>,
}

impl SuiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("{} not found", path.display());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.suites.keys().map(String::as_str).collect()
    }

    pub fn sequence(&self, suite: &str) -> Option<&[String]> {
        self.suites.get(suite).map(Vec::as_slice)
    }
}

/// Substitute `{target}` in the template and append the extra arguments
pub fn build_command(template: &[String], target: &str, extra: &[String]) -> Result<(String, Vec<String>)> {
    let mut parts = template.iter().map(|part| part.replace("{target}", target));
    let program = match parts.next() {
        Some(program) => program,
        None => bail!("Runner command is empty"),
    };
    let mut args: Vec<String> = parts.collect();
    args.extend(extra.iter().cloned());
    Ok((program, args))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRun {
    pub target: String,
    pub attempts: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteOutcome {
    pub suite: String,
    pub runs: Vec<TargetRun>,
}

impl SuiteOutcome {
    pub fn passed(&self) -> bool {
        self.runs.iter().all(|r| r.passed)
    }

    pub fn failed_target(&self) -> Option<&str> {
        self.runs.iter().find(|r| !r.passed).map(|r| r.target.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SuiteRunner {
    pub command: Vec<String>,
    pub retries: u32,
    pub workdir: PathBuf,
}

impl SuiteRunner {
    pub async fn run(&self, suite: &str, targets: &[String], extra: &[String]) -> Result<SuiteOutcome> {
        println!("{}", format!("🚀 Running test suite: {}", suite).bold());
        if !extra.is_empty() {
            println!("with args: {}", extra.join(" "));
        }
        println!("📋 Sequence: {}", targets.join(" -> "));
        println!("{}", BANNER);

        let mut outcome = SuiteOutcome {
            suite: suite.to_string(),
            runs: Vec::new(),
        };

        for target in targets {
            println!("\n🔍 Executing: {}", target.cyan());
            let run = self.run_target(target, extra).await?;
            let passed = run.passed;
            outcome.runs.push(run);

            if !passed {
                eprintln!("{}", format!("❌ Failed: {}", target).red());
                return Ok(outcome);
            }
            println!("{}", format!("✅ Passed: {}", target).green());
        }

        println!("\n{}", BANNER);
        println!("{}", format!("✨ Suite \"{}\" completed successfully!", suite).green().bold());
        Ok(outcome)
    }

    async fn run_target(&self, target: &str, extra: &[String]) -> Result<TargetRun> {
        let (program, args) = build_command(&self.command, target, extra)?;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                println!(
                    "{}",
                    format!("🔁 Retrying {} ({}/{})", target, attempt, self.retries).yellow()
                );
            }
            debug!("Running {} {:?} (WARD_RETRY={})", program, args, attempt);

            let status = Command::new(&program)
                .args(&args)
                .current_dir(&self.workdir)
                .env("WARD_RETRY", attempt.to_string())
                .env("WARD_RETRIES", self.retries.to_string())
                .status()
                .await
                .with_context(|| format!("Failed to start {}", program))?;

            if status.success() {
                return Ok(TargetRun {
                    target: target.to_string(),
                    attempts: attempt + 1,
                    passed: true,
                });
            }
        }

        Ok(TargetRun {
            target: target.to_string(),
            attempts: self.retries + 1,
            passed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_build_command() {
        let template: Vec<String> = ["cargo", "test", "--test", "{target}", "--", "--test-threads=1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (program, args) = build_command(&template, "auth", &["--nocapture".to_string()]).unwrap();
        assert_eq!(program, "cargo");
        assert_eq!(args, vec!["test", "--test", "auth", "--", "--test-threads=1", "--nocapture"]);

        assert!(build_command(&[], "auth", &[]).is_err());
    }

    #[test]
    fn test_load_suite_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test-suites.json");
        assert!(SuiteConfig::load(&path).is_err());

        std::fs::write(&path, r#"{"suites": {"users": ["users", "permissions"], "auth": ["auth"]}}"#).unwrap();
        let config = SuiteConfig::load(&path).unwrap();
        assert_eq!(config.names(), vec!["auth", "users"]);
        assert_eq!(config.sequence("users").unwrap(), ["users", "permissions"]);
        assert!(config.sequence("storage").is_none());
    }

    #[tokio::test]
    async fn test_suite_aborts_on_first_failure() {
        let dir = tempdir().unwrap();
        let runner = SuiteRunner {
            command: sh("test {target} != bad"),
            retries: 0,
            workdir: dir.path().to_path_buf(),
        };
        let targets: Vec<String> = ["auth", "bad", "users"].iter().map(|s| s.to_string()).collect();

        let outcome = runner.run("auth", &targets, &[]).await.unwrap();
        assert!(!outcome.passed());
        assert_eq!(outcome.runs.len(), 2);
        assert_eq!(outcome.failed_target(), Some("bad"));
    }

    #[tokio::test]
    async fn test_failed_target_is_retried() {
        let dir = tempdir().unwrap();
        let runner = SuiteRunner {
            command: sh("test \"$WARD_RETRY\" = 1"),
            retries: 2,
            workdir: dir.path().to_path_buf(),
        };

        let outcome = runner.run("flaky", &["flaky".to_string()], &[]).await.unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.runs[0].attempts, 2);
    }
}
