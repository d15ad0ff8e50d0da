//! Shared configuration fixtures for tests across the workspace

use std::path::Path;

use crate::{Environment, WardConfig, WardSettings};

/// Environment carrying every required variable
pub fn sample_environment() -> Environment {
    Environment::from_pairs([
        ("BASE_URL", "https://console.example.com"),
        ("API_TIMEOUT", "15000"),
        ("PAGE_TIMEOUT", "30000"),
        ("TEST_USER_EMAIL", "user@example.com"),
        ("TEST_USER_PASSWORD", "user-pw"),
        ("ADMIN_USER_EMAIL", "admin@example.com"),
        ("ADMIN_USER_PASSWORD", "admin-pw"),
        ("TEAM_NAME", "Private Team"),
        ("VM_WORKER_IPS", "10.0.0.11,10.0.0.12"),
        ("VM_MACHINE_USER", "runner"),
        ("VM_MACHINE_PASSWORD", "runner-pw"),
        ("REPO_NAME", "test-repo"),
    ])
}

/// Configuration whose output paths live under `root`
pub fn sample_config(root: &Path) -> WardConfig {
    config_from(&sample_environment(), root)
}

/// Configuration for a custom environment, output paths under `root`
pub fn config_from(env: &Environment, root: &Path) -> WardConfig {
    let mut settings = WardSettings::default();
    settings.paths = settings.paths.rooted_at(root);
    settings.browser.viewport_settle_ms = 0;
    settings.login.probe_timeout_ms = 200;
    settings.login.auth_timeout_ms = 500;
    settings.session_modal.poll_interval_ms = 20;
    WardConfig::from_env_with_settings(env, settings).expect("sample environment is complete")
}
