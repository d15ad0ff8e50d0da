//! End-to-end fixture scenarios against the in-memory console

use futures::FutureExt;
use std::sync::Arc;
use tempfile::tempdir;
use ward_browser::fake::FakeDriver;
use ward_browser::Page;
use ward_core::testing::{config_from, sample_environment};
use ward_core::{TestInfo, TestStatus, WardConfig, WardError};
use ward_fixtures::{global_teardown, init_test_logging, FixtureProvider};

fn setup(config: WardConfig) -> (FakeDriver, FixtureProvider) {
    init_test_logging();
    let driver = FakeDriver::new(config.base_url.clone(), config.settings.login.clone())
        .with_account(&config.user.email, &config.user.password)
        .with_account(&config.admin.email, &config.admin.password);
    let provider = FixtureProvider::new(Arc::new(driver.clone()), Arc::new(config));
    (driver, provider)
}

fn detailed_report(reports_dir: &std::path::Path) -> serde_json::Value {
    let entry = std::fs::read_dir(reports_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("detailed-")
        })
        .expect("detailed report written");
    serde_json::from_str(&std::fs::read_to_string(entry).unwrap()).unwrap()
}

#[tokio::test]
async fn authenticated_page_is_past_login() {
    let dir = tempdir().unwrap();
    let (_driver, provider) = setup(config_from(&sample_environment(), dir.path()));

    let url = provider
        .run_authenticated(TestInfo::new("authenticated page"), |fx| {
            async move { fx.page.url().await }.boxed()
        })
        .await
        .unwrap();

    assert!(!url.contains("/login"));
}

#[tokio::test]
async fn invalid_credentials_fail_fixture_setup() {
    let dir = tempdir().unwrap();
    let env = sample_environment().with("TEST_USER_PASSWORD", "wrong-password");
    let config = config_from(&env, dir.path());

    let driver = FakeDriver::new(config.base_url.clone(), config.settings.login.clone())
        .with_account("user@example.com", "user-pw");
    let provider = FixtureProvider::new(Arc::new(driver.clone()), Arc::new(config));

    let mut body_ran = false;
    let err = provider
        .run_authenticated(TestInfo::new("bad login"), |_fx| {
            body_ran = true;
            async move { Ok(()) }.boxed()
        })
        .await
        .unwrap_err();

    assert!(!body_ran);
    assert!(matches!(err, WardError::Authentication(_)));
    assert!(err.to_string().contains("still on login page"));
    assert_eq!(driver.open_pages(), 0);
}

#[tokio::test]
async fn created_user_lifecycle() {
    let dir = tempdir().unwrap();
    let (_driver, provider) = setup(config_from(&sample_environment(), dir.path()));

    provider
        .run_unauthenticated(TestInfo::new("created user lifecycle"), |fx| {
            async move {
                fx.data.add_created_user("a@x.com", "p", false)?;
                let latest = fx.data.get_created_user(None)?;
                assert_eq!(latest.email, "a@x.com");
                assert!(!latest.activated);

                fx.data.update_created_user_activation("a@x.com", true)?;
                assert!(fx.data.get_created_user(Some("a@x.com"))?.activated);
                Ok(())
            }
            .boxed()
        })
        .await
        .unwrap();

    // Persists for the next test file
    let again = provider.test_data_manager().get_created_user(Some("a@x.com")).unwrap();
    assert!(again.activated);
}

#[tokio::test]
async fn duplicate_step_names_complete_last_opened() {
    let dir = tempdir().unwrap();
    let config = config_from(&sample_environment(), dir.path());
    let reports_dir = config.settings.paths.reports_dir.clone();
    let (_driver, provider) = setup(config);

    provider
        .run_authenticated(TestInfo::new("duplicate steps"), |fx| {
            async move {
                fx.reporter.start_step("X", None);
                fx.reporter.start_step("X", None);
                fx.reporter.complete_step("X", TestStatus::Passed, None);
                Ok(())
            }
            .boxed()
        })
        .await
        .unwrap();

    let report = detailed_report(&reports_dir);
    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert!(steps[0].get("endTime").is_none());
    assert!(steps[0].get("duration").is_none());
    assert_eq!(steps[1]["status"], "passed");
    assert!(steps[1]["duration"].is_i64());
}

#[tokio::test]
async fn detailed_report_counts_steps_and_records_base_url() {
    let dir = tempdir().unwrap();
    let env = sample_environment();
    let config = config_from(&env, dir.path());
    let reports_dir = config.settings.paths.reports_dir.clone();
    let (_driver, provider) = setup(config);

    let path = provider
        .run_admin(TestInfo::new("report shape @system"), |fx| {
            async move {
                for name in ["open users", "create user", "activate user"] {
                    let step = fx.reporter.start_step(name, None);
                    fx.reporter.complete(step, TestStatus::Passed, None);
                }
                fx.reporter.generate_detailed_report().await
            }
            .boxed()
        })
        .await
        .unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report["steps"].as_array().unwrap().len(), 3);
    assert_eq!(
        report["environment"]["baseURL"],
        env.optional("BASE_URL").unwrap()
    );
    assert!(path.starts_with(&reports_dir));
}

#[tokio::test]
async fn failed_tests_reach_the_run_summary() {
    let dir = tempdir().unwrap();
    let config = config_from(&sample_environment(), dir.path());
    let teardown_config = config.clone();
    let (driver, provider) = setup(config);

    let _ = provider
        .run_authenticated(TestInfo::new("passes"), |_fx| async move { Ok(()) }.boxed())
        .await;
    let _ = provider
        .run_authenticated(TestInfo::new("fails"), |fx| {
            async move { fx.page.click("#does-not-exist").await }.boxed()
        })
        .await;
    assert_eq!(driver.open_pages(), 0);

    let report = global_teardown(&teardown_config).await;
    let stats = report.stats.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.passed, 1);
    assert_eq!(stats.failed, 1);
}
