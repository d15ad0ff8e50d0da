//! Per-test fixtures and scoped runners
//!
//! [`FixtureProvider`] hands out a [`TestFixtures`] bundle for one test: an
//! isolated page (optionally authenticated as the standard user or the
//! administrator), the step reporter, the screenshot manager and the test
//! data manager. The `run_*` methods wrap a test body and guarantee teardown
//! whether the body returns an error or panics.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use ward_browser::{BrowserDriver, Page, ScreenshotManager, SessionExpiryHandler};
use ward_core::fail_open::fail_open;
use ward_core::{Result, TestInfo, TestStatus, WardConfig, WardError};
use ward_data::TestDataManager;
use ward_report::StepReporter;

use crate::auth::{authenticate, authenticate_admin, AuthOutcome};

/// Which session a fixture page starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Anonymous,
    User,
    Admin,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Everything a test body works with
pub struct TestFixtures {
    pub page: Arc<dyn Page>,
    pub reporter: StepReporter,
    pub screenshots: ScreenshotManager,
    pub data: TestDataManager,
    pub config: Arc<WardConfig>,
    kind: SessionKind,
    auth: Option<AuthOutcome>,
}

impl TestFixtures {
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// How the page was authenticated, `None` for anonymous pages
    pub fn auth_outcome(&self) -> Option<AuthOutcome> {
        self.auth
    }

    /// Handler for the session-expired modal on this page
    pub fn session_handler(&self) -> SessionExpiryHandler {
        SessionExpiryHandler::new(self.page.clone(), self.config.settings.session_modal.clone())
    }

    /// Close the page and its browser context
    pub async fn close(&self) -> Result<()> {
        if self.page.is_closed() {
            return Ok(());
        }
        self.page.close().await
    }
}

impl Drop for TestFixtures {
    fn drop(&mut self) {
        if self.page.is_closed() {
            return;
        }
        // Fixtures dropped outside the scoped runners still release the context
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    debug!("Closing page on drop failed: {}", e);
                }
            });
        }
    }
}

impl std::fmt::Debug for TestFixtures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestFixtures")
            .field("kind", &self.kind)
            .field("auth", &self.auth)
            .field("reporter", &self.reporter)
            .finish()
    }
}

/// Message carried by a panic payload
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn status_for(error: &WardError) -> TestStatus {
    match error {
        WardError::Timeout(_) => TestStatus::TimedOut,
        _ => TestStatus::Failed,
    }
}

#[derive(Clone)]
pub struct FixtureProvider {
    driver: Arc<dyn BrowserDriver>,
    config: Arc<WardConfig>,
}

impl FixtureProvider {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Arc<WardConfig>) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &Arc<WardConfig> {
        &self.config
    }

    /// Fresh test data manager, independent of any page
    pub fn test_data_manager(&self) -> TestDataManager {
        TestDataManager::from_config(&self.config)
    }

    /// Fixtures around an isolated page with no session
    pub async fn test_fixtures(&self, info: TestInfo) -> Result<TestFixtures> {
        self.open(SessionKind::Anonymous, info).await
    }

    /// Fixtures around a page signed in as the standard user
    pub async fn authenticated_page(&self, info: TestInfo) -> Result<TestFixtures> {
        self.open(SessionKind::User, info).await
    }

    /// Fixtures around a page signed in as the administrator in expert mode
    pub async fn admin_page(&self, info: TestInfo) -> Result<TestFixtures> {
        self.open(SessionKind::Admin, info).await
    }

    async fn open(&self, kind: SessionKind, info: TestInfo) -> Result<TestFixtures> {
        let page = self.driver.new_page().await?;

        let auth = match kind {
            SessionKind::Anonymous => Ok(None),
            SessionKind::User => authenticate(page.as_ref(), &self.config.user, &self.config)
                .await
                .map(Some),
            SessionKind::Admin => authenticate_admin(page.as_ref(), &self.config).await.map(Some),
        };
        let auth = match auth {
            Ok(auth) => auth,
            Err(e) => {
                fail_open("close page after failed login", || page.close()).await;
                return Err(e);
            }
        };

        let screenshots = match ScreenshotManager::new(page.clone(), &info, &self.config) {
            Ok(screenshots) => screenshots,
            Err(e) => {
                fail_open("close page after setup failure", || page.close()).await;
                return Err(e);
            }
        };

        debug!("Opened {} fixtures for {}", kind, info.title);
        Ok(TestFixtures {
            reporter: StepReporter::new(page.clone(), info, self.config.clone()),
            screenshots,
            data: TestDataManager::from_config(&self.config),
            config: self.config.clone(),
            page,
            kind,
            auth,
        })
    }

    pub async fn run_unauthenticated<T, F>(&self, info: TestInfo, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TestFixtures) -> BoxFuture<'a, Result<T>>,
    {
        self.run(SessionKind::Anonymous, info, body).await
    }

    pub async fn run_authenticated<T, F>(&self, info: TestInfo, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TestFixtures) -> BoxFuture<'a, Result<T>>,
    {
        self.run(SessionKind::User, info, body).await
    }

    pub async fn run_admin<T, F>(&self, info: TestInfo, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TestFixtures) -> BoxFuture<'a, Result<T>>,
    {
        self.run(SessionKind::Admin, info, body).await
    }

    /// Run `body` with fixtures of `kind`, then tear down unconditionally
    ///
    /// Teardown captures an error screenshot when enabled, finalizes the
    /// reporter and closes the page. A panic in `body` is re-raised after
    /// teardown.
    pub async fn run<T, F>(&self, kind: SessionKind, info: TestInfo, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TestFixtures) -> BoxFuture<'a, Result<T>>,
    {
        let mut fixtures = self.open(kind, info).await?;
        let result = AssertUnwindSafe(body(&mut fixtures)).catch_unwind().await;

        let failure = match &result {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some((status_for(e), e.to_string())),
            Err(panic) => Some((TestStatus::Failed, panic_message(panic.as_ref()))),
        };

        match &failure {
            None => {
                if fixtures.reporter.status().is_none() {
                    fixtures.reporter.set_status(TestStatus::Passed);
                }
            }
            Some((status, message)) => {
                error!("❌ {} failed: {}", fixtures.reporter.info().title, message);
                fixtures.reporter.set_status(*status);
                fixtures.reporter.record_error(message.clone());

                if self.config.screenshot_on_failure && !fixtures.page.is_closed() {
                    let shots = &fixtures.screenshots;
                    if let Some(path) = fail_open("error screenshot", || shots.capture_error(message)).await {
                        info!("📸 Error screenshot: {}", path.display());
                    }
                }
            }
        }

        let taken = fixtures.screenshots.screenshots();
        fixtures.reporter.add_screenshots(taken);
        fixtures.reporter.finalize_test().await;

        if let Err(e) = fixtures.close().await {
            warn!("Closing page failed: {}", e);
        }

        match result {
            Ok(outcome) => outcome,
            Err(panic) => resume_unwind(panic),
        }
    }
}
