//! # ward-fixtures
//!
//! Composes configuration, test data, browser pages and reporting into the
//! fixtures console tests consume.
//!
//! - [`FixtureProvider`]: `authenticated_page`, `admin_page` and the scoped
//!   `run_*` runners with guaranteed teardown
//! - [`authenticate`]: probe-then-authenticate login
//! - [`global_setup`] / [`global_teardown`]: once-per-run directory, auth-state
//!   and summary handling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::FutureExt;
//! use ward_browser::{ChromeDriver, Page};
//! use ward_core::{Environment, TestInfo, TestStatus, WardConfig};
//! use ward_fixtures::FixtureProvider;
//!
//! async fn lists_machines() -> ward_core::Result<()> {
//!     ward_fixtures::init_test_logging();
//!     let config = Arc::new(WardConfig::from_env(&Environment::from_process())?);
//!     let driver = Arc::new(ChromeDriver::launch(&config.settings.browser, config.page_timeout)?);
//!
//!     FixtureProvider::new(driver, config)
//!         .run_authenticated(TestInfo::new("lists machines @machines"), |fx| {
//!             async move {
//!                 let step = fx.reporter.start_step("open machines", None);
//!                 fx.page.wait_for_network_idle(fx.config.page_timeout).await?;
//!                 fx.reporter.complete(step, TestStatus::Passed, None);
//!                 Ok(())
//!             }
//!             .boxed()
//!         })
//!         .await
//! }
//! ```

mod auth;
mod fixtures;
mod global;
mod logging;

pub use auth::{authenticate, authenticate_admin, AuthOutcome};
pub use fixtures::{FixtureProvider, SessionKind, TestFixtures};
pub use global::{
    check_reachable, global_setup, global_teardown, write_run_summaries, SetupOptions, SetupReport,
    SummaryEnvironment, TeardownReport, TeardownSummary,
};
pub use logging::{init_test_logging, load_dotenv};
