//! Browser capability surface for the Ward console harness
//!
//! Fixtures and reporters only talk to the [`Page`] trait. Two backends exist:
//!
//! - [`chrome`]: Chrome DevTools Protocol via `headless_chrome`, one isolated
//!   browser context per page
//! - `fake` (feature `fake`): an in-memory console used by tests that must not
//!   launch a browser
//!
//! On top of the trait sit the [`ScreenshotManager`] and the
//! [`SessionExpiryHandler`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ward_browser::{BrowserDriver, ChromeDriver, ScreenshotManager};
//! use ward_core::{Environment, TestInfo, WardConfig};
//!
//! #[tokio::main]
//! async fn main() -> ward_core::Result<()> {
//!     let config = WardConfig::from_env(&Environment::from_process())?;
//!     let driver = ChromeDriver::launch(&config.settings.browser, config.page_timeout)?;
//!
//!     let page = driver.new_page().await?;
//!     page.goto(&config.url("/console/login")).await?;
//!
//!     let shots = ScreenshotManager::new(page.clone(), &TestInfo::new("login page"), &config)?;
//!     shots.capture_step("login form", Default::default()).await?;
//!
//!     page.close().await
//! }
//! ```

pub mod chrome;
pub mod page;
pub mod screenshot;
pub mod session;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use chrome::{ChromeDriver, ChromePage};
pub use page::{
    BrowserDriver, Cookie, OriginState, Page, PageEvent, PageListener, StorageEntry, StorageState,
    Viewport,
};
pub use screenshot::{Comparison, FlowStep, ScreenshotManager, ScreenshotOptions};
pub use session::{AutoDismissHandle, SessionExpiryHandler};
