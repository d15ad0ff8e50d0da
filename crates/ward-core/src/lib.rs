//! # ward-core
//!
//! Shared foundation for the Ward console end-to-end harness.
//!
//! - [`WardError`] is the single error taxonomy used by every crate
//! - [`Environment`] and [`require_env_var`] are the fail-fast configuration accessors
//! - [`WardConfig`] is the typed configuration built once per process and passed by reference
//! - [`fail_open`] contains instrumentation failures at the component boundary
//! - [`TestInfo`] describes the test a fixture or reporter is scoped to

mod error;
mod test_info;

pub mod config;
pub mod env;
pub mod fail_open;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{
    Account, BrowserSettings, LoginSelectors, OutputPaths, SessionModal, SuiteSettings, UiModeFlag,
    ViewportProfile, WardConfig, WardSettings,
};
pub use env::{require_env_var, Environment};
pub use error::{Result, WardError};
pub use test_info::{file_timestamp, sanitize_file_name, TestInfo, TestStatus};
