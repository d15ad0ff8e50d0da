//! # ward-report
//!
//! Turns imperative test actions into structured records.
//!
//! - [`StepReporter`]: per-test step log, metrics, activity capture and the
//!   detailed JSON/HTML report
//! - [`ResultStore`] and [`RunSummary`]: run-level results and the custom
//!   JSON/HTML summary
//!
//! Reporting never fails the enclosing test. Operations that can only fail for
//! instrumentation reasons log a warning and carry on.

mod activity;
mod detailed;
mod html;
mod metrics;
mod reporter;
mod results;
mod step;
mod summary;

pub use activity::{ActivityEntry, ActivityKind, ActivityLog};
pub use detailed::{DetailedReport, ExecutionInfo, ReportEnvironment, ReportTestInfo};
pub use html::{escape_html, render_detailed_html, render_summary_html};
pub use metrics::{collect_metrics, TestMetrics};
pub use reporter::{format_duration, StepReporter, BANNER};
pub use results::{ResultStore, TestOutcome};
pub use step::{StepHandle, TestStep};
pub use summary::{RunStats, RunSummary};
