//! Logging and `.env` helpers for test binaries

use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once per process
///
/// Honors `RUST_LOG`, defaulting to `info`. Later calls are no-ops.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Load `.env` from the current directory or a parent, if there is one
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) => {
            debug!("No .env loaded: {}", e);
            None
        }
    }
}
