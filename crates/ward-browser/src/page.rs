//! The page capability surface consumed by fixtures, reporters and screenshots

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use ward_core::{Result, WardError};

/// Interval between polls in the provided wait helpers
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser-side activity forwarded to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageEvent {
    Request { url: String, method: String },
    Response { url: String, status: u16 },
    RequestFailed { url: String, error: String },
    Console { level: String, text: String },
    PageError { message: String },
}

/// Callback invoked for every [`PageEvent`]
pub type PageListener = Arc<dyn Fn(&PageEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Serialized session state reusable to skip re-authentication
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

impl StorageState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Unix seconds, -1 for session cookies
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_expires() -> f64 {
    -1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

/// A single browser page inside its own isolated context
///
/// Every interaction is a suspension point. After [`Page::close`] every
/// operation fails with [`WardError::PageClosed`].
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn url(&self) -> Result<String>;

    /// Replace the value of an input
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Whether an element matching `selector` is currently rendered and visible
    async fn element_visible(&self, selector: &str) -> Result<bool>;

    /// Whether a visible element matching `selector` contains `text`
    async fn text_visible(&self, selector: &str, text: &str) -> Result<bool>;

    /// Click the first visible element matching `selector` that contains `text`
    async fn click_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Wait until the document is loaded and the network has settled
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// PNG bytes of the viewport, or of the whole document when `full_page`
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    async fn element_screenshot(&self, selector: &str) -> Result<Vec<u8>>;

    async fn set_viewport(&self, viewport: Viewport) -> Result<()>;

    async fn viewport(&self) -> Result<Viewport>;

    async fn user_agent(&self) -> Result<String>;

    /// Set a localStorage entry for the current origin
    async fn set_local_storage(&self, key: &str, value: &str) -> Result<()>;

    async fn storage_state(&self) -> Result<StorageState>;

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()>;

    /// Register a listener for network and console activity
    fn subscribe(&self, listener: PageListener);

    fn is_closed(&self) -> bool;

    /// Close the page and dispose its browser context; idempotent
    async fn close(&self) -> Result<()>;

    /// Poll until `selector` is visible or fail with [`WardError::Timeout`]
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.element_visible(selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(WardError::Timeout(format!(
                    "Element {} not visible after {}ms",
                    selector,
                    timeout.as_millis()
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Visibility probe that reports `false` instead of timing out
    async fn is_visible(&self, selector: &str, timeout: Duration) -> bool {
        self.wait_for_selector(selector, timeout).await.is_ok()
    }

    /// Poll until the URL contains `fragment`; returns the matching URL
    async fn wait_for_url_containing(&self, fragment: &str, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let url = self.url().await?;
            if url.contains(fragment) {
                return Ok(url);
            }
            if Instant::now() >= deadline {
                return Err(WardError::Timeout(format!(
                    "URL did not contain {} after {}ms (at {})",
                    fragment,
                    timeout.as_millis(),
                    url
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Factory for isolated pages
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Fresh page in a new browser context; the caller owns closing it
    async fn new_page(&self) -> Result<Arc<dyn Page>>;
}
