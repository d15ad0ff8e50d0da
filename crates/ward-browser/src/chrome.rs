//! Chrome DevTools Protocol backend
//!
//! Each page lives in its own browser context, so cookies and storage never
//! leak between fixtures. Closing the page disposes the context.

use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::Target::DisposeBrowserContext;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use ward_core::{BrowserSettings, Result, WardError};

use crate::page::{
    BrowserDriver, Cookie, OriginState, Page, PageEvent, PageListener, StorageEntry, StorageState,
    Viewport, POLL_INTERVAL,
};

/// Launched Chrome instance handing out isolated pages
#[derive(Clone)]
pub struct ChromeDriver {
    browser: Browser,
    default_timeout: Duration,
}

impl ChromeDriver {
    /// Launch Chrome with the configured window size and headless flag
    pub fn launch(settings: &BrowserSettings, default_timeout: Duration) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            settings.headless, settings.window_width, settings.window_height
        );

        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .window_size(Some((settings.window_width, settings.window_height)))
            .build()
            .map_err(|e| WardError::Browser(format!("Failed to launch browser: {}", e)))?;

        let browser = Browser::new(options)
            .map_err(|e| WardError::Browser(format!("Failed to launch browser: {}", e)))?;

        info!("Browser launched successfully");
        Ok(Self {
            browser,
            default_timeout,
        })
    }

    /// Attach to a running Chrome (`--remote-debugging-port`)
    pub fn connect(port: u16, default_timeout: Duration) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let browser = Browser::connect(format!("http://127.0.0.1:{}", port))
            .map_err(|e| WardError::Browser(format!("Failed to connect to browser: {}", e)))?;

        Ok(Self {
            browser,
            default_timeout,
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn new_page(&self) -> Result<Arc<dyn Page>> {
        let page = ChromePage::open(&self.browser, self.default_timeout)?;
        Ok(Arc::new(page))
    }
}

/// A tab inside a dedicated browser context
pub struct ChromePage {
    // Holds the Chrome process open for as long as the page is alive.
    _browser: Browser,
    context_id: String,
    tab: Arc<Tab>,
    timeout: Duration,
    closed: AtomicBool,
    listeners: Arc<Mutex<Vec<PageListener>>>,
}

impl ChromePage {
    fn open(browser: &Browser, timeout: Duration) -> Result<Self> {
        let context = browser
            .new_context()
            .map_err(|e| WardError::Browser(format!("Failed to create browser context: {}", e)))?;
        let context_id = context.get_id().to_string();
        let tab = context
            .new_tab()
            .map_err(|e| WardError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        let page = Self {
            _browser: browser.clone(),
            context_id,
            tab,
            timeout,
            closed: AtomicBool::new(false),
            listeners: Arc::new(Mutex::new(Vec::new())),
        };
        page.forward_events()?;

        debug!("Opened page in browser context {}", page.context_id);
        Ok(page)
    }

    /// Route CDP network and runtime events to subscribed listeners
    fn forward_events(&self) -> Result<()> {
        // Registering a response handler is what switches the Network domain on.
        self.tab
            .register_response_handling("ward-activity", Box::new(|_params, _body| {}))
            .map_err(|e| WardError::Browser(format!("Failed to enable network events: {}", e)))?;
        self.tab
            .enable_runtime()
            .map_err(|e| WardError::Browser(format!("Failed to enable runtime events: {}", e)))?;

        let listeners = self.listeners.clone();
        let requests: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());

        self.tab
            .add_event_listener(Arc::new(move |event: &Event| {
                let (kind, params) = match event {
                    Event::NetworkRequestWillBeSent(e) => ("request", serde_json::to_value(&e.params)),
                    Event::NetworkResponseReceived(e) => ("response", serde_json::to_value(&e.params)),
                    Event::NetworkLoadingFailed(e) => ("failed", serde_json::to_value(&e.params)),
                    Event::RuntimeConsoleAPICalled(e) => ("console", serde_json::to_value(&e.params)),
                    Event::RuntimeExceptionThrown(e) => ("exception", serde_json::to_value(&e.params)),
                    _ => return,
                };
                let Ok(params) = params else { return };

                let page_event = match requests.lock() {
                    Ok(mut requests) => translate_cdp_event(kind, &params, &mut requests),
                    Err(_) => None,
                };
                let Some(page_event) = page_event else { return };

                if let Ok(listeners) = listeners.lock() {
                    for listener in listeners.iter() {
                        listener(&page_event);
                    }
                }
            }))
            .map_err(|e| WardError::Browser(format!("Failed to attach event listener: {}", e)))?;

        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WardError::PageClosed);
        }
        Ok(())
    }

    fn eval(&self, script: &str) -> Result<Value> {
        self.ensure_open()?;
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| WardError::Browser(format!("JavaScript evaluation failed: {}", e)))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn eval_bool(&self, script: &str) -> Result<bool> {
        Ok(self.eval(script)?.as_bool().unwrap_or(false))
    }
}

/// JS literal for a string, safe to splice into a script
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

const IS_VISIBLE_FN: &str = "const visible = (el) => { \
    const r = el.getBoundingClientRect(); \
    const s = window.getComputedStyle(el); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; };";

/// Map a CDP event payload to a [`PageEvent`]
///
/// `requests` remembers in-flight request ids so failures can report their
/// URL. An id is forgotten once its response or failure arrives.
fn translate_cdp_event(
    kind: &str,
    params: &Value,
    requests: &mut HashMap<String, String>,
) -> Option<PageEvent> {
    let str_at = |pointer: &str| {
        params
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    match kind {
        "request" => {
            let url = str_at("/request/url")?;
            if let Some(id) = str_at("/requestId") {
                requests.insert(id, url.clone());
            }
            Some(PageEvent::Request {
                url,
                method: str_at("/request/method").unwrap_or_else(|| "GET".to_string()),
            })
        }
        "response" => {
            if let Some(id) = str_at("/requestId") {
                requests.remove(&id);
            }
            Some(PageEvent::Response {
                url: str_at("/response/url")?,
                status: params
                    .pointer("/response/status")
                    .and_then(Value::as_f64)
                    .map(|s| s as u16)
                    .unwrap_or(0),
            })
        }
        "failed" => {
            let id = str_at("/requestId").unwrap_or_default();
            Some(PageEvent::RequestFailed {
                url: requests.remove(&id).unwrap_or(id),
                error: str_at("/errorText").unwrap_or_default(),
            })
        }
        "console" => {
            let text = params
                .get("args")
                .and_then(Value::as_array)
                .map(|args| {
                    args.iter()
                        .map(|arg| match arg.get("value") {
                            Some(Value::String(s)) => s.clone(),
                            Some(other) => other.to_string(),
                            None => arg
                                .get("description")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            Some(PageEvent::Console {
                level: str_at("/type").unwrap_or_else(|| "log".to_string()),
                text,
            })
        }
        "exception" => Some(PageEvent::PageError {
            message: str_at("/exceptionDetails/exception/description")
                .or_else(|| str_at("/exceptionDetails/text"))
                .unwrap_or_default(),
        }),
        _ => None,
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| WardError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| WardError::Timeout(format!("Navigation timeout for {}: {}", url, e)))?;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.tab.get_url())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.ensure_open()?;
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.timeout)
            .map_err(|_| WardError::ElementNotFound {
                selector: selector.to_string(),
            })?;

        element
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .map_err(|e| WardError::Browser(format!("Failed to clear {}: {}", selector, e)))?;
        element
            .click()
            .map_err(|e| WardError::Browser(format!("Failed to focus {}: {}", selector, e)))?;
        self.tab
            .type_str(value)
            .map_err(|e| WardError::Browser(format!("Failed to type into {}: {}", selector, e)))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.ensure_open()?;
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.timeout)
            .map_err(|_| WardError::ElementNotFound {
                selector: selector.to_string(),
            })?
            .click()
            .map_err(|e| WardError::Browser(format!("Failed to click {}: {}", selector, e)))?;
        Ok(())
    }

    async fn element_visible(&self, selector: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ {} return Array.from(document.querySelectorAll({})).some(visible); }})()",
            IS_VISIBLE_FN,
            js_str(selector)
        );
        self.eval_bool(&script).await
    }

    async fn text_visible(&self, selector: &str, text: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ {} return Array.from(document.querySelectorAll({})) \
             .some(el => visible(el) && (el.textContent || '').includes({})); }})()",
            IS_VISIBLE_FN,
            js_str(selector),
            js_str(text)
        );
        self.eval_bool(&script).await
    }

    async fn click_text(&self, selector: &str, text: &str) -> Result<()> {
        let script = format!(
            "(() => {{ {} const el = Array.from(document.querySelectorAll({})) \
             .find(el => visible(el) && (el.textContent || '').includes({})); \
             if (!el) return false; el.click(); return true; }})()",
            IS_VISIBLE_FN,
            js_str(selector),
            js_str(text)
        );
        if self.eval_bool(&script).await? {
            Ok(())
        } else {
            Err(WardError::ElementNotFound {
                selector: format!("{} with text {:?}", selector, text),
            })
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.eval(script)
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.eval("document.readyState")?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(WardError::Timeout(format!(
                    "Page did not finish loading after {}ms",
                    timeout.as_millis()
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, full_page)
            .map_err(|e| WardError::ScreenshotFailed(format!("CDP capture failed: {}", e)))
    }

    async fn element_screenshot(&self, selector: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, self.timeout)
            .map_err(|_| WardError::ElementNotFound {
                selector: selector.to_string(),
            })?;

        element
            .capture_screenshot(CaptureScreenshotFormatOption::Png)
            .map_err(|e| WardError::ScreenshotFailed(format!("Element capture failed: {}", e)))
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.ensure_open()?;
        self.tab
            .set_bounds(Bounds::Normal {
                left: None,
                top: None,
                width: Some(f64::from(viewport.width)),
                height: Some(f64::from(viewport.height)),
            })
            .map_err(|e| WardError::Browser(format!("Failed to resize viewport: {}", e)))?;
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport> {
        let size = self.eval("[window.innerWidth, window.innerHeight]")?;
        let dim = |i: usize| size.get(i).and_then(Value::as_u64).unwrap_or(0) as u32;
        Ok(Viewport::new(dim(0), dim(1)))
    }

    async fn user_agent(&self) -> Result<String> {
        Ok(self
            .eval("navigator.userAgent")?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> Result<()> {
        self.eval(&format!(
            "window.localStorage.setItem({}, {})",
            js_str(key),
            js_str(value)
        ))?;
        Ok(())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        self.ensure_open()?;
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| WardError::Browser(format!("Failed to read cookies: {}", e)))?
            .iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .filter_map(|v| serde_json::from_value::<Cookie>(v).ok())
            .collect();

        let raw = self.eval(
            "JSON.stringify({ origin: window.location.origin, \
             entries: Object.entries(window.localStorage) })",
        )?;
        let mut origins = Vec::new();
        if let Some(parsed) = raw.as_str().and_then(|s| serde_json::from_str::<Value>(s).ok()) {
            let local_storage: Vec<StorageEntry> = parsed["entries"]
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|pair| {
                            Some(StorageEntry {
                                name: pair.get(0)?.as_str()?.to_string(),
                                value: pair.get(1)?.as_str()?.to_string(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            if let Some(origin) = parsed["origin"].as_str() {
                origins.push(OriginState {
                    origin: origin.to_string(),
                    local_storage,
                });
            }
        }

        Ok(StorageState { cookies, origins })
    }

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()> {
        self.ensure_open()?;

        let params = state
            .cookies
            .iter()
            .map(|c| {
                let mut value = json!({
                    "name": c.name,
                    "value": c.value,
                    "domain": c.domain,
                    "path": c.path,
                    "httpOnly": c.http_only,
                    "secure": c.secure,
                });
                if c.expires > 0.0 {
                    value["expires"] = json!(c.expires);
                }
                if let Some(same_site) = &c.same_site {
                    value["sameSite"] = json!(same_site);
                }
                serde_json::from_value::<CookieParam>(value)
                    .map_err(|e| WardError::Browser(format!("Invalid cookie {}: {}", c.name, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        if !params.is_empty() {
            self.tab
                .set_cookies(params)
                .map_err(|e| WardError::Browser(format!("Failed to restore cookies: {}", e)))?;
        }

        for origin in state.origins.iter().filter(|o| !o.local_storage.is_empty()) {
            self.goto(&origin.origin).await?;
            for entry in &origin.local_storage {
                self.set_local_storage(&entry.name, &entry.value).await?;
            }
        }
        Ok(())
    }

    fn subscribe(&self, listener: PageListener) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(listener),
            Err(e) => warn!("Page listener registry poisoned: {}", e),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Disposing the context closes its tabs, so the tab is only closed
        // directly when disposal fails.
        let disposed = self.tab.call_method(DisposeBrowserContext {
            browser_context_id: self.context_id.clone(),
        });
        if let Err(e) = disposed {
            if let Err(close_err) = self.tab.close(true) {
                warn!("Failed to close tab: {}", close_err);
            }
            return Err(WardError::Browser(format!(
                "Failed to dispose browser context: {}",
                e
            )));
        }

        debug!("Disposed browser context {}", self.context_id);
        Ok(())
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            debug!("ChromePage dropped without close, context {} leaks until browser exit", self.context_id);
        }
    }
}
