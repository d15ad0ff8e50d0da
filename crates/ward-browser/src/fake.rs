//! In-memory console used by tests
//!
//! [`FakeDriver`] simulates the login flow of the console: protected routes
//! redirect to the login route until the login form is submitted with a known
//! account, after which a session cookie is set and the post-login route is
//! shown. Arbitrary elements can be shown or hidden to script modals.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use ward_core::{LoginSelectors, Result, WardError};

use crate::page::{
    BrowserDriver, Cookie, OriginState, Page, PageEvent, PageListener, StorageEntry, StorageState,
    Viewport,
};

const SESSION_COOKIE: &str = "ward_session";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Shared site definition all fake pages talk to
#[derive(Debug)]
struct FakeSite {
    base_url: String,
    login: LoginSelectors,
    accounts: Mutex<HashMap<String, String>>,
}

/// Driver producing [`FakePage`]s against one simulated console
#[derive(Clone)]
pub struct FakeDriver {
    site: Arc<FakeSite>,
    pages: Arc<Mutex<Vec<Arc<FakePage>>>>,
}

impl FakeDriver {
    pub fn new(base_url: impl Into<String>, login: LoginSelectors) -> Self {
        Self {
            site: Arc::new(FakeSite {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                login,
                accounts: Mutex::new(HashMap::new()),
            }),
            pages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register credentials the login form accepts
    pub fn with_account(self, email: &str, password: &str) -> Self {
        lock(&self.site.accounts).insert(email.to_string(), password.to_string());
        self
    }

    /// Every page handed out so far
    pub fn pages(&self) -> Vec<Arc<FakePage>> {
        lock(&self.pages).clone()
    }

    pub fn open_pages(&self) -> usize {
        lock(&self.pages).iter().filter(|p| !p.is_closed()).count()
    }

    /// Standalone page not backed by any account
    pub fn page(&self) -> Arc<FakePage> {
        let page = Arc::new(FakePage::new(self.site.clone()));
        lock(&self.pages).push(page.clone());
        page
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn new_page(&self) -> Result<Arc<dyn Page>> {
        Ok(self.page())
    }
}

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    authenticated: bool,
    closed: bool,
    viewport: Option<Viewport>,
    visible: HashSet<String>,
    texts: HashMap<String, String>,
    click_hides: HashMap<String, Vec<String>>,
    fills: HashMap<String, String>,
    clicks: Vec<String>,
    local_storage: HashMap<String, String>,
    cookies: Vec<Cookie>,
    evaluate_result: Option<Value>,
    evaluated: Vec<String>,
    fail_screenshots: bool,
    screenshots: usize,
}

/// Scriptable in-memory page
pub struct FakePage {
    site: Arc<FakeSite>,
    state: Mutex<FakeState>,
    listeners: Mutex<Vec<PageListener>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakePage {
    fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            state: Mutex::new(FakeState {
                url: "about:blank".to_string(),
                viewport: Some(Viewport::new(1920, 1080)),
                ..Default::default()
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, FakeState>> {
        let state = lock(&self.state);
        if state.closed {
            return Err(WardError::PageClosed);
        }
        Ok(state)
    }

    fn login_form(&self) -> [&str; 3] {
        let login = &self.site.login;
        [
            login.email_input.as_str(),
            login.password_input.as_str(),
            login.submit_button.as_str(),
        ]
    }

    fn show_login(&self, state: &mut FakeState) {
        state.url = format!("{}{}", self.site.base_url, self.site.login.login_route);
        for selector in self.login_form() {
            state.visible.insert(selector.to_string());
        }
    }

    fn hide_login(&self, state: &mut FakeState) {
        for selector in self.login_form() {
            state.visible.remove(selector);
        }
    }

    /// Deliver an event to subscribers as if the browser emitted it
    pub fn emit(&self, event: PageEvent) {
        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Make `selector` visible, optionally carrying `text`
    pub fn show(&self, selector: &str, text: Option<&str>) {
        let mut state = lock(&self.state);
        state.visible.insert(selector.to_string());
        if let Some(text) = text {
            state.texts.insert(selector.to_string(), text.to_string());
        }
    }

    pub fn hide(&self, selector: &str) {
        let mut state = lock(&self.state);
        state.visible.remove(selector);
        state.texts.remove(selector);
    }

    /// Clicking `click_selector` hides every listed selector
    pub fn on_click_hide(&self, click_selector: &str, hides: &[&str]) {
        lock(&self.state).click_hides.insert(
            click_selector.to_string(),
            hides.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Value returned by every `evaluate` call
    pub fn set_evaluate_result(&self, value: Value) {
        lock(&self.state).evaluate_result = Some(value);
    }

    pub fn fail_screenshots(&self, fail: bool) {
        lock(&self.state).fail_screenshots = fail;
    }

    pub fn clicks(&self) -> Vec<String> {
        lock(&self.state).clicks.clone()
    }

    pub fn evaluated(&self) -> Vec<String> {
        lock(&self.state).evaluated.clone()
    }

    pub fn local_storage(&self, key: &str) -> Option<String> {
        lock(&self.state).local_storage.get(key).cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.state).authenticated
    }

    /// Email carried by the session cookie, if any
    pub fn session_account(&self) -> Option<String> {
        lock(&self.state)
            .cookies
            .iter()
            .find(|c| c.name == SESSION_COOKIE)
            .map(|c| c.value.clone())
    }

    pub fn screenshot_count(&self) -> usize {
        lock(&self.state).screenshots
    }

    fn capture(&self) -> Result<Vec<u8>> {
        let mut state = self.state()?;
        if state.fail_screenshots {
            return Err(WardError::ScreenshotFailed("fake capture disabled".to_string()));
        }
        state.screenshots += 1;
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(state.url.as_bytes());
        Ok(bytes)
    }

    fn submit_login(&self, state: &mut FakeState) {
        let login = &self.site.login;
        let email = state.fills.get(&login.email_input).cloned().unwrap_or_default();
        let password = state.fills.get(&login.password_input).cloned().unwrap_or_default();

        let accepted = lock(&self.site.accounts).get(&email) == Some(&password);
        if accepted {
            state.authenticated = true;
            state.cookies.retain(|c| c.name != SESSION_COOKIE);
            state.cookies.push(Cookie {
                name: SESSION_COOKIE.to_string(),
                value: email,
                domain: self.site.base_url.clone(),
                path: "/".to_string(),
                expires: -1.0,
                http_only: true,
                secure: true,
                same_site: Some("Lax".to_string()),
            });
            self.hide_login(state);
            state.url = format!("{}{}", self.site.base_url, self.site.login.landing_route);
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        {
            let mut state = self.state()?;
            let is_login = url.contains(&self.site.login.login_marker);

            if is_login || !state.authenticated {
                self.show_login(&mut state);
            } else {
                self.hide_login(&mut state);
                state.url = url.to_string();
            }
        }

        self.emit(PageEvent::Request {
            url: url.to_string(),
            method: "GET".to_string(),
        });
        self.emit(PageEvent::Response {
            url: url.to_string(),
            status: 200,
        });
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.state()?.url.clone())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state()?;
        if !state.visible.contains(selector) {
            return Err(WardError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        state.fills.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state()?;
        if !state.visible.contains(selector) {
            return Err(WardError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        state.clicks.push(selector.to_string());

        if selector == self.site.login.submit_button {
            self.submit_login(&mut state);
        }
        if let Some(hides) = state.click_hides.get(selector).cloned() {
            for hidden in hides {
                state.visible.remove(&hidden);
                state.texts.remove(&hidden);
            }
        }
        Ok(())
    }

    async fn element_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.state()?.visible.contains(selector))
    }

    async fn text_visible(&self, selector: &str, text: &str) -> Result<bool> {
        let state = self.state()?;
        Ok(state.visible.contains(selector)
            && state
                .texts
                .get(selector)
                .map(|t| t.contains(text))
                .unwrap_or(false))
    }

    async fn click_text(&self, selector: &str, text: &str) -> Result<()> {
        if !self.text_visible(selector, text).await? {
            return Err(WardError::ElementNotFound {
                selector: format!("{} with text {:?}", selector, text),
            });
        }
        self.click(selector).await
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let mut state = self.state()?;
        state.evaluated.push(script.to_string());
        Ok(state.evaluate_result.clone().unwrap_or(Value::Null))
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
        self.state()?;
        Ok(())
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>> {
        self.capture()
    }

    async fn element_screenshot(&self, selector: &str) -> Result<Vec<u8>> {
        if !self.state()?.visible.contains(selector) {
            return Err(WardError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        self.capture()
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.state()?.viewport = Some(viewport);
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport> {
        Ok(self.state()?.viewport.unwrap_or(Viewport::new(0, 0)))
    }

    async fn user_agent(&self) -> Result<String> {
        self.state()?;
        Ok("Mozilla/5.0 (X11; Linux x86_64) WardFake/1.0".to_string())
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> Result<()> {
        self.state()?
            .local_storage
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let state = self.state()?;
        let mut entries: Vec<StorageEntry> = state
            .local_storage
            .iter()
            .map(|(name, value)| StorageEntry {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(StorageState {
            cookies: state.cookies.clone(),
            origins: vec![OriginState {
                origin: self.site.base_url.clone(),
                local_storage: entries,
            }],
        })
    }

    async fn restore_storage_state(&self, restored: &StorageState) -> Result<()> {
        let mut state = self.state()?;
        for cookie in &restored.cookies {
            state.cookies.retain(|c| c.name != cookie.name);
            state.cookies.push(cookie.clone());
        }
        for entry in restored.origins.iter().flat_map(|o| &o.local_storage) {
            state
                .local_storage
                .insert(entry.name.clone(), entry.value.clone());
        }

        let accounts = lock(&self.site.accounts);
        state.authenticated = state
            .cookies
            .iter()
            .any(|c| c.name == SESSION_COOKIE && accounts.contains_key(&c.value));
        Ok(())
    }

    fn subscribe(&self, listener: PageListener) {
        lock(&self.listeners).push(listener);
    }

    fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    async fn close(&self) -> Result<()> {
        lock(&self.state).closed = true;
        Ok(())
    }
}
