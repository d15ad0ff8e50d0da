//! Dismissal of the "Session Expired" modal during long-running tests

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ward_core::{Result, SessionModal};

use crate::page::Page;

/// Detects and dismisses the session-expired modal on one page
#[derive(Clone)]
pub struct SessionExpiryHandler {
    page: Arc<dyn Page>,
    modal: SessionModal,
}

impl SessionExpiryHandler {
    pub fn new(page: Arc<dyn Page>, modal: SessionModal) -> Self {
        Self { page, modal }
    }

    /// Dismiss the modal if present; `false` when nothing was dismissed or on any error
    pub async fn dismiss_session_expired_modal(&self) -> bool {
        match self.try_dismiss().await {
            Ok(dismissed) => dismissed,
            Err(e) => {
                debug!("Session modal check failed: {}", e);
                false
            }
        }
    }

    async fn try_dismiss(&self) -> Result<bool> {
        let modal = &self.modal;
        if !self
            .page
            .text_visible(&modal.container, &modal.marker_text)
            .await?
        {
            return Ok(false);
        }

        warn!("⚠️ Session expired modal detected - dismissing...");

        let close = format!("{} {}", modal.container, modal.close_selector);
        if self.page.element_visible(&close).await? {
            self.page.click(&close).await?;
            info!("✅ Session expired modal dismissed via close button");
            return Ok(true);
        }

        let button = format!("{} button", modal.container);
        if self
            .page
            .text_visible(&button, &modal.fallback_button_text)
            .await?
        {
            self.page
                .click_text(&button, &modal.fallback_button_text)
                .await?;
            info!(
                "✅ Session expired modal dismissed via {} button",
                modal.fallback_button_text
            );
            return Ok(true);
        }

        Ok(false)
    }

    /// Poll for the modal in the background until the page closes
    ///
    /// Must be called inside a tokio runtime. Dropping the handle stops the watcher.
    pub fn setup_auto_handler(&self) -> AutoDismissHandle {
        let handler = self.clone();
        let interval = Duration::from_millis(self.modal.poll_interval_ms.max(1));

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if handler.page.is_closed() {
                    debug!("Page closed, stopping session modal watcher");
                    break;
                }
                handler.dismiss_session_expired_modal().await;
            }
        });

        AutoDismissHandle { task }
    }
}

/// Background watcher started by [`SessionExpiryHandler::setup_auto_handler`]
#[derive(Debug)]
pub struct AutoDismissHandle {
    task: JoinHandle<()>,
}

impl AutoDismissHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutoDismissHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeDriver, FakePage};
    use ward_core::LoginSelectors;

    fn modal() -> SessionModal {
        let mut modal = ward_core::WardSettings::default().session_modal;
        modal.poll_interval_ms = 10;
        modal
    }

    fn page() -> Arc<FakePage> {
        FakeDriver::new("https://console.example.com", LoginSelectors::default()).page()
    }

    fn show_modal(page: &FakePage, with_close: bool) {
        page.show(".ant-modal-content", Some("Session Expired"));
        page.show(".ant-modal-content button", Some("Stay Logged Out"));
        let hides = [".ant-modal-content", ".ant-modal-content button", ".ant-modal-content .ant-modal-close"];
        if with_close {
            page.show(".ant-modal-content .ant-modal-close", None);
            page.on_click_hide(".ant-modal-content .ant-modal-close", &hides);
        }
        page.on_click_hide(".ant-modal-content button", &hides);
    }

    #[tokio::test]
    async fn test_no_modal_returns_false() {
        let page = page();
        let handler = SessionExpiryHandler::new(page.clone(), modal());
        assert!(!handler.dismiss_session_expired_modal().await);
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_dismiss_via_close_button() {
        let page = page();
        show_modal(&page, true);
        let handler = SessionExpiryHandler::new(page.clone(), modal());

        assert!(handler.dismiss_session_expired_modal().await);
        assert_eq!(page.clicks(), vec![".ant-modal-content .ant-modal-close"]);
        assert!(!handler.dismiss_session_expired_modal().await);
    }

    #[tokio::test]
    async fn test_dismiss_falls_back_to_stay_logged_out() {
        let page = page();
        show_modal(&page, false);
        let handler = SessionExpiryHandler::new(page.clone(), modal());

        assert!(handler.dismiss_session_expired_modal().await);
        assert_eq!(page.clicks(), vec![".ant-modal-content button"]);
    }

    #[tokio::test]
    async fn test_errors_are_swallowed() {
        let page = page();
        page.close().await.unwrap();
        let handler = SessionExpiryHandler::new(page, modal());
        assert!(!handler.dismiss_session_expired_modal().await);
    }

    #[tokio::test]
    async fn test_auto_handler_dismisses_and_stops_on_close() {
        let page = page();
        let handler = SessionExpiryHandler::new(page.clone(), modal());
        let handle = handler.setup_auto_handler();

        show_modal(&page, true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!page.element_visible(".ant-modal-content").await.unwrap());

        page.close().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_running());
    }
}
