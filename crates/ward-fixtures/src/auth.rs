//! Probe-then-authenticate login flow
//!
//! Navigate straight to the protected landing route. If the login form shows
//! up the session did not carry over: for the standard user try the saved
//! storage state once, then fall back to filling the form. A session that is still on the login route
//! afterwards is an explicit [`WardError::Authentication`].

use std::time::Duration;
use tracing::{debug, info, warn};
use ward_browser::{Page, StorageState};
use ward_core::fail_open::fail_open_sync;
use ward_core::{Account, Result, WardConfig, WardError};

/// How a session ended up authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The landing route rendered without a login form
    AlreadyAuthenticated,
    /// The saved storage state was restored
    RestoredState,
    /// Credentials were submitted through the login form
    LoggedIn,
}

pub async fn authenticate(page: &dyn Page, account: &Account, config: &WardConfig) -> Result<AuthOutcome> {
    let login = &config.settings.login;
    let probe = Duration::from_millis(login.probe_timeout_ms);
    let landing = config.url(&login.landing_route);

    page.goto(&landing).await?;
    if !page.is_visible(&login.email_input, probe).await {
        debug!("Login form absent on {}, session carried over", landing);
        return Ok(AuthOutcome::AlreadyAuthenticated);
    }

    // Global setup only saves the standard user's session.
    let state_file = &config.settings.paths.auth_state_file;
    if account.email == config.user.email && state_file.exists() {
        if let Some(state) = fail_open_sync("load auth state", || StorageState::load(state_file)) {
            if !state.is_empty() {
                page.restore_storage_state(&state).await?;
                page.goto(&landing).await?;
                if !page.is_visible(&login.email_input, probe).await {
                    info!("🔐 Restored session from {}", state_file.display());
                    return Ok(AuthOutcome::RestoredState);
                }
                debug!("Saved auth state did not carry a valid session");
            }
        }
    }

    info!("🔐 Signing in as {}", account.email);
    page.fill(&login.email_input, &account.email).await?;
    page.fill(&login.password_input, &account.password).await?;
    page.click(&login.submit_button).await?;

    let timeout = Duration::from_millis(login.auth_timeout_ms);
    if let Err(e) = page.wait_for_url_containing(&login.post_login_marker, timeout).await {
        if e.is_page_closed() {
            return Err(e);
        }
        warn!("No redirect to {} after login: {}", login.post_login_marker, e);
    }

    let url = page.url().await?;
    if url.contains(&login.login_marker) {
        return Err(WardError::Authentication(format!(
            "still on login page after signing in as {} ({})",
            account.email, url
        )));
    }

    info!("✅ Authenticated as {}", account.email);
    Ok(AuthOutcome::LoggedIn)
}

/// Set the admin UI-mode flag, then authenticate with the admin account
pub async fn authenticate_admin(page: &dyn Page, config: &WardConfig) -> Result<AuthOutcome> {
    let flag = &config.settings.admin_mode;
    page.goto(&config.base_url).await?;
    page.set_local_storage(&flag.storage_key, &flag.value).await?;
    debug!("Set {}={} before admin login", flag.storage_key, flag.value);

    authenticate(page, &config.admin, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use ward_browser::fake::FakeDriver;
    use ward_core::testing::sample_config;

    fn driver(config: &WardConfig) -> FakeDriver {
        FakeDriver::new(config.base_url.clone(), config.settings.login.clone())
            .with_account(&config.user.email, &config.user.password)
            .with_account(&config.admin.email, &config.admin.password)
    }

    #[tokio::test]
    async fn test_login_through_form() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let page = driver(&config).page();

        let outcome = authenticate(page.as_ref(), &config.user, &config).await.unwrap();
        assert_eq!(outcome, AuthOutcome::LoggedIn);
        assert!(page.is_authenticated());
        assert!(!page.url().await.unwrap().contains("/login"));
    }

    #[tokio::test]
    async fn test_second_probe_skips_login() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let page = driver(&config).page();

        authenticate(page.as_ref(), &config.user, &config).await.unwrap();
        let clicks = page.clicks().len();
        let outcome = authenticate(page.as_ref(), &config.user, &config).await.unwrap();
        assert_eq!(outcome, AuthOutcome::AlreadyAuthenticated);
        assert_eq!(page.clicks().len(), clicks);
    }

    #[tokio::test]
    async fn test_invalid_credentials_fail_explicitly() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let page = driver(&config).page();

        let wrong = Account::new(config.user.email.clone(), "nope");
        let err = authenticate(page.as_ref(), &wrong, &config).await.unwrap_err();
        assert!(matches!(err, WardError::Authentication(_)));
        assert!(err.to_string().contains("still on login page"));
    }

    #[tokio::test]
    async fn test_saved_state_is_restored() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let driver = driver(&config);

        let first = driver.page();
        authenticate(first.as_ref(), &config.user, &config).await.unwrap();
        first
            .storage_state()
            .await
            .unwrap()
            .save(&config.settings.paths.auth_state_file)
            .unwrap();

        let second = driver.page();
        let outcome = authenticate(second.as_ref(), &config.user, &config).await.unwrap();
        assert_eq!(outcome, AuthOutcome::RestoredState);
        assert!(second.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_admin_ignores_user_saved_state() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let driver = driver(&config);

        let user_page = driver.page();
        authenticate(user_page.as_ref(), &config.user, &config).await.unwrap();
        user_page
            .storage_state()
            .await
            .unwrap()
            .save(&config.settings.paths.auth_state_file)
            .unwrap();

        let admin_page = driver.page();
        let outcome = authenticate_admin(admin_page.as_ref(), &config).await.unwrap();
        assert_eq!(outcome, AuthOutcome::LoggedIn);
        assert_eq!(admin_page.session_account(), Some(config.admin.email.clone()));
        assert_eq!(admin_page.local_storage("uiMode").as_deref(), Some("expert"));
    }

    #[tokio::test]
    async fn test_admin_sets_ui_mode() {
        let dir = tempdir().unwrap();
        let config = sample_config(dir.path());
        let page = driver(&config).page();

        authenticate_admin(page.as_ref(), &config).await.unwrap();
        assert_eq!(page.local_storage("uiMode").as_deref(), Some("expert"));
        assert!(page.is_authenticated());
    }
}
