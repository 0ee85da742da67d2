//! Page driver for the login and registration pages.
//!
//! Each operation is a located, waited-for, single interaction. Scenarios
//! never see raw selectors or timeouts:
//!
//! ```text
//! switch_to_password()  ─► wait clickable(tab) ─► click ─► wait visible(#email)
//! click_primary(face)   ─► observe enrollment ─► click register | authenticate
//! is_locked_out()       ─► bounded probe, timeout means false
//! ```

use crate::driver::{AuthDriver, ElementState};
use crate::injector::{BehaviorInjector, CredentialMode, RuntimeOverrides};
use crate::locator::{catalog, AuthTab, Factor, RegistrationTab, Selector};
use crate::result::{AuthProbeError, AuthProbeResult};
use crate::wait::{ElementCondition, WaitOptions, Waiter, DEFAULT_PROBE_TIMEOUT_MS};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

// =============================================================================
// OBSERVATIONS
// =============================================================================

/// Enrollment state of the identity currently entered for a factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    /// The authenticate control is shown
    Registered,
    /// The register control is shown
    Unregistered,
    /// Neither control is shown
    Unknown,
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registered => "registered",
            Self::Unregistered => "unregistered",
            Self::Unknown => "unknown",
        })
    }
}

/// Outcome of an authentication attempt as rendered by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Success banner
    Success,
    /// Generic failure banner
    Error,
    /// Lockout banner
    Locked,
    /// Network error banner
    NetworkError,
}

/// Banners checked by [`LoginPage::observe_outcome`], most specific first
const OUTCOME_BANNERS: [(Selector, AttemptOutcome); 4] = [
    (catalog::STATUS_LOCKED, AttemptOutcome::Locked),
    (catalog::STATUS_NETWORK_ERROR, AttemptOutcome::NetworkError),
    (catalog::STATUS_ERROR, AttemptOutcome::Error),
    (catalog::STATUS_SUCCESS, AttemptOutcome::Success),
];

/// Registration form values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountForm {
    /// Username
    pub username: String,
    /// Email
    pub email: String,
    /// Password
    pub password: String,
    /// Password confirmation
    pub confirm_password: String,
}

impl AccountForm {
    /// Form with a matching confirmation
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            email: email.into(),
            confirm_password: password.clone(),
            password,
        }
    }

    /// Override the confirmation
    #[must_use]
    pub fn with_confirmation(mut self, confirm: impl Into<String>) -> Self {
        self.confirm_password = confirm.into();
        self
    }
}

// =============================================================================
// LOGIN PAGE
// =============================================================================

/// Page object for the login application
#[derive(Debug)]
pub struct LoginPage<D: AuthDriver> {
    driver: D,
    base_url: String,
    waiter: Waiter,
    prober: Waiter,
    injector: BehaviorInjector,
}

impl<D: AuthDriver> LoginPage<D> {
    /// Wrap a driver; default waits are 15s, probes 2s
    #[must_use]
    pub fn new(driver: D, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            waiter: Waiter::default(),
            prober: Waiter::new(WaitOptions::new().with_timeout(DEFAULT_PROBE_TIMEOUT_MS)),
            injector: BehaviorInjector::new(),
        }
    }

    /// Set the bound for wait-based operations
    #[must_use]
    pub const fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.waiter = Waiter::new(options);
        self
    }

    /// Set the bound for status probes
    #[must_use]
    pub const fn with_probe_options(mut self, options: WaitOptions) -> Self {
        self.prober = Waiter::new(options);
        self
    }

    /// Start from the given overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: RuntimeOverrides) -> Self {
        self.injector.set(overrides);
        self
    }

    /// Base URL of the application
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Give the driver back
    #[must_use]
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Current overrides
    #[must_use]
    pub const fn injector(&self) -> &BehaviorInjector {
        &self.injector
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Load the base URL and wait for the login tabs
    ///
    /// # Errors
    ///
    /// Navigation error, or a timeout if no tab becomes visible
    pub async fn open(&mut self) -> AuthProbeResult<()> {
        let options = *self.waiter.options();
        self.open_with(options).await
    }

    /// Like [`LoginPage::open`] with a custom bound
    ///
    /// # Errors
    ///
    /// Navigation error, or a timeout if no tab becomes visible
    pub async fn open_with(&mut self, options: WaitOptions) -> AuthProbeResult<()> {
        info!(url = %self.base_url, "opening login page");
        let url = self.base_url.clone();
        self.driver.navigate(&url).await?;
        self.injector.reapply_after_navigation(&mut self.driver).await;
        self.wait_for_login_tabs(Waiter::new(options)).await
    }

    /// Reload and re-install overrides
    ///
    /// # Errors
    ///
    /// Reload error, or a timeout if no tab becomes visible
    pub async fn refresh(&mut self) -> AuthProbeResult<()> {
        info!("refreshing page");
        self.driver.reload().await?;
        self.injector.reapply_after_navigation(&mut self.driver).await;
        self.wait_for_login_tabs(self.waiter).await
    }

    async fn wait_for_login_tabs(&self, waiter: Waiter) -> AuthProbeResult<()> {
        let driver = &self.driver;
        waiter
            .until("biometric or password tab visible", || async move {
                for tab in [AuthTab::Biometric, AuthTab::Password] {
                    if driver.query(&tab.tab()).await?.is_some_and(|s| s.visible) {
                        return Ok(true);
                    }
                }
                Ok(false)
            })
            .await?;
        Ok(())
    }

    /// Tabs currently visible, without waiting
    pub async fn visible_tabs(&self) -> Vec<AuthTab> {
        let mut tabs = Vec::new();
        for tab in AuthTab::ALL {
            if self.state_now(&tab.tab()).await.is_some_and(|s| s.visible) {
                tabs.push(tab);
            }
        }
        tabs
    }

    // -------------------------------------------------------------------------
    // Behavior injection
    // -------------------------------------------------------------------------

    /// Install the current overrides into the page
    pub async fn apply_overrides(&mut self) -> bool {
        self.injector.apply(&mut self.driver).await
    }

    /// Edit the overrides, then install them
    pub async fn update_overrides(&mut self, edit: impl FnOnce(&mut BehaviorInjector)) -> bool {
        edit(&mut self.injector);
        self.apply_overrides().await
    }

    /// Force credential ceremonies to succeed
    pub async fn enable_success_mode(&mut self) -> bool {
        self.update_overrides(|i| {
            i.update(|o| o.credentials = CredentialMode::Success);
        })
        .await
    }

    /// Force credential ceremonies to fail
    pub async fn enable_failure_mode(&mut self) -> bool {
        self.update_overrides(BehaviorInjector::enable_failure_mode)
            .await
    }

    /// Stop forcing failures
    pub async fn disable_failure_mode(&mut self) -> bool {
        self.update_overrides(BehaviorInjector::disable_failure_mode)
            .await
    }

    /// Fail ceremonies and report a lockout from attempt `threshold` on
    pub async fn enable_lockout_counting(&mut self, threshold: u32) -> bool {
        self.update_overrides(|i| i.enable_lockout_counting(threshold))
            .await
    }

    /// Deny authenticator and camera access
    pub async fn deny_permissions(&mut self) -> bool {
        self.update_overrides(BehaviorInjector::deny_permissions)
            .await
    }

    /// Restore authenticator and camera access
    pub async fn grant_permissions(&mut self) -> bool {
        self.update_overrides(BehaviorInjector::grant_permissions)
            .await
    }

    /// Fail API requests
    pub async fn interrupt_network(&mut self) -> bool {
        self.update_overrides(BehaviorInjector::interrupt_network)
            .await
    }

    /// Restore API requests
    pub async fn restore_network(&mut self) -> bool {
        self.update_overrides(BehaviorInjector::restore_network)
            .await
    }

    // -------------------------------------------------------------------------
    // Tabs and fields
    // -------------------------------------------------------------------------

    /// Wait until `selector` meets `condition`
    ///
    /// # Errors
    ///
    /// Timeout if the condition never holds
    pub async fn wait_for(
        &self,
        selector: &Selector,
        condition: ElementCondition,
    ) -> AuthProbeResult<Option<ElementState>> {
        self.waiter
            .for_element(&self.driver, selector, condition)
            .await
    }

    async fn click_when_clickable(&mut self, selector: &Selector) -> AuthProbeResult<()> {
        self.wait_for(selector, ElementCondition::Clickable).await?;
        debug!(%selector, "click");
        self.driver.click(selector).await
    }

    async fn switch_to(&mut self, tab: AuthTab) -> AuthProbeResult<()> {
        debug!(%tab, "switching tab");
        self.click_when_clickable(&tab.tab()).await?;
        self.wait_for(&tab.signature_input(), ElementCondition::Visible)
            .await?;
        Ok(())
    }

    /// Show the password form
    ///
    /// # Errors
    ///
    /// Timeout if the tab or the email field never renders
    pub async fn switch_to_password(&mut self) -> AuthProbeResult<()> {
        self.switch_to(AuthTab::Password).await
    }

    /// Show the biometric panel
    ///
    /// # Errors
    ///
    /// Timeout if the tab or the username field never renders
    pub async fn switch_to_biometric(&mut self) -> AuthProbeResult<()> {
        self.switch_to(AuthTab::Biometric).await
    }

    /// Show the face panel
    ///
    /// # Errors
    ///
    /// Timeout if the tab or the username field never renders
    pub async fn switch_to_face(&mut self) -> AuthProbeResult<()> {
        self.switch_to(AuthTab::Face).await
    }

    async fn enter(&mut self, selector: &Selector, text: &str) -> AuthProbeResult<()> {
        self.wait_for(selector, ElementCondition::Visible).await?;
        debug!(%selector, text, "typing");
        self.driver.clear_and_type(selector, text).await
    }

    /// Type the biometric identity; any string is forwarded verbatim
    ///
    /// # Errors
    ///
    /// Timeout if the field is not visible
    pub async fn enter_biometric_username(&mut self, username: &str) -> AuthProbeResult<()> {
        self.enter(&catalog::BIOMETRIC_USERNAME, username).await
    }

    /// Type the face identity
    ///
    /// # Errors
    ///
    /// Timeout if the field is not visible
    pub async fn enter_face_username(&mut self, username: &str) -> AuthProbeResult<()> {
        self.enter(&catalog::FACE_USERNAME, username).await
    }

    /// Type the login email
    ///
    /// # Errors
    ///
    /// Timeout if the field is not visible
    pub async fn enter_email(&mut self, email: &str) -> AuthProbeResult<()> {
        self.enter(&catalog::EMAIL, email).await
    }

    /// Type the login password
    ///
    /// # Errors
    ///
    /// Timeout if the field is not visible
    pub async fn enter_password(&mut self, password: &str) -> AuthProbeResult<()> {
        self.enter(&catalog::PASSWORD, password).await
    }

    /// Submit the password form
    ///
    /// # Errors
    ///
    /// Timeout if the submit button never becomes clickable
    pub async fn submit_password(&mut self) -> AuthProbeResult<()> {
        self.click_when_clickable(&catalog::PASSWORD_SUBMIT).await
    }

    // -------------------------------------------------------------------------
    // Primary actions
    // -------------------------------------------------------------------------

    /// Click the biometric authenticate control
    ///
    /// # Errors
    ///
    /// Timeout if the control never becomes clickable
    pub async fn click_biometric_auth(&mut self) -> AuthProbeResult<()> {
        self.click_when_clickable(&catalog::BIOMETRIC_AUTH).await
    }

    /// Click the face authenticate control
    ///
    /// # Errors
    ///
    /// Timeout if the control never becomes clickable
    pub async fn click_face_auth(&mut self) -> AuthProbeResult<()> {
        self.click_when_clickable(&catalog::FACE_AUTH).await
    }

    /// Observe, without waiting, which primary control the factor shows
    pub async fn enrollment_status(&self, factor: Factor) -> EnrollmentStatus {
        if self.is_present(&factor.auth_button()).await {
            EnrollmentStatus::Registered
        } else if self.is_present(&factor.register_button()).await {
            EnrollmentStatus::Unregistered
        } else {
            EnrollmentStatus::Unknown
        }
    }

    /// Click whichever of register / authenticate is shown right now.
    ///
    /// A disabled control is still clicked; the application ignores it.
    ///
    /// # Errors
    ///
    /// [`AuthProbeError::MissingControl`] if neither control is present
    pub async fn click_primary(&mut self, factor: Factor) -> AuthProbeResult<EnrollmentStatus> {
        let status = self.enrollment_status(factor).await;
        let control = match status {
            EnrollmentStatus::Registered => factor.auth_button(),
            EnrollmentStatus::Unregistered => factor.register_button(),
            EnrollmentStatus::Unknown => {
                return Err(AuthProbeError::MissingControl {
                    factor: factor.name().to_string(),
                })
            }
        };
        debug!(%factor, %status, "primary action");
        self.driver.click(&control).await?;
        Ok(status)
    }

    /// [`LoginPage::click_primary`] for the biometric factor
    ///
    /// # Errors
    ///
    /// [`AuthProbeError::MissingControl`] if neither control is present
    pub async fn click_biometric_primary(&mut self) -> AuthProbeResult<EnrollmentStatus> {
        self.click_primary(Factor::Biometric).await
    }

    /// [`LoginPage::click_primary`] for the face factor
    ///
    /// # Errors
    ///
    /// [`AuthProbeError::MissingControl`] if neither control is present
    pub async fn click_face_primary(&mut self) -> AuthProbeResult<EnrollmentStatus> {
        self.click_primary(Factor::Face).await
    }

    /// Label of the factor's primary control
    pub async fn primary_button_text(&self, factor: Factor) -> Option<String> {
        let control = match self.enrollment_status(factor).await {
            EnrollmentStatus::Registered => factor.auth_button(),
            EnrollmentStatus::Unregistered => factor.register_button(),
            EnrollmentStatus::Unknown => return None,
        };
        self.state_now(&control).await.map(|s| s.text)
    }

    // -------------------------------------------------------------------------
    // Probes
    // -------------------------------------------------------------------------

    async fn state_now(&self, selector: &Selector) -> Option<ElementState> {
        match self.driver.query(selector).await {
            Ok(state) => state,
            Err(e) => {
                warn!(%selector, error = %e, "lookup failed");
                None
            }
        }
    }

    /// Whether `selector` matches anything right now; never waits or fails
    pub async fn is_present(&self, selector: &Selector) -> bool {
        self.state_now(selector).await.is_some()
    }

    /// Whether the factor currently shows its register control
    pub async fn is_register_button_present(&self, factor: Factor) -> bool {
        self.is_present(&factor.register_button()).await
    }

    /// Whether the factor currently shows its authenticate control
    pub async fn is_authenticate_button_present(&self, factor: Factor) -> bool {
        self.is_present(&factor.auth_button()).await
    }

    async fn probe_visible(&self, selector: &Selector) -> bool {
        match self
            .prober
            .probe(&self.driver, selector, ElementCondition::Visible)
            .await
        {
            Ok(seen) => seen,
            Err(e) => {
                warn!(%selector, error = %e, "probe failed");
                false
            }
        }
    }

    /// Scanning indicator shown
    pub async fn is_scanning_visible(&self) -> bool {
        self.probe_visible(&catalog::STATUS_SCANNING).await
    }

    /// Success banner shown
    pub async fn is_auth_success_visible(&self) -> bool {
        self.probe_visible(&catalog::STATUS_SUCCESS).await
    }

    /// Failure banner shown
    pub async fn is_auth_error_visible(&self) -> bool {
        self.probe_visible(&catalog::STATUS_ERROR).await
    }

    /// Network error banner shown
    pub async fn is_network_error_visible(&self) -> bool {
        self.probe_visible(&catalog::STATUS_NETWORK_ERROR).await
    }

    /// Lockout banner shown
    pub async fn is_locked_out(&self) -> bool {
        self.probe_visible(&catalog::STATUS_LOCKED).await
    }

    /// Password fallback suggestion shown
    pub async fn is_fallback_message_visible(&self) -> bool {
        self.probe_visible(&catalog::STATUS_FALLBACK).await
    }

    /// Whether `selector` appears within the probe bound and is disabled
    pub async fn is_button_disabled(&self, selector: &Selector) -> bool {
        match self
            .prober
            .for_element(&self.driver, selector, ElementCondition::Present)
            .await
        {
            Ok(state) => state.is_some_and(|s| !s.enabled),
            Err(e) => {
                if !e.is_timeout() {
                    warn!(%selector, error = %e, "probe failed");
                }
                false
            }
        }
    }

    /// Whether the factor's shown primary control is disabled
    pub async fn is_primary_disabled(&self, factor: Factor) -> bool {
        match self.enrollment_status(factor).await {
            EnrollmentStatus::Registered => self.is_button_disabled(&factor.auth_button()).await,
            EnrollmentStatus::Unregistered => {
                self.is_button_disabled(&factor.register_button()).await
            }
            EnrollmentStatus::Unknown => false,
        }
    }

    /// Whether the URL reaches the dashboard within the probe bound
    pub async fn is_on_dashboard(&self) -> bool {
        let driver = &self.driver;
        self.prober
            .until("dashboard url", || async move {
                let url = driver.current_url().await?;
                Ok(url.contains(catalog::DASHBOARD_URL_FRAGMENT))
            })
            .await
            .is_ok()
    }

    /// Poll the status banners until one shows, within the probe bound
    pub async fn observe_outcome(&self) -> Option<AttemptOutcome> {
        let found = Mutex::new(None);
        let driver = &self.driver;
        let slot = &found;
        let waited = self
            .prober
            .until("attempt outcome", || async move {
                for (selector, outcome) in OUTCOME_BANNERS {
                    if driver.query(&selector).await?.is_some_and(|s| s.visible) {
                        if let Ok(mut f) = slot.lock() {
                            *f = Some(outcome);
                        }
                        return Ok(true);
                    }
                }
                Ok(false)
            })
            .await;
        if let Err(e) = waited {
            if !e.is_timeout() {
                warn!(error = %e, "outcome probe failed");
            }
            return None;
        }
        found.into_inner().ok().flatten()
    }

    /// Email value, if the field is shown and non-empty within the probe bound
    pub async fn autopopulated_email(&self) -> Option<String> {
        let found = Mutex::new(None);
        let driver = &self.driver;
        let slot = &found;
        let waited = self
            .prober
            .until("autopopulated email", || async move {
                let value = driver
                    .query(&catalog::EMAIL)
                    .await?
                    .and_then(|s| s.value)
                    .filter(|v| !v.trim().is_empty());
                let filled = value.is_some();
                if let Ok(mut f) = slot.lock() {
                    *f = value;
                }
                Ok(filled)
            })
            .await;
        if waited.is_err() {
            return None;
        }
        found.into_inner().ok().flatten()
    }

    /// Whether the email field was filled by the application
    pub async fn is_email_autopopulated(&self) -> bool {
        self.autopopulated_email().await.is_some()
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Follow the link to account creation
    ///
    /// # Errors
    ///
    /// Timeout if the link or the registration page never renders
    pub async fn click_register_link(&mut self) -> AuthProbeResult<()> {
        self.click_when_clickable(&catalog::REGISTER_LINK).await?;
        self.wait_for(&catalog::REGISTER_SUBMIT, ElementCondition::Visible)
            .await?;
        Ok(())
    }

    /// Open a registration sub-tab
    ///
    /// # Errors
    ///
    /// Timeout if the tab never becomes clickable
    pub async fn switch_to_registration_tab(&mut self, tab: RegistrationTab) -> AuthProbeResult<()> {
        self.click_when_clickable(&tab.tab()).await
    }

    /// Fill the account form
    ///
    /// # Errors
    ///
    /// Timeout if a field is not visible
    pub async fn fill_registration_form(&mut self, form: &AccountForm) -> AuthProbeResult<()> {
        self.enter(&catalog::REGISTER_USERNAME, &form.username)
            .await?;
        self.enter(&catalog::REGISTER_EMAIL, &form.email).await?;
        self.enter(&catalog::REGISTER_PASSWORD, &form.password)
            .await?;
        self.enter(&catalog::REGISTER_CONFIRM_PASSWORD, &form.confirm_password)
            .await
    }

    /// Tick the enroll-at-signup option, opening its tab first if needed
    ///
    /// # Errors
    ///
    /// Timeout if the option never becomes clickable
    pub async fn check_biometric_registration_option(&mut self) -> AuthProbeResult<()> {
        if !self.is_present(&catalog::REGISTER_BIOMETRIC_OPTION).await {
            self.switch_to_registration_tab(RegistrationTab::Biometric)
                .await?;
        }
        self.click_when_clickable(&catalog::REGISTER_BIOMETRIC_OPTION)
            .await
    }

    /// Submit the registration form
    ///
    /// # Errors
    ///
    /// Timeout if the submit button never becomes clickable
    pub async fn submit_registration(&mut self) -> AuthProbeResult<()> {
        self.click_when_clickable(&catalog::REGISTER_SUBMIT).await
    }

    /// Return to the login page through the link, or by loading the base URL
    ///
    /// # Errors
    ///
    /// Navigation error, or a timeout if no login tab renders
    pub async fn navigate_back_to_login(&mut self) -> AuthProbeResult<()> {
        if self.is_present(&catalog::BACK_TO_LOGIN).await {
            self.driver.click(&catalog::BACK_TO_LOGIN).await?;
            self.wait_for_login_tabs(self.waiter).await
        } else {
            info!("no back link; loading login page directly");
            self.open().await
        }
    }
}
