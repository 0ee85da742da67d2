//! In-process double of the login application.
//!
//! [`MockDriver`] implements [`AuthDriver`] against a simulated single-page
//! app so page operations and whole scenarios run without Chromium. Server
//! state ([`MockBackend`]) is shared between drivers the way a real backend is
//! shared between browser sessions; page state is per driver and is lost on
//! every load.

use crate::config::DEFAULT_BASE_URL;
use crate::driver::{AuthDriver, ElementState};
use crate::injector::{CameraMode, CredentialMode, RuntimeOverrides};
use crate::locator::{catalog, AuthTab, Factor, RegistrationTab, Selector};
use crate::result::{AuthProbeError, AuthProbeResult};
use crate::session::SessionFactory;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Failures after which the application locks a factor
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 3;

/// Path of the test-only endpoint that clears server state
pub const DEFAULT_RESET_PATH: &str = "/test/reset";

const WEBAUTHN_PATH: &str = "/webauthn/verify";
const FACE_PATH: &str = "/api/face/verify";
const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_API_PATH: &str = "/api/auth/register";

// =============================================================================
// BACKEND
// =============================================================================

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAccount {
    /// Login email
    pub email: String,
    /// Username used by the hardware factors
    pub username: String,
    /// Password
    pub password: String,
}

/// Server-side state of the simulated application
#[derive(Debug, Clone)]
pub struct MockBackend {
    accounts: Vec<MockAccount>,
    enrollments: HashSet<(Factor, String)>,
    failures: HashMap<(Factor, String), u32>,
    locked: HashSet<(Factor, String)>,
    lockout_threshold: u32,
    reset_path: String,
    resets: u32,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            enrollments: HashSet::new(),
            failures: HashMap::new(),
            locked: HashSet::new(),
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            reset_path: DEFAULT_RESET_PATH.to_string(),
            resets: 0,
        }
    }
}

impl MockBackend {
    /// Registered accounts
    #[must_use]
    pub fn accounts(&self) -> &[MockAccount] {
        &self.accounts
    }

    /// Whether `username` has an enrolled credential for `factor`
    #[must_use]
    pub fn is_enrolled(&self, factor: Factor, username: &str) -> bool {
        self.enrollments.contains(&(factor, username.to_string()))
    }

    /// Whether `factor` is locked for `username`
    #[must_use]
    pub fn is_locked(&self, factor: Factor, username: &str) -> bool {
        self.locked.contains(&(factor, username.to_string()))
    }

    /// Consecutive failures recorded for `username` on `factor`
    #[must_use]
    pub fn failures(&self, factor: Factor, username: &str) -> u32 {
        self.failures
            .get(&(factor, username.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of times the reset endpoint was hit
    #[must_use]
    pub const fn resets(&self) -> u32 {
        self.resets
    }

    fn account_by_username(&self, username: &str) -> Option<&MockAccount> {
        self.accounts.iter().find(|a| a.username == username)
    }

    /// Path that clears server state when loaded
    #[must_use]
    pub fn reset_path(&self) -> &str {
        &self.reset_path
    }

    fn is_reset(&self, url: &str) -> bool {
        let reset = self.reset_path.trim_end_matches('/');
        !reset.is_empty() && url_path(url).trim_end_matches('/') == reset
    }

    /// Count a failure; `limit` overrides the backend threshold
    fn record_failure(&mut self, factor: Factor, username: &str, limit: Option<u32>) -> bool {
        let limit = limit.unwrap_or(self.lockout_threshold);
        let key = (factor, username.to_string());
        let count = self.failures.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count >= limit {
            self.locked.insert(key);
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.failures.clear();
        self.locked.clear();
        self.resets += 1;
    }
}

/// Handle to a backend shared by several drivers
pub type SharedBackend = Arc<Mutex<MockBackend>>;

/// Path of `url` without origin, query or fragment
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.find('/').map_or("", |idx| &rest[idx..]);
    path.split(['?', '#']).next().unwrap_or(path)
}

// =============================================================================
// PAGE STATE
// =============================================================================

/// Route the simulated app is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockPage {
    /// Nothing loaded
    #[default]
    Blank,
    /// Login page with the three auth tabs
    Login,
    /// Account creation
    Register,
    /// Post-authentication landing page
    Dashboard,
}

/// Status banner rendered by the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    /// Authentication succeeded
    Success,
    /// Ceremony or password check failed
    Error,
    /// Factor locked
    Locked,
    /// API unreachable
    NetworkError,
    /// Suggestion to switch to password
    Fallback,
    /// Credential enrolled
    Registered,
    /// Account created
    AccountCreated,
    /// Registration form rejected
    AccountRejected,
}

impl Banner {
    /// Rendered text
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Success => "Authentication successful!",
            Self::Error => "Authentication failed",
            Self::Locked => "Account locked after too many failed attempts",
            Self::NetworkError => "Network Error: connection interrupted",
            Self::Fallback => "Use password to sign in instead",
            Self::Registered => "Credential registered",
            Self::AccountCreated => "Account created",
            Self::AccountRejected => "Registration failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failed,
    Denied,
    NetworkError,
}

/// Client-side state of the simulated application
#[derive(Debug, Clone)]
pub struct MockLoginApp {
    backend: SharedBackend,
    origin: String,
    page: MockPage,
    tab: AuthTab,
    registration_tab: RegistrationTab,
    fields: HashMap<Selector, String>,
    banners: Vec<Banner>,
    overrides: Option<RuntimeOverrides>,
    last_failed_identity: Option<String>,
    biometric_option: bool,
}

impl Default for MockLoginApp {
    fn default() -> Self {
        Self::with_backend(SharedBackend::default())
    }
}

impl MockLoginApp {
    /// Create an app on top of a shared backend
    #[must_use]
    pub fn with_backend(backend: SharedBackend) -> Self {
        Self {
            backend,
            origin: String::new(),
            page: MockPage::Blank,
            tab: AuthTab::Biometric,
            registration_tab: RegistrationTab::Account,
            fields: HashMap::new(),
            banners: Vec::new(),
            overrides: None,
            last_failed_identity: None,
            biometric_option: false,
        }
    }

    /// Current route
    #[must_use]
    pub const fn page(&self) -> MockPage {
        self.page
    }

    /// Active login tab
    #[must_use]
    pub const fn active_tab(&self) -> AuthTab {
        self.tab
    }

    /// Visible banners
    #[must_use]
    pub fn banners(&self) -> &[Banner] {
        &self.banners
    }

    /// Overrides installed into the current page, if any
    #[must_use]
    pub const fn overrides(&self) -> Option<&RuntimeOverrides> {
        self.overrides.as_ref()
    }

    /// Shared backend handle
    #[must_use]
    pub fn backend(&self) -> SharedBackend {
        Arc::clone(&self.backend)
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> String {
        match self.page {
            MockPage::Blank => "about:blank".to_string(),
            MockPage::Login => self.origin.clone(),
            MockPage::Register => format!("{}/register", self.origin),
            MockPage::Dashboard => format!("{}/dashboard", self.origin),
        }
    }

    fn server(&self) -> AuthProbeResult<MutexGuard<'_, MockBackend>> {
        self.backend
            .lock()
            .map_err(|e| AuthProbeError::script(format!("backend unavailable: {e}")))
    }

    /// Full page load: client state and injected overrides are discarded
    fn load(&mut self, url: &str) -> AuthProbeResult<()> {
        self.fields.clear();
        self.banners.clear();
        self.overrides = None;
        self.last_failed_identity = None;
        self.biometric_option = false;
        self.tab = AuthTab::Biometric;
        self.registration_tab = RegistrationTab::Account;

        if url == "about:blank" {
            self.page = MockPage::Blank;
            return Ok(());
        }
        let reset = {
            let mut server = self.server()?;
            let hit = server.is_reset(url);
            if hit {
                server.reset();
            }
            hit
        };
        if reset {
            self.page = MockPage::Blank;
            return Ok(());
        }
        let (origin, page) = if let Some(idx) = url.find("/dashboard") {
            (&url[..idx], MockPage::Dashboard)
        } else if let Some(idx) = url.find("/register") {
            (&url[..idx], MockPage::Register)
        } else {
            (url, MockPage::Login)
        };
        self.origin = origin.trim_end_matches('/').to_string();
        self.page = page;
        Ok(())
    }

    /// Client-side route change; injected overrides survive
    fn route(&mut self, page: MockPage) {
        self.page = page;
        self.fields.clear();
        self.banners.clear();
        self.tab = AuthTab::Biometric;
        self.registration_tab = RegistrationTab::Account;
        self.biometric_option = false;
    }

    fn field(&self, selector: &Selector) -> String {
        self.fields.get(selector).cloned().unwrap_or_default()
    }

    fn identity(&self, factor: Factor) -> String {
        self.field(&factor.username_input()).trim().to_string()
    }

    fn input(&self, selector: &Selector) -> ElementState {
        ElementState::shown("").with_value(self.field(selector))
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Immediate lookup of `selector` in the rendered page
    ///
    /// # Errors
    ///
    /// Fails only if the shared backend is poisoned.
    pub fn element(&self, selector: &Selector) -> AuthProbeResult<Option<ElementState>> {
        let found = match self.page {
            MockPage::Blank => None,
            MockPage::Login => self.login_element(selector)?,
            MockPage::Register => self.register_element(selector),
            MockPage::Dashboard => None,
        };
        Ok(found.or_else(|| self.banner_element(selector)))
    }

    fn banner_element(&self, selector: &Selector) -> Option<ElementState> {
        self.banners
            .iter()
            .find(|b| match selector {
                Selector::Text(t) => b.text() == &**t,
                Selector::TextContains(t) => b.text().contains(&**t),
                _ => false,
            })
            .map(|b| ElementState::shown(b.text()))
    }

    fn login_element(&self, selector: &Selector) -> AuthProbeResult<Option<ElementState>> {
        for tab in AuthTab::ALL {
            if *selector == tab.tab() {
                return Ok(Some(ElementState::shown(tab_label(tab))));
            }
        }
        if *selector == catalog::TAB_BIOMETRIC_STATEFUL {
            return Ok(Some(ElementState::shown(tab_label(AuthTab::Biometric))));
        }
        if *selector == catalog::REGISTER_LINK {
            return Ok(Some(ElementState::shown("Create one here")));
        }

        let factor = match self.tab {
            AuthTab::Password => {
                if *selector == catalog::EMAIL || *selector == catalog::PASSWORD {
                    return Ok(Some(self.input(selector)));
                }
                if *selector == catalog::PASSWORD_SUBMIT {
                    return Ok(Some(ElementState::shown("Sign In")));
                }
                return Ok(None);
            }
            AuthTab::Biometric => Factor::Biometric,
            AuthTab::Face => Factor::Face,
        };

        if *selector == factor.username_input() {
            return Ok(Some(self.input(selector)));
        }
        let identity = self.identity(factor);
        let server = self.server()?;
        let enrolled = server.is_enrolled(factor, &identity);
        let locked = server.is_locked(factor, &identity);
        let control = if *selector == factor.register_button() && !enrolled {
            Some(format!("Register {}", factor_label(factor)))
        } else if *selector == factor.auth_button() && enrolled {
            Some(format!("Authenticate with {}", factor_label(factor)))
        } else {
            None
        };
        Ok(control.map(|text| {
            let state = ElementState::shown(text);
            if locked {
                state.disabled()
            } else {
                state
            }
        }))
    }

    fn register_element(&self, selector: &Selector) -> Option<ElementState> {
        if *selector == catalog::REGISTER_TAB_ACCOUNT {
            return Some(ElementState::shown("Account"));
        }
        if *selector == catalog::REGISTER_TAB_BIOMETRIC {
            return Some(ElementState::shown("Biometric"));
        }
        if *selector == catalog::REGISTER_SUBMIT {
            return Some(ElementState::shown("Create Account"));
        }
        if *selector == catalog::BACK_TO_LOGIN {
            return Some(ElementState::shown("Sign in here"));
        }
        match self.registration_tab {
            RegistrationTab::Account => [
                catalog::REGISTER_USERNAME,
                catalog::REGISTER_EMAIL,
                catalog::REGISTER_PASSWORD,
                catalog::REGISTER_CONFIRM_PASSWORD,
            ]
            .contains(selector)
            .then(|| self.input(selector)),
            RegistrationTab::Biometric => (*selector == catalog::REGISTER_BIOMETRIC_OPTION).then(|| {
                let checked = if self.biometric_option { "checked" } else { "unchecked" };
                ElementState::shown("Enable biometric sign-in").with_value(checked)
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Interaction
    // -------------------------------------------------------------------------

    fn click(&mut self, selector: &Selector) -> AuthProbeResult<()> {
        let state = self
            .element(selector)?
            .ok_or_else(|| AuthProbeError::input(format!("no element matches {selector}")))?;
        if !state.visible {
            return Err(AuthProbeError::input(format!("{selector} is not visible")));
        }
        if !state.enabled {
            return Ok(());
        }
        match self.page {
            MockPage::Login => self.click_login(selector),
            MockPage::Register => self.click_register(selector),
            MockPage::Blank | MockPage::Dashboard => Ok(()),
        }
    }

    fn type_into(&mut self, selector: &Selector, text: &str) -> AuthProbeResult<()> {
        let state = self
            .element(selector)?
            .ok_or_else(|| AuthProbeError::input(format!("no element matches {selector}")))?;
        if state.value.is_none() || !state.visible {
            return Err(AuthProbeError::input(format!("{selector} does not accept text")));
        }
        self.fields.insert(selector.clone(), text.to_string());
        Ok(())
    }

    fn click_login(&mut self, selector: &Selector) -> AuthProbeResult<()> {
        if let Some(tab) = AuthTab::ALL.into_iter().find(|t| *selector == t.tab()) {
            return self.switch_tab(tab);
        }
        if *selector == catalog::TAB_BIOMETRIC_STATEFUL {
            return self.switch_tab(AuthTab::Biometric);
        }
        if *selector == catalog::REGISTER_LINK {
            self.route(MockPage::Register);
            return Ok(());
        }
        if *selector == catalog::PASSWORD_SUBMIT {
            return self.password_login();
        }
        for factor in [Factor::Biometric, Factor::Face] {
            if *selector == factor.register_button() {
                return self.ceremony(factor, true);
            }
            if *selector == factor.auth_button() {
                return self.ceremony(factor, false);
            }
        }
        Ok(())
    }

    fn switch_tab(&mut self, tab: AuthTab) -> AuthProbeResult<()> {
        self.tab = tab;
        self.banners.clear();
        if tab == AuthTab::Password {
            if let Some(identity) = self.last_failed_identity.clone() {
                let email = self
                    .server()?
                    .account_by_username(&identity)
                    .map(|a| a.email.clone());
                if let Some(email) = email {
                    self.fields.insert(catalog::EMAIL, email);
                }
            }
        }
        Ok(())
    }

    fn blocked(&self, path: &str) -> bool {
        self.overrides
            .as_ref()
            .is_some_and(|o| o.network.blocks(path))
    }

    fn ceremony_outcome(&self, factor: Factor) -> Outcome {
        let Some(overrides) = &self.overrides else {
            // No test doubles: the platform prompt never resolves headlessly
            return Outcome::Denied;
        };
        if factor == Factor::Face && overrides.camera == CameraMode::PermissionDenied {
            return Outcome::Denied;
        }
        match overrides.credentials {
            CredentialMode::PermissionDenied => Outcome::Denied,
            CredentialMode::Failure | CredentialMode::LockoutAfter(_) => Outcome::Failed,
            CredentialMode::Passthrough | CredentialMode::Success => {
                let path = match factor {
                    Factor::Biometric => WEBAUTHN_PATH,
                    Factor::Face => FACE_PATH,
                };
                if self.blocked(path) {
                    Outcome::NetworkError
                } else {
                    Outcome::Success
                }
            }
        }
    }

    fn ceremony(&mut self, factor: Factor, registering: bool) -> AuthProbeResult<()> {
        let identity = self.identity(factor);
        self.banners.clear();
        if self.server()?.is_locked(factor, &identity) {
            self.banners = vec![Banner::Locked, Banner::Fallback];
            return Ok(());
        }
        match self.ceremony_outcome(factor) {
            Outcome::Success => {
                let mut server = self.server()?;
                let key = (factor, identity);
                server.failures.remove(&key);
                if registering {
                    server.enrollments.insert(key);
                    drop(server);
                    self.banners = vec![Banner::Registered];
                } else {
                    drop(server);
                    self.banners = vec![Banner::Success];
                    self.page = MockPage::Dashboard;
                    self.last_failed_identity = None;
                }
            }
            Outcome::NetworkError => self.banners = vec![Banner::NetworkError, Banner::Fallback],
            Outcome::Denied => {
                self.banners = vec![Banner::Error, Banner::Fallback];
                self.last_failed_identity = Some(identity);
            }
            Outcome::Failed => {
                let limit = match self.overrides.as_ref().map(|o| o.credentials) {
                    Some(CredentialMode::LockoutAfter(n)) => Some(n),
                    _ => None,
                };
                let locked = self.server()?.record_failure(factor, &identity, limit);
                self.banners = if locked {
                    vec![Banner::Locked, Banner::Fallback]
                } else {
                    vec![Banner::Error, Banner::Fallback]
                };
                self.last_failed_identity = Some(identity);
            }
        }
        Ok(())
    }

    fn password_login(&mut self) -> AuthProbeResult<()> {
        self.banners.clear();
        if self.blocked(LOGIN_PATH) {
            self.banners = vec![Banner::NetworkError];
            return Ok(());
        }
        let email = self.field(&catalog::EMAIL);
        let password = self.field(&catalog::PASSWORD);
        let matched = self
            .server()?
            .accounts
            .iter()
            .any(|a| a.email == email && a.password == password);
        if matched {
            self.banners = vec![Banner::Success];
            self.page = MockPage::Dashboard;
            self.last_failed_identity = None;
        } else {
            self.banners = vec![Banner::Error];
        }
        Ok(())
    }

    fn click_register(&mut self, selector: &Selector) -> AuthProbeResult<()> {
        if *selector == catalog::REGISTER_TAB_ACCOUNT {
            self.registration_tab = RegistrationTab::Account;
        } else if *selector == catalog::REGISTER_TAB_BIOMETRIC {
            self.registration_tab = RegistrationTab::Biometric;
        } else if *selector == catalog::REGISTER_BIOMETRIC_OPTION {
            self.biometric_option = !self.biometric_option;
        } else if *selector == catalog::REGISTER_SUBMIT {
            self.submit_registration()?;
        } else if *selector == catalog::BACK_TO_LOGIN {
            self.route(MockPage::Login);
        }
        Ok(())
    }

    fn submit_registration(&mut self) -> AuthProbeResult<()> {
        let account = MockAccount {
            username: self.field(&catalog::REGISTER_USERNAME).trim().to_string(),
            email: self.field(&catalog::REGISTER_EMAIL).trim().to_string(),
            password: self.field(&catalog::REGISTER_PASSWORD),
        };
        let confirm = self.field(&catalog::REGISTER_CONFIRM_PASSWORD);
        self.banners.clear();

        if self.blocked(REGISTER_API_PATH) {
            self.banners = vec![Banner::NetworkError];
            return Ok(());
        }
        let enroll = self.biometric_option
            && self.ceremony_outcome(Factor::Biometric) == Outcome::Success;

        let mut server = self.server()?;
        let duplicate = server
            .accounts
            .iter()
            .any(|a| a.email == account.email || a.username == account.username);
        let invalid = account.username.is_empty()
            || account.email.is_empty()
            || account.password.is_empty()
            || account.password != confirm;
        if duplicate || invalid {
            drop(server);
            self.banners = vec![Banner::AccountRejected];
            return Ok(());
        }
        if enroll {
            server
                .enrollments
                .insert((Factor::Biometric, account.username.clone()));
        }
        server.accounts.push(account);
        drop(server);
        self.banners = vec![Banner::AccountCreated];
        self.biometric_option = false;
        Ok(())
    }
}

const fn tab_label(tab: AuthTab) -> &'static str {
    match tab {
        AuthTab::Password => "Password",
        AuthTab::Biometric => "Biometric",
        AuthTab::Face => "Face",
    }
}

const fn factor_label(factor: Factor) -> &'static str {
    match factor {
        Factor::Biometric => "Biometric",
        Factor::Face => "Face",
    }
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Mock driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    app: MockLoginApp,
    fail_injection: bool,
    unreachable: bool,
    closed: bool,
    /// Call history for verification
    pub call_history: Vec<String>,
}

impl MockDriver {
    /// Create a driver with its own empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver on a shared backend
    #[must_use]
    pub fn with_backend(backend: SharedBackend) -> Self {
        Self {
            app: MockLoginApp::with_backend(backend),
            ..Self::default()
        }
    }

    /// Seed an account
    #[must_use]
    pub fn with_account(self, email: &str, username: &str, password: &str) -> Self {
        if let Ok(mut server) = self.app.backend.lock() {
            server.accounts.push(MockAccount {
                email: email.to_string(),
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        self
    }

    /// Seed an enrolled credential
    #[must_use]
    pub fn with_enrollment(self, factor: Factor, username: &str) -> Self {
        if let Ok(mut server) = self.app.backend.lock() {
            server.enrollments.insert((factor, username.to_string()));
        }
        self
    }

    /// Change the failure count that locks a factor
    #[must_use]
    pub fn with_lockout_threshold(self, threshold: u32) -> Self {
        if let Ok(mut server) = self.app.backend.lock() {
            server.lockout_threshold = threshold;
        }
        self
    }

    /// Serve the reset endpoint at the path of `url`
    #[must_use]
    pub fn with_reset_url(self, url: &str) -> Self {
        if let Ok(mut server) = self.app.backend.lock() {
            server.reset_path = url_path(url).to_string();
        }
        self
    }

    /// Make override installation fail
    pub fn fail_injection(&mut self, fail: bool) {
        self.fail_injection = fail;
    }

    /// Make every navigation fail
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    /// Load the login page at the default base URL without overrides
    pub fn navigate_to_login(&mut self) {
        self.call_history
            .push(format!("navigate:{DEFAULT_BASE_URL}"));
        self.app.route(MockPage::Login);
        self.app.overrides = None;
        self.app.origin = DEFAULT_BASE_URL.to_string();
    }

    /// Simulated application
    #[must_use]
    pub const fn app(&self) -> &MockLoginApp {
        &self.app
    }

    /// Snapshot of the server state
    #[must_use]
    pub fn backend_snapshot(&self) -> MockBackend {
        self.app
            .backend
            .lock()
            .map(|b| b.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Whether `close` was called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }
}

#[async_trait]
impl AuthDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> AuthProbeResult<()> {
        self.call_history.push(format!("navigate:{url}"));
        if self.unreachable {
            return Err(AuthProbeError::Navigation {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.app.load(url)
    }

    async fn reload(&mut self) -> AuthProbeResult<()> {
        self.call_history.push("reload".to_string());
        let url = self.app.url();
        self.app.load(&url)
    }

    async fn current_url(&self) -> AuthProbeResult<String> {
        Ok(self.app.url())
    }

    async fn execute_js(&self, script: &str) -> AuthProbeResult<serde_json::Value> {
        let _ = script;
        Ok(serde_json::Value::Null)
    }

    async fn query(&self, selector: &Selector) -> AuthProbeResult<Option<ElementState>> {
        self.app.element(selector)
    }

    async fn click(&mut self, selector: &Selector) -> AuthProbeResult<()> {
        self.call_history.push(format!("click:{selector}"));
        self.app.click(selector)
    }

    async fn clear_and_type(&mut self, selector: &Selector, text: &str) -> AuthProbeResult<()> {
        self.call_history.push(format!("type:{selector}:{text}"));
        self.app.type_into(selector, text)
    }

    async fn apply_overrides(&mut self, overrides: &RuntimeOverrides) -> AuthProbeResult<()> {
        self.call_history
            .push(format!("apply_overrides:{:?}", overrides.credentials));
        if self.fail_injection {
            return Err(AuthProbeError::script("injection rejected by page"));
        }
        self.app.overrides = Some(overrides.clone());
        Ok(())
    }

    async fn close(&mut self) -> AuthProbeResult<()> {
        self.call_history.push("close".to_string());
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// MOCK SESSION FACTORY
// =============================================================================

/// Opens [`MockDriver`]s that share one backend
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    backend: SharedBackend,
    opened: Arc<Mutex<u32>>,
}

impl MockFactory {
    /// Create a factory with an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account on the shared backend
    #[must_use]
    pub fn with_account(self, email: &str, username: &str, password: &str) -> Self {
        if let Ok(mut server) = self.backend.lock() {
            server.accounts.push(MockAccount {
                email: email.to_string(),
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        self
    }

    /// Serve the reset endpoint at the path of `url`
    #[must_use]
    pub fn with_reset_url(self, url: &str) -> Self {
        if let Ok(mut server) = self.backend.lock() {
            server.reset_path = url_path(url).to_string();
        }
        self
    }

    /// Shared backend handle
    #[must_use]
    pub fn backend(&self) -> SharedBackend {
        Arc::clone(&self.backend)
    }

    /// Number of sessions opened so far
    #[must_use]
    pub fn opened(&self) -> u32 {
        self.opened.lock().map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    type Driver = MockDriver;

    async fn open(&self) -> AuthProbeResult<MockDriver> {
        if let Ok(mut n) = self.opened.lock() {
            *n += 1;
        }
        Ok(MockDriver::with_backend(Arc::clone(&self.backend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn login_page() -> MockDriver {
        let mut driver = MockDriver::new()
            .with_account("etornam.koko@example.com", "etornam.koko", "12345678");
        driver.navigate("http://localhost:8081").await.unwrap();
        driver
            .apply_overrides(&RuntimeOverrides::default())
            .await
            .unwrap();
        driver
    }

    async fn visible(driver: &MockDriver, selector: &Selector) -> bool {
        driver
            .query(selector)
            .await
            .unwrap()
            .is_some_and(|s| s.visible)
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_blank_until_navigated() {
            let driver = MockDriver::new();
            assert_eq!(driver.current_url().await.unwrap(), "about:blank");
            assert!(!visible(&driver, &catalog::TAB_PASSWORD).await);
        }

        #[tokio::test]
        async fn test_login_page_shows_tabs() {
            let driver = login_page().await;
            for tab in AuthTab::ALL {
                assert!(visible(&driver, &tab.tab()).await);
            }
            assert!(visible(&driver, &catalog::BIOMETRIC_USERNAME).await);
            assert!(!visible(&driver, &catalog::EMAIL).await);
        }

        #[tokio::test]
        async fn test_reload_drops_overrides() {
            let mut driver = login_page().await;
            assert!(driver.app().overrides().is_some());
            driver.reload().await.unwrap();
            assert!(driver.app().overrides().is_none());
            assert_eq!(driver.app().page(), MockPage::Login);
        }

        #[tokio::test]
        async fn test_unreachable() {
            let mut driver = MockDriver::new();
            driver.set_unreachable(true);
            let err = driver.navigate("http://localhost:8081").await.unwrap_err();
            assert!(matches!(err, AuthProbeError::Navigation { .. }));
        }

        #[tokio::test]
        async fn test_reset_endpoint_clears_lockouts() {
            let mut driver = login_page().await;
            driver
                .apply_overrides(&RuntimeOverrides::default().with_failure_mode())
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "x")
                .await
                .unwrap();
            for _ in 0..3 {
                driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            }
            assert!(driver.backend_snapshot().is_locked(Factor::Biometric, "x"));
            driver
                .navigate("http://localhost:8081/test/reset")
                .await
                .unwrap();
            let backend = driver.backend_snapshot();
            assert!(!backend.is_locked(Factor::Biometric, "x"));
            assert_eq!(backend.resets(), 1);
        }

        #[tokio::test]
        async fn test_reset_matches_whole_path() {
            let mut driver = MockDriver::new();
            for url in [
                "http://localhost:8081/password-reset",
                "http://localhost:8081/test/reset/confirm",
                "http://reset.example.com",
            ] {
                driver.navigate(url).await.unwrap();
                assert_eq!(driver.backend_snapshot().resets(), 0, "{url}");
            }
            assert_eq!(driver.app().page(), MockPage::Login);

            driver
                .navigate("http://localhost:8081/test/reset/?run=2")
                .await
                .unwrap();
            assert_eq!(driver.backend_snapshot().resets(), 1);
            assert_eq!(driver.app().page(), MockPage::Blank);
        }

        #[tokio::test]
        async fn test_custom_reset_url() {
            let mut driver = MockDriver::new().with_reset_url("http://app:9000/__admin/wipe");
            assert_eq!(driver.backend_snapshot().reset_path(), "/__admin/wipe");
            driver.navigate("http://localhost:8081/test/reset").await.unwrap();
            assert_eq!(driver.backend_snapshot().resets(), 0);
            driver.navigate("http://localhost:8081/__admin/wipe").await.unwrap();
            assert_eq!(driver.backend_snapshot().resets(), 1);

            // a reset URL without a path never matches the login page
            let mut driver = MockDriver::new().with_reset_url("http://localhost:8081");
            driver.navigate("http://localhost:8081/").await.unwrap();
            assert_eq!(driver.backend_snapshot().resets(), 0);
        }
    }

    mod primary_control_tests {
        use super::*;

        #[tokio::test]
        async fn test_exactly_one_primary_control() {
            let mut driver = login_page().await.with_enrollment(Factor::Biometric, "enrolled");
            for name in ["", "enrolled", "stranger"] {
                driver
                    .clear_and_type(&catalog::BIOMETRIC_USERNAME, name)
                    .await
                    .unwrap();
                let register = visible(&driver, &catalog::BIOMETRIC_REGISTER).await;
                let auth = visible(&driver, &catalog::BIOMETRIC_AUTH).await;
                assert!(register ^ auth, "identity {name:?}");
            }
        }

        #[tokio::test]
        async fn test_register_then_authenticate() {
            let mut driver = login_page().await;
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "biouser")
                .await
                .unwrap();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(driver.backend_snapshot().is_enrolled(Factor::Biometric, "biouser"));
            assert!(visible(&driver, &catalog::BIOMETRIC_AUTH).await);

            driver.click(&catalog::BIOMETRIC_AUTH).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_SUCCESS).await);
            assert!(driver.current_url().await.unwrap().contains("dashboard"));
        }

        #[tokio::test]
        async fn test_without_overrides_ceremony_fails() {
            let mut driver = MockDriver::new();
            driver.navigate_to_login();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_ERROR).await);
            assert!(visible(&driver, &catalog::STATUS_FALLBACK).await);
        }
    }

    mod lockout_tests {
        use super::*;

        #[tokio::test]
        async fn test_three_failures_lock_the_factor() {
            let mut driver = login_page().await;
            driver
                .apply_overrides(&RuntimeOverrides::default().with_failure_mode())
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "lockoutuser")
                .await
                .unwrap();
            for attempt in 1..=2 {
                driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
                assert!(visible(&driver, &catalog::STATUS_ERROR).await, "attempt {attempt}");
                assert!(!visible(&driver, &catalog::STATUS_LOCKED).await);
            }
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_LOCKED).await);

            // fourth attempt hits a disabled control
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            let control = driver
                .query(&catalog::BIOMETRIC_REGISTER)
                .await
                .unwrap()
                .unwrap();
            assert!(!control.enabled);
            assert!(visible(&driver, &catalog::STATUS_LOCKED).await);
            assert_eq!(
                driver.backend_snapshot().failures(Factor::Biometric, "lockoutuser"),
                3
            );

            driver.click(&catalog::TAB_PASSWORD).await.unwrap();
            assert!(visible(&driver, &catalog::EMAIL).await);
        }

        #[tokio::test]
        async fn test_custom_threshold() {
            let mut driver = login_page().await.with_lockout_threshold(1);
            driver
                .apply_overrides(&RuntimeOverrides::default().with_failure_mode())
                .await
                .unwrap();
            driver.click(&catalog::TAB_FACE).await.unwrap();
            driver
                .clear_and_type(&catalog::FACE_USERNAME, "nouser")
                .await
                .unwrap();
            driver.click(&catalog::FACE_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_LOCKED).await);
        }

        #[tokio::test]
        async fn test_lockout_counting_locks_at_its_own_count() {
            let mut driver = login_page().await.with_lockout_threshold(5);
            driver
                .apply_overrides(&RuntimeOverrides::default().with_lockout_after(2))
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "counted")
                .await
                .unwrap();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_ERROR).await);
            assert!(!visible(&driver, &catalog::STATUS_LOCKED).await);

            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_LOCKED).await);
            let backend = driver.backend_snapshot();
            assert!(backend.is_locked(Factor::Biometric, "counted"));
            assert_eq!(backend.failures(Factor::Biometric, "counted"), 2);
        }
    }

    mod fallback_tests {
        use super::*;

        #[tokio::test]
        async fn test_email_autopopulates_for_known_identity() {
            let mut driver = login_page().await;
            driver
                .apply_overrides(&RuntimeOverrides::default().with_failure_mode())
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "etornam.koko")
                .await
                .unwrap();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            driver.click(&catalog::TAB_PASSWORD).await.unwrap();
            let email = driver.query(&catalog::EMAIL).await.unwrap().unwrap();
            assert_eq!(email.value.as_deref(), Some("etornam.koko@example.com"));
        }

        #[tokio::test]
        async fn test_no_autopopulation_for_unknown_identity() {
            let mut driver = login_page().await;
            driver
                .apply_overrides(&RuntimeOverrides::default().with_failure_mode())
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "ghost")
                .await
                .unwrap();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            driver.click(&catalog::TAB_PASSWORD).await.unwrap();
            let email = driver.query(&catalog::EMAIL).await.unwrap().unwrap();
            assert_eq!(email.value.as_deref(), Some(""));
        }

        #[tokio::test]
        async fn test_password_login() {
            let mut driver = login_page().await;
            driver.click(&catalog::TAB_PASSWORD).await.unwrap();
            driver
                .clear_and_type(&catalog::EMAIL, "etornam.koko@example.com")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::PASSWORD, "wrong")
                .await
                .unwrap();
            driver.click(&catalog::PASSWORD_SUBMIT).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_ERROR).await);

            driver
                .clear_and_type(&catalog::PASSWORD, "12345678")
                .await
                .unwrap();
            driver.click(&catalog::PASSWORD_SUBMIT).await.unwrap();
            assert_eq!(driver.app().page(), MockPage::Dashboard);
        }
    }

    mod network_tests {
        use super::*;
        use crate::injector::NetworkMode;

        #[tokio::test]
        async fn test_interruption_and_recovery() {
            let mut driver = login_page().await;
            driver
                .clear_and_type(&catalog::BIOMETRIC_USERNAME, "networkuser")
                .await
                .unwrap();
            driver
                .apply_overrides(&RuntimeOverrides::default().with_network(NetworkMode::interrupted()))
                .await
                .unwrap();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_NETWORK_ERROR).await);
            assert!(!visible(&driver, &catalog::STATUS_SUCCESS).await);

            driver
                .apply_overrides(&RuntimeOverrides::default())
                .await
                .unwrap();
            driver.click(&catalog::BIOMETRIC_REGISTER).await.unwrap();
            assert!(!visible(&driver, &catalog::STATUS_NETWORK_ERROR).await);
            assert!(driver
                .backend_snapshot()
                .is_enrolled(Factor::Biometric, "networkuser"));
        }

        #[tokio::test]
        async fn test_denied_camera_fails_face_only() {
            let mut driver = login_page().await;
            driver
                .apply_overrides(&RuntimeOverrides {
                    camera: CameraMode::PermissionDenied,
                    ..RuntimeOverrides::default()
                })
                .await
                .unwrap();
            driver.click(&catalog::TAB_FACE).await.unwrap();
            driver
                .clear_and_type(&catalog::FACE_USERNAME, "faceuser")
                .await
                .unwrap();
            driver.click(&catalog::FACE_REGISTER).await.unwrap();
            assert!(visible(&driver, &catalog::STATUS_ERROR).await);
        }
    }

    mod registration_tests {
        use super::*;

        #[tokio::test]
        async fn test_registration_with_enrollment() {
            let mut driver = login_page().await;
            driver.click(&catalog::REGISTER_LINK).await.unwrap();
            assert_eq!(driver.app().page(), MockPage::Register);
            driver
                .clear_and_type(&catalog::REGISTER_USERNAME, "journey")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_EMAIL, "journey@example.com")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_PASSWORD, "pw")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_CONFIRM_PASSWORD, "pw")
                .await
                .unwrap();
            driver.click(&catalog::REGISTER_TAB_BIOMETRIC).await.unwrap();
            driver.click(&catalog::REGISTER_BIOMETRIC_OPTION).await.unwrap();
            driver.click(&catalog::REGISTER_SUBMIT).await.unwrap();

            let backend = driver.backend_snapshot();
            assert!(backend.accounts().iter().any(|a| a.username == "journey"));
            assert!(backend.is_enrolled(Factor::Biometric, "journey"));

            driver.click(&catalog::BACK_TO_LOGIN).await.unwrap();
            assert_eq!(driver.app().page(), MockPage::Login);
            assert!(driver.app().overrides().is_some());
        }

        #[tokio::test]
        async fn test_mismatched_confirmation_is_rejected() {
            let mut driver = login_page().await;
            driver.click(&catalog::REGISTER_LINK).await.unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_USERNAME, "u")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_EMAIL, "u@example.com")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_PASSWORD, "a")
                .await
                .unwrap();
            driver
                .clear_and_type(&catalog::REGISTER_CONFIRM_PASSWORD, "b")
                .await
                .unwrap();
            driver.click(&catalog::REGISTER_SUBMIT).await.unwrap();
            assert_eq!(driver.app().banners(), &[Banner::AccountRejected]);
        }

        #[tokio::test]
        async fn test_typing_into_missing_field_fails() {
            let mut driver = login_page().await;
            let err = driver
                .clear_and_type(&catalog::REGISTER_CONFIRM_PASSWORD, "x")
                .await
                .unwrap_err();
            assert!(matches!(err, AuthProbeError::Input { .. }));
        }
    }

    mod factory_tests {
        use super::*;

        #[tokio::test]
        async fn test_sessions_share_backend() {
            let factory = MockFactory::new().with_account("a@b.c", "a", "pw");
            let first = factory.open().await.unwrap();
            let second = factory.open().await.unwrap();
            assert_eq!(factory.opened(), 2);
            assert_eq!(first.backend_snapshot().accounts().len(), 1);
            assert_eq!(second.backend_snapshot().accounts().len(), 1);
        }
    }
}
