//! Locator catalog for the login application.
//!
//! Every element the suites touch is named here once. A [`Selector`] is pure
//! data; drivers compile it to an in-page query with [`Selector::to_query`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// =============================================================================
// SELECTOR
// =============================================================================

/// Selector strategy plus expression identifying one DOM element family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Element id attribute
    Id(Cow<'static, str>),
    /// `data-testid` attribute
    TestId(Cow<'static, str>),
    /// CSS selector
    Css(Cow<'static, str>),
    /// XPath expression
    XPath(Cow<'static, str>),
    /// Element whose own text equals the value (after trimming)
    Text(Cow<'static, str>),
    /// Element whose own text contains the value
    TextContains(Cow<'static, str>),
}

impl Selector {
    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<Cow<'static, str>>) -> Self {
        Self::Id(id.into())
    }

    /// Create a test id selector
    #[must_use]
    pub fn test_id(id: impl Into<Cow<'static, str>>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<Cow<'static, str>>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<Cow<'static, str>>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create an exact text selector
    #[must_use]
    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Text(text.into())
    }

    /// Create a substring text selector
    #[must_use]
    pub fn text_contains(text: impl Into<Cow<'static, str>>) -> Self {
        Self::TextContains(text.into())
    }

    /// JavaScript expression evaluating to the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Id(id) => format!("document.getElementById({id:?})"),
            Self::TestId(id) => format!("document.querySelector('[data-testid={id:?}]')"),
            Self::Css(s) => format!("document.querySelector({s:?})"),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue")
            }
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('body *')).find(el => Array.from(el.childNodes).some(n => n.nodeType === 3 && n.textContent.trim() === {t:?})) || null"
            ),
            Self::TextContains(t) => format!(
                "Array.from(document.querySelectorAll('body *')).find(el => Array.from(el.childNodes).some(n => n.nodeType === 3 && n.textContent.includes({t:?}))) || null"
            ),
        }
    }

    /// Short human-readable rendering for logs and timeout messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Id(id) => format!("#{id}"),
            Self::TestId(id) => format!("[data-testid='{id}']"),
            Self::Css(s) => s.to_string(),
            Self::XPath(s) => format!("xpath={s}"),
            Self::Text(t) => format!("text='{t}'"),
            Self::TextContains(t) => format!("text~='{t}'"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Named selectors for every affordance of the login and registration pages
pub mod catalog {
    use super::Selector;
    use std::borrow::Cow::Borrowed;

    // Auth-method tabs
    pub const TAB_BIOMETRIC: Selector =
        Selector::XPath(Borrowed("//button[.//span[text()='Biometric']]"));
    pub const TAB_PASSWORD: Selector =
        Selector::XPath(Borrowed("//button[.//span[text()='Password']]"));
    pub const TAB_FACE: Selector = Selector::XPath(Borrowed("//button[.//span[text()='Face']]"));
    /// Tab variant that only matches once the tab widget has rendered its state
    pub const TAB_BIOMETRIC_STATEFUL: Selector = Selector::XPath(Borrowed(
        "//button[@data-state and .//span[text()='Biometric']]",
    ));

    // Biometric panel
    pub const BIOMETRIC_USERNAME: Selector = Selector::Id(Borrowed("biometric-username"));
    pub const BIOMETRIC_REGISTER: Selector =
        Selector::TestId(Borrowed("biometric-register-button"));
    pub const BIOMETRIC_AUTH: Selector = Selector::TestId(Borrowed("biometric-auth-button"));

    // Face panel
    pub const FACE_USERNAME: Selector = Selector::Id(Borrowed("face-username"));
    pub const FACE_REGISTER: Selector = Selector::TestId(Borrowed("face-register-button"));
    pub const FACE_AUTH: Selector = Selector::TestId(Borrowed("face-auth-button"));

    // Password panel
    pub const EMAIL: Selector = Selector::Id(Borrowed("email"));
    pub const PASSWORD: Selector = Selector::Id(Borrowed("password"));
    pub const PASSWORD_SUBMIT: Selector = Selector::TestId(Borrowed("password-login-button"));

    // Status banners
    pub const STATUS_SCANNING: Selector = Selector::Text(Borrowed("Scanning biometric data..."));
    pub const STATUS_SUCCESS: Selector = Selector::Text(Borrowed("Authentication successful!"));
    pub const STATUS_ERROR: Selector = Selector::Text(Borrowed("Authentication failed"));
    pub const STATUS_LOCKED: Selector = Selector::TextContains(Borrowed("locked"));
    pub const STATUS_NETWORK_ERROR: Selector = Selector::TextContains(Borrowed("Network Error"));
    pub const STATUS_FALLBACK: Selector = Selector::TextContains(Borrowed("Use password"));

    // Registration page
    pub const REGISTER_LINK: Selector =
        Selector::XPath(Borrowed("//button[contains(text(), 'Create one here')]"));
    pub const REGISTER_TAB_ACCOUNT: Selector =
        Selector::XPath(Borrowed("//button[.//span[text()='Account'] or text()='Account']"));
    pub const REGISTER_TAB_BIOMETRIC: Selector = Selector::XPath(Borrowed(
        "//div[@role='tablist']//button[.//span[text()='Biometric'] or text()='Biometric']",
    ));
    pub const REGISTER_USERNAME: Selector = Selector::Id(Borrowed("username"));
    pub const REGISTER_EMAIL: Selector = Selector::Id(Borrowed("email"));
    pub const REGISTER_PASSWORD: Selector = Selector::Id(Borrowed("password"));
    pub const REGISTER_CONFIRM_PASSWORD: Selector = Selector::Id(Borrowed("confirm-password"));
    pub const REGISTER_BIOMETRIC_OPTION: Selector = Selector::XPath(Borrowed(
        "//div[contains(@class, 'flex items-center space-x-2')]//button",
    ));
    pub const REGISTER_SUBMIT: Selector = Selector::TestId(Borrowed("account-register-button"));
    pub const BACK_TO_LOGIN: Selector =
        Selector::XPath(Borrowed("//button[contains(text(), 'Sign in here')]"));

    /// URL fragment the application navigates to after authentication
    pub const DASHBOARD_URL_FRAGMENT: &str = "dashboard";
}

// =============================================================================
// TABS AND FACTORS
// =============================================================================

/// Top-level authentication tab on the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthTab {
    /// Email and password
    Password,
    /// WebAuthn platform authenticator
    Biometric,
    /// Camera capture
    Face,
}

impl AuthTab {
    /// All tabs in on-screen order
    pub const ALL: [Self; 3] = [Self::Biometric, Self::Password, Self::Face];

    /// Tab control selector
    #[must_use]
    pub const fn tab(self) -> Selector {
        match self {
            Self::Password => catalog::TAB_PASSWORD,
            Self::Biometric => catalog::TAB_BIOMETRIC,
            Self::Face => catalog::TAB_FACE,
        }
    }

    /// Input that signals the tab's content has rendered
    #[must_use]
    pub const fn signature_input(self) -> Selector {
        match self {
            Self::Password => catalog::EMAIL,
            Self::Biometric => catalog::BIOMETRIC_USERNAME,
            Self::Face => catalog::FACE_USERNAME,
        }
    }

    /// Display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Biometric => "biometric",
            Self::Face => "face",
        }
    }
}

impl fmt::Display for AuthTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hardware-backed factor with a register/authenticate primary control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Factor {
    /// Fingerprint / platform authenticator
    Biometric,
    /// Face capture
    Face,
}

impl Factor {
    /// Tab hosting this factor
    #[must_use]
    pub const fn auth_tab(self) -> AuthTab {
        match self {
            Self::Biometric => AuthTab::Biometric,
            Self::Face => AuthTab::Face,
        }
    }

    /// Identity input
    #[must_use]
    pub const fn username_input(self) -> Selector {
        match self {
            Self::Biometric => catalog::BIOMETRIC_USERNAME,
            Self::Face => catalog::FACE_USERNAME,
        }
    }

    /// Register control, shown while the identity has no enrolled credential
    #[must_use]
    pub const fn register_button(self) -> Selector {
        match self {
            Self::Biometric => catalog::BIOMETRIC_REGISTER,
            Self::Face => catalog::FACE_REGISTER,
        }
    }

    /// Authenticate control, shown once the identity is enrolled
    #[must_use]
    pub const fn auth_button(self) -> Selector {
        match self {
            Self::Biometric => catalog::BIOMETRIC_AUTH,
            Self::Face => catalog::FACE_AUTH,
        }
    }

    /// Display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.auth_tab().name()
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-section tab on the registration page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationTab {
    /// Account details form
    Account,
    /// Enrollment step
    Biometric,
}

impl RegistrationTab {
    /// Tab control selector
    #[must_use]
    pub const fn tab(self) -> Selector {
        match self {
            Self::Account => catalog::REGISTER_TAB_ACCOUNT,
            Self::Biometric => catalog::REGISTER_TAB_BIOMETRIC,
        }
    }
}
