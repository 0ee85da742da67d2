//! Authprobe: end-to-end failure-path testing for multi-factor login pages
//!
//! Drives a login application that offers password, platform-authenticator
//! (WebAuthn) and face sign-in, forces the hardware factors into failure
//! modes from inside the page, and checks that the UI degrades the way it
//! should: fallback to password, lockout, permission denial, network loss.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    AUTHPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ LoginPage  │    │ AuthDriver │            │
//! │   │ Suites     │───►│ + Injector │───►│ (chromium  │            │
//! │   │            │    │            │    │  or mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         ▲                                                        │
//! │   ┌─────┴──────┐    ┌────────────┐                              │
//! │   │ SuiteRunner│◄───│ Session    │  one fresh browser per       │
//! │   │ + fixtures │    │ Factory    │  scenario                    │
//! │   └────────────┘    └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `browser` feature enables the Chromium driver. Without it the crate
//! still builds and runs every scenario against [`MockDriver`].

#![warn(missing_docs)]

mod browser;
mod config;
mod driver;
mod fixture;
mod injector;
mod locator;
mod mock;
mod page;
mod result;
mod scenario;
mod session;
mod wait;

pub use browser::{
    BrowserConfig, ARG_ALLOW_INSECURE_CONTENT, ARG_DISABLE_WEB_SECURITY, ARG_FAKE_MEDIA_DEVICE,
    ARG_FAKE_MEDIA_UI, ARG_IGNORE_CERT_ERRORS,
};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};
pub use config::{
    resolve_base_url, SuiteConfig, BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE,
};
pub use driver::{AuthDriver, ElementState};
pub use fixture::{
    EnrolledFactors, FixtureAccount, FixtureState, ProvisioningReport, TestDataProvisioner,
};
pub use injector::{
    BehaviorInjector, CameraMode, CredentialMode, GeneratedScript, NetworkMode, RuntimeOverrides,
    ScriptBuilder, DEFAULT_INTERRUPTED_PATHS, INDICATOR_ID,
};
pub use locator::{catalog, AuthTab, Factor, RegistrationTab, Selector};
pub use mock::{
    Banner, MockAccount, MockBackend, MockDriver, MockFactory, MockLoginApp, MockPage,
    SharedBackend, DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_RESET_PATH,
};
pub use page::{AccountForm, AttemptOutcome, EnrollmentStatus, LoginPage};
pub use result::{ensure, AuthProbeError, AuthProbeResult};
pub use scenario::{
    ScenarioContext, ScenarioId, ScenarioResult, Suite, SuiteObserver, SuiteReport, SuiteRunner,
    TracingObserver,
};
pub use session::{with_session, Session, SessionFactory, SessionSettings};
pub use wait::{
    ElementCondition, WaitOptions, WaitResult, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        catalog, AuthDriver, AuthProbeError, AuthProbeResult, AuthTab, BehaviorInjector,
        BrowserConfig, ElementCondition, Factor, LoginPage, MockDriver, MockFactory,
        RuntimeOverrides, ScenarioId, Selector, SessionFactory, Suite, SuiteConfig, SuiteRunner,
        WaitOptions,
    };
    #[cfg(feature = "browser")]
    pub use super::{ChromiumDriver, ChromiumFactory};
}
