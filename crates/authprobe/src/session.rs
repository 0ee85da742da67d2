//! Per-scenario browser sessions.
//!
//! Each scenario gets a fresh driver from a [`SessionFactory`]. The driver is
//! closed on every exit path, including a failing body.

use crate::config::SuiteConfig;
use crate::driver::AuthDriver;
use crate::page::LoginPage;
use crate::result::AuthProbeResult;
use crate::wait::WaitOptions;
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use tracing::{debug, warn};

/// Produces a fresh driver per session
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Driver type handed to the page
    type Driver: AuthDriver;

    /// Open a new browser session
    async fn open(&self) -> AuthProbeResult<Self::Driver>;
}

/// What a page needs to know about the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Resolved base URL
    pub base_url: String,
    /// Bound for wait-based operations
    pub wait: WaitOptions,
    /// Bound for status probes
    pub probe: WaitOptions,
}

impl SessionSettings {
    /// Resolve settings from a suite configuration
    #[must_use]
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            base_url: config.resolved_base_url(),
            wait: config.wait,
            probe: config.probe_options(),
        }
    }
}

/// Driver, base URL and page for one scenario
#[derive(Debug)]
pub struct Session<D: AuthDriver> {
    page: LoginPage<D>,
}

impl<D: AuthDriver> Session<D> {
    /// Open a session through `factory`
    ///
    /// # Errors
    ///
    /// Returns error if the factory cannot produce a driver
    pub async fn open<F>(factory: &F, settings: &SessionSettings) -> AuthProbeResult<Self>
    where
        F: SessionFactory<Driver = D>,
    {
        let driver = factory.open().await?;
        debug!(base_url = %settings.base_url, "session opened");
        let page = LoginPage::new(driver, settings.base_url.clone())
            .with_wait_options(settings.wait)
            .with_probe_options(settings.probe);
        Ok(Self { page })
    }

    /// Base URL of the application under test
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.page.base_url()
    }

    /// Page driver
    pub fn page_mut(&mut self) -> &mut LoginPage<D> {
        &mut self.page
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails to close
    pub async fn close(self) -> AuthProbeResult<()> {
        let mut driver = self.page.into_driver();
        driver.close().await?;
        debug!("session closed");
        Ok(())
    }
}

/// Run `body` in a fresh session and close it afterwards.
///
/// A close failure is logged and never masks the body's result.
///
/// # Errors
///
/// Returns the session-open error or the body's error
pub async fn with_session<F, C, T, B>(
    factory: &F,
    settings: &SessionSettings,
    context: &mut C,
    body: B,
) -> AuthProbeResult<T>
where
    F: SessionFactory,
    B: for<'p> FnOnce(&'p mut LoginPage<F::Driver>, &'p mut C) -> LocalBoxFuture<'p, AuthProbeResult<T>>,
{
    let mut session = Session::open(factory, settings).await?;
    let outcome = body(session.page_mut(), context).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close browser session");
    }
    outcome
}
