//! Condition-based waiting.
//!
//! Every synchronization point polls a predicate with a bounded timeout and a
//! short interval. No step sleeps for a fixed duration.

use crate::driver::{AuthDriver, ElementState};
use crate::locator::Selector;
use crate::result::{AuthProbeError, AuthProbeResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (15 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 15_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default bound for status probes (2 seconds)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// ELEMENT CONDITIONS
// =============================================================================

/// State an element must reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCondition {
    /// Attached to the DOM
    Present,
    /// Attached and rendered
    Visible,
    /// Visible and enabled
    Clickable,
    /// Detached or not rendered
    Hidden,
}

impl ElementCondition {
    /// Check the condition against a lookup result
    #[must_use]
    pub fn is_met(self, state: Option<&ElementState>) -> bool {
        match (self, state) {
            (Self::Present, found) => found.is_some(),
            (Self::Visible, Some(s)) => s.visible,
            (Self::Clickable, Some(s)) => s.visible && s.enabled,
            (Self::Hidden, None) => true,
            (Self::Hidden, Some(s)) => !s.visible,
            (_, None) => false,
        }
    }

    /// Description fragment used in timeout messages
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Visible => "visible",
            Self::Clickable => "clickable",
            Self::Hidden => "hidden",
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polling waiter
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter with the given options
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Options this waiter polls with
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Poll `check` until it yields `true` or the timeout elapses.
    ///
    /// The predicate runs at least once, even with a zero timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProbeError::Timeout`] when the bound elapses, or the
    /// first error raised by `check`.
    pub async fn until<F, Fut>(
        &self,
        description: impl Into<String>,
        mut check: F,
    ) -> AuthProbeResult<WaitResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AuthProbeResult<bool>>,
    {
        let description = description.into();
        let start = Instant::now();
        let timeout = self.options.timeout();

        loop {
            if check().await? {
                return Ok(WaitResult {
                    elapsed: start.elapsed(),
                    waited_for: description,
                });
            }
            if start.elapsed() >= timeout {
                return Err(AuthProbeError::timeout(self.options.timeout_ms, description));
            }
            tokio::time::sleep(self.options.poll_interval()).await;
        }
    }

    /// Wait until `selector` satisfies `condition`, returning its last state
    ///
    /// # Errors
    ///
    /// Returns [`AuthProbeError::Timeout`] when the element never reaches
    /// the condition.
    pub async fn for_element<D: AuthDriver + ?Sized>(
        &self,
        driver: &D,
        selector: &Selector,
        condition: ElementCondition,
    ) -> AuthProbeResult<Option<ElementState>> {
        let last = Mutex::new(None);
        let description = format!("{selector} {}", condition.verb());
        self.until(description, || {
            let lookup = driver.query(selector);
            let last = &last;
            async move {
                let state = lookup.await?;
                let met = condition.is_met(state.as_ref());
                if let Ok(mut slot) = last.lock() {
                    *slot = state;
                }
                Ok(met)
            }
        })
        .await?;
        Ok(last.into_inner().unwrap_or_default())
    }

    /// Like [`Waiter::for_element`] but maps a timeout to `false`.
    ///
    /// # Errors
    ///
    /// Propagates driver errors other than timeouts.
    pub async fn probe<D: AuthDriver + ?Sized>(
        &self,
        driver: &D,
        selector: &Selector,
        condition: ElementCondition,
    ) -> AuthProbeResult<bool> {
        match self.for_element(driver, selector, condition).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
