//! Scenario suites.
//!
//! Scenarios are fixed scripts over [`LoginPage`]: open, pick a factor, enter
//! an identity, act, observe, optionally fall back to password. They run in
//! declared order because later ones rely on server state left by earlier
//! ones.
//!
//! | Suite          | Scenarios                         |
//! |----------------|-----------------------------------|
//! | `deliverables` | `a` `b` `c` `d` `e` `chained`     |
//! | `face-lockout` | `face-lockout`                    |
//! | `user-journey` | `user-journey` `idempotence`      |

mod deliverables;
mod journeys;
mod runner;

pub use runner::{ScenarioResult, SuiteObserver, SuiteReport, SuiteRunner, TracingObserver};

use crate::driver::AuthDriver;
use crate::fixture::TestDataProvisioner;
use crate::locator::Factor;
use crate::mock::DEFAULT_LOCKOUT_THRESHOLD;
use crate::page::{AttemptOutcome, LoginPage};
use crate::result::AuthProbeResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

// =============================================================================
// SUITES
// =============================================================================

/// Named group of scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    /// The five required failure behaviors plus the chained scenario
    Deliverables,
    /// Face lockout after repeated failures
    FaceLockout,
    /// Registration journey and idempotence
    UserJourney,
    /// Everything
    #[default]
    All,
}

impl Suite {
    /// Whether this suite runs scenarios of `other`
    #[must_use]
    pub fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }

    /// Kebab-case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deliverables => "deliverables",
            Self::FaceLockout => "face-lockout",
            Self::UserJourney => "user-journey",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// Scenario identifier, in declared execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioId {
    /// Biometric failure, then password fallback
    A,
    /// Biometric success, then forced failure
    B,
    /// Lockout after three failures
    C,
    /// Permission denial on both hardware factors
    D,
    /// Network interruption and recovery
    E,
    /// Permission denial, then network loss, then password
    Chained,
    /// Face lockout
    FaceLockout,
    /// Registration with enrollment
    UserJourney,
    /// Opening twice gives the same page
    Idempotence,
}

impl ScenarioId {
    /// Every scenario in execution order
    pub const ALL: [Self; 9] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::Chained,
        Self::FaceLockout,
        Self::UserJourney,
        Self::Idempotence,
    ];

    /// Suite this scenario belongs to
    #[must_use]
    pub const fn suite(self) -> Suite {
        match self {
            Self::A | Self::B | Self::C | Self::D | Self::E | Self::Chained => Suite::Deliverables,
            Self::FaceLockout => Suite::FaceLockout,
            Self::UserJourney | Self::Idempotence => Suite::UserJourney,
        }
    }

    /// Kebab-case name, used by filters
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
            Self::E => "e",
            Self::Chained => "chained",
            Self::FaceLockout => "face-lockout",
            Self::UserJourney => "user-journey",
            Self::Idempotence => "idempotence",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::A => "fallback to password after biometric failure",
            Self::B => "biometric success and failure",
            Self::C => "lockout after repeated failures",
            Self::D => "permission denial",
            Self::E => "network interruption and recovery",
            Self::Chained => "chained failures end in password login",
            Self::FaceLockout => "face authentication lockout",
            Self::UserJourney => "registration enrolls biometric",
            Self::Idempotence => "opening the login page is idempotent",
        }
    }

    /// Whether the scenario expects fixture accounts
    #[must_use]
    pub const fn needs_fixtures(self) -> bool {
        matches!(self.suite(), Suite::Deliverables)
    }

    /// Run the scenario script
    ///
    /// # Errors
    ///
    /// Returns the first assertion failure or fatal page error
    pub async fn run<D: AuthDriver>(
        self,
        page: &mut LoginPage<D>,
        ctx: &mut ScenarioContext,
    ) -> AuthProbeResult<()> {
        info!(scenario = self.name(), title = self.title(), "scenario start");
        match self {
            Self::A => deliverables::fallback_after_failure(page, ctx).await,
            Self::B => deliverables::success_then_failure(page, ctx).await,
            Self::C => deliverables::lockout(page, ctx).await,
            Self::D => deliverables::permission_denial(page, ctx).await,
            Self::E => deliverables::network_interruption(page, ctx).await,
            Self::Chained => deliverables::chained_failures(page, ctx).await,
            Self::FaceLockout => journeys::face_lockout(page, ctx).await,
            Self::UserJourney => journeys::registration_journey(page, ctx).await,
            Self::Idempotence => journeys::open_is_idempotent(page, ctx).await,
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// State shared by the scenarios of one run
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Fixture accounts
    pub fixtures: TestDataProvisioner,
    /// Clock-derived suffix for identities that must be new
    pub suffix: String,
    /// Failures after which the application locks a factor
    pub lockout_threshold: u32,
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new(TestDataProvisioner::new())
    }
}

impl ScenarioContext {
    /// Context with a fresh suffix
    #[must_use]
    pub fn new(fixtures: TestDataProvisioner) -> Self {
        Self {
            fixtures,
            suffix: chrono::Utc::now().timestamp_millis().to_string(),
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
        }
    }

    /// Fix the suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// `prefix` made unique for this run
    #[must_use]
    pub fn unique(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.suffix)
    }
}

/// Click the factor's primary control and observe the outcome.
///
/// Fatal errors propagate; anything else is logged and the script continues.
async fn attempt<D: AuthDriver>(
    page: &mut LoginPage<D>,
    factor: Factor,
) -> AuthProbeResult<Option<AttemptOutcome>> {
    match page.click_primary(factor).await {
        Ok(status) => info!(%factor, %status, "primary action"),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => warn!(%factor, error = %e, "primary action did not complete"),
    }
    let outcome = page.observe_outcome().await;
    info!(%factor, ?outcome, "attempt observed");
    Ok(outcome)
}

/// Log in through the password tab and report whether it was accepted.
///
/// An autopopulated email is kept when it matches `email` and replaced
/// otherwise; an empty field is typed into.
async fn password_login<D: AuthDriver>(
    page: &mut LoginPage<D>,
    email: &str,
    password: &str,
) -> AuthProbeResult<bool> {
    page.switch_to_password().await?;
    match page.autopopulated_email().await {
        Some(filled) if filled.trim() == email => info!(email = %filled, "email autopopulated"),
        Some(filled) => {
            warn!(filled = %filled, email, "autopopulated email belongs to another identity");
            page.enter_email(email).await?;
        }
        None => {
            info!("email not autopopulated; typing it");
            page.enter_email(email).await?;
        }
    }
    page.enter_password(password).await?;
    page.submit_password().await?;
    let error = page.is_auth_error_visible().await;
    let accepted =
        !error && (page.is_auth_success_visible().await || page.is_on_dashboard().await);
    info!(email, error, accepted, "password login submitted");
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod catalog_tests {
        use super::*;

        #[test]
        fn test_declared_order() {
            let names: Vec<_> = ScenarioId::ALL.iter().map(|s| s.name()).collect();
            assert_eq!(
                names,
                [
                    "a",
                    "b",
                    "c",
                    "d",
                    "e",
                    "chained",
                    "face-lockout",
                    "user-journey",
                    "idempotence"
                ]
            );
        }

        #[test]
        fn test_suite_membership() {
            assert!(Suite::All.includes(Suite::FaceLockout));
            assert!(!Suite::Deliverables.includes(Suite::UserJourney));
            assert_eq!(ScenarioId::Idempotence.suite(), Suite::UserJourney);
            assert!(ScenarioId::Chained.needs_fixtures());
            assert!(!ScenarioId::FaceLockout.needs_fixtures());
        }

        #[test]
        fn test_serde_names() {
            assert_eq!(
                serde_json::to_string(&ScenarioId::FaceLockout).unwrap(),
                "\"face-lockout\""
            );
            let suite: Suite = serde_yaml_ng::from_str("user-journey").unwrap();
            assert_eq!(suite, Suite::UserJourney);
        }

        #[test]
        fn test_unique_identity() {
            let ctx = ScenarioContext::default().with_suffix("42");
            assert_eq!(ctx.unique("biouser"), "biouser42");
            assert_eq!(ctx.lockout_threshold, 3);
            assert!(!ScenarioContext::default().suffix.is_empty());
        }
    }
}
