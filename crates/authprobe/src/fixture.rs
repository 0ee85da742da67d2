//! Fixture accounts.
//!
//! Fixture accounts are created through the application's own registration
//! flow, once per suite run, so scenarios can rely on known identities.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──ensure_provisioned──► Provisioned
//!                              └► PartiallyProvisioned (some accounts failed)
//! ```
//!
//! Provisioning never fails the run: per-account errors are logged and kept in
//! the [`ProvisioningReport`].

use crate::driver::AuthDriver;
use crate::locator::{Factor, RegistrationTab};
use crate::page::{AccountForm, EnrollmentStatus, LoginPage};
use crate::result::{AuthProbeError, AuthProbeResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Credentials enrolled at provisioning time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledFactors {
    /// Enroll a platform authenticator during registration
    pub biometric: bool,
    /// Enroll face recognition after registration
    pub face: bool,
}

/// A pre-provisioned identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureAccount {
    /// Login email
    pub email: String,
    /// Username for the hardware factors
    pub username: String,
    /// Password
    pub password: String,
    /// Factors to enroll
    pub factors: EnrolledFactors,
}

impl FixtureAccount {
    /// Account without enrolled factors
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            factors: EnrolledFactors::default(),
        }
    }

    /// Enroll biometric at registration
    #[must_use]
    pub const fn with_biometric(mut self) -> Self {
        self.factors.biometric = true;
        self
    }

    /// Enroll face after registration
    #[must_use]
    pub const fn with_face(mut self) -> Self {
        self.factors.face = true;
        self
    }

    /// Registration form for this account
    #[must_use]
    pub fn form(&self) -> AccountForm {
        AccountForm::new(&self.username, &self.email, &self.password)
    }

    /// Plain, biometric, face and lockout-target accounts
    #[must_use]
    pub fn standard_set() -> Vec<Self> {
        vec![
            Self::new("testuser@secureauth.ai", "testuser", "TestPassword123!"),
            Self::new("biometric@secureauth.ai", "biometricuser", "BioPass123!").with_biometric(),
            Self::new("faceuser@secureauth.ai", "faceuser", "FacePass123!").with_face(),
            Self::new("lockout@secureauth.ai", "lockoutuser", "LockPass123!"),
        ]
    }
}

/// Provisioning progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixtureState {
    /// Not yet attempted
    Pending,
    /// Every account went through
    Provisioned,
    /// At least one account failed
    PartiallyProvisioned,
}

/// What provisioning did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningReport {
    /// Usernames that went through registration
    pub created: Vec<String>,
    /// Username and error for each failed account
    pub failed: Vec<(String, String)>,
}

impl ProvisioningReport {
    /// Whether every account went through
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates fixture accounts at most once
#[derive(Debug, Clone)]
pub struct TestDataProvisioner {
    accounts: Vec<FixtureAccount>,
    state: FixtureState,
    report: ProvisioningReport,
}

impl Default for TestDataProvisioner {
    fn default() -> Self {
        Self::with_accounts(FixtureAccount::standard_set())
    }
}

impl TestDataProvisioner {
    /// Provisioner for [`FixtureAccount::standard_set`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisioner for a custom account set
    #[must_use]
    pub fn with_accounts(accounts: Vec<FixtureAccount>) -> Self {
        Self {
            accounts,
            state: FixtureState::Pending,
            report: ProvisioningReport::default(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> FixtureState {
        self.state
    }

    /// Outcome of the provisioning pass
    #[must_use]
    pub const fn report(&self) -> &ProvisioningReport {
        &self.report
    }

    /// All fixture accounts
    #[must_use]
    pub fn accounts(&self) -> &[FixtureAccount] {
        &self.accounts
    }

    /// Look up an account that provisioning did not report as failed
    ///
    /// # Errors
    ///
    /// [`AuthProbeError::Fixture`] if `username` is not in the set or its
    /// registration failed
    pub fn account(&self, username: &str) -> AuthProbeResult<&FixtureAccount> {
        if let Some((_, error)) = self.report.failed.iter().find(|(u, _)| u == username) {
            return Err(AuthProbeError::fixture(format!(
                "{username} was not provisioned: {error}"
            )));
        }
        self.accounts
            .iter()
            .find(|a| a.username == username)
            .ok_or_else(|| AuthProbeError::fixture(format!("no fixture account {username}")))
    }

    /// Account without enrolled factors
    ///
    /// # Errors
    ///
    /// See [`TestDataProvisioner::account`]
    pub fn basic_user(&self) -> AuthProbeResult<&FixtureAccount> {
        self.account("testuser")
    }

    /// Biometric-enrolled account
    ///
    /// # Errors
    ///
    /// See [`TestDataProvisioner::account`]
    pub fn biometric_user(&self) -> AuthProbeResult<&FixtureAccount> {
        self.account("biometricuser")
    }

    /// Face-enrolled account
    ///
    /// # Errors
    ///
    /// See [`TestDataProvisioner::account`]
    pub fn face_user(&self) -> AuthProbeResult<&FixtureAccount> {
        self.account("faceuser")
    }

    /// Account reserved for lockout scenarios
    ///
    /// # Errors
    ///
    /// See [`TestDataProvisioner::account`]
    pub fn lockout_user(&self) -> AuthProbeResult<&FixtureAccount> {
        self.account("lockoutuser")
    }

    /// Register every account unless that already happened
    pub async fn ensure_provisioned<D: AuthDriver>(&mut self, page: &mut LoginPage<D>) -> FixtureState {
        if self.state != FixtureState::Pending {
            return self.state;
        }
        info!(accounts = self.accounts.len(), "provisioning fixture accounts");

        for account in &self.accounts {
            match provision(page, account).await {
                Ok(()) => {
                    info!(username = %account.username, "fixture account ready");
                    self.report.created.push(account.username.clone());
                }
                Err(e) => {
                    warn!(username = %account.username, error = %e, "fixture provisioning failed");
                    self.report
                        .failed
                        .push((account.username.clone(), e.to_string()));
                }
            }
        }

        self.state = if self.report.is_complete() {
            FixtureState::Provisioned
        } else {
            FixtureState::PartiallyProvisioned
        };
        self.state
    }

    /// Clear server-side state through `reset_url`, if one is configured
    ///
    /// # Errors
    ///
    /// [`AuthProbeError::Fixture`] if the reset URL cannot be loaded
    pub async fn teardown<D: AuthDriver>(
        &self,
        page: &mut LoginPage<D>,
        reset_url: Option<&str>,
    ) -> AuthProbeResult<()> {
        match reset_url {
            Some(url) => {
                info!(url, "resetting application state");
                page.driver_mut()
                    .navigate(url)
                    .await
                    .map_err(|e| AuthProbeError::fixture(format!("reset via {url} failed: {e}")))
            }
            None => {
                info!("no reset endpoint configured; fixture accounts persist");
                Ok(())
            }
        }
    }
}

async fn provision<D: AuthDriver>(
    page: &mut LoginPage<D>,
    account: &FixtureAccount,
) -> AuthProbeResult<()> {
    page.open().await?;
    page.click_register_link().await?;
    page.switch_to_registration_tab(RegistrationTab::Account)
        .await?;
    page.fill_registration_form(&account.form()).await?;
    if account.factors.biometric {
        page.check_biometric_registration_option().await?;
    }
    page.submit_registration().await?;
    page.navigate_back_to_login().await?;

    if account.factors.face {
        page.switch_to_face().await?;
        page.enter_face_username(&account.username).await?;
        if page.enrollment_status(Factor::Face).await == EnrollmentStatus::Unregistered {
            page.click_face_primary().await?;
        }
    }
    Ok(())
}
