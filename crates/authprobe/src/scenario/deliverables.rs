//! The five required failure behaviors and the chained scenario.

use super::{attempt, password_login, ScenarioContext};
use crate::driver::AuthDriver;
use crate::locator::{catalog, Factor};
use crate::page::{AttemptOutcome, LoginPage};
use crate::result::{ensure, AuthProbeResult};
use crate::wait::ElementCondition;
use tracing::info;

const SEED_IDENTITY: &str = "etornam.koko";
const SEED_EMAIL: &str = "etornam.koko@example.com";
const SEED_PASSWORD: &str = "12345678";

fn is_error(outcome: Option<AttemptOutcome>) -> bool {
    matches!(
        outcome,
        Some(AttemptOutcome::Error | AttemptOutcome::NetworkError | AttemptOutcome::Locked)
    )
}

async fn succeeded<D: AuthDriver>(page: &LoginPage<D>) -> bool {
    page.is_auth_success_visible().await || page.is_on_dashboard().await
}

/// A: a failed biometric attempt leaves the password form usable
pub(super) async fn fallback_after_failure<D: AuthDriver>(
    page: &mut LoginPage<D>,
    _ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username(SEED_IDENTITY).await?;
    page.enable_failure_mode().await;

    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(
        outcome != Some(AttemptOutcome::Success),
        "forced biometric failure reported success",
    )?;
    info!(
        fallback = page.is_fallback_message_visible().await,
        "biometric attempt failed"
    );

    let accepted = password_login(page, SEED_EMAIL, SEED_PASSWORD).await?;
    ensure(accepted, "password fallback showed an auth error")
}

/// B: enroll and authenticate a new identity, then force a failure
pub(super) async fn success_then_failure<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let username = ctx.unique("biouser");
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username(&username).await?;
    page.enable_success_mode().await;

    attempt(page, Factor::Biometric).await?;
    page.wait_for(&catalog::BIOMETRIC_AUTH, ElementCondition::Visible)
        .await?;
    attempt(page, Factor::Biometric).await?;
    ensure(
        succeeded(page).await,
        format!("{username} did not authenticate after enrollment"),
    )?;

    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username("failuser").await?;
    page.enable_failure_mode().await;
    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(
        outcome != Some(AttemptOutcome::Success),
        "forced failure reported success",
    )?;
    ensure(
        page.is_auth_error_visible().await || page.is_locked_out().await,
        "forced failure showed neither an error nor a lockout",
    )
}

/// C: three failures lock the factor; password stays reachable
pub(super) async fn lockout<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let threshold = ctx.lockout_threshold;
    let account = ctx.fixtures.lockout_user()?;
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username(&account.username).await?;
    page.enable_lockout_counting(threshold).await;

    for n in 1..=threshold {
        let outcome = attempt(page, Factor::Biometric).await?;
        info!(attempt = n, ?outcome, "failed attempt");
    }
    attempt(page, Factor::Biometric).await?;
    let locked = page.is_locked_out().await;
    let disabled = page.is_primary_disabled(Factor::Biometric).await;
    info!(locked, disabled, "after attempt {}", threshold + 1);
    ensure(
        locked,
        format!("no lockout indicator after {} attempts", threshold + 1),
    )?;
    ensure(
        disabled,
        format!("biometric control still enabled after {} attempts", threshold + 1),
    )?;

    let accepted = password_login(page, &account.email, &account.password).await?;
    ensure(accepted, "password fallback rejected after lockout")
}

/// D: denied authenticator and camera both fail cleanly
pub(super) async fn permission_denial<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let account = ctx.fixtures.face_user()?;
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username("permissionuser").await?;
    page.deny_permissions().await;
    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(
        outcome != Some(AttemptOutcome::Success),
        "biometric succeeded with permission denied",
    )?;

    page.switch_to_face().await?;
    page.enter_face_username(&account.username).await?;
    let outcome = attempt(page, Factor::Face).await?;
    ensure(
        outcome != Some(AttemptOutcome::Success),
        "face succeeded with camera denied",
    )?;

    page.grant_permissions().await;
    let accepted = password_login(page, &account.email, &account.password).await?;
    ensure(accepted, "password fallback rejected after permission denial")
}

/// E: API loss surfaces an error; restoring it recovers
pub(super) async fn network_interruption<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let account = ctx.fixtures.basic_user()?;
    info!("phase 1: interruption during registration");
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username("networkuser").await?;
    page.interrupt_network().await;
    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(is_error(outcome), "interrupted registration showed no error")?;
    page.restore_network().await;
    attempt(page, Factor::Biometric).await?;

    info!("phase 2: interruption during authentication");
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username("networkuser").await?;
    page.wait_for(&catalog::BIOMETRIC_AUTH, ElementCondition::Visible)
        .await?;
    page.interrupt_network().await;
    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(is_error(outcome), "interrupted authentication showed no error")?;
    ensure(
        !page.is_auth_success_visible().await,
        "interrupted authentication showed success",
    )?;
    page.restore_network().await;
    page.disable_failure_mode().await;
    attempt(page, Factor::Biometric).await?;
    ensure(succeeded(page).await, "no recovery after restoring the network")?;

    info!("phase 3: password fallback across a reload");
    page.open().await?;
    page.switch_to_biometric().await?;
    page.interrupt_network().await;
    page.refresh().await?;
    page.switch_to_password().await?;
    page.restore_network().await;
    let accepted = password_login(page, &account.email, &account.password).await?;
    ensure(accepted, "password login rejected after network recovery")
}

/// Chained: denial, then network loss, then password
pub(super) async fn chained_failures<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let account = ctx.fixtures.basic_user()?;
    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username(&account.username).await?;

    page.deny_permissions().await;
    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(
        outcome != Some(AttemptOutcome::Success),
        "denied attempt reported success",
    )?;

    page.grant_permissions().await;
    page.interrupt_network().await;
    let outcome = attempt(page, Factor::Biometric).await?;
    ensure(
        outcome != Some(AttemptOutcome::Success),
        "offline attempt reported success",
    )?;

    page.restore_network().await;
    let accepted = password_login(page, &account.email, &account.password).await?;
    ensure(accepted, "password login rejected after chained failures")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureState, TestDataProvisioner};
    use crate::mock::MockDriver;
    use crate::result::AuthProbeError;
    use crate::wait::WaitOptions;

    fn page(driver: MockDriver) -> LoginPage<MockDriver> {
        LoginPage::new(driver, "http://localhost:8081")
            .with_wait_options(WaitOptions::new().with_timeout(50).with_poll_interval(5))
            .with_probe_options(WaitOptions::new().with_timeout(20).with_poll_interval(5))
    }

    async fn provisioned() -> (LoginPage<MockDriver>, ScenarioContext) {
        let mut page = page(MockDriver::new());
        let mut ctx = ScenarioContext::default().with_suffix("7");
        let state = ctx.fixtures.ensure_provisioned(&mut page).await;
        assert_eq!(state, FixtureState::Provisioned);
        (page, ctx)
    }

    mod fallback_tests {
        use super::*;

        #[tokio::test]
        async fn test_lockout_signs_in_lockout_account() {
            let (mut page, mut ctx) = provisioned().await;
            let before = page.driver().history().len();
            lockout(&mut page, &mut ctx).await.unwrap();
            assert!(page.is_on_dashboard().await);
            let backend = page.driver().backend_snapshot();
            assert!(backend.is_locked(Factor::Biometric, "lockoutuser"));
            // email came from the failed identity
            assert!(page.driver().history()[before..]
                .iter()
                .all(|c| !c.starts_with("type:#email")));
        }

        #[tokio::test]
        async fn test_permission_denial_signs_in_face_account() {
            let (mut page, mut ctx) = provisioned().await;
            permission_denial(&mut page, &mut ctx).await.unwrap();
            assert!(page.is_on_dashboard().await);
        }

        #[tokio::test]
        async fn test_network_recovery_types_email() {
            let (mut page, mut ctx) = provisioned().await;
            let before = page.driver().history().len();
            network_interruption(&mut page, &mut ctx).await.unwrap();
            assert!(page.is_on_dashboard().await);
            assert!(page.driver().history()[before..]
                .iter()
                .any(|c| c == "type:#email:testuser@secureauth.ai"));
        }

        #[tokio::test]
        async fn test_chained_failures_sign_in_basic_account() {
            let (mut page, mut ctx) = provisioned().await;
            chained_failures(&mut page, &mut ctx).await.unwrap();
            assert!(page.is_on_dashboard().await);
        }

        #[tokio::test]
        async fn test_rejected_fallback_fails_scenario() {
            // accounts never registered with the application
            let mut page = page(MockDriver::new());
            let mut ctx = ScenarioContext::default();
            let err = lockout(&mut page, &mut ctx).await.unwrap_err();
            assert!(matches!(err, AuthProbeError::Assertion { .. }));
            assert!(err.to_string().contains("password fallback rejected"));

            let err = chained_failures(&mut page, &mut ctx).await.unwrap_err();
            assert!(err.to_string().contains("rejected after chained failures"));
        }

        #[tokio::test]
        async fn test_missing_fixture_account_fails_scenario() {
            let mut page = page(MockDriver::new());
            let mut ctx = ScenarioContext::new(TestDataProvisioner::with_accounts(vec![]));
            let err = permission_denial(&mut page, &mut ctx).await.unwrap_err();
            assert!(matches!(err, AuthProbeError::Fixture { .. }));
            assert!(page.driver().history().is_empty());
        }
    }

    mod lockout_tests {
        use super::*;

        #[tokio::test]
        async fn test_disabled_control_without_indicator_fails() {
            let (mut page, mut ctx) = provisioned().await;
            lockout(&mut page, &mut ctx).await.unwrap();

            // already locked: every click hits a disabled control and no banner renders
            let err = lockout(&mut page, &mut ctx).await.unwrap_err();
            assert!(err.to_string().contains("no lockout indicator"));
        }
    }
}
