//! Face lockout, registration journey and idempotence.

use super::{attempt, ScenarioContext};
use crate::driver::AuthDriver;
use crate::locator::{catalog, Factor, RegistrationTab};
use crate::page::{AccountForm, EnrollmentStatus, LoginPage};
use crate::result::{ensure, AuthProbeResult};
use crate::wait::ElementCondition;
use tracing::info;

pub(super) async fn face_lockout<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let threshold = ctx.lockout_threshold;
    page.open().await?;
    page.switch_to_face().await?;
    page.enter_face_username("nouser").await?;
    page.enable_lockout_counting(threshold).await;

    for n in 1..=threshold {
        let outcome = attempt(page, Factor::Face).await?;
        info!(attempt = n, ?outcome, "face attempt");
    }
    let disabled = page.is_primary_disabled(Factor::Face).await;
    let locked = page.is_locked_out().await;
    ensure(
        disabled || locked,
        format!("face not locked after {threshold} failures"),
    )
}

pub(super) async fn registration_journey<D: AuthDriver>(
    page: &mut LoginPage<D>,
    ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    let username = ctx.unique("journey");
    let form = AccountForm::new(&username, format!("{username}@example.com"), "Journey123!");

    page.open().await?;
    page.switch_to_biometric().await?;
    page.enter_biometric_username(&username).await?;
    let before = page.enrollment_status(Factor::Biometric).await;
    ensure(
        before == EnrollmentStatus::Unregistered,
        format!("new identity {username} shows {before}"),
    )?;

    page.click_register_link().await?;
    page.switch_to_registration_tab(RegistrationTab::Account)
        .await?;
    page.fill_registration_form(&form).await?;
    page.check_biometric_registration_option().await?;
    page.submit_registration().await?;
    page.navigate_back_to_login().await?;

    page.switch_to_biometric().await?;
    page.enter_biometric_username(&username).await?;
    page.wait_for(&catalog::BIOMETRIC_AUTH, ElementCondition::Visible)
        .await?;
    let after = page.enrollment_status(Factor::Biometric).await;
    info!(%before, %after, "enrollment changed");
    ensure(
        after == EnrollmentStatus::Registered,
        format!("{username} still shows {after} after registration"),
    )
}

pub(super) async fn open_is_idempotent<D: AuthDriver>(
    page: &mut LoginPage<D>,
    _ctx: &mut ScenarioContext,
) -> AuthProbeResult<()> {
    page.open().await?;
    let first = page.visible_tabs().await;
    page.open().await?;
    let second = page.visible_tabs().await;
    ensure(!first.is_empty(), "no login tab visible after open")?;
    ensure(
        first == second,
        format!("tabs changed between opens: {first:?} then {second:?}"),
    )
}
