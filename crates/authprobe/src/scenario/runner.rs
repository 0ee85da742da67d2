//! Suite execution.

use super::{ScenarioContext, ScenarioId, Suite};
use crate::config::SuiteConfig;
use crate::fixture::{FixtureState, ProvisioningReport};
use crate::result::AuthProbeResult;
use crate::session::{with_session, SessionFactory, SessionSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario
    pub scenario: ScenarioId,
    /// Suite it belongs to
    pub suite: Suite,
    /// Whether it passed
    pub passed: bool,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Failure message
    pub error: Option<String>,
}

/// Outcome of a suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Application under test
    pub base_url: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Per-scenario results, in execution order
    pub results: Vec<ScenarioResult>,
    /// Scenarios not run after a fail-fast stop
    pub skipped: Vec<ScenarioId>,
    /// Fixture provisioning, when it ran
    pub provisioning: Option<ProvisioningReport>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl SuiteReport {
    /// Number of passed scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Number of failed scenarios
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Number of executed scenarios
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Whether everything that ran passed and nothing was skipped
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }

    /// Failed results
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> AuthProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_json(&self, path: impl AsRef<Path>) -> AuthProbeResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Suite lifecycle hooks
pub trait SuiteObserver {
    /// Before the first scenario
    fn on_suite_start(&mut self, scenarios: &[ScenarioId]) {
        let _ = scenarios;
    }

    /// Before each scenario
    fn on_scenario_start(&mut self, scenario: ScenarioId) {
        let _ = scenario;
    }

    /// After a passing scenario
    fn on_scenario_pass(&mut self, result: &ScenarioResult) {
        let _ = result;
    }

    /// After a failing scenario
    fn on_scenario_fail(&mut self, result: &ScenarioResult) {
        let _ = result;
    }

    /// After the last scenario
    fn on_suite_finish(&mut self, report: &SuiteReport) {
        let _ = report;
    }
}

/// Logs lifecycle events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SuiteObserver for TracingObserver {
    fn on_suite_start(&mut self, scenarios: &[ScenarioId]) {
        info!(count = scenarios.len(), "suite start");
    }

    fn on_scenario_start(&mut self, scenario: ScenarioId) {
        info!(%scenario, "scenario start");
    }

    fn on_scenario_pass(&mut self, result: &ScenarioResult) {
        info!(scenario = %result.scenario, duration_ms = result.duration_ms, "scenario passed");
    }

    fn on_scenario_fail(&mut self, result: &ScenarioResult) {
        error!(
            scenario = %result.scenario,
            error = result.error.as_deref().unwrap_or_default(),
            "scenario failed"
        );
    }

    fn on_suite_finish(&mut self, report: &SuiteReport) {
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped.len(),
            "suite finished"
        );
    }
}

/// Runs selected scenarios, each in a fresh session
pub struct SuiteRunner<F: SessionFactory> {
    factory: F,
    config: SuiteConfig,
    observers: Vec<Box<dyn SuiteObserver>>,
}

impl<F: SessionFactory> std::fmt::Debug for SuiteRunner<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<F: SessionFactory> SuiteRunner<F> {
    /// Runner with no observers
    #[must_use]
    pub fn new(factory: F, config: SuiteConfig) -> Self {
        Self {
            factory,
            config,
            observers: Vec::new(),
        }
    }

    /// Add a lifecycle observer
    #[must_use]
    pub fn with_observer(mut self, observer: impl SuiteObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Scenarios matching the suite and filter, in declared order
    #[must_use]
    pub fn selected(&self) -> Vec<ScenarioId> {
        let filter = self.config.filter.as_deref().map(str::to_lowercase);
        ScenarioId::ALL
            .into_iter()
            .filter(|id| self.config.suite.includes(id.suite()))
            .filter(|id| filter.as_deref().map_or(true, |f| id.name().contains(f)))
            .collect()
    }

    fn notify(&mut self, event: impl Fn(&mut dyn SuiteObserver)) {
        for observer in &mut self.observers {
            event(observer.as_mut());
        }
    }

    /// Run the selected scenarios
    pub async fn run(&mut self) -> SuiteReport {
        self.run_with(ScenarioContext::default()).await
    }

    /// Run with a caller-supplied context
    pub async fn run_with(&mut self, mut ctx: ScenarioContext) -> SuiteReport {
        let settings = SessionSettings::from_config(&self.config);
        let scenarios = self.selected();
        let started_at = Utc::now();
        let clock = Instant::now();
        self.notify(|o| o.on_suite_start(&scenarios));

        let mut provisioning = None;
        if self.config.provision && scenarios.iter().any(|s| s.needs_fixtures()) {
            let provisioned = with_session(&self.factory, &settings, &mut ctx, |page, ctx| {
                Box::pin(async move { Ok(ctx.fixtures.ensure_provisioned(page).await) })
            })
            .await;
            match provisioned {
                Ok(state) => info!(?state, "fixtures"),
                Err(e) => warn!(error = %e, "could not open a session for provisioning"),
            }
            provisioning = Some(ctx.fixtures.report().clone());
        }

        let mut results = Vec::with_capacity(scenarios.len());
        let mut skipped = Vec::new();
        for &scenario in &scenarios {
            if self.config.fail_fast && results.iter().any(|r: &ScenarioResult| !r.passed) {
                skipped.push(scenario);
                continue;
            }
            self.notify(|o| o.on_scenario_start(scenario));
            let start = Instant::now();
            let outcome = with_session(&self.factory, &settings, &mut ctx, |page, ctx| {
                Box::pin(scenario.run(page, ctx))
            })
            .await;
            let result = ScenarioResult {
                scenario,
                suite: scenario.suite(),
                passed: outcome.is_ok(),
                duration_ms: elapsed_ms(start),
                error: outcome.err().map(|e| e.to_string()),
            };
            if result.passed {
                self.notify(|o| o.on_scenario_pass(&result));
            } else {
                self.notify(|o| o.on_scenario_fail(&result));
            }
            results.push(result);
        }

        if ctx.fixtures.state() != FixtureState::Pending || self.config.reset_url.is_some() {
            let reset_url = self.config.reset_url.clone();
            let teardown = with_session(&self.factory, &settings, &mut ctx, move |page, ctx| {
                Box::pin(async move { ctx.fixtures.teardown(page, reset_url.as_deref()).await })
            })
            .await;
            if let Err(e) = teardown {
                warn!(error = %e, "fixture teardown failed");
            }
        }

        let report = SuiteReport {
            base_url: settings.base_url,
            started_at,
            results,
            skipped,
            provisioning,
            duration_ms: elapsed_ms(clock),
        };
        self.notify(|o| o.on_suite_finish(&report));
        report
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
