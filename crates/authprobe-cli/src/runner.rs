//! Suite execution and the `list`/`config` renderings

use crate::commands::RunArgs;
use crate::config::{apply_run_args, load_suite_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use authprobe::{
    MockFactory, ScenarioId, SessionFactory, Suite, SuiteConfig, SuiteReport, SuiteRunner,
    TracingObserver,
};
use std::fmt::Write as _;
use tracing::info;

/// Seed account of the simulated application
pub const MOCK_SEED_ACCOUNT: (&str, &str, &str) =
    ("etornam.koko@example.com", "etornam.koko", "12345678");

/// Resolve configuration for a `run` invocation
pub fn resolve_run_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    let loaded = load_suite_config(args.config.as_deref())?;
    apply_run_args(loaded, args)
}

/// Run the selected suite and write the report if asked.
///
/// Returns the report; failing scenarios are not an error here.
pub fn run_suite(cli: &CliConfig, args: &RunArgs) -> CliResult<SuiteReport> {
    let suite_config = resolve_run_config(args)?;
    info!(
        base_url = %suite_config.resolved_base_url(),
        suite = %suite_config.suite,
        mock = args.mock,
        "resolved configuration"
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::test_execution(format!("Failed to create runtime: {e}")))?;

    let report = if args.mock {
        let (email, username, password) = MOCK_SEED_ACCOUNT;
        let mut factory = MockFactory::new().with_account(email, username, password);
        if let Some(url) = &suite_config.reset_url {
            factory = factory.with_reset_url(url);
        }
        rt.block_on(execute(factory, suite_config, cli))
    } else {
        run_in_browser(&rt, suite_config, cli)?
    };

    if let Some(ref path) = args.report {
        report
            .save_json(path)
            .map_err(|e| CliError::report_generation(format!("{}: {e}", path.display())))?;
    }
    Ok(report)
}

#[cfg(feature = "browser")]
fn run_in_browser(
    rt: &tokio::runtime::Runtime,
    suite_config: SuiteConfig,
    cli: &CliConfig,
) -> CliResult<SuiteReport> {
    let factory = authprobe::ChromiumFactory::new(suite_config.browser.clone());
    Ok(rt.block_on(execute(factory, suite_config, cli)))
}

#[cfg(not(feature = "browser"))]
fn run_in_browser(
    _rt: &tokio::runtime::Runtime,
    _suite_config: SuiteConfig,
    _cli: &CliConfig,
) -> CliResult<SuiteReport> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser or pass --mock",
    ))
}

async fn execute<F: SessionFactory>(
    factory: F,
    suite_config: SuiteConfig,
    cli: &CliConfig,
) -> SuiteReport {
    let reporter = ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet());
    let mut runner = SuiteRunner::new(factory, suite_config)
        .with_observer(TracingObserver)
        .with_observer(reporter);
    runner.run().await
}

/// Table of scenarios in execution order, optionally one suite only
#[must_use]
pub fn render_scenario_list(suite: Suite) -> String {
    let mut out = String::new();
    for scenario in ScenarioId::ALL.iter().filter(|s| suite.includes(s.suite())) {
        let _ = writeln!(
            out,
            "{:<24} {:<14} {}",
            scenario.name(),
            scenario.suite().name(),
            scenario.title()
        );
    }
    out
}

/// Configuration as YAML with the base URL resolved
pub fn render_config(config: &SuiteConfig) -> CliResult<String> {
    let resolved = config.clone().with_base_url(config.resolved_base_url());
    Ok(resolved.to_yaml()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::SuiteArg;

    mod list_tests {
        use super::*;

        #[test]
        fn test_all_lists_every_scenario() {
            let listing = render_scenario_list(Suite::All);
            assert_eq!(listing.lines().count(), ScenarioId::ALL.len());
        }

        #[test]
        fn test_suite_filter() {
            let listing = render_scenario_list(Suite::FaceLockout);
            assert_eq!(listing.lines().count(), 1);
            assert!(listing.contains(Suite::FaceLockout.name()));
        }
    }

    mod config_render_tests {
        use super::*;

        #[test]
        fn test_base_url_is_resolved() {
            let yaml = render_config(&SuiteConfig::default().with_base_url("http://app:9000"))
                .unwrap();
            assert!(yaml.contains("http://app:9000"));
            let parsed = SuiteConfig::from_yaml(&yaml).unwrap();
            assert_eq!(parsed.base_url.as_deref(), Some("http://app:9000"));
        }
    }

    mod run_tests {
        use super::*;

        fn mock_args() -> RunArgs {
            RunArgs {
                mock: true,
                timeout: Some(200),
                probe_timeout: Some(50),
                base_url: Some("http://localhost:8081".to_string()),
                ..RunArgs::default()
            }
        }

        #[test]
        fn test_mock_journey_suite_passes() {
            let args = RunArgs {
                suite: Some(SuiteArg::UserJourney),
                ..mock_args()
            };
            let report = run_suite(&CliConfig::new(), &args).unwrap();
            assert!(report.all_passed(), "{:?}", report.failures());
            assert_eq!(report.total(), 2);
        }

        #[test]
        fn test_report_written() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("report.json");
            let args = RunArgs {
                suite: Some(SuiteArg::FaceLockout),
                report: Some(path.clone()),
                ..mock_args()
            };
            let report = run_suite(&CliConfig::new(), &args).unwrap();
            let written = std::fs::read_to_string(&path).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
            assert_eq!(parsed["results"].as_array().unwrap().len(), report.total());
        }

        #[test]
        fn test_mock_run_with_reset_url() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("authprobe.yaml");
            std::fs::write(&path, "reset_url: http://localhost:8081/__admin/wipe\n").unwrap();
            let args = RunArgs {
                suite: Some(SuiteArg::FaceLockout),
                config: Some(path),
                ..mock_args()
            };
            let report = run_suite(&CliConfig::new(), &args).unwrap();
            assert!(report.all_passed(), "{:?}", report.failures());
        }

        #[test]
        fn test_filter_narrows_run() {
            let args = RunArgs {
                filter: Some("idempot".to_string()),
                ..mock_args()
            };
            let report = run_suite(&CliConfig::new(), &args).unwrap();
            assert_eq!(report.total(), 1);
        }
    }
}
