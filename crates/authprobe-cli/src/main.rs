//! Authprobe CLI: failure-path E2E suites for multi-factor login
//!
//! ## Usage
//!
//! ```bash
//! authprobe run                              # Run every suite against BASE_URL
//! authprobe run --suite deliverables         # Scenarios A to E plus chained
//! authprobe run --filter face --report r.json
//! authprobe run --mock                       # Simulated app, no browser
//! authprobe list
//! authprobe config
//! ```

use authprobe::Suite;
use authprobe_cli::{
    load_suite_config, logging, render_config, render_scenario_list, run_suite, Cli, CliConfig,
    CliError, CliResult, ColorChoice, Commands, ConfigArgs, ListArgs, LogFormat, RunArgs,
    Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    logging::init_tracing(&config)?;

    match cli.command {
        Commands::Run(args) => run_scenarios(&config, &args),
        Commands::List(args) => {
            run_list(&args);
            Ok(())
        }
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();
    let log_format: LogFormat = cli.log_format.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_format(log_format)
}

fn run_scenarios(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let report = run_suite(config, args)?;
    if let Some(ref path) = args.report {
        if !config.verbosity.is_quiet() {
            println!("Report written to {}", path.display());
        }
    }
    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{} of {} scenarios failed, {} skipped",
            report.failed(),
            report.total(),
            report.skipped.len()
        )))
    }
}

fn run_list(args: &ListArgs) {
    let suite = args.suite.map_or(Suite::All, Suite::from);
    print!("{}", render_scenario_list(suite));
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = load_suite_config(args.config.as_deref())?;
    print!("{}", render_config(&config)?);
    Ok(())
}
