//! Authprobe CLI library
//!
//! Command-line front end for the authprobe scenario suites.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ListArgs, LogFormatArg, RunArgs, SuiteArg,
};
pub use config::{
    apply_run_args, load_suite_config, CliConfig, ColorChoice, LogFormat, Verbosity,
};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::{
    render_config, render_scenario_list, resolve_run_config, run_suite, MOCK_SEED_ACCOUNT,
};
