//! CLI command definitions using clap

use authprobe::Suite;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Authprobe: failure-path E2E suite for password, WebAuthn and face login
#[derive(Parser, Debug)]
#[command(name = "authprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenario suites against the login application
    Run(RunArgs),

    /// List scenarios in execution order
    List(ListArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Suite to run
    #[arg(long)]
    pub suite: Option<SuiteArg>,

    /// Only run scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Base URL of the application (overrides config file and BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Headless mode (true/false); `--headed` wins
    #[arg(long, env = "AUTHPROBE_HEADLESS", hide = true)]
    pub headless: Option<bool>,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Wait timeout for page operations in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Timeout for status probes in milliseconds
    #[arg(long)]
    pub probe_timeout: Option<u64>,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Write a JSON report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Skip fixture account provisioning
    #[arg(long)]
    pub no_provision: bool,

    /// Run against the built-in simulated application instead of a browser
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the list command
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only list this suite
    #[arg(long)]
    pub suite: Option<SuiteArg>,
}

/// Arguments for the config command
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Suite selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuiteArg {
    /// Scenarios A to E and the chained scenario
    Deliverables,
    /// Face lockout
    FaceLockout,
    /// Registration journey and idempotence
    UserJourney,
    /// Everything
    All,
}

impl From<SuiteArg> for Suite {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::Deliverables => Self::Deliverables,
            SuiteArg::FaceLockout => Self::FaceLockout,
            SuiteArg::UserJourney => Self::UserJourney,
            SuiteArg::All => Self::All,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}
