//! CLI configuration

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use authprobe::{SuiteConfig, WaitOptions, DEFAULT_CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter for this level
    #[must_use]
    pub const fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

/// Load the suite configuration.
///
/// An explicit path must exist; otherwise `authprobe.yaml` in the working
/// directory is used when present, else defaults.
pub fn load_suite_config(path: Option<&Path>) -> CliResult<SuiteConfig> {
    match path {
        Some(p) => Ok(SuiteConfig::load(p)?),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            Ok(SuiteConfig::load(DEFAULT_CONFIG_FILE)?)
        }
        None => Ok(SuiteConfig::default()),
    }
}

/// Layer command-line flags over a loaded configuration
pub fn apply_run_args(mut config: SuiteConfig, args: &RunArgs) -> CliResult<SuiteConfig> {
    if let Some(suite) = args.suite {
        config.suite = suite.into();
    }
    if let Some(filter) = &args.filter {
        config.filter = Some(filter.clone());
    }
    if let Some(url) = &args.base_url {
        if url.trim().is_empty() {
            return Err(CliError::invalid_argument("--base-url must not be blank"));
        }
        config.base_url = Some(url.clone());
    }
    if let Some(headless) = args.headless {
        config.browser.headless = headless;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if args.no_sandbox {
        config.browser.sandbox = false;
    }
    if let Some(path) = &args.chromium_path {
        config.browser.chromium_path = Some(path.clone());
    }
    if let Some(ms) = args.timeout {
        config.wait = WaitOptions { timeout_ms: ms, ..config.wait };
    }
    if let Some(ms) = args.probe_timeout {
        config.probe_timeout_ms = ms;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    if args.no_provision {
        config.provision = false;
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::SuiteArg;
    use authprobe::Suite;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_verbosity() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_log_levels() {
            assert_eq!(Verbosity::Quiet.log_level(), "error");
            assert_eq!(Verbosity::Verbose.log_level(), "info");
            assert!(Verbosity::Debug.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Quiet.is_quiet());
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_forced_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod suite_config_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_flags_override_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                "base_url: http://file:8081\nsuite: deliverables\nprobe_timeout_ms: 900\n"
            )
            .unwrap();
            let loaded = load_suite_config(Some(file.path())).unwrap();
            let args = RunArgs {
                suite: Some(SuiteArg::UserJourney),
                base_url: Some("http://flag:1".to_string()),
                timeout: Some(250),
                headed: true,
                no_provision: true,
                ..RunArgs::default()
            };
            let config = apply_run_args(loaded, &args).unwrap();
            assert_eq!(config.suite, Suite::UserJourney);
            assert_eq!(config.base_url.as_deref(), Some("http://flag:1"));
            assert_eq!(config.wait.timeout_ms, 250);
            assert_eq!(config.probe_timeout_ms, 900);
            assert!(!config.browser.headless);
            assert!(!config.provision);
        }

        #[test]
        fn test_headed_beats_headless_env() {
            let args = RunArgs {
                headless: Some(true),
                headed: true,
                ..RunArgs::default()
            };
            let config = apply_run_args(SuiteConfig::default(), &args).unwrap();
            assert!(!config.browser.headless);

            let args = RunArgs {
                headless: Some(false),
                ..RunArgs::default()
            };
            let config = apply_run_args(SuiteConfig::default(), &args).unwrap();
            assert!(!config.browser.headless);
        }

        #[test]
        fn test_missing_explicit_file_is_error() {
            let err = load_suite_config(Some(Path::new("/nonexistent/authprobe.yaml")));
            assert!(err.is_err());
        }

        #[test]
        fn test_blank_base_url_rejected() {
            let args = RunArgs {
                base_url: Some("  ".to_string()),
                ..RunArgs::default()
            };
            assert!(apply_run_args(SuiteConfig::default(), &args).is_err());
        }
    }
}
