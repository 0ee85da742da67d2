//! Suite configuration.
//!
//! Precedence for the base URL, evaluated once per run: explicit setting
//! (CLI flag or YAML file), then `BASE_URL`, then [`DEFAULT_BASE_URL`].

use crate::browser::BrowserConfig;
use crate::result::{AuthProbeError, AuthProbeResult};
use crate::scenario::Suite;
use crate::wait::{WaitOptions, DEFAULT_PROBE_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";

/// Environment variable consulted for the base URL
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Conventional config file name
pub const DEFAULT_CONFIG_FILE: &str = "authprobe.yaml";

/// Pick the base URL: explicit value, then environment, then default.
///
/// Blank values count as unset.
#[must_use]
pub fn resolve_base_url(explicit: Option<&str>, env: Option<&str>) -> String {
    [explicit, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string()
}

/// Configuration for one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Explicit base URL of the application under test
    pub base_url: Option<String>,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Bound for wait-based page operations
    pub wait: WaitOptions,
    /// Bound for status probes
    pub probe_timeout_ms: u64,
    /// Scenarios to run
    pub suite: Suite,
    /// Substring filter on scenario names
    pub filter: Option<String>,
    /// Stop after the first failing scenario
    pub fail_fast: bool,
    /// Provision fixture accounts before the run
    pub provision: bool,
    /// Test-only endpoint that clears server-side state at teardown
    pub reset_url: Option<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            browser: BrowserConfig::default(),
            wait: WaitOptions::default(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            suite: Suite::All,
            filter: None,
            fail_fast: false,
            provision: true,
            reset_url: None,
        }
    }
}

impl SuiteConfig {
    /// Load from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> AuthProbeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AuthProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Parse from YAML text
    ///
    /// # Errors
    ///
    /// Returns error on invalid YAML or unknown values
    pub fn from_yaml(text: &str) -> AuthProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> AuthProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Write as YAML
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> AuthProbeResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Set the explicit base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set browser settings
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Set wait options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set the status probe bound
    #[must_use]
    pub const fn with_probe_timeout(mut self, ms: u64) -> Self {
        self.probe_timeout_ms = ms;
        self
    }

    /// Select a suite
    #[must_use]
    pub const fn with_suite(mut self, suite: Suite) -> Self {
        self.suite = suite;
        self
    }

    /// Filter scenarios by name
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Stop after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Toggle fixture provisioning
    #[must_use]
    pub const fn with_provision(mut self, provision: bool) -> Self {
        self.provision = provision;
        self
    }

    /// Set the reset endpoint
    #[must_use]
    pub fn with_reset_url(mut self, url: impl Into<String>) -> Self {
        self.reset_url = Some(url.into());
        self
    }

    /// Base URL after applying the environment and the default
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        let env = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url(self.base_url.as_deref(), env.as_deref())
    }

    /// Wait options for status probes
    #[must_use]
    pub const fn probe_options(&self) -> WaitOptions {
        self.wait.with_timeout(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_explicit_wins() {
            assert_eq!(
                resolve_base_url(Some("http://app:3000"), Some("http://env:1")),
                "http://app:3000"
            );
        }

        #[test]
        fn test_env_when_no_explicit() {
            assert_eq!(resolve_base_url(None, Some(" http://env:1 ")), "http://env:1");
        }

        #[test]
        fn test_blank_values_fall_through() {
            assert_eq!(resolve_base_url(Some("  "), Some("")), DEFAULT_BASE_URL);
            assert_eq!(resolve_base_url(None, None), "http://localhost:8081");
        }

        proptest! {
            #[test]
            fn prop_non_blank_explicit_always_wins(
                explicit in "[a-z]{1,12}",
                env in proptest::option::of("[a-z]{0,12}"),
            ) {
                let url = format!("http://{explicit}");
                prop_assert_eq!(resolve_base_url(Some(&url), env.as_deref()), url);
            }

            #[test]
            fn prop_result_is_never_blank(
                explicit in proptest::option::of("\\s{0,3}"),
                env in proptest::option::of("\\s{0,3}"),
            ) {
                let url = resolve_base_url(explicit.as_deref(), env.as_deref());
                prop_assert!(!url.trim().is_empty());
            }
        }
    }

    mod file_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_defaults() {
            let config = SuiteConfig::default();
            assert_eq!(config.probe_timeout_ms, 2_000);
            assert_eq!(config.suite, Suite::All);
            assert!(config.provision);
            assert_eq!(config.probe_options().timeout_ms, 2_000);
            assert_eq!(config.probe_options().poll_interval_ms, 100);
        }

        #[test]
        fn test_partial_yaml() {
            let config = SuiteConfig::from_yaml(
                "base_url: http://staging:8081\nsuite: face-lockout\nbrowser:\n  headless: false\n",
            )
            .unwrap();
            assert_eq!(config.base_url.as_deref(), Some("http://staging:8081"));
            assert_eq!(config.suite, Suite::FaceLockout);
            assert!(!config.browser.headless);
            assert_eq!(config.wait, WaitOptions::default());
        }

        #[test]
        fn test_unknown_suite_is_rejected() {
            let err = SuiteConfig::from_yaml("suite: everything\n").unwrap_err();
            assert!(matches!(err, AuthProbeError::Yaml(_)));
        }

        #[test]
        fn test_load_and_save() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "fail_fast: true\nreset_url: http://localhost:8081/test/reset").unwrap();
            let config = SuiteConfig::load(file.path()).unwrap();
            assert!(config.fail_fast);

            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join(DEFAULT_CONFIG_FILE);
            config.save(&out).unwrap();
            assert_eq!(SuiteConfig::load(&out).unwrap(), config);
        }

        #[test]
        fn test_missing_file() {
            let err = SuiteConfig::load("/nonexistent/authprobe.yaml").unwrap_err();
            assert!(matches!(err, AuthProbeError::Config { .. }));
        }
    }
}
