//! AuthDriver - browser automation seam
//!
//! Page operations talk to the browser only through [`AuthDriver`]. The
//! Chromium implementation lives in [`crate::browser`]; [`crate::mock`] holds
//! an in-process double of the login application for unit tests.
//!
//! ```text
//! LoginPage ──► AuthDriver ──┬─► ChromiumDriver (CDP via chromiumoxide)
//!                            └─► MockDriver     (simulated application)
//! ```

use crate::injector::{RuntimeOverrides, ScriptBuilder};
use crate::locator::Selector;
use crate::result::AuthProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Observed state of one element at lookup time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Rendered with a non-empty box and not hidden by style
    pub visible: bool,
    /// Not carrying the `disabled` property
    pub enabled: bool,
    /// Current `value` for form controls
    pub value: Option<String>,
    /// Trimmed text content
    pub text: String,
}

impl ElementState {
    /// A visible, enabled element with the given text
    #[must_use]
    pub fn shown(text: impl Into<String>) -> Self {
        Self {
            visible: true,
            enabled: true,
            value: None,
            text: text.into(),
        }
    }

    /// Mark the element disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Attach a form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `ChromiumDriver` - real browser over CDP (feature `browser`)
/// - `MockDriver` - simulated login application for unit testing
#[async_trait]
pub trait AuthDriver: Send + Sync {
    /// Navigate to URL and wait for the document to load
    async fn navigate(&mut self, url: &str) -> AuthProbeResult<()>;

    /// Reload the current page
    async fn reload(&mut self) -> AuthProbeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> AuthProbeResult<String>;

    /// Execute JavaScript in page context
    async fn execute_js(&self, script: &str) -> AuthProbeResult<serde_json::Value>;

    /// Look the element up once, without waiting
    async fn query(&self, selector: &Selector) -> AuthProbeResult<Option<ElementState>>;

    /// Click the element
    async fn click(&mut self, selector: &Selector) -> AuthProbeResult<()>;

    /// Clear the input, then type `text` into it
    async fn clear_and_type(&mut self, selector: &Selector, text: &str) -> AuthProbeResult<()>;

    /// Install test doubles for camera, credential ceremony and network
    /// transport into the current page.
    ///
    /// The default evaluates the generated injector script. Drivers whose
    /// application exposes a test hook can override this instead.
    async fn apply_overrides(&mut self, overrides: &RuntimeOverrides) -> AuthProbeResult<()> {
        let script = ScriptBuilder::new(overrides).build();
        self.execute_js(&script.content).await.map(|_| ())
    }

    /// Close the browser
    async fn close(&mut self) -> AuthProbeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::AuthProbeError;
    use std::sync::Mutex;

    /// Driver that only records scripts, to exercise the default override path
    #[derive(Debug, Default)]
    struct ScriptRecorder {
        scripts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuthDriver for ScriptRecorder {
        async fn navigate(&mut self, _url: &str) -> AuthProbeResult<()> {
            Ok(())
        }

        async fn reload(&mut self) -> AuthProbeResult<()> {
            Ok(())
        }

        async fn current_url(&self) -> AuthProbeResult<String> {
            Ok("about:blank".to_string())
        }

        async fn execute_js(&self, script: &str) -> AuthProbeResult<serde_json::Value> {
            self.scripts
                .lock()
                .map_err(|e| AuthProbeError::script(e.to_string()))?
                .push(script.to_string());
            Ok(serde_json::Value::Bool(true))
        }

        async fn query(&self, _selector: &Selector) -> AuthProbeResult<Option<ElementState>> {
            Ok(None)
        }

        async fn click(&mut self, _selector: &Selector) -> AuthProbeResult<()> {
            Ok(())
        }

        async fn clear_and_type(&mut self, _selector: &Selector, _text: &str) -> AuthProbeResult<()> {
            Ok(())
        }

        async fn close(&mut self) -> AuthProbeResult<()> {
            Ok(())
        }
    }

    mod element_state_tests {
        use super::*;

        #[test]
        fn test_shown() {
            let state = ElementState::shown("Register Biometric");
            assert!(state.visible);
            assert!(state.enabled);
            assert_eq!(state.text, "Register Biometric");
        }

        #[test]
        fn test_disabled_with_value() {
            let state = ElementState::shown("").disabled().with_value("a@b.c");
            assert!(!state.enabled);
            assert_eq!(state.value.as_deref(), Some("a@b.c"));
        }
    }

    mod default_override_tests {
        use super::*;

        #[tokio::test]
        async fn test_default_apply_overrides_runs_script() {
            let mut driver = ScriptRecorder::default();
            driver
                .apply_overrides(&RuntimeOverrides::default().with_failure_mode())
                .await
                .unwrap();
            let scripts = driver.scripts.lock().unwrap();
            assert_eq!(scripts.len(), 1);
            assert!(scripts[0].contains("__SELENIUM_TEST_MODE__"));
            assert!(scripts[0].contains("Mock biometric failure"));
        }
    }
}
