//! Browser control for the suites.
//!
//! [`BrowserConfig`] describes the launch; it is plain data so it can be read
//! from YAML and printed by the CLI. With the `browser` feature the
//! [`ChromiumDriver`] drives a real Chromium over CDP via chromiumoxide.

use serde::{Deserialize, Serialize};

/// Let pages served over http load mixed content
pub const ARG_ALLOW_INSECURE_CONTENT: &str = "--allow-running-insecure-content";
/// Turn off same-origin enforcement
pub const ARG_DISABLE_WEB_SECURITY: &str = "--disable-web-security";
/// Accept self-signed certificates
pub const ARG_IGNORE_CERT_ERRORS: &str = "--ignore-certificate-errors";
/// Auto-accept camera and microphone prompts
pub const ARG_FAKE_MEDIA_UI: &str = "--use-fake-ui-for-media-stream";
/// Replace capture devices with a synthetic source
pub const ARG_FAKE_MEDIA_DEVICE: &str = "--use-fake-device-for-media-stream";

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Fake camera devices so capture prompts resolve without hardware
    pub fake_media: bool,
    /// Relax TLS and mixed-content checks for local test servers
    pub relaxed_security: bool,
    /// Additional command-line flags
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1440,
            viewport_height: 900,
            chromium_path: None,
            sandbox: true,
            fake_media: true,
            relaxed_security: true,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Toggle fake media devices
    #[must_use]
    pub const fn with_fake_media(mut self, enabled: bool) -> Self {
        self.fake_media = enabled;
        self
    }

    /// Toggle relaxed TLS and mixed-content flags
    #[must_use]
    pub const fn with_relaxed_security(mut self, enabled: bool) -> Self {
        self.relaxed_security = enabled;
        self
    }

    /// Append a raw command-line flag
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Command-line flags implied by this configuration
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.relaxed_security {
            args.extend(
                [
                    ARG_ALLOW_INSECURE_CONTENT,
                    ARG_DISABLE_WEB_SECURITY,
                    ARG_IGNORE_CERT_ERRORS,
                ]
                .map(String::from),
            );
        }
        if self.fake_media {
            args.extend([ARG_FAKE_MEDIA_UI, ARG_FAKE_MEDIA_DEVICE].map(String::from));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{AuthDriver, ElementState};
    use crate::locator::Selector;
    use crate::result::{AuthProbeError, AuthProbeResult};
    use crate::session::SessionFactory;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tracing::{debug, info, warn};

    /// [`crate::AuthDriver`] over a real Chromium instance
    #[derive(Debug)]
    pub struct ChromiumDriver {
        browser: Arc<Mutex<CdpBrowser>>,
        page: Arc<Mutex<CdpPage>>,
        handle: tokio::task::JoinHandle<()>,
        closed: bool,
    }

    impl ChromiumDriver {
        /// Launch a browser and open one blank page
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: &BrowserConfig) -> AuthProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .args(config.launch_args());

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|e| AuthProbeError::BrowserLaunch { message: e })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                AuthProbeError::BrowserLaunch {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| AuthProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

            info!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "launched chromium"
            );

            Ok(Self {
                browser: Arc::new(Mutex::new(browser)),
                page: Arc::new(Mutex::new(page)),
                handle,
                closed: false,
            })
        }

        async fn eval(&self, script: &str) -> AuthProbeResult<serde_json::Value> {
            let page = self.page.lock().await;
            let result = page
                .evaluate(script)
                .await
                .map_err(|e| AuthProbeError::script(e.to_string()))?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        }
    }

    fn state_script(selector: &Selector) -> String {
        format!(
            r"(() => {{
  const el = {query};
  if (!el) {{ return null; }}
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return {{
    visible: rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none',
    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
    value: (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) ? el.value : null,
    text: (el.textContent || '').trim(),
  }};
}})()",
            query = selector.to_query()
        )
    }

    fn click_script(selector: &Selector) -> String {
        format!(
            r"(() => {{
  const el = {query};
  if (!el) {{ return false; }}
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()",
            query = selector.to_query()
        )
    }

    fn type_script(selector: &Selector, text: &str) -> AuthProbeResult<String> {
        let literal = serde_json::to_string(text)?;
        Ok(format!(
            r"(() => {{
  const el = {query};
  if (!el) {{ return false; }}
  el.focus();
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
  setter.call(el, '');
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  setter.call(el, {literal});
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()",
            query = selector.to_query()
        ))
    }

    #[async_trait]
    impl AuthDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> AuthProbeResult<()> {
            debug!(url, "navigate");
            let page = self.page.lock().await;
            page.goto(url)
                .await
                .map_err(|e| AuthProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn reload(&mut self) -> AuthProbeResult<()> {
            debug!("reload");
            let page = self.page.lock().await;
            page.reload()
                .await
                .map_err(|e| AuthProbeError::Navigation {
                    url: "(reload)".to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> AuthProbeResult<String> {
            let page = self.page.lock().await;
            let url = page
                .url()
                .await
                .map_err(|e| AuthProbeError::script(e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn execute_js(&self, script: &str) -> AuthProbeResult<serde_json::Value> {
            self.eval(script).await
        }

        async fn query(&self, selector: &Selector) -> AuthProbeResult<Option<ElementState>> {
            let value = self.eval(&state_script(selector)).await?;
            Ok(serde_json::from_value(value)?)
        }

        async fn click(&mut self, selector: &Selector) -> AuthProbeResult<()> {
            debug!(%selector, "click");
            match self.eval(&click_script(selector)).await? {
                serde_json::Value::Bool(true) => Ok(()),
                _ => Err(AuthProbeError::input(format!("no element matches {selector}"))),
            }
        }

        async fn clear_and_type(&mut self, selector: &Selector, text: &str) -> AuthProbeResult<()> {
            debug!(%selector, text, "type");
            match self.eval(&type_script(selector, text)?).await? {
                serde_json::Value::Bool(true) => Ok(()),
                _ => Err(AuthProbeError::input(format!("no element matches {selector}"))),
            }
        }

        async fn close(&mut self) -> AuthProbeResult<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            let mut browser = self.browser.lock().await;
            let closed = browser.close().await;
            if let Err(ref e) = closed {
                warn!(error = %e, "browser close reported an error");
            }
            let _ = browser.wait().await;
            self.handle.abort();
            closed
                .map(|_| ())
                .map_err(|e| AuthProbeError::browser_close(e.to_string()))
        }
    }

    /// Opens one fresh Chromium per session
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumFactory {
        config: BrowserConfig,
    }

    impl ChromiumFactory {
        /// Create a factory for the given launch configuration
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl SessionFactory for ChromiumFactory {
        type Driver = ChromiumDriver;

        async fn open(&self) -> AuthProbeResult<ChromiumDriver> {
            ChromiumDriver::launch(&self.config).await
        }
    }

}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumFactory};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
        assert_eq!((config.viewport_width, config.viewport_height), (1440, 900));
    }

    #[test]
    fn test_launch_args() {
        let args = BrowserConfig::default().launch_args();
        assert_eq!(
            args,
            vec![
                ARG_ALLOW_INSECURE_CONTENT,
                ARG_DISABLE_WEB_SECURITY,
                ARG_IGNORE_CERT_ERRORS,
                ARG_FAKE_MEDIA_UI,
                ARG_FAKE_MEDIA_DEVICE,
            ]
        );
    }

    #[test]
    fn test_toggles() {
        let args = BrowserConfig::default()
            .with_relaxed_security(false)
            .with_fake_media(false)
            .with_arg("--lang=en-US")
            .launch_args();
        assert_eq!(args, vec!["--lang=en-US"]);
    }

    #[test]
    fn test_builder() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_no_sandbox()
            .with_viewport(800, 600)
            .with_chromium_path("/usr/bin/chromium");
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_yaml_partial() {
        let config: BrowserConfig = serde_yaml_ng::from_str("headless: false\n").unwrap();
        assert!(!config.headless);
        assert!(config.fake_media);
    }
}
