//! Behavior injection for hardware-backed ceremonies.
//!
//! The login application reaches a camera, a platform authenticator and its
//! API over the network. [`RuntimeOverrides`] describes test doubles for all
//! three; [`ScriptBuilder`] renders them as one in-page script, and
//! [`BehaviorInjector`] keeps the current set so it can be re-installed after
//! every page load.

use crate::driver::AuthDriver;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Request path fragments treated as the application's API
pub const DEFAULT_INTERRUPTED_PATHS: [&str; 2] = ["/api/", "/webauthn/"];

/// Element id of the on-page test-mode badge
pub const INDICATOR_ID: &str = "authprobe-test-mode";

/// Message thrown by forced credential failures
pub const FAILURE_MESSAGE: &str = "Mock biometric failure";

/// Message thrown once a lockout-counting double reaches its threshold
pub const LOCKOUT_MESSAGE: &str = "Account locked due to multiple failed attempts";

/// Message thrown by an interrupted network transport
pub const NETWORK_MESSAGE: &str = "Network error - connection interrupted";

// =============================================================================
// OVERRIDE MODEL
// =============================================================================

/// Outcome forced on WebAuthn credential creation and assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialMode {
    /// Leave `navigator.credentials` alone; only the app's test hook is mocked
    #[default]
    Passthrough,
    /// Every ceremony resolves with a fake credential
    Success,
    /// Every ceremony rejects with a generic failure
    Failure,
    /// Fail every ceremony; from the `n`th on, reject with a lockout message
    LockoutAfter(u32),
    /// Every ceremony rejects with `NotAllowedError`
    PermissionDenied,
}

/// Behavior of camera capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraMode {
    /// Synthetic 640x480 face stream
    #[default]
    Synthetic,
    /// Capture rejects with `NotAllowedError`
    PermissionDenied,
}

/// Behavior of the network transport
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkMode {
    /// Original transport
    #[default]
    Online,
    /// Requests whose URL contains any pattern fail
    Interrupted {
        /// URL fragments to fail
        patterns: Vec<String>,
    },
}

impl NetworkMode {
    /// Interrupt the default API paths
    #[must_use]
    pub fn interrupted() -> Self {
        Self::Interrupted {
            patterns: DEFAULT_INTERRUPTED_PATHS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }

    /// Whether a request to `url` would fail
    #[must_use]
    pub fn blocks(&self, url: &str) -> bool {
        match self {
            Self::Online => false,
            Self::Interrupted { patterns } => patterns.iter().any(|p| url.contains(p.as_str())),
        }
    }
}

/// Full set of runtime doubles for one page load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOverrides {
    /// Credential ceremony outcome
    pub credentials: CredentialMode,
    /// Camera behavior
    pub camera: CameraMode,
    /// Network behavior
    pub network: NetworkMode,
    /// Show the "TEST MODE" badge
    pub indicator: bool,
}

impl Default for RuntimeOverrides {
    fn default() -> Self {
        Self {
            credentials: CredentialMode::Passthrough,
            camera: CameraMode::Synthetic,
            network: NetworkMode::Online,
            indicator: true,
        }
    }
}

impl RuntimeOverrides {
    /// Set the credential mode
    #[must_use]
    pub const fn with_credentials(mut self, mode: CredentialMode) -> Self {
        self.credentials = mode;
        self
    }

    /// Force every ceremony to succeed
    #[must_use]
    pub const fn with_success_mode(self) -> Self {
        self.with_credentials(CredentialMode::Success)
    }

    /// Force every ceremony to fail
    #[must_use]
    pub const fn with_failure_mode(self) -> Self {
        self.with_credentials(CredentialMode::Failure)
    }

    /// Fail every ceremony, reporting a lockout from attempt `threshold` on
    #[must_use]
    pub const fn with_lockout_after(self, threshold: u32) -> Self {
        self.with_credentials(CredentialMode::LockoutAfter(threshold))
    }

    /// Deny both the authenticator and the camera
    #[must_use]
    pub const fn with_permissions_denied(mut self) -> Self {
        self.credentials = CredentialMode::PermissionDenied;
        self.camera = CameraMode::PermissionDenied;
        self
    }

    /// Set the network mode
    #[must_use]
    pub fn with_network(mut self, network: NetworkMode) -> Self {
        self.network = network;
        self
    }

    /// Hide the test-mode badge
    #[must_use]
    pub const fn without_indicator(mut self) -> Self {
        self.indicator = false;
        self
    }
}

// =============================================================================
// SCRIPT GENERATION
// =============================================================================

/// Generated in-page script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedScript {
    /// JavaScript content
    pub content: String,
    /// Number of lines
    pub line_count: usize,
    /// Names of the sections emitted, in order
    pub sections: Vec<String>,
    /// Overrides the script installs
    pub overrides: RuntimeOverrides,
}

/// Renders [`RuntimeOverrides`] as one idempotent IIFE
///
/// Originals are captured once per page in `window.__authprobeOriginals`, so
/// re-running the script with a different mode swaps doubles instead of
/// wrapping previous ones.
#[derive(Debug, Clone)]
pub struct ScriptBuilder<'a> {
    overrides: &'a RuntimeOverrides,
}

impl<'a> ScriptBuilder<'a> {
    /// Create a builder for the given overrides
    #[must_use]
    pub const fn new(overrides: &'a RuntimeOverrides) -> Self {
        Self { overrides }
    }

    /// Build the script
    #[must_use]
    pub fn build(&self) -> GeneratedScript {
        let mut sections = Vec::new();
        let mut body = String::new();

        body.push_str(PRELUDE);
        sections.push("prelude".to_string());

        let (camera_name, camera_js) = self.camera_section();
        body.push_str(camera_js);
        sections.push(camera_name.to_string());

        body.push_str(PLATFORM_AUTHENTICATOR);
        sections.push("platform-authenticator".to_string());

        let (credential_name, credential_js) = self.credential_section();
        body.push_str(&credential_js);
        sections.push(credential_name);

        let (network_name, network_js) = self.network_section();
        body.push_str(&network_js);
        sections.push(network_name.to_string());

        if self.overrides.indicator {
            body.push_str(&format!(
                r#"let badge = document.getElementById('{INDICATOR_ID}');
if (!badge && document.body) {{
  badge = document.createElement('div');
  badge.id = '{INDICATOR_ID}';
  badge.textContent = 'TEST MODE';
  badge.style.cssText = 'position:fixed;top:10px;right:10px;background:#ff6b6b;color:white;padding:5px 10px;border-radius:3px;z-index:9999;font-size:12px;font-weight:bold;';
  document.body.appendChild(badge);
}}
"#
            ));
            sections.push("indicator".to_string());
        } else {
            body.push_str(&format!(
                "const staleBadge = document.getElementById('{INDICATOR_ID}');\nif (staleBadge) {{ staleBadge.remove(); }}\n"
            ));
        }

        let content = format!("(() => {{\n{body}return true;\n}})()");
        let line_count = content.lines().count();

        GeneratedScript {
            content,
            line_count,
            sections,
            overrides: self.overrides.clone(),
        }
    }

    fn camera_section(&self) -> (&'static str, &'static str) {
        match self.overrides.camera {
            CameraMode::Synthetic => ("camera:synthetic", CAMERA_SYNTHETIC),
            CameraMode::PermissionDenied => ("camera:denied", CAMERA_DENIED),
        }
    }

    fn credential_section(&self) -> (String, String) {
        let ceremony = match self.overrides.credentials {
            CredentialMode::Passthrough => {
                return (
                    "credentials:passthrough".to_string(),
                    CREDENTIALS_PASSTHROUGH.to_string(),
                );
            }
            CredentialMode::Success => ("success".to_string(), "return fake(kind);".to_string()),
            CredentialMode::Failure => (
                "failure".to_string(),
                format!("throw new Error('{FAILURE_MESSAGE}');"),
            ),
            CredentialMode::LockoutAfter(n) => (
                format!("lockout-after-{n}"),
                format!(
                    "w.__authprobeAttempts = (w.__authprobeAttempts || 0) + 1;\n  if (w.__authprobeAttempts >= {n}) {{ throw new Error('{LOCKOUT_MESSAGE}'); }}\n  throw new Error('{FAILURE_MESSAGE}');"
                ),
            ),
            CredentialMode::PermissionDenied => (
                "denied".to_string(),
                "throw new DOMException('Permission denied', 'NotAllowedError');".to_string(),
            ),
        };
        let (name, outcome) = ceremony;
        let js = format!(
            r#"const ceremony = async (kind) => {{
  {outcome}
}};
if (navigator.credentials) {{
  navigator.credentials.create = () => ceremony('create');
  navigator.credentials.get = () => ceremony('get');
}}
w.__mockWebAuthn = {{
  startRegistration: () => ceremony('create'),
  startAuthentication: () => ceremony('get'),
}};
"#
        );
        (format!("credentials:{name}"), js)
    }

    fn network_section(&self) -> (&'static str, String) {
        match &self.overrides.network {
            NetworkMode::Online => ("network:online", NETWORK_ONLINE.to_string()),
            NetworkMode::Interrupted { patterns } => {
                let blocked =
                    serde_json::to_string(patterns).unwrap_or_else(|_| "[]".to_string());
                (
                    "network:interrupted",
                    format!(
                        r#"const blocked = {blocked};
w.fetch = function (input, init) {{
  const url = typeof input === 'string' ? input : (input && input.url) || '';
  if (blocked.some((p) => url.includes(p))) {{
    return Promise.reject(new Error('{NETWORK_MESSAGE}'));
  }}
  return w.originalFetch.call(this, input, init);
}};
"#
                    ),
                )
            }
        }
    }
}

const PRELUDE: &str = r"const w = window;
w.__SELENIUM_TEST_MODE__ = true;
const o = w.__authprobeOriginals || (w.__authprobeOriginals = {
  fetch: w.fetch,
  create: navigator.credentials && navigator.credentials.create ? navigator.credentials.create.bind(navigator.credentials) : null,
  get: navigator.credentials && navigator.credentials.get ? navigator.credentials.get.bind(navigator.credentials) : null,
});
if (!w.originalFetch) { w.originalFetch = o.fetch; }
const fake = (kind) => ({
  id: 'mock-credential-' + Date.now(),
  rawId: new ArrayBuffer(64),
  response: kind === 'create'
    ? { attestationObject: new ArrayBuffer(1024), clientDataJSON: new ArrayBuffer(256), transports: ['internal'] }
    : { authenticatorData: new ArrayBuffer(256), clientDataJSON: new ArrayBuffer(256), signature: new ArrayBuffer(256), signCount: 1 },
  type: 'public-key',
});
";

const CAMERA_SYNTHETIC: &str = r"if (navigator.mediaDevices) {
  navigator.mediaDevices.getUserMedia = async () => {
    const canvas = document.createElement('canvas');
    canvas.width = 640;
    canvas.height = 480;
    const ctx = canvas.getContext('2d');
    if (ctx) {
      ctx.fillStyle = '#f0c674';
      ctx.fillRect(0, 0, 640, 480);
      ctx.fillStyle = '#000000';
      ctx.fillRect(200, 150, 60, 60);
      ctx.fillRect(380, 150, 60, 60);
      ctx.fillRect(280, 280, 80, 40);
    }
    return canvas.captureStream(30);
  };
}
";

const CAMERA_DENIED: &str = r"if (navigator.mediaDevices) {
  navigator.mediaDevices.getUserMedia = async () => {
    throw new DOMException('Permission denied', 'NotAllowedError');
  };
}
";

const PLATFORM_AUTHENTICATOR: &str = r"if (w.PublicKeyCredential) {
  w.PublicKeyCredential.isUserVerifyingPlatformAuthenticatorAvailable = async () => true;
}
";

const CREDENTIALS_PASSTHROUGH: &str = r"if (navigator.credentials) {
  if (o.create) { navigator.credentials.create = o.create; }
  if (o.get) { navigator.credentials.get = o.get; }
}
w.__mockWebAuthn = {
  startRegistration: async () => fake('create'),
  startAuthentication: async () => fake('get'),
};
";

const NETWORK_ONLINE: &str = "if (w.originalFetch) { w.fetch = w.originalFetch; }\n";

// =============================================================================
// INJECTOR
// =============================================================================

/// Holds the overrides for the current test and installs them on demand
#[derive(Debug, Clone, Default)]
pub struct BehaviorInjector {
    overrides: RuntimeOverrides,
    applications: u32,
}

impl BehaviorInjector {
    /// Create an injector with default overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an injector with the given overrides
    #[must_use]
    pub fn with_overrides(overrides: RuntimeOverrides) -> Self {
        Self {
            overrides,
            applications: 0,
        }
    }

    /// Current overrides
    #[must_use]
    pub const fn overrides(&self) -> &RuntimeOverrides {
        &self.overrides
    }

    /// Number of successful installations so far
    #[must_use]
    pub const fn applications(&self) -> u32 {
        self.applications
    }

    /// Replace the overrides
    pub fn set(&mut self, overrides: RuntimeOverrides) {
        self.overrides = overrides;
    }

    /// Edit the overrides in place
    pub fn update(&mut self, edit: impl FnOnce(&mut RuntimeOverrides)) {
        edit(&mut self.overrides);
    }

    /// Force credential failures
    pub fn enable_failure_mode(&mut self) {
        self.overrides.credentials = CredentialMode::Failure;
    }

    /// Stop forcing credential failures
    pub fn disable_failure_mode(&mut self) {
        self.overrides.credentials = CredentialMode::Passthrough;
    }

    /// Count failures and report a lockout once `threshold` is reached
    pub fn enable_lockout_counting(&mut self, threshold: u32) {
        self.overrides.credentials = CredentialMode::LockoutAfter(threshold);
    }

    /// Deny authenticator and camera access
    pub fn deny_permissions(&mut self) {
        self.overrides.credentials = CredentialMode::PermissionDenied;
        self.overrides.camera = CameraMode::PermissionDenied;
    }

    /// Restore authenticator and camera access
    pub fn grant_permissions(&mut self) {
        self.overrides.credentials = CredentialMode::Passthrough;
        self.overrides.camera = CameraMode::Synthetic;
    }

    /// Fail API requests
    pub fn interrupt_network(&mut self) {
        self.overrides.network = NetworkMode::interrupted();
    }

    /// Restore the original transport
    pub fn restore_network(&mut self) {
        self.overrides.network = NetworkMode::Online;
    }

    /// Back to defaults
    pub fn reset(&mut self) {
        self.overrides = RuntimeOverrides::default();
    }

    /// Install the current overrides into the driver's page.
    ///
    /// Failures are logged and reported as `false`; a page that rejects the
    /// doubles still lets the scenario continue.
    pub async fn apply<D: AuthDriver + ?Sized>(&mut self, driver: &mut D) -> bool {
        match driver.apply_overrides(&self.overrides).await {
            Ok(()) => {
                self.applications += 1;
                debug!(overrides = ?self.overrides, "installed runtime overrides");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to install runtime overrides");
                false
            }
        }
    }

    /// Re-install after a page load; a navigation discards in-page doubles
    pub async fn reapply_after_navigation<D: AuthDriver + ?Sized>(&mut self, driver: &mut D) -> bool {
        debug!("re-installing runtime overrides after navigation");
        self.apply(driver).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    mod script_tests {
        use super::*;

        fn script(overrides: &RuntimeOverrides) -> GeneratedScript {
            ScriptBuilder::new(overrides).build()
        }

        #[test]
        fn test_default_script() {
            let generated = script(&RuntimeOverrides::default());
            assert!(generated.content.starts_with("(() => {"));
            assert!(generated.content.ends_with("})()"));
            assert!(generated.content.contains("w.__SELENIUM_TEST_MODE__ = true;"));
            assert!(generated.content.contains("ctx.fillStyle = '#f0c674';"));
            assert!(generated.content.contains("canvas.captureStream(30)"));
            assert!(generated
                .content
                .contains("isUserVerifyingPlatformAuthenticatorAvailable = async () => true"));
            assert!(generated.content.contains("w.__mockWebAuthn"));
            assert!(generated.content.contains("TEST MODE"));
            assert!(generated.content.contains("#ff6b6b"));
            assert_eq!(
                generated.sections,
                vec![
                    "prelude",
                    "camera:synthetic",
                    "platform-authenticator",
                    "credentials:passthrough",
                    "network:online",
                    "indicator"
                ]
            );
            assert_eq!(generated.line_count, generated.content.lines().count());
            assert_eq!(generated.overrides, RuntimeOverrides::default());
        }

        #[test]
        fn test_failure_mode() {
            let generated = script(&RuntimeOverrides::default().with_failure_mode());
            assert!(generated
                .content
                .contains("throw new Error('Mock biometric failure');"));
            assert!(generated.content.contains("navigator.credentials.get = () => ceremony('get');"));
        }

        #[test]
        fn test_lockout_counting() {
            let generated = script(&RuntimeOverrides::default().with_lockout_after(3));
            assert!(generated.content.contains("if (w.__authprobeAttempts >= 3)"));
            assert!(generated.content.contains(LOCKOUT_MESSAGE));
            assert!(generated
                .sections
                .contains(&"credentials:lockout-after-3".to_string()));
        }

        #[test]
        fn test_permission_denied() {
            let generated = script(&RuntimeOverrides::default().with_permissions_denied());
            assert_eq!(
                generated
                    .content
                    .matches("new DOMException('Permission denied', 'NotAllowedError')")
                    .count(),
                2
            );
        }

        #[test]
        fn test_network_interruption() {
            let overrides = RuntimeOverrides::default().with_network(NetworkMode::interrupted());
            let generated = script(&overrides);
            assert!(generated
                .content
                .contains(r#"const blocked = ["/api/","/webauthn/"];"#));
            assert!(generated.content.contains(NETWORK_MESSAGE));
            assert!(generated.content.contains("if (!w.originalFetch)"));
        }

        #[test]
        fn test_network_restore() {
            let generated = script(&RuntimeOverrides::default());
            assert!(generated.content.contains("w.fetch = w.originalFetch;"));
        }

        #[test]
        fn test_without_indicator_removes_badge() {
            let generated = script(&RuntimeOverrides::default().without_indicator());
            assert!(!generated.content.contains("TEST MODE"));
            assert!(generated.content.contains("staleBadge.remove()"));
        }

        #[test]
        fn test_network_blocks() {
            let mode = NetworkMode::interrupted();
            assert!(mode.blocks("http://localhost:3001/api/auth/fingerprint"));
            assert!(mode.blocks("/webauthn/register"));
            assert!(!mode.blocks("/static/app.js"));
            assert!(!NetworkMode::Online.blocks("/api/"));
        }

        #[test]
        fn test_overrides_yaml() {
            let overrides: RuntimeOverrides =
                serde_yaml_ng::from_str("credentials: !lockout-after 3\n").unwrap();
            assert_eq!(overrides.credentials, CredentialMode::LockoutAfter(3));
            assert!(overrides.indicator);

            let yaml = serde_yaml_ng::to_string(&overrides).unwrap();
            assert!(yaml.contains("credentials: !lockout-after 3"));
            let back: RuntimeOverrides = serde_yaml_ng::from_str(&yaml).unwrap();
            assert_eq!(back, overrides);

            let overrides: RuntimeOverrides =
                serde_yaml_ng::from_str("credentials: permission-denied\n").unwrap();
            assert_eq!(overrides.credentials, CredentialMode::PermissionDenied);
        }
    }

    mod injector_tests {
        use super::*;

        #[test]
        fn test_transitions() {
            let mut injector = BehaviorInjector::new();
            injector.enable_failure_mode();
            assert_eq!(injector.overrides().credentials, CredentialMode::Failure);
            injector.disable_failure_mode();
            assert_eq!(injector.overrides().credentials, CredentialMode::Passthrough);

            injector.deny_permissions();
            assert_eq!(injector.overrides().camera, CameraMode::PermissionDenied);
            injector.grant_permissions();
            assert_eq!(injector.overrides().camera, CameraMode::Synthetic);

            injector.interrupt_network();
            assert!(injector.overrides().network.blocks("/api/x"));
            injector.restore_network();
            assert_eq!(injector.overrides().network, NetworkMode::Online);

            injector.update(|o| o.indicator = false);
            injector.reset();
            assert_eq!(injector.overrides(), &RuntimeOverrides::default());
        }

        #[tokio::test]
        async fn test_apply_counts_installations() {
            let mut driver = MockDriver::new();
            driver.navigate_to_login();
            let mut injector = BehaviorInjector::new();
            assert!(injector.apply(&mut driver).await);
            assert!(injector.apply(&mut driver).await);
            assert_eq!(injector.applications(), 2);
            assert!(driver.was_called("apply_overrides"));
        }

        #[tokio::test]
        async fn test_apply_failure_is_swallowed() {
            let mut driver = MockDriver::new();
            driver.fail_injection(true);
            let mut injector = BehaviorInjector::new();
            assert!(!injector.apply(&mut driver).await);
            assert_eq!(injector.applications(), 0);
        }
    }
}
