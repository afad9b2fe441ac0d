//! Session bootstrap: launch options and the Chromium launcher.

use super::Launcher;
use crate::error::HarvestError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Flags that suppress the most visible automation fingerprints.
pub const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-gpu",
];

/// chromiumoxide's default switches without `--enable-automation`. They are
/// passed explicitly because the library defaults are disabled at launch.
pub const BASELINE_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--enable-features=NetworkService,NetworkServiceInProcess",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-component-extensions-with-background-pages",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-features=TranslateUI",
    "--disable-hang-monitor",
    "--disable-ipc-flooding-protection",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-renderer-backgrounding",
    "--disable-sync",
    "--force-color-profile=srgb",
    "--metrics-recording-only",
    "--no-first-run",
    "--password-store=basic",
    "--use-mock-keychain",
    "--enable-blink-features=IdleDetection",
    "--lang=en_US",
];

/// Every switch Chromium is started with, baseline first, without repeats.
pub fn launch_args() -> Vec<&'static str> {
    let mut args: Vec<&'static str> = Vec::with_capacity(BASELINE_ARGS.len() + STEALTH_ARGS.len());
    for arg in BASELINE_ARGS.iter().chain(STEALTH_ARGS) {
        if !args.contains(arg) {
            args.push(*arg);
        }
    }
    args
}

/// Browser launch settings (`[browser]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run without a visible window
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Chrome/Chromium executable; discovered when unset
    pub executable: Option<PathBuf>,
    /// Bounded wait for element resolution when a call site gives none
    pub implicit_wait_ms: u64,
    /// Interval between element checks while waiting
    pub poll_interval_ms: u64,
    /// Timeout for individual CDP requests
    pub request_timeout_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            executable: None,
            implicit_wait_ms: 5_000,
            poll_interval_ms: 250,
            request_timeout_ms: 30_000,
        }
    }
}

impl BrowserOptions {
    pub fn implicit_wait(&self) -> Duration {
        Duration::from_millis(self.implicit_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Launches a local Chromium over CDP.
pub struct ChromiumLauncher {
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    options: BrowserOptions,
}

impl ChromiumLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl Launcher for ChromiumLauncher {
    type Driver = super::CdpDriver;

    async fn launch(&self) -> Result<Self::Driver, HarvestError> {
        super::CdpDriver::launch(&self.options).await
    }
}

/// Stand-in driver type when browser support is compiled out.
#[cfg(not(feature = "browser"))]
pub enum Unavailable {}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl super::Driver for Unavailable {
    async fn goto(&self, _url: &str) -> Result<(), crate::error::DriverError> {
        match *self {}
    }
    async fn current_url(&self) -> Result<String, crate::error::DriverError> {
        match *self {}
    }
    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, crate::error::DriverError> {
        match *self {}
    }
    async fn check(
        &self,
        _locator: &crate::locator::Locator,
        _condition: crate::locator::Condition,
    ) -> Result<bool, crate::error::DriverError> {
        match *self {}
    }
    async fn click(&self, _locator: &crate::locator::Locator) -> Result<(), crate::error::DriverError> {
        match *self {}
    }
    async fn fill(
        &self,
        _locator: &crate::locator::Locator,
        _text: &str,
    ) -> Result<(), crate::error::DriverError> {
        match *self {}
    }
    async fn text(
        &self,
        _locator: &crate::locator::Locator,
    ) -> Result<Option<String>, crate::error::DriverError> {
        match *self {}
    }
    async fn type_into_page(&self, _keys: &str) -> Result<(), crate::error::DriverError> {
        match *self {}
    }
    async fn release(&self) -> Result<(), crate::error::DriverError> {
        match *self {}
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl Launcher for ChromiumLauncher {
    type Driver = Unavailable;

    async fn launch(&self) -> Result<Self::Driver, HarvestError> {
        Err(HarvestError::SessionStart(
            "browser automation requires the 'browser' feature. \
             Build with: cargo build --features browser"
                .to_string(),
        ))
    }
}

/// Find a Chrome/Chromium executable on `PATH` or in well-known locations.
pub fn find_chrome() -> Option<PathBuf> {
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_desktop_viewport() {
        let options = BrowserOptions::default();
        assert!(options.headless);
        assert_eq!((options.window_width, options.window_height), (1920, 1080));
        assert_eq!(options.implicit_wait(), Duration::from_secs(5));
    }

    #[test]
    fn poll_interval_has_floor() {
        let options = BrowserOptions {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(options.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn launch_args_never_enable_automation() {
        let args = launch_args();
        assert!(!args.iter().any(|a| a.contains("enable-automation")));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled"));
        assert!(args.contains(&"--disable-dev-shm-usage"));
        assert_eq!(args.iter().filter(|a| **a == "--no-first-run").count(), 1);
    }
}
