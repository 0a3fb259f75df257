//! Browser automation capabilities consumed by the engine
//!
//! The engine only ever talks to these traits. A concrete implementation
//! backed by Playwright lives in [`crate::playwright`]; tests supply
//! scripted in-memory doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ValidatorResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed to [`BrowserDriver::launch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub kind: BrowserKind,
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            slow_mo_ms: 0,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// What a screenshot should cover and where it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotTarget {
    FullPage { path: PathBuf },
    Element { locator: String, path: PathBuf },
}

impl ScreenshotTarget {
    pub fn path(&self) -> &Path {
        match self {
            ScreenshotTarget::FullPage { path } | ScreenshotTarget::Element { path, .. } => path,
        }
    }
}

/// Launches browser instances
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> ValidatorResult<Box<dyn BrowserHandle>>;
}

/// A running browser
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn new_page(&self) -> ValidatorResult<Box<dyn PageHandle>>;

    async fn close(&self) -> ValidatorResult<()>;
}

/// One page (tab) inside a running browser
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Load `url`, returning the main response status when there is one
    async fn goto(&self, url: &str, timeout: Duration) -> ValidatorResult<Option<u16>>;

    async fn wait_for_locator(&self, locator: &str, timeout: Duration) -> ValidatorResult<()>;

    async fn click(&self, locator: &str, timeout: Duration) -> ValidatorResult<()>;

    async fn fill(&self, locator: &str, value: &str, timeout: Duration) -> ValidatorResult<()>;

    async fn press_enter(&self, locator: &str, timeout: Duration) -> ValidatorResult<()>;

    /// Run `script` in the page and return its JSON-serializable result
    async fn evaluate(&self, script: &str) -> ValidatorResult<serde_json::Value>;

    /// Write a screenshot, returning the path actually written
    async fn screenshot(&self, target: &ScreenshotTarget) -> ValidatorResult<PathBuf>;

    async fn current_url(&self) -> ValidatorResult<String>;

    async fn title(&self) -> ValidatorResult<String>;
}

/// Natural-language interaction capability used by `smart` actions
#[async_trait]
pub trait IntelligentTask: Send + Sync {
    async fn perform(
        &self,
        page: &dyn PageHandle,
        instruction: &str,
    ) -> ValidatorResult<serde_json::Value>;
}
