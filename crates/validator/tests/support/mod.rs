//! Scripted in-memory browser used by the integration tests
//!
//! Sites are keyed by host, so one driver can serve both the source and the
//! target side of a comparison.

#![allow(dead_code)]

use async_trait::async_trait;
use fidelity_validator::capture::CAPTURE_SCRIPT;
use fidelity_validator::config::EngineConfig;
use fidelity_validator::driver::{
    BrowserDriver, BrowserHandle, IntelligentTask, LaunchOptions, PageHandle, ScreenshotTarget,
};
use fidelity_validator::{ValidatorError, ValidatorResult};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Behavior of one scripted host
#[derive(Debug, Clone, Default)]
pub struct Site {
    /// Value returned for the page-state capture script
    pub capture: Value,
    /// Paths whose navigation fails
    pub broken_paths: HashSet<String>,
    /// Locators that never appear
    pub missing_locators: HashSet<String>,
    /// Locators whose interactions never complete
    pub hanging_locators: HashSet<String>,
    /// Script results for `evaluate`
    pub scripts: HashMap<String, Value>,
    /// Capture script fails
    pub capture_fails: bool,
}

impl Site {
    pub fn new(capture: Value) -> Self {
        Self {
            capture,
            ..Self::default()
        }
    }

    pub fn broken(mut self, path: &str) -> Self {
        self.broken_paths.insert(path.to_string());
        self
    }

    pub fn missing(mut self, locator: &str) -> Self {
        self.missing_locators.insert(locator.to_string());
        self
    }

    pub fn hanging(mut self, locator: &str) -> Self {
        self.hanging_locators.insert(locator.to_string());
        self
    }

    pub fn script(mut self, script: &str, result: Value) -> Self {
        self.scripts.insert(script.to_string(), result);
        self
    }
}

/// Capture-script output for a page with one form per entry of `form_inputs`
pub fn page(title: &str, form_inputs: &[usize], messages: &[&str], buttons: usize, links: usize) -> Value {
    let forms: Vec<Value> = form_inputs
        .iter()
        .map(|&count| {
            let elements: Vec<Value> = (0..count)
                .map(|i| {
                    json!({
                        "tag": "input",
                        "type": "text",
                        "name": format!("field{}", i),
                        "id": null,
                        "required": i == 0,
                    })
                })
                .collect();
            json!({ "action": "/submit", "method": "post", "elements": elements })
        })
        .collect();
    let messages: Vec<Value> = messages
        .iter()
        .map(|text| json!({ "text": text, "class": "alert" }))
        .collect();

    json!({
        "title": title,
        "forms": forms,
        "messages": messages,
        "metrics": {
            "forms": form_inputs.len(),
            "inputs": form_inputs.iter().sum::<usize>(),
            "buttons": buttons,
            "links": links,
        }
    })
}

pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Default)]
pub struct MockDriver {
    sites: Arc<HashMap<String, Site>>,
    pub calls: CallLog,
    pub launched: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl MockDriver {
    pub fn new(sites: Vec<(&str, Site)>) -> Self {
        Self {
            sites: Arc::new(
                sites
                    .into_iter()
                    .map(|(host, site)| (host.to_string(), site))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn launch(&self, _options: &LaunchOptions) -> ValidatorResult<Box<dyn BrowserHandle>> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockBrowser {
            sites: Arc::clone(&self.sites),
            calls: Arc::clone(&self.calls),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct MockBrowser {
    sites: Arc<HashMap<String, Site>>,
    calls: CallLog,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserHandle for MockBrowser {
    async fn new_page(&self) -> ValidatorResult<Box<dyn PageHandle>> {
        Ok(Box::new(MockPage {
            sites: Arc::clone(&self.sites),
            calls: Arc::clone(&self.calls),
            current: Mutex::new(None),
        }))
    }

    async fn close(&self) -> ValidatorResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockPage {
    sites: Arc<HashMap<String, Site>>,
    calls: CallLog,
    current: Mutex<Option<Url>>,
}

impl MockPage {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn site(&self) -> ValidatorResult<Site> {
        let current = self.current.lock().unwrap().clone();
        let url = current.ok_or_else(|| ValidatorError::Browser("page is blank".into()))?;
        let host = url.host_str().unwrap_or_default().to_string();
        self.sites
            .get(&host)
            .cloned()
            .ok_or_else(|| ValidatorError::Browser(format!("net::ERR_NAME_NOT_RESOLVED {}", host)))
    }

    async fn locate(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        let site = self.site()?;
        if site.hanging_locators.contains(locator) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if site.missing_locators.contains(locator) {
            return Err(ValidatorError::Timeout(format!(
                "locator {} after {} ms",
                locator,
                timeout.as_millis()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PageHandle for MockPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> ValidatorResult<Option<u16>> {
        self.record(format!("goto:{}", url));
        let parsed = Url::parse(url)?;
        let host = parsed.host_str().unwrap_or_default().to_string();
        let site = self
            .sites
            .get(&host)
            .ok_or_else(|| ValidatorError::Browser(format!("net::ERR_NAME_NOT_RESOLVED {}", host)))?;
        if site.broken_paths.contains(parsed.path()) {
            return Err(ValidatorError::Browser(format!("net::ERR_ABORTED {}", url)));
        }
        *self.current.lock().unwrap() = Some(parsed);
        Ok(Some(200))
    }

    async fn wait_for_locator(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        self.record(format!("wait_for:{}", locator));
        self.locate(locator, timeout).await
    }

    async fn click(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        self.locate(locator, timeout).await?;
        self.record(format!("click:{}", locator));
        Ok(())
    }

    async fn fill(&self, locator: &str, _value: &str, timeout: Duration) -> ValidatorResult<()> {
        self.locate(locator, timeout).await?;
        self.record(format!("fill:{}", locator));
        Ok(())
    }

    async fn press_enter(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        self.locate(locator, timeout).await?;
        self.record(format!("press_enter:{}", locator));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ValidatorResult<Value> {
        let site = self.site()?;
        if script == CAPTURE_SCRIPT {
            if site.capture_fails {
                return Err(ValidatorError::Browser("Execution context was destroyed".into()));
            }
            return Ok(site.capture.clone());
        }
        self.record(format!("evaluate:{}", script));
        Ok(site.scripts.get(script).cloned().unwrap_or(Value::Null))
    }

    async fn screenshot(&self, target: &ScreenshotTarget) -> ValidatorResult<PathBuf> {
        match target {
            ScreenshotTarget::FullPage { path } => {
                self.record(format!("screenshot:{}", path.display()))
            }
            ScreenshotTarget::Element { locator, path } => {
                self.locate(locator, Duration::from_secs(1)).await?;
                self.record(format!("screenshot[{}]:{}", locator, path.display()))
            }
        }
        Ok(target.path().to_path_buf())
    }

    async fn current_url(&self) -> ValidatorResult<String> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> ValidatorResult<String> {
        let site = self.site()?;
        Ok(site.capture["title"].as_str().unwrap_or_default().to_string())
    }
}

/// Intelligent capability that succeeds with a fixed value, fails, or never answers
pub struct MockIntelligence {
    pub succeed: bool,
    pub hang: bool,
    pub calls: CallLog,
}

impl MockIntelligence {
    pub fn new(succeed: bool) -> Self {
        Self {
            succeed,
            hang: false,
            calls: CallLog::default(),
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(false)
        }
    }
}

#[async_trait]
impl IntelligentTask for MockIntelligence {
    async fn perform(&self, _page: &dyn PageHandle, instruction: &str) -> ValidatorResult<Value> {
        self.calls.lock().unwrap().push(instruction.to_string());
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.succeed {
            Ok(json!({ "performed": instruction }))
        } else {
            Err(ValidatorError::Browser("could not resolve instruction".into()))
        }
    }
}

/// Engine settings with no inter-action delay
pub fn engine_config(screenshot_dir: &Path) -> EngineConfig {
    EngineConfig {
        default_timeout_ms: 2_000,
        action_delay_ms: 0,
        screenshot_dir: screenshot_dir.to_path_buf(),
    }
}
