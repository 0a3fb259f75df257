//! Declarative browser actions and their execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::driver::{IntelligentTask, PageHandle, ScreenshotTarget};
use crate::error::{ValidatorError, ValidatorResult};

/// Default per-action timeout
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Slack added on top of a fixed sleep so the hard timeout never cuts it short
const SLEEP_GRACE: Duration = Duration::from_millis(500);

/// Stands in for `fill` values on recorded actions
pub const REDACTED: &str = "***";

fn default_timeout_ms() -> u64 {
    DEFAULT_ACTION_TIMEOUT_MS
}

/// One replayable browser interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,

    /// Hard limit for the action itself, also used for `wait_for`
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Locator awaited after the action succeeds; failure is only logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,
}

/// The closed set of action kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Load a URL, absolute or relative to the session base URL
    Navigate { target: String },

    Click { target: String },

    /// Type `value` into the element at `target`
    Fill { target: String, value: String },

    /// Press Enter on the element at `target`
    Submit { target: String },

    /// Wait for a locator, or sleep `value` milliseconds
    Wait {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        value: Option<u64>,
    },

    /// Screenshot the full page, or only the element at `target`
    Capture {
        #[serde(default)]
        target: Option<String>,
        /// Screenshot name
        #[serde(default)]
        value: Option<String>,
    },

    /// Run `target` as a script in the page
    Evaluate { target: String },

    /// Natural-language instruction, clicking `fallback` (or `target`) if it fails
    Smart {
        target: String,
        #[serde(default)]
        fallback: Option<String>,
    },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Navigate { .. } => "navigate",
            ActionKind::Click { .. } => "click",
            ActionKind::Fill { .. } => "fill",
            ActionKind::Submit { .. } => "submit",
            ActionKind::Wait { .. } => "wait",
            ActionKind::Capture { .. } => "capture",
            ActionKind::Evaluate { .. } => "evaluate",
            ActionKind::Smart { .. } => "smart",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Navigate { target } => write!(f, "navigate:{}", target),
            ActionKind::Click { target } => write!(f, "click:{}", target),
            ActionKind::Fill { target, .. } => write!(f, "fill:{}", target),
            ActionKind::Submit { target } => write!(f, "submit:{}", target),
            ActionKind::Wait { target: Some(locator), .. } => write!(f, "wait:{}", locator),
            ActionKind::Wait { value: Some(ms), .. } => write!(f, "wait:{}ms", ms),
            ActionKind::Wait { .. } => write!(f, "wait"),
            ActionKind::Capture { value: Some(name), .. } => write!(f, "capture:{}", name),
            ActionKind::Capture { .. } => write!(f, "capture"),
            ActionKind::Evaluate { .. } => write!(f, "evaluate"),
            ActionKind::Smart { target, .. } => {
                let preview: String = target.chars().take(40).collect();
                write!(f, "smart:{}", preview)
            }
        }
    }
}

/// Outcome of executing one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action: Action,
    #[serde(default)]
    pub result_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    /// Seconds
    pub execution_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Everything an action needs from the session running it
pub struct ActionContext<'a> {
    pub page: &'a dyn PageHandle,
    pub intelligent: Option<&'a dyn IntelligentTask>,
    pub base_url: Option<&'a Url>,
    pub screenshot_dir: &'a Path,
}

struct Outcome {
    data: Value,
    screenshot: Option<PathBuf>,
}

impl Outcome {
    fn data(data: Value) -> Self {
        Self { data, screenshot: None }
    }
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            description: None,
            wait_for: None,
        }
    }

    pub fn navigate(target: impl Into<String>) -> Self {
        Self::new(ActionKind::Navigate { target: target.into() })
    }

    pub fn click(target: impl Into<String>) -> Self {
        Self::new(ActionKind::Click { target: target.into() })
    }

    pub fn fill(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionKind::Fill {
            target: target.into(),
            value: value.into(),
        })
    }

    pub fn submit(target: impl Into<String>) -> Self {
        Self::new(ActionKind::Submit { target: target.into() })
    }

    pub fn wait_for_locator(locator: impl Into<String>) -> Self {
        Self::new(ActionKind::Wait {
            target: Some(locator.into()),
            value: None,
        })
    }

    pub fn sleep(ms: u64) -> Self {
        Self::new(ActionKind::Wait {
            target: None,
            value: Some(ms),
        })
    }

    pub fn capture(name: impl Into<String>) -> Self {
        Self::new(ActionKind::Capture {
            target: None,
            value: Some(name.into()),
        })
    }

    pub fn evaluate(script: impl Into<String>) -> Self {
        Self::new(ActionKind::Evaluate { target: script.into() })
    }

    pub fn smart(instruction: impl Into<String>) -> Self {
        Self::new(ActionKind::Smart {
            target: instruction.into(),
            fallback: None,
        })
    }

    pub fn smart_with_fallback(
        instruction: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self::new(ActionKind::Smart {
            target: instruction.into(),
            fallback: Some(fallback.into()),
        })
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_wait_for(mut self, locator: impl Into<String>) -> Self {
        self.wait_for = Some(locator.into());
        self
    }

    /// Whether a failure of this action halts the rest of the scenario
    pub fn is_critical(&self) -> bool {
        matches!(self.kind, ActionKind::Navigate { .. } | ActionKind::Smart { .. })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Copy of this action that is safe to record, with any `fill` value masked
    pub fn redacted(&self) -> Action {
        let mut action = self.clone();
        if let ActionKind::Fill { value, .. } = &mut action.kind {
            *value = REDACTED.to_string();
        }
        action
    }

    fn hard_limit(&self) -> Duration {
        match &self.kind {
            ActionKind::Wait {
                target: None,
                value: Some(ms),
            } => Duration::from_millis(self.timeout_ms.max(*ms)) + SLEEP_GRACE,
            // The intelligent attempt and the fallback click get one timeout each
            ActionKind::Smart { .. } => self.timeout() * 2,
            _ => self.timeout(),
        }
    }

    /// Execute against the page in `ctx`
    ///
    /// Never fails: any error, including the hard timeout, is recorded on
    /// the returned result.
    pub async fn execute(&self, ctx: &ActionContext<'_>) -> ActionResult {
        let start = Instant::now();
        debug!("Executing action: {}", self);

        let outcome = match tokio::time::timeout(self.hard_limit(), self.perform(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ValidatorError::Timeout(format!(
                "{} after {} ms",
                self,
                self.hard_limit().as_millis()
            ))),
        };

        if outcome.is_ok() {
            if let Some(locator) = &self.wait_for {
                self.await_post_condition(ctx, locator).await;
            }
        }

        let url = ctx.page.current_url().await.ok();
        let execution_time = start.elapsed().as_secs_f64();

        match outcome {
            Ok(outcome) => {
                debug!("Action succeeded: {} ({:.3}s)", self, execution_time);
                ActionResult {
                    success: true,
                    action: self.redacted(),
                    result_data: outcome.data,
                    error_message: None,
                    screenshot: outcome.screenshot,
                    execution_time,
                    url,
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                warn!("Action failed: {} - {}", self, e);
                ActionResult {
                    success: false,
                    action: self.redacted(),
                    result_data: Value::Null,
                    error_message: Some(e.to_string()),
                    screenshot: None,
                    execution_time,
                    url,
                    timestamp: Utc::now(),
                }
            }
        }
    }

    async fn await_post_condition(&self, ctx: &ActionContext<'_>, locator: &str) {
        let wait = ctx.page.wait_for_locator(locator, self.timeout());
        match tokio::time::timeout(self.timeout(), wait).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("wait_for '{}' after {} failed: {}", locator, self, e),
            Err(_) => warn!(
                "wait_for '{}' after {} timed out after {} ms",
                locator, self, self.timeout_ms
            ),
        }
    }

    async fn perform(&self, ctx: &ActionContext<'_>) -> ValidatorResult<Outcome> {
        let page = ctx.page;
        let timeout = self.timeout();

        match &self.kind {
            ActionKind::Navigate { target } => {
                let url = resolve_target(target, ctx.base_url)?;
                let status = page.goto(&url, timeout).await?;
                Ok(Outcome::data(json!({
                    "requested_url": url,
                    "status": status,
                })))
            }
            ActionKind::Click { target } => {
                page.wait_for_locator(target, timeout).await?;
                page.click(target, timeout).await?;
                Ok(Outcome::data(json!({ "locator": target })))
            }
            ActionKind::Fill { target, value } => {
                page.wait_for_locator(target, timeout).await?;
                page.fill(target, value, timeout).await?;
                Ok(Outcome::data(json!({
                    "locator": target,
                    "value_length": value.chars().count(),
                })))
            }
            ActionKind::Submit { target } => {
                page.wait_for_locator(target, timeout).await?;
                page.press_enter(target, timeout).await?;
                Ok(Outcome::data(json!({ "locator": target, "key": "Enter" })))
            }
            ActionKind::Wait {
                target: Some(locator),
                ..
            } => {
                page.wait_for_locator(locator, timeout).await?;
                Ok(Outcome::data(json!({ "locator": locator })))
            }
            ActionKind::Wait {
                target: None,
                value: Some(ms),
            } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(Outcome::data(json!({ "slept_ms": ms })))
            }
            ActionKind::Wait {
                target: None,
                value: None,
            } => Err(ValidatorError::InvalidAction(
                "wait needs a locator or a duration".to_string(),
            )),
            ActionKind::Capture { target, value } => {
                // The browser may run in another working directory
                let dir = absolute_dir(ctx.screenshot_dir)?;
                tokio::fs::create_dir_all(&dir).await?;
                let name = value
                    .clone()
                    .unwrap_or_else(|| format!("capture-{}", Utc::now().timestamp_millis()));
                let path = dir.join(format!("{}.png", sanitize_file_stem(&name)));
                let shot = match target {
                    Some(locator) => ScreenshotTarget::Element {
                        locator: locator.clone(),
                        path,
                    },
                    None => ScreenshotTarget::FullPage { path },
                };
                let written = page.screenshot(&shot).await?;
                Ok(Outcome {
                    data: json!({
                        "name": name,
                        "full_page": target.is_none(),
                    }),
                    screenshot: Some(written),
                })
            }
            ActionKind::Evaluate { target } => {
                let value = page.evaluate(target).await?;
                Ok(Outcome::data(json!({ "return_value": value })))
            }
            ActionKind::Smart { target, fallback } => {
                let attempt = match ctx.intelligent {
                    Some(agent) => Some(tokio::time::timeout(timeout, agent.perform(page, target)).await),
                    None => None,
                };
                let failure = match attempt {
                    Some(Ok(Ok(value))) => {
                        return Ok(Outcome::data(json!({
                            "mode": "intelligent",
                            "result": value,
                        })))
                    }
                    Some(Ok(Err(e))) => e.to_string(),
                    Some(Err(_)) => format!("timed out after {} ms", self.timeout_ms),
                    None => "no intelligent capability configured".to_string(),
                };

                let locator = fallback.as_deref().unwrap_or(target);
                warn!(
                    "Smart action '{}' unavailable ({}), falling back to click on '{}'",
                    target, failure, locator
                );
                page.wait_for_locator(locator, timeout).await?;
                page.click(locator, timeout).await?;
                Ok(Outcome::data(json!({
                    "mode": "fallback_click",
                    "locator": locator,
                    "intelligent_error": failure,
                })))
            }
        }
    }
}

/// Resolve a navigation target against the session base URL
pub fn resolve_target(target: &str, base: Option<&Url>) -> ValidatorResult<String> {
    match Url::parse(target) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => Ok(base.join(target)?.to_string()),
            None => Err(url::ParseError::RelativeUrlWithoutBase.into()),
        },
        Err(e) => Err(e.into()),
    }
}

fn absolute_dir(dir: &Path) -> ValidatorResult<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
