//! Action execution engine
//!
//! Drives one browser session through an ordered list of actions against a
//! single URL, then captures the resulting page state.

use chrono::{DateTime, Utc};
use fidelity_common::PageState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::action::{Action, ActionContext, ActionResult};
use crate::capture;
use crate::config::EngineConfig;
use crate::driver::{BrowserDriver, BrowserHandle, IntelligentTask, LaunchOptions, PageHandle};
use crate::error::{ValidatorError, ValidatorResult};

/// A finished (or in-progress) run of actions against one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub url: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub actions: Vec<Action>,
    pub results: Vec<ActionResult>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Session {
    fn new(url: &str, metadata: BTreeMap<String, String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            actions: Vec::new(),
            results: Vec::new(),
            metadata,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Session lifecycle
enum SessionState {
    Idle,
    Open {
        session: Session,
        base_url: Url,
        browser: Box<dyn BrowserHandle>,
        page: Box<dyn PageHandle>,
    },
    Closed,
}

/// Everything one side of a comparison produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exploration {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub page_state: PageState,
    /// Set when the browser session could not be initialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_error: Option<String>,
}

impl Exploration {
    pub fn results(&self) -> &[ActionResult] {
        self.session
            .as_ref()
            .map(|s| s.results.as_slice())
            .unwrap_or(&[])
    }
}

/// Drives one automated browser session at a time
pub struct ExplorationEngine {
    driver: Arc<dyn BrowserDriver>,
    launch: LaunchOptions,
    config: EngineConfig,
    intelligent: Option<Arc<dyn IntelligentTask>>,
    state: SessionState,
}

impl ExplorationEngine {
    pub fn new(driver: Arc<dyn BrowserDriver>, launch: LaunchOptions, config: EngineConfig) -> Self {
        Self {
            driver,
            launch,
            config,
            intelligent: None,
            state: SessionState::Idle,
        }
    }

    /// Enable natural-language `smart` actions
    pub fn with_intelligent(mut self, intelligent: Arc<dyn IntelligentTask>) -> Self {
        self.intelligent = Some(intelligent);
        self
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Open { session, .. } => Some(&session.id),
            _ => None,
        }
    }

    /// Launch a browser, open `url`, and start a new session
    pub async fn start(
        &mut self,
        url: &str,
        metadata: BTreeMap<String, String>,
    ) -> ValidatorResult<String> {
        if let SessionState::Open { session, .. } = &self.state {
            return Err(ValidatorError::SessionAlreadyOpen(session.id.clone()));
        }

        let base_url = Url::parse(url)?;
        let browser = self.driver.launch(&self.launch).await?;

        let page = match self.open_page(&*browser, base_url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close browser after startup error: {}", close_err);
                }
                return Err(e);
            }
        };

        let session = Session::new(url, metadata);
        let id = session.id.clone();
        info!("Session {} started for {} ({})", id, url, self.launch.kind);

        self.state = SessionState::Open {
            session,
            base_url,
            browser,
            page,
        };
        Ok(id)
    }

    async fn open_page(
        &self,
        browser: &dyn BrowserHandle,
        url: &str,
    ) -> ValidatorResult<Box<dyn PageHandle>> {
        let page = browser.new_page().await?;
        let timeout = self.config.default_timeout();
        match tokio::time::timeout(timeout, page.goto(url, timeout)).await {
            Ok(Ok(status)) => {
                debug!("Loaded {} (status {:?})", url, status);
                Ok(page)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ValidatorError::Timeout(format!("initial load of {}", url))),
        }
    }

    /// Execute `actions` in order within the open session
    ///
    /// A failed `navigate` or `smart` action halts the remaining actions;
    /// any other failure is recorded and execution continues.
    pub async fn execute_actions(&mut self, actions: &[Action]) -> ValidatorResult<Vec<ActionResult>> {
        let (session, base_url, page) = match &mut self.state {
            SessionState::Open {
                session,
                base_url,
                page,
                ..
            } => (session, base_url, page),
            _ => return Err(ValidatorError::NoSession),
        };

        let ctx = ActionContext {
            page: &**page,
            intelligent: self.intelligent.as_deref(),
            base_url: Some(&*base_url),
            screenshot_dir: &self.config.screenshot_dir,
        };

        let mut results = Vec::with_capacity(actions.len());
        for (i, action) in actions.iter().enumerate() {
            if i > 0 && !self.config.action_delay().is_zero() {
                tokio::time::sleep(self.config.action_delay()).await;
            }

            let result = action.execute(&ctx).await;
            let halt = !result.success && action.is_critical();

            session.actions.push(action.redacted());
            session.results.push(result.clone());
            results.push(result);

            if halt {
                error!(
                    "Critical action {} failed in session {}, skipping {} remaining action(s)",
                    action,
                    session.id,
                    actions.len() - i - 1
                );
                break;
            }
        }

        Ok(results)
    }

    /// Snapshot the current page; never fails
    pub async fn capture_page_state(&self) -> PageState {
        match &self.state {
            SessionState::Open { page, .. } => {
                capture::capture_page_state(&**page, self.config.default_timeout()).await
            }
            _ => PageState::unavailable("", "no open session"),
        }
    }

    /// Close the browser and hand off the finished session
    pub async fn end(&mut self) -> Option<Session> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open {
                mut session,
                browser,
                page,
                ..
            } => {
                drop(page);
                if let Err(e) = browser.close().await {
                    warn!("Failed to close browser for session {}: {}", session.id, e);
                }
                session.ended_at = Some(Utc::now());
                info!(
                    "Session {} ended: {} succeeded, {} failed",
                    session.id,
                    session.succeeded(),
                    session.failed()
                );
                Some(session)
            }
            previous => {
                self.state = previous;
                None
            }
        }
    }

    /// Run a full session: start, execute, capture, end
    ///
    /// Never fails: a session that cannot be initialized yields an
    /// error-flagged empty snapshot and no results.
    pub async fn explore(
        &mut self,
        url: &str,
        actions: &[Action],
        metadata: BTreeMap<String, String>,
    ) -> Exploration {
        if let Err(e) = self.start(url, metadata).await {
            error!("Session for {} failed to start: {}", url, e);
            return Exploration {
                url: url.to_string(),
                session: None,
                page_state: PageState::unavailable(url, e.to_string()),
                session_error: Some(e.to_string()),
            };
        }

        if let Err(e) = self.execute_actions(actions).await {
            warn!("Action execution for {} aborted: {}", url, e);
        }
        let page_state = self.capture_page_state().await;
        let session = self.end().await;

        Exploration {
            url: url.to_string(),
            session,
            page_state,
            session_error: None,
        }
    }
}

impl Drop for ExplorationEngine {
    fn drop(&mut self) {
        if let SessionState::Open { session, .. } = &self.state {
            warn!(
                "Engine dropped with session {} still open, releasing browser",
                session.id
            );
        }
    }
}
