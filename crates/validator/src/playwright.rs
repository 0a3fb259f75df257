//! Playwright browser automation
//!
//! Each launched browser is hosted by its own `node` child process running
//! an embedded bridge script. Requests and replies travel as JSON lines over
//! the child's stdin/stdout and are matched up by id.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::driver::{BrowserDriver, BrowserHandle, LaunchOptions, PageHandle, ScreenshotTarget};
use crate::error::{ValidatorError, ValidatorResult};

/// Node script hosting Playwright on the other end of the pipe
pub const BRIDGE_SCRIPT: &str = include_str!("../scripts/playwright_bridge.js");

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Launches browsers through a Playwright bridge process
#[derive(Debug, Clone)]
pub struct PlaywrightDriver {
    node_binary: String,
    working_dir: Option<PathBuf>,
}

impl PlaywrightDriver {
    pub fn new(node_binary: impl Into<String>) -> Self {
        Self {
            node_binary: node_binary.into(),
            working_dir: None,
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(config.node_binary.clone())
    }

    /// Directory the bridge runs in; `playwright` is resolved from its node_modules
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn launch(&self, options: &LaunchOptions) -> ValidatorResult<Box<dyn BrowserHandle>> {
        let bridge = Bridge::spawn(&self.node_binary, self.working_dir.as_ref())?;

        let params = json!({
            "browser": options.kind.as_str(),
            "headless": options.headless,
            "slow_mo_ms": options.slow_mo_ms,
            "viewport_width": options.viewport_width,
            "viewport_height": options.viewport_height,
        });
        let launched = bridge
            .call("launch", params)
            .await
            .map_err(|e| ValidatorError::BrowserLaunch(e.to_string()))?;

        info!(
            "Launched {} {} (headless: {})",
            options.kind,
            launched.get("version").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            options.headless
        );

        Ok(Box::new(PlaywrightBrowser {
            bridge: Arc::new(bridge),
        }))
    }
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>>;

/// One running bridge process
struct Bridge {
    child: tokio::sync::Mutex<Child>,
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: Pending,
    next_id: AtomicU64,
    tasks: Vec<JoinHandle<()>>,
}

impl Bridge {
    fn spawn(node_binary: &str, working_dir: Option<&PathBuf>) -> ValidatorResult<Self> {
        let mut command = TokioCommand::new(node_binary);
        command
            .arg("-e")
            .arg(BRIDGE_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            ValidatorError::BrowserLaunch(format!("failed to start {}: {}", node_binary, e))
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            ValidatorError::BrowserLaunch("bridge stdin unavailable".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ValidatorError::BrowserLaunch("bridge stdout unavailable".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ValidatorError::BrowserLaunch("bridge stderr unavailable".to_string())
        })?;

        let pending: Pending = Arc::default();
        let tasks = vec![
            tokio::spawn(read_replies(stdout, Arc::clone(&pending))),
            tokio::spawn(forward_stderr(stderr)),
        ];

        debug!("Spawned Playwright bridge (pid {:?})", child.id());

        Ok(Self {
            child: tokio::sync::Mutex::new(child),
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            tasks,
        })
    }

    async fn call(&self, method: &str, params: Value) -> ValidatorResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut line = serde_json::to_string(&BridgeRequest { id, method, params })?;
        line.push('\n');

        let written = async {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            self.pending.lock().remove(&id);
            return Err(e.into());
        }

        let reply = rx.await.map_err(|_| ValidatorError::BridgeClosed)?;
        if reply.ok {
            Ok(reply.result)
        } else {
            Err(ValidatorError::Browser(
                reply
                    .error
                    .unwrap_or_else(|| format!("{} failed without a message", method)),
            ))
        }
    }

    async fn shutdown(&self) -> ValidatorResult<()> {
        let closed = match tokio::time::timeout(SHUTDOWN_GRACE, self.call("close", Value::Null)).await {
            Ok(result) => result,
            Err(_) => Err(ValidatorError::Timeout(format!(
                "browser close after {:?}",
                SHUTDOWN_GRACE
            ))),
        };

        let mut child = self.child.lock().await;
        if let Err(e) = child.start_kill() {
            debug!("Bridge already exited: {}", e);
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright bridge exited with {}", status),
            Ok(Err(e)) => warn!("Failed to reap Playwright bridge: {}", e),
            Err(_) => warn!("Playwright bridge did not exit within {:?}", SHUTDOWN_GRACE),
        }

        closed.map(|_| ())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        let _ = self.child.get_mut().start_kill();
    }
}

async fn read_replies(stdout: ChildStdout, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<BridgeReply>(&line) {
                Ok(reply) => {
                    if let Some(tx) = pending.lock().remove(&reply.id) {
                        let _ = tx.send(reply);
                    } else {
                        debug!("Dropping reply for abandoned request {}", reply.id);
                    }
                }
                Err(_) => debug!("[bridge] {}", line),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read from Playwright bridge: {}", e);
                break;
            }
        }
    }
    // Wake every waiter with BridgeClosed
    pending.lock().clear();
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[bridge stderr] {}", line);
    }
}

fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// A browser hosted by a bridge process
pub struct PlaywrightBrowser {
    bridge: Arc<Bridge>,
}

#[async_trait]
impl BrowserHandle for PlaywrightBrowser {
    async fn new_page(&self) -> ValidatorResult<Box<dyn PageHandle>> {
        let reply = self.bridge.call("new_page", Value::Null).await?;
        let id = reply
            .get("page")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidatorError::Browser(format!("unexpected new_page reply: {}", reply)))?;
        Ok(Box::new(PlaywrightPage {
            bridge: Arc::clone(&self.bridge),
            id: id.to_string(),
        }))
    }

    async fn close(&self) -> ValidatorResult<()> {
        self.bridge.shutdown().await
    }
}

/// A page inside a [`PlaywrightBrowser`]
pub struct PlaywrightPage {
    bridge: Arc<Bridge>,
    id: String,
}

impl PlaywrightPage {
    async fn call(&self, method: &str, mut params: Value) -> ValidatorResult<Value> {
        if let Value::Object(map) = &mut params {
            map.insert("page".to_string(), Value::String(self.id.clone()));
        }
        self.bridge.call(method, params).await
    }

    async fn call_string(&self, method: &str) -> ValidatorResult<String> {
        match self.call(method, json!({})).await? {
            Value::String(s) => Ok(s),
            other => Err(ValidatorError::Browser(format!(
                "unexpected {} reply: {}",
                method, other
            ))),
        }
    }
}

#[async_trait]
impl PageHandle for PlaywrightPage {
    async fn goto(&self, url: &str, timeout: Duration) -> ValidatorResult<Option<u16>> {
        let reply = self
            .call("goto", json!({ "url": url, "timeout_ms": millis(timeout) }))
            .await?;
        Ok(reply
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok()))
    }

    async fn wait_for_locator(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        self.call(
            "wait_for",
            json!({ "locator": locator, "timeout_ms": millis(timeout) }),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        self.call(
            "click",
            json!({ "locator": locator, "timeout_ms": millis(timeout) }),
        )
        .await?;
        Ok(())
    }

    async fn fill(&self, locator: &str, value: &str, timeout: Duration) -> ValidatorResult<()> {
        self.call(
            "fill",
            json!({ "locator": locator, "value": value, "timeout_ms": millis(timeout) }),
        )
        .await?;
        Ok(())
    }

    async fn press_enter(&self, locator: &str, timeout: Duration) -> ValidatorResult<()> {
        self.call(
            "press",
            json!({ "locator": locator, "key": "Enter", "timeout_ms": millis(timeout) }),
        )
        .await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ValidatorResult<Value> {
        self.call("evaluate", json!({ "script": script })).await
    }

    async fn screenshot(&self, target: &ScreenshotTarget) -> ValidatorResult<PathBuf> {
        let params = match target {
            ScreenshotTarget::FullPage { path } => json!({ "path": path.to_string_lossy() }),
            ScreenshotTarget::Element { locator, path } => {
                json!({ "path": path.to_string_lossy(), "locator": locator })
            }
        };
        self.call("screenshot", params).await?;
        Ok(target.path().to_path_buf())
    }

    async fn current_url(&self) -> ValidatorResult<String> {
        self.call_string("url").await
    }

    async fn title(&self) -> ValidatorResult<String> {
        self.call_string("title").await
    }
}
