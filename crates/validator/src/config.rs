//! Validator configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::{BrowserKind, LaunchOptions};
use crate::error::{ValidatorError, ValidatorResult};

/// Validator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Browser launch configuration
    pub browser: BrowserConfig,

    /// Action engine configuration
    pub engine: EngineConfig,

    /// Unified scoring configuration
    pub scoring: ScoringConfig,
}

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser engine to drive
    pub kind: BrowserKind,

    /// Run without a visible window
    pub headless: bool,

    /// Delay Playwright inserts between low-level operations
    pub slow_mo_ms: u64,

    /// Node.js binary used to host the Playwright bridge
    pub node_binary: String,

    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            slow_mo_ms: 0,
            node_binary: "node".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl BrowserConfig {
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            kind: self.kind,
            headless: self.headless,
            slow_mo_ms: self.slow_mo_ms,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
        }
    }
}

/// Action engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for the initial page load and page-state capture
    pub default_timeout_ms: u64,

    /// Pause between consecutive actions
    pub action_delay_ms: u64,

    /// Where `capture` actions write screenshots
    pub screenshot_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            action_delay_ms: 250,
            screenshot_dir: PathBuf::from("validation-results/screenshots"),
        }
    }
}

impl EngineConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }
}

/// Unified scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub static_weight: f64,
    pub behavioral_weight: f64,

    /// Scores at or above this are approved outright
    pub approve_threshold: f64,

    /// Scores below this are rejected
    pub reject_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            static_weight: 0.6,
            behavioral_weight: 0.4,
            approve_threshold: 0.8,
            reject_threshold: 0.6,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> ValidatorResult<()> {
        for (name, weight) in [
            ("static_weight", self.static_weight),
            ("behavioral_weight", self.behavioral_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ValidatorError::InvalidWeights(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.static_weight + self.behavioral_weight <= 0.0 {
            return Err(ValidatorError::InvalidWeights(
                "weights must not sum to zero".to_string(),
            ));
        }

        for (name, threshold) in [
            ("approve_threshold", self.approve_threshold),
            ("reject_threshold", self.reject_threshold),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ValidatorError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, threshold
                )));
            }
        }
        if self.reject_threshold > self.approve_threshold {
            return Err(ValidatorError::InvalidConfig(format!(
                "reject_threshold ({}) exceeds approve_threshold ({})",
                self.reject_threshold, self.approve_threshold
            )));
        }

        Ok(())
    }
}

impl ValidatorConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> ValidatorResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> ValidatorResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ValidatorResult<()> {
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            return Err(ValidatorError::InvalidConfig(
                "viewport dimensions must be non-zero".to_string(),
            ));
        }
        self.scoring.validate()
    }
}
