//! Core types shared by the validator and its consumers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Discrepancy severity
///
/// Ordering follows urgency: `Critical` sorts before `Warning`, which sorts
/// before `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Breaks functionality
    Critical,
    /// Usability or maintenance impact
    Warning,
    /// Cosmetic or non-functional
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which validation signal produced a discrepancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    Static,
    Behavioral,
}

impl ValidationSource {
    /// Prefix applied to the discrepancy type once merged
    pub fn type_prefix(&self) -> &'static str {
        match self {
            ValidationSource::Static => "static_",
            ValidationSource::Behavioral => "behavioral_",
        }
    }

    /// Label prepended to the discrepancy description once merged
    pub fn label(&self) -> &'static str {
        match self {
            ValidationSource::Static => "[Static Analysis]",
            ValidationSource::Behavioral => "[Behavioral Testing]",
        }
    }
}

impl fmt::Display for ValidationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSource::Static => write!(f, "static"),
            ValidationSource::Behavioral => write!(f, "behavioral"),
        }
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// One classified difference between source and target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    #[serde(rename = "type")]
    pub discrepancy_type: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_source: Option<ValidationSource>,
}

impl Discrepancy {
    pub fn new(
        discrepancy_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            discrepancy_type: discrepancy_type.into(),
            severity,
            description: description.into(),
            source_element: None,
            target_element: None,
            recommendation: None,
            confidence: default_confidence(),
            validation_source: None,
        }
    }

    pub fn critical(discrepancy_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(discrepancy_type, Severity::Critical, description)
    }

    pub fn warning(discrepancy_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(discrepancy_type, Severity::Warning, description)
    }

    pub fn info(discrepancy_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(discrepancy_type, Severity::Info, description)
    }

    pub fn with_elements(
        mut self,
        source_element: impl Into<String>,
        target_element: impl Into<String>,
    ) -> Self {
        self.source_element = Some(source_element.into());
        self.target_element = Some(target_element.into());
        self
    }

    pub fn with_source_element(mut self, element: impl Into<String>) -> Self {
        self.source_element = Some(element.into());
        self
    }

    pub fn with_target_element(mut self, element: impl Into<String>) -> Self {
        self.target_element = Some(element.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    /// Set the confidence, clamped into [0, 1]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Re-type and re-label this discrepancy as coming from `source`
    pub fn attributed_to(mut self, source: ValidationSource) -> Self {
        self.discrepancy_type = format!("{}{}", source.type_prefix(), self.discrepancy_type);
        self.description = format!("{} {}", source.label(), self.description);
        self.validation_source = Some(source);
        self
    }
}

/// A single input-like element inside a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormElement {
    pub tag: String,
    #[serde(default, rename = "type")]
    pub input_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// One form as rendered on the page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormSnapshot {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub elements: Vec<FormElement>,
}

/// Status, alert, or flash message visible on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    #[serde(default)]
    pub class: Option<String>,
}

/// Element counts collected at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMetrics {
    pub forms: usize,
    pub inputs: usize,
    pub buttons: usize,
    pub links: usize,
}

impl PageMetrics {
    /// Metric name and value pairs in a fixed order
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            ("forms", self.forms),
            ("inputs", self.inputs),
            ("buttons", self.buttons),
            ("links", self.links),
        ]
    }
}

/// Structural snapshot of one rendered screen at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub forms: Vec<FormSnapshot>,
    #[serde(default)]
    pub messages: Vec<StatusMessage>,
    #[serde(default)]
    pub metrics: PageMetrics,
    /// Set when the page could not be read; all other fields are then empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageState {
    /// An error-flagged empty snapshot
    pub fn unavailable(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            captured_at: Utc::now(),
            forms: Vec::new(),
            messages: Vec::new(),
            metrics: PageMetrics::default(),
            error: Some(error.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }

    /// Normalized, non-empty message texts
    pub fn message_texts(&self) -> BTreeSet<String> {
        self.messages
            .iter()
            .map(|m| m.text.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Status reported by an individual validation component
///
/// Components report free-form status strings; the well-known ones are
/// parsed into variants (case-insensitively) and anything else is kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentStatus {
    Approved,
    ApprovedWithWarnings,
    Rejected,
    Error,
    Other(String),
}

impl ComponentStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, ComponentStatus::Error)
    }

    /// Whether the status carries a `_with_warnings` suffix
    pub fn has_warnings(&self) -> bool {
        match self {
            ComponentStatus::ApprovedWithWarnings => true,
            ComponentStatus::Other(raw) => raw
                .trim()
                .to_ascii_lowercase()
                .ends_with("_with_warnings"),
            _ => false,
        }
    }
}

impl From<String> for ComponentStatus {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "approved" => ComponentStatus::Approved,
            "approved_with_warnings" => ComponentStatus::ApprovedWithWarnings,
            "rejected" => ComponentStatus::Rejected,
            "error" => ComponentStatus::Error,
            _ => ComponentStatus::Other(raw),
        }
    }
}

impl From<&str> for ComponentStatus {
    fn from(raw: &str) -> Self {
        ComponentStatus::from(raw.to_string())
    }
}

impl From<ComponentStatus> for String {
    fn from(status: ComponentStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Approved => write!(f, "approved"),
            ComponentStatus::ApprovedWithWarnings => write!(f, "approved_with_warnings"),
            ComponentStatus::Rejected => write!(f, "rejected"),
            ComponentStatus::Error => write!(f, "error"),
            ComponentStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Final verdict of a unified fidelity run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedStatus {
    Approved,
    ApprovedWithWarnings,
    Rejected,
}

impl UnifiedStatus {
    pub fn is_rejected(&self) -> bool {
        matches!(self, UnifiedStatus::Rejected)
    }
}

impl fmt::Display for UnifiedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnifiedStatus::Approved => write!(f, "approved"),
            UnifiedStatus::ApprovedWithWarnings => write!(f, "approved_with_warnings"),
            UnifiedStatus::Rejected => write!(f, "rejected"),
        }
    }
}
