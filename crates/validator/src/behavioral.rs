//! Behavioral validation
//!
//! Runs the same scenario against a source and a target URL concurrently,
//! compares what each side ended up showing, and turns the differences into a
//! scored component result.

use chrono::{DateTime, Utc};
use fidelity_common::{ComponentStatus, Discrepancy, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::action::{Action, ActionResult};
use crate::comparator::compare_page_states;
use crate::config::EngineConfig;
use crate::driver::{BrowserDriver, IntelligentTask, LaunchOptions};
use crate::engine::{Exploration, ExplorationEngine};
use crate::scorer::ComponentResult;

const CRITICAL_PENALTY: f64 = 0.25;
const WARNING_PENALTY: f64 = 0.10;
const INFO_PENALTY: f64 = 0.02;

/// Similarity in [0, 1] derived from discrepancy counts
pub fn similarity_score(discrepancies: &[Discrepancy]) -> f64 {
    let penalty: f64 = discrepancies
        .iter()
        .map(|d| match d.severity {
            Severity::Critical => CRITICAL_PENALTY,
            Severity::Warning => WARNING_PENALTY,
            Severity::Info => INFO_PENALTY,
        })
        .sum();
    (1.0 - penalty).max(0.0)
}

/// Everything produced by one behavioral validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralReport {
    pub source: Exploration,
    pub target: Exploration,
    pub discrepancies: Vec<Discrepancy>,
    pub similarity: f64,
    pub status: ComponentStatus,
    /// Seconds
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl BehavioralReport {
    /// The scorer's view of this report
    pub fn to_component(&self) -> ComponentResult {
        ComponentResult::new(self.similarity, self.status.clone())
            .with_discrepancies(self.discrepancies.clone())
            .with_summary(format!(
                "{} source / {} target action(s), {} discrepancies",
                self.source.results().len(),
                self.target.results().len(),
                self.discrepancies.len()
            ))
    }
}

/// Drives source and target through the same actions
pub struct BehavioralValidator {
    driver: Arc<dyn BrowserDriver>,
    launch: LaunchOptions,
    engine: EngineConfig,
    intelligent: Option<Arc<dyn IntelligentTask>>,
}

impl BehavioralValidator {
    pub fn new(driver: Arc<dyn BrowserDriver>, launch: LaunchOptions, engine: EngineConfig) -> Self {
        Self {
            driver,
            launch,
            engine,
            intelligent: None,
        }
    }

    pub fn with_intelligent(mut self, intelligent: Arc<dyn IntelligentTask>) -> Self {
        self.intelligent = Some(intelligent);
        self
    }

    fn engine(&self) -> ExplorationEngine {
        let engine = ExplorationEngine::new(
            Arc::clone(&self.driver),
            self.launch.clone(),
            self.engine.clone(),
        );
        match &self.intelligent {
            Some(intelligent) => engine.with_intelligent(Arc::clone(intelligent)),
            None => engine,
        }
    }

    /// Run `actions` against both URLs and compare the outcome
    pub async fn validate(
        &self,
        source_url: &str,
        target_url: &str,
        actions: &[Action],
    ) -> BehavioralReport {
        let start = Instant::now();
        info!(
            "Behavioral validation: {} vs {} ({} action(s))",
            source_url,
            target_url,
            actions.len()
        );

        let mut source_engine = self.engine();
        let mut target_engine = self.engine();
        let (source, target) = tokio::join!(
            source_engine.explore(source_url, actions, side_metadata("source")),
            target_engine.explore(target_url, actions, side_metadata("target")),
        );

        let discrepancies = collect_discrepancies(&source, &target);
        let similarity = similarity_score(&discrepancies);
        let status = component_status(&source, &target, &discrepancies);

        info!(
            "Behavioral similarity {:.3} -> {} ({} discrepancies)",
            similarity,
            status,
            discrepancies.len()
        );

        BehavioralReport {
            source,
            target,
            discrepancies,
            similarity,
            status,
            execution_time: start.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }
}

fn side_metadata(side: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("side".to_string(), side.to_string())])
}

fn collect_discrepancies(source: &Exploration, target: &Exploration) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    for (side, exploration) in [("source", source), ("target", target)] {
        if let Some(reason) = &exploration.session_error {
            discrepancies.push(
                Discrepancy::critical(
                    "session_error",
                    format!("The {} session could not be started: {}", side, reason),
                )
                .with_recommendation(format!("Check that {} is reachable", exploration.url)),
            );
        }
    }
    if !discrepancies.is_empty() {
        return discrepancies;
    }

    discrepancies.extend(compare_outcomes(source.results(), target.results()));
    discrepancies.extend(compare_page_states(&source.page_state, &target.page_state));
    discrepancies
}

fn compare_outcomes(source: &[ActionResult], target: &[ActionResult]) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    for (i, (src, tgt)) in source.iter().zip(target).enumerate() {
        let action = &src.action;
        match (src.success, tgt.success) {
            (true, false) => {
                let severity = if action.is_critical() {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                let mut discrepancy = Discrepancy::new(
                    "action_outcome_mismatch",
                    severity,
                    format!(
                        "Step {} ({}) succeeded on source but failed on target: {}",
                        i + 1,
                        action,
                        tgt.error_message.as_deref().unwrap_or("unknown error")
                    ),
                )
                .with_recommendation("Reproduce the step on the target and fix the failing interaction");
                if let Some(url) = &src.url {
                    discrepancy = discrepancy.with_source_element(url.clone());
                }
                if let Some(url) = &tgt.url {
                    discrepancy = discrepancy.with_target_element(url.clone());
                }
                discrepancies.push(discrepancy);
            }
            (false, true) => discrepancies.push(Discrepancy::info(
                "action_outcome_mismatch",
                format!(
                    "Step {} ({}) failed on source but succeeded on target",
                    i + 1,
                    action
                ),
            )),
            _ => {}
        }
    }

    if source.len() != target.len() {
        discrepancies.push(
            Discrepancy::critical(
                "scenario_length_mismatch",
                format!(
                    "Source completed {} step(s), target completed {}",
                    source.len(),
                    target.len()
                ),
            )
            .with_recommendation("A critical step halted one side early; inspect its first failure"),
        );
    }

    discrepancies
}

fn component_status(
    source: &Exploration,
    target: &Exploration,
    discrepancies: &[Discrepancy],
) -> ComponentStatus {
    let session_failed = source.session_error.is_some() || target.session_error.is_some();
    let comparison_failed = discrepancies
        .iter()
        .any(|d| d.discrepancy_type == "comparison_error");

    if session_failed || comparison_failed {
        ComponentStatus::Error
    } else if discrepancies.iter().any(|d| d.severity == Severity::Critical) {
        ComponentStatus::Rejected
    } else if discrepancies.iter().any(|d| d.severity == Severity::Warning) {
        ComponentStatus::ApprovedWithWarnings
    } else {
        ComponentStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_penalties() {
        assert_eq!(similarity_score(&[]), 1.0);

        let mixed = vec![
            Discrepancy::critical("a", "a"),
            Discrepancy::warning("b", "b"),
            Discrepancy::info("c", "c"),
        ];
        assert!((similarity_score(&mixed) - 0.63).abs() < 1e-9);

        let many: Vec<Discrepancy> = (0..5).map(|_| Discrepancy::critical("a", "a")).collect();
        assert_eq!(similarity_score(&many), 0.0);
    }

    #[test]
    fn test_outcome_mismatch_severity_follows_criticality() {
        let ok = |action: Action| ActionResult {
            success: true,
            action,
            result_data: serde_json::Value::Null,
            error_message: None,
            screenshot: None,
            execution_time: 0.1,
            url: None,
            timestamp: Utc::now(),
        };
        let failed = |action: Action| ActionResult {
            success: false,
            error_message: Some("element not found".into()),
            ..ok(action)
        };

        let source = vec![ok(Action::click("#save")), ok(Action::navigate("/done"))];
        let target = vec![failed(Action::click("#save")), failed(Action::navigate("/done"))];

        let found = compare_outcomes(&source, &target);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].severity, Severity::Warning);
        assert_eq!(found[1].severity, Severity::Critical);
        assert!(found[0].description.contains("element not found"));

        let reversed = compare_outcomes(&target[..1], &source[..1]);
        assert_eq!(reversed[0].severity, Severity::Info);
    }
}
