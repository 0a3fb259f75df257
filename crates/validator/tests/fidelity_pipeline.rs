//! Source vs target validation through to the unified verdict

mod support;

use fidelity_common::{ComponentStatus, Severity, UnifiedStatus, ValidationSource};
use fidelity_validator::config::ScoringConfig;
use fidelity_validator::driver::LaunchOptions;
use fidelity_validator::{Action, BehavioralValidator, ComponentResult, FidelityScorer, Scenario};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use support::{engine_config, page, MockDriver, Site};

const SOURCE: &str = "http://legacy.local/";
const TARGET: &str = "http://modern.local/";

fn validator(driver: &MockDriver, dir: &std::path::Path) -> BehavioralValidator {
    BehavioralValidator::new(
        Arc::new(driver.clone()),
        LaunchOptions::default(),
        engine_config(dir),
    )
}

fn profile_flow() -> Vec<Action> {
    vec![
        Action::navigate("/profile"),
        Action::fill("#name", "Ada"),
        Action::click("#save"),
    ]
}

fn profile_page() -> serde_json::Value {
    page("Profile", &[3], &["Profile saved"], 2, 5)
}

#[tokio::test]
async fn identical_sites_are_approved() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(vec![
        ("legacy.local", Site::new(profile_page())),
        ("modern.local", Site::new(profile_page())),
    ]);

    let report = validator(&driver, dir.path())
        .validate(SOURCE, TARGET, &profile_flow())
        .await;

    assert!(report.discrepancies.is_empty());
    assert_eq!(report.similarity, 1.0);
    assert_eq!(report.status, ComponentStatus::Approved);
    assert_eq!(report.source.results().len(), 3);
    assert_eq!(report.target.results().len(), 3);
    assert_eq!(driver.launched.load(Ordering::SeqCst), 2);
    assert_eq!(driver.closed.load(Ordering::SeqCst), 2);

    let static_result = ComponentResult::new(0.9, "approved");
    let unified = FidelityScorer::default()
        .score(Some(&static_result), Some(&report.to_component()))
        .unwrap();
    assert!((unified.fidelity_score - 0.94).abs() < 1e-9);
    assert_eq!(unified.overall_status, UnifiedStatus::Approved);
}

#[tokio::test]
async fn structural_drift_produces_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(vec![
        ("legacy.local", Site::new(profile_page())),
        ("modern.local", Site::new(page("Profile", &[2], &[], 2, 5))),
    ]);

    let report = validator(&driver, dir.path())
        .validate(SOURCE, TARGET, &profile_flow())
        .await;

    let types: Vec<&str> = report
        .discrepancies
        .iter()
        .map(|d| d.discrepancy_type.as_str())
        .collect();
    assert_eq!(
        types,
        vec!["form_elements_mismatch", "missing_message", "inputs_count_difference"]
    );
    assert!(report.discrepancies.iter().all(|d| d.severity == Severity::Warning));
    assert!((report.similarity - 0.7).abs() < 1e-9);
    assert_eq!(report.status, ComponentStatus::ApprovedWithWarnings);

    let unified = FidelityScorer::default()
        .score(None, Some(&report.to_component()))
        .unwrap();
    assert_eq!(unified.overall_status, UnifiedStatus::ApprovedWithWarnings);
    assert!(unified
        .discrepancies
        .iter()
        .all(|d| d.validation_source == Some(ValidationSource::Behavioral)
            && d.discrepancy_type.starts_with("behavioral_")));
}

#[tokio::test]
async fn broken_target_navigation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(vec![
        ("legacy.local", Site::new(profile_page())),
        ("modern.local", Site::new(profile_page()).broken("/profile")),
    ]);

    let report = validator(&driver, dir.path())
        .validate(SOURCE, TARGET, &profile_flow())
        .await;

    assert_eq!(report.source.results().len(), 3);
    assert_eq!(report.target.results().len(), 1);
    assert_eq!(report.discrepancies[0].discrepancy_type, "action_outcome_mismatch");
    assert_eq!(report.discrepancies[0].severity, Severity::Critical);
    assert!(report
        .discrepancies
        .iter()
        .any(|d| d.discrepancy_type == "scenario_length_mismatch"));
    assert_eq!(report.status, ComponentStatus::Rejected);

    let static_result = ComponentResult::new(0.95, "approved")
        .with_discrepancies(vec![fidelity_common::Discrepancy::warning(
            "style_drift",
            "Button styling differs",
        )]);
    let unified = FidelityScorer::default()
        .score(Some(&static_result), Some(&report.to_component()))
        .unwrap();
    assert_eq!(unified.discrepancies[0].severity, Severity::Critical);
    assert_eq!(
        unified.discrepancies[0].validation_source,
        Some(ValidationSource::Behavioral)
    );
    assert!(unified
        .discrepancies
        .iter()
        .any(|d| d.discrepancy_type == "static_style_drift"));
}

#[tokio::test]
async fn unreachable_target_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new(vec![("legacy.local", Site::new(profile_page()))]);

    let report = validator(&driver, dir.path())
        .validate(SOURCE, TARGET, &profile_flow())
        .await;

    assert!(report.target.session_error.is_some());
    assert_eq!(report.discrepancies.len(), 1);
    assert_eq!(report.discrepancies[0].discrepancy_type, "session_error");
    assert_eq!(report.status, ComponentStatus::Error);

    let static_result = ComponentResult::new(1.0, "approved");
    let unified = FidelityScorer::new(ScoringConfig::default())
        .score(Some(&static_result), Some(&report.to_component()))
        .unwrap();
    assert_eq!(unified.overall_status, UnifiedStatus::Rejected);
}

#[tokio::test]
async fn scenario_file_drives_validation() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = Scenario::from_yaml(
        r#"
name: save-profile
tags: [profile]
actions:
  - kind: navigate
    target: /profile
  - kind: fill
    target: '#name'
    value: Ada
  - kind: submit
    target: '#name'
    wait_for: '.alert'
"#,
    )
    .unwrap();
    let driver = MockDriver::new(vec![
        ("legacy.local", Site::new(profile_page())),
        ("modern.local", Site::new(profile_page()).missing("#name")),
    ]);

    let report = validator(&driver, dir.path())
        .validate(SOURCE, TARGET, &scenario.actions)
        .await;

    let mismatches: Vec<_> = report
        .discrepancies
        .iter()
        .filter(|d| d.discrepancy_type == "action_outcome_mismatch")
        .collect();
    assert_eq!(mismatches.len(), 2);
    assert!(mismatches.iter().all(|d| d.severity == Severity::Warning));
    assert_eq!(report.status, ComponentStatus::ApprovedWithWarnings);
    assert!((report.similarity - 0.8).abs() < 1e-9);
}
