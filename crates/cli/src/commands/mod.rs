//! CLI Commands

pub mod compare;
pub mod diff;
pub mod init;
pub mod score;
pub mod snapshot;

use anyhow::{Context, Result};
use std::path::Path;

use fidelity_validator::ComponentResult;

/// Read a component result (JSON) produced by another validation stage
pub fn load_component(path: &Path) -> Result<ComponentResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a component result", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidelity_common::{ComponentStatus, Severity};

    #[test]
    fn test_load_component() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static.json");
        std::fs::write(
            &path,
            r#"{
                "score": 0.85,
                "status": "approved_with_warnings",
                "discrepancies": [
                    {"type": "missing_route", "severity": "warning", "description": "No /admin route"}
                ]
            }"#,
        )
        .unwrap();

        let component = load_component(&path).unwrap();
        assert_eq!(component.score, 0.85);
        assert_eq!(component.status, ComponentStatus::ApprovedWithWarnings);
        assert_eq!(component.discrepancies[0].severity, Severity::Warning);
    }

    #[test]
    fn test_load_component_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load_component(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
