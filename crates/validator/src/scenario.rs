//! Declarative YAML scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::action::{Action, ActionKind};
use crate::error::{ValidatorError, ValidatorResult};

/// An ordered, named list of actions replayed on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Actions to execute in order
    pub actions: Vec<Action>,
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> ValidatorResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ValidatorError::ScenarioParse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> ValidatorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            ValidatorError::ScenarioParse(reason) => {
                ValidatorError::ScenarioParse(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Load all scenarios from a directory, ordered by name
    pub fn load_all(dir: &Path) -> ValidatorResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Reject actions that cannot possibly run
    pub fn validate(&self) -> ValidatorResult<()> {
        if self.name.trim().is_empty() {
            return Err(ValidatorError::ScenarioParse(
                "scenario name must not be empty".to_string(),
            ));
        }

        for (i, action) in self.actions.iter().enumerate() {
            let problem = match &action.kind {
                ActionKind::Navigate { target }
                | ActionKind::Click { target }
                | ActionKind::Fill { target, .. }
                | ActionKind::Submit { target }
                | ActionKind::Evaluate { target }
                | ActionKind::Smart { target, .. }
                    if target.trim().is_empty() =>
                {
                    Some("target must not be empty")
                }
                ActionKind::Wait {
                    target: None,
                    value: None,
                } => Some("wait needs a locator or a duration"),
                _ if action.timeout_ms == 0 => Some("timeout_ms must be positive"),
                _ => None,
            };
            if let Some(problem) = problem {
                return Err(ValidatorError::ScenarioParse(format!(
                    "{} step {} ({}): {}",
                    self.name,
                    i + 1,
                    action.kind.name(),
                    problem
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = r#"
name: login-flow
description: Sign in and land on the dashboard
tags:
  - auth
  - smoke
actions:
  - kind: navigate
    target: /login
    wait_for: 'form#login'
  - kind: fill
    target: '#username'
    value: alice
  - kind: fill
    target: '#password'
    value: secret
  - kind: submit
    target: '#password'
  - kind: capture
    value: dashboard
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_yaml(LOGIN).unwrap();
        assert_eq!(scenario.name, "login-flow");
        assert_eq!(scenario.actions.len(), 5);
        assert_eq!(scenario.actions[0].kind.name(), "navigate");
    }

    #[test]
    fn test_rejects_empty_target() {
        let yaml = "name: broken\nactions:\n  - kind: click\n    target: ''\n";
        assert!(matches!(
            Scenario::from_yaml(yaml),
            Err(ValidatorError::ScenarioParse(_))
        ));
    }

    #[test]
    fn test_rejects_wait_without_condition() {
        let yaml = "name: broken\nactions:\n  - kind: wait\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("login.yaml"), LOGIN).unwrap();
        std::fs::write(
            dir.path().join("home.yml"),
            "name: home\ntags: [smoke]\nactions:\n  - kind: navigate\n    target: /\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["home", "login-flow"]);

        assert_eq!(Scenario::filter_by_tag(&scenarios, "smoke").len(), 2);
        assert_eq!(Scenario::filter_by_tag(&scenarios, "auth").len(), 1);
    }

    #[test]
    fn test_malformed_file_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("login.yaml"), LOGIN).unwrap();
        std::fs::write(dir.path().join("checkout.yaml"), "name: checkout\nactions: [\n").unwrap();

        let err = Scenario::load_all(dir.path()).unwrap_err();
        assert!(matches!(err, ValidatorError::ScenarioParse(_)));
        assert!(err.to_string().contains("checkout.yaml"));
    }
}
