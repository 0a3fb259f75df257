//! Fidelity Validator
//!
//! Behavioral comparison and fidelity scoring for migrated web applications:
//! - Replays a declarative action scenario against a source and a target URL
//! - Captures a structural snapshot of each resulting page
//! - Diffs the snapshots into severity-classified discrepancies
//! - Merges behavioral and static-analysis results into one weighted verdict
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     BehavioralValidator                     │
//! │    ├── ExplorationEngine(source) ──┐                        │
//! │    │     └── Action::execute()     ├── tokio::join!         │
//! │    └── ExplorationEngine(target) ──┘                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  compare_page_states(source, target) -> Vec<Discrepancy>    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FidelityScorer::score(static?, behavioral?)                │
//! │    └── UnifiedResult { overall_status, fidelity_score, .. } │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod behavioral;
pub mod capture;
pub mod comparator;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod playwright;
pub mod scenario;
pub mod scorer;

pub use action::{Action, ActionKind, ActionResult};
pub use behavioral::{BehavioralReport, BehavioralValidator};
pub use comparator::compare_page_states;
pub use config::ValidatorConfig;
pub use engine::{Exploration, ExplorationEngine, Session};
pub use error::{ValidatorError, ValidatorResult};
pub use scenario::Scenario;
pub use scorer::{ComponentResult, FidelityScorer, UnifiedResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
