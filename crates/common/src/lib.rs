//! Fidelity Common Library
//!
//! Shared data model for the fidelity validator: page-state snapshots,
//! classified discrepancies, and the status vocabularies used by the
//! validation components and the unified verdict.

pub mod types;

pub use types::*;

/// Fidelity validator version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
