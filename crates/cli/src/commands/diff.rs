//! Diff Command

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use fidelity_common::PageState;
use fidelity_validator::behavioral::similarity_score;
use fidelity_validator::compare_page_states;

use crate::output::{print_list, print_success, DiscrepancyDisplay, OutputFormat};

#[derive(Args)]
pub struct DiffArgs {
    /// Source page state (JSON, as written by `fidelity snapshot`)
    pub source: PathBuf,

    /// Target page state (JSON)
    pub target: PathBuf,
}

pub async fn execute(args: DiffArgs, format: OutputFormat) -> Result<()> {
    let source = load_state(&args.source)?;
    let target = load_state(&args.target)?;

    let discrepancies = compare_page_states(&source, &target);

    if format == OutputFormat::Table && discrepancies.is_empty() {
        print_success("Page states match");
        return Ok(());
    }

    let rows: Vec<DiscrepancyDisplay> = discrepancies.iter().map(DiscrepancyDisplay).collect();
    print_list(&rows, format)?;
    if format == OutputFormat::Table {
        println!("Similarity: {:.2}", similarity_score(&discrepancies));
    }
    Ok(())
}

fn load_state(path: &Path) -> Result<PageState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a page state document", path.display()))
}
