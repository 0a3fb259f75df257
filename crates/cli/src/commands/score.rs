//! Score Command

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use fidelity_validator::{ComponentResult, FidelityScorer, ValidatorConfig};

use crate::commands::load_component;
use crate::output::{print_unified, OutputFormat};

#[derive(Args)]
pub struct ScoreArgs {
    /// Static-analysis component result (JSON)
    #[arg(long = "static")]
    pub static_result: Option<PathBuf>,

    /// Behavioral component result (JSON)
    #[arg(long)]
    pub behavioral: Option<PathBuf>,

    /// Override the configured static weight
    #[arg(long)]
    pub static_weight: Option<f64>,

    /// Override the configured behavioral weight
    #[arg(long)]
    pub behavioral_weight: Option<f64>,
}

pub async fn execute(args: ScoreArgs, config: ValidatorConfig, format: OutputFormat) -> Result<()> {
    if args.static_result.is_none() && args.behavioral.is_none() {
        bail!("Provide --static, --behavioral, or both");
    }

    let mut scoring = config.scoring;
    if let Some(weight) = args.static_weight {
        scoring.static_weight = weight;
    }
    if let Some(weight) = args.behavioral_weight {
        scoring.behavioral_weight = weight;
    }
    scoring.validate()?;

    let static_result: Option<ComponentResult> =
        args.static_result.as_deref().map(load_component).transpose()?;
    let behavioral: Option<ComponentResult> =
        args.behavioral.as_deref().map(load_component).transpose()?;

    let unified = FidelityScorer::new(scoring).score(static_result.as_ref(), behavioral.as_ref())?;
    print_unified(&unified, format)?;

    if unified.overall_status.is_rejected() {
        std::process::exit(1);
    }
    Ok(())
}
