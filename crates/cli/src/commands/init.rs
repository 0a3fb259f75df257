//! Init Command

use anyhow::{bail, Result};
use clap::Args;
use std::path::Path;

use fidelity_validator::ValidatorConfig;

use crate::output::print_success;

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

pub async fn execute(args: InitArgs, config_path: &Path) -> Result<()> {
    if config_path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    ValidatorConfig::default().save(config_path)?;
    print_success(&format!("Wrote default configuration to {}", config_path.display()));
    Ok(())
}
