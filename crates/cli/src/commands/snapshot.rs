//! Snapshot Command

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use fidelity_common::PageState;
use fidelity_validator::playwright::PlaywrightDriver;
use fidelity_validator::{ExplorationEngine, ValidatorConfig};

use crate::output::{print_error, print_success, print_value, OutputFormat};

#[derive(Args)]
pub struct SnapshotArgs {
    /// Page to capture
    pub url: String,

    /// Write the page state (JSON) to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory containing node_modules/playwright
    #[arg(long)]
    pub playwright_dir: Option<PathBuf>,
}

pub async fn execute(args: SnapshotArgs, config: ValidatorConfig, format: OutputFormat) -> Result<()> {
    let mut driver = PlaywrightDriver::from_config(&config.browser);
    if let Some(dir) = &args.playwright_dir {
        driver = driver.with_working_dir(dir);
    }
    let mut engine = ExplorationEngine::new(
        Arc::new(driver),
        config.browser.launch_options(),
        config.engine.clone(),
    );

    let exploration = engine.explore(&args.url, &[], BTreeMap::new()).await;
    let state = exploration.page_state;

    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        print_success(&format!("Page state written to {}", path.display()));
    }

    match format {
        OutputFormat::Table => print_summary(&state),
        _ => print_value(&state, format)?,
    }

    if let Some(error) = &state.error {
        print_error(&format!("Capture failed: {}", error));
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(state: &PageState) {
    println!();
    println!("{}  {}", "URL:".bold(), state.url);
    println!("{}  {}", "Title:".bold(), state.title);
    println!(
        "{}  {} form(s), {} input(s), {} button(s), {} link(s)",
        "Metrics:".bold(),
        state.metrics.forms,
        state.metrics.inputs,
        state.metrics.buttons,
        state.metrics.links
    );
    for (i, form) in state.forms.iter().enumerate() {
        println!(
            "   • form {} {} {} ({} element(s))",
            i + 1,
            form.method.as_deref().unwrap_or("get").to_uppercase(),
            form.action.as_deref().unwrap_or("-").cyan(),
            form.elements.len()
        );
    }
    for message in &state.messages {
        println!("   • {}", message.text.yellow());
    }
    println!();
}
