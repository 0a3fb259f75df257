//! Compare Command

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use fidelity_validator::playwright::PlaywrightDriver;
use fidelity_validator::{
    BehavioralReport, BehavioralValidator, ComponentResult, FidelityScorer, Scenario,
    UnifiedResult, ValidatorConfig,
};

use crate::commands::load_component;
use crate::output::{print_error, print_unified, print_value, print_warning, OutputFormat};

#[derive(Args)]
pub struct CompareArgs {
    /// URL of the reference (source) application
    #[arg(long)]
    pub source: String,

    /// URL of the migrated (target) application
    #[arg(long)]
    pub target: String,

    /// Scenario file, or a directory of scenario files
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Only run scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Static-analysis component result (JSON) to merge into the verdict
    #[arg(long = "static")]
    pub static_result: Option<PathBuf>,

    /// Write the full report (JSON) to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory containing node_modules/playwright
    #[arg(long)]
    pub playwright_dir: Option<PathBuf>,
}

/// Everything produced for one scenario
#[derive(Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub behavioral: BehavioralReport,
    pub unified: UnifiedResult,
}

pub async fn execute(args: CompareArgs, mut config: ValidatorConfig, format: OutputFormat) -> Result<()> {
    if args.headed {
        config.browser.headless = false;
    }

    let scenarios = load_scenarios(&args)?;
    if scenarios.is_empty() {
        print_warning(&format!("No scenarios found in {}", args.scenario.display()));
        return Ok(());
    }
    debug!("Loaded {} scenario(s) from {}", scenarios.len(), args.scenario.display());

    let static_result: Option<ComponentResult> = args
        .static_result
        .as_deref()
        .map(load_component)
        .transpose()?;

    let mut driver = PlaywrightDriver::from_config(&config.browser);
    if let Some(dir) = &args.playwright_dir {
        driver = driver.with_working_dir(dir);
    }
    let validator = BehavioralValidator::new(
        Arc::new(driver),
        config.browser.launch_options(),
        config.engine.clone(),
    );
    let scorer = FidelityScorer::new(config.scoring.clone());

    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let spinner = spinner(format, &scenario.name);
        let behavioral = validator
            .validate(&args.source, &args.target, &scenario.actions)
            .await;
        spinner.finish_and_clear();
        info!(
            "Scenario '{}' finished with similarity {:.2}",
            scenario.name, behavioral.similarity
        );

        let unified = scorer
            .score(static_result.as_ref(), Some(&behavioral.to_component()))
            .with_context(|| format!("Failed to score scenario '{}'", scenario.name))?;

        if format == OutputFormat::Table {
            println!("Scenario: {}", scenario.name);
            print_unified(&unified, format)?;
        }
        reports.push(ScenarioReport {
            scenario: scenario.name,
            behavioral,
            unified,
        });
    }

    if format != OutputFormat::Table {
        print_value(&reports, format)?;
    }
    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&reports)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    let rejected: Vec<&str> = reports
        .iter()
        .filter(|r| r.unified.overall_status.is_rejected())
        .map(|r| r.scenario.as_str())
        .collect();
    if !rejected.is_empty() {
        print_error(&format!("Rejected: {}", rejected.join(", ")));
        std::process::exit(1);
    }

    Ok(())
}

fn load_scenarios(args: &CompareArgs) -> Result<Vec<Scenario>> {
    let scenarios = if args.scenario.is_dir() {
        Scenario::load_all(&args.scenario)
    } else {
        Scenario::from_file(&args.scenario).map(|s| vec![s])
    }
    .with_context(|| format!("Failed to load scenarios from {}", args.scenario.display()))?;

    Ok(match &args.tag {
        Some(tag) => Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect(),
        None => scenarios,
    })
}

fn spinner(format: OutputFormat, name: &str) -> ProgressBar {
    if format != OutputFormat::Table {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Validating '{}'", name));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
