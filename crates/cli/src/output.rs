//! Output formatting for CLI

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fidelity_common::{Discrepancy, Severity, UnifiedStatus};
use fidelity_validator::UnifiedResult;
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Print a structured value as JSON or YAML
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No items found.");
                return Ok(());
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
            Ok(())
        }
        _ => print_value(items, format),
    }
}

/// Discrepancy display wrapper
#[derive(Serialize)]
pub struct DiscrepancyDisplay<'a>(pub &'a Discrepancy);

impl TableDisplay for DiscrepancyDisplay<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Severity", "Type", "Description", "Source", "Target"]
    }

    fn row(&self) -> Vec<String> {
        let d = self.0;
        vec![
            severity_label(d.severity).to_string(),
            d.discrepancy_type.clone(),
            d.description.clone(),
            d.source_element.clone().unwrap_or_else(|| "-".to_string()),
            d.target_element.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

pub fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::Warning => "WARNING".yellow(),
        Severity::Info => "INFO".cyan(),
    }
}

pub fn status_label(status: UnifiedStatus) -> ColoredString {
    match status {
        UnifiedStatus::Approved => "✅ APPROVED".green().bold(),
        UnifiedStatus::ApprovedWithWarnings => "⚠️  APPROVED WITH WARNINGS".yellow().bold(),
        UnifiedStatus::Rejected => "❌ REJECTED".red().bold(),
    }
}

/// Human-readable unified verdict
pub fn print_unified(result: &UnifiedResult, format: OutputFormat) -> anyhow::Result<()> {
    if format != OutputFormat::Table {
        return print_value(result, format);
    }

    println!();
    println!("{}", "━".repeat(60).dimmed());
    println!("{}", " Fidelity Report".bold());
    println!("{}", "━".repeat(60).dimmed());
    println!();
    println!("   Verdict:  {}", status_label(result.overall_status));
    println!("   Score:    {:.3}", result.fidelity_score);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Component", "Score", "Weight", "Status", "Discrepancies"]);
    let components = [
        ("static", result.components.static_analysis.as_ref()),
        ("behavioral", result.components.behavioral.as_ref()),
    ];
    for (name, breakdown) in components {
        if let Some(b) = breakdown {
            table.add_row(vec![
                name.to_string(),
                format!("{:.3}", b.score),
                format!("{:.2}", b.weight),
                b.status.to_string(),
                b.discrepancy_count.to_string(),
            ]);
        }
    }
    println!();
    println!("{table}");

    println!(
        "   {} critical, {} warning, {} info",
        result.count(Severity::Critical).to_string().red(),
        result.count(Severity::Warning).to_string().yellow(),
        result.count(Severity::Info).to_string().cyan()
    );
    println!();

    let rows: Vec<DiscrepancyDisplay> = result.discrepancies.iter().map(DiscrepancyDisplay).collect();
    if !rows.is_empty() {
        print_list(&rows, format)?;
    }
    Ok(())
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrepancy_row_fills_missing_elements() {
        colored::control::set_override(false);
        let d = Discrepancy::warning("missing_message", "Saved!").with_source_element("Saved!");
        let row = DiscrepancyDisplay(&d).row();
        assert_eq!(row.len(), DiscrepancyDisplay::headers().len());
        assert_eq!(row[0], "WARNING");
        assert_eq!(row[3], "Saved!");
        assert_eq!(row[4], "-");
    }

    #[test]
    fn test_discrepancy_display_serializes_inner_value() {
        let d = Discrepancy::info("title_mismatch", "Title differs");
        let json = serde_json::to_value(DiscrepancyDisplay(&d)).unwrap();
        assert_eq!(json["type"], "title_mismatch");
        assert_eq!(json["severity"], "info");
    }
}
