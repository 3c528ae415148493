//! Human and JSON rendering of run results

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tabled::{Table, Tabled};

use cqldeploy_core::domain::{FileReport, RunReport};

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

impl FileRow {
    fn from_report(position: usize, report: &FileReport) -> Self {
        Self {
            position,
            file: report.file.to_string(),
            outcome: report.outcome.to_string(),
            duration: format!("{} ms", report.duration_ms),
        }
    }
}

pub fn print_json(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

pub fn print_report(report: &RunReport, log_file: Option<&Path>, dry_run: bool) {
    let title = if dry_run {
        format!("Dry run for environment '{}'", report.environment)
    } else {
        format!("Deployment to environment '{}'", report.environment)
    };
    println!("{}", title.cyan().bold());
    println!();

    if !report.files.is_empty() {
        let rows: Vec<FileRow> = report
            .files
            .iter()
            .enumerate()
            .map(|(i, r)| FileRow::from_report(i + 1, r))
            .collect();
        println!("{}", Table::new(rows));
        println!();
    }

    println!("  {} {}", "Total:".bold(), report.total);
    println!("  {} {}", "Succeeded:".bold(), report.succeeded.to_string().green());
    if report.failed > 0 {
        println!("  {} {}", "Failed:".bold(), report.failed.to_string().red());
    } else {
        println!("  {} {}", "Failed:".bold(), report.failed);
    }
    if let Some(ms) = report.duration_ms() {
        println!("  {} {} ms", "Elapsed:".bold(), ms);
    }
    if let Some(path) = log_file {
        println!("  {} {}", "Log file:".bold(), path.display());
    }
    println!();

    if report.has_failures() {
        println!(
            "{}",
            format!("✗ {} of {} files failed", report.failed, report.total)
                .red()
                .bold()
        );
    } else if dry_run {
        println!("{}", "✓ All files present and readable".green().bold());
    } else {
        println!("{}", "✓ All files applied successfully".green().bold());
    }
}
