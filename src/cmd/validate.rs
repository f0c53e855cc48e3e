//! Validate command - surface scenario input problems without projecting

use crate::cmd::read_scenario;
use crate::limits::{scan_state, SanityBounds};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Scenario file (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    scenario: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    subject: String,
    message: String,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    scenario_id: String,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let scenario = read_scenario(&self.scenario)?;
        let state = scenario.into_state();
        let bounds = SanityBounds::default();

        let issues: Vec<ValidationIssue> = scan_state(&state, &bounds)
            .iter()
            .map(|issue| ValidationIssue {
                subject: issue.subject.clone(),
                message: issue.message(),
            })
            .collect();

        if self.json {
            self.print_json(&state.global.scenario_id, &issues)?;
        } else {
            self.print_text(&state.global.scenario_id, &issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, scenario_id: &str, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS ({})", scenario_id);
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();

            for (i, issue) in issues.iter().enumerate() {
                println!("  {}. [{}]", i + 1, issue.subject);
                println!("     {}", issue.message);
                println!();
            }
        }
    }

    fn print_json(&self, scenario_id: &str, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            scenario_id: scenario_id.to_string(),
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
