//! Project command - run every registered calculation over a multi-year horizon

use crate::cmd::{load_rules, read_scenario};
use crate::projection::{ExecutionPlan, ProjectionOutput, Projector, DEFAULT_HORIZON_YEARS};
use crate::registry::Registry;
use crate::trace::Severity;
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs::File;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ProjectCommand {
    /// Scenario file (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    scenario: PathBuf,

    /// Years to project beyond the first (overrides the scenario's value)
    #[arg(long)]
    horizon: Option<u32>,

    /// Directory of rule files to use instead of the built-in set
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Write the full calculation trace to a CSV file
    #[arg(long)]
    trace_csv: Option<PathBuf>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl ProjectCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let scenario = read_scenario(&self.scenario)?;
        let horizon = self
            .horizon
            .or(scenario.horizon_years)
            .unwrap_or(DEFAULT_HORIZON_YEARS);
        let rules = load_rules(self.rules_dir.as_deref())?;
        let registry = Registry::standard();

        let state = scenario.into_state();
        let plan = ExecutionPlan::standard(&state);
        let output = Projector::new(&registry, &rules).run(&state, &plan, horizon)?;

        if let Some(path) = &self.trace_csv {
            let file = File::create(path)?;
            output.trace.write_csv(file)?;
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            self.print_table(&output);
        }
        Ok(())
    }

    fn print_table(&self, output: &ProjectionOutput) {
        println!();
        println!(
            "PROJECTION {} ({} year(s))",
            output.scenario_id,
            output.years.len()
        );
        println!();

        let rows: Vec<YearRow> = output
            .summaries()
            .map(|(financial_year, summary)| YearRow {
                year: financial_year.label(),
                net_wealth: format_money(summary.net_wealth),
                tax_paid: format_money(summary.tax_paid),
                surplus: format_money(summary.surplus),
                adequacy: format_percent(summary.retirement_adequacy),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        let warnings = output
            .trace
            .iter()
            .filter(|e| e.severity != Severity::Info)
            .count();
        if warnings > 0 {
            println!();
            println!(
                "{} trace entr(ies) flagged; run the trace command for details",
                warnings
            );
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct YearRow {
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Net Wealth")]
    net_wealth: String,
    #[tabled(rename = "Tax Paid")]
    tax_paid: String,
    #[tabled(rename = "Surplus")]
    surplus: String,
    #[tabled(rename = "Adequacy")]
    adequacy: String,
}

fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

fn format_percent(value: Decimal) -> String {
    format!("{:.0}%", value * dec!(100))
}
