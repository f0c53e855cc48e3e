//! Trace command - run a projection and query its calculation trace

use crate::cmd::{load_rules, read_scenario};
use crate::entity::EntityId;
use crate::projection::{ExecutionPlan, Projector, DEFAULT_HORIZON_YEARS};
use crate::registry::{CalcId, Registry};
use crate::trace::{TraceCsvRecord, TraceEntry};
use clap::Args;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct TraceCommand {
    /// Scenario file (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    scenario: PathBuf,

    /// Filter by calculation id (e.g. CAL-PIT-001)
    #[arg(long = "cal-id")]
    cal_id: Option<String>,

    /// Filter by entity
    #[arg(long)]
    entity: Option<String>,

    /// Filter by projection year index
    #[arg(long)]
    year: Option<u32>,

    /// Years to project beyond the first (overrides the scenario's value)
    #[arg(long)]
    horizon: Option<u32>,

    /// Directory of rule files to use instead of the built-in set
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

impl TraceCommand {
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

        let cal_filter = self.cal_id.as_deref().map(CalcId::new);
        let entity_filter = self.entity.as_deref().map(EntityId::new);
        let entries: Vec<&TraceEntry> = output
            .trace
            .iter()
            .filter(|e| cal_filter.as_ref().is_none_or(|id| &e.cal_id == id))
            .filter(|e| entity_filter.as_ref().is_none_or(|id| &e.entity_id == id))
            .filter(|e| self.year.is_none_or(|y| e.year_index == y))
            .collect();

        if self.csv {
            self.write_csv(&entries)
        } else {
            self.print_table(&entries);
            Ok(())
        }
    }

    fn write_csv(&self, entries: &[&TraceEntry]) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_writer(io::stdout());
        for entry in entries {
            writer.serialize(TraceCsvRecord::from(*entry))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn print_table(&self, entries: &[&TraceEntry]) {
        if entries.is_empty() {
            println!("No trace entries found matching filters");
            return;
        }

        let rows: Vec<TraceRow> = entries
            .iter()
            .map(|e| TraceRow {
                year: e.year_index.to_string(),
                cal_id: e.cal_id.to_string(),
                entity: e.entity_id.to_string(),
                field: e.field.as_str().to_string(),
                value: format!("{:.2}", e.value),
                severity: e.severity.to_string(),
                explanation: e.explanation.clone(),
            })
            .collect();

        println!();
        println!("CALCULATION TRACE ({} entr(ies))", rows.len());
        println!();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
}

#[derive(Debug, Clone, Tabled)]
struct TraceRow {
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Calc")]
    cal_id: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Explanation")]
    explanation: String,
}
