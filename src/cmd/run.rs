//! Run command - execute one calculation against a scenario's first year

use crate::cmd::{load_rules, read_scenario};
use crate::entity::EntityId;
use crate::projection::run_calculation;
use crate::registry::{CalcId, Registry};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Scenario file (JSON). Reads from stdin if not specified.
    #[arg(default_value = "-")]
    scenario: PathBuf,

    /// Calculation to run (e.g. CAL-PIT-001)
    #[arg(long = "cal-id")]
    cal_id: String,

    /// Entity the calculation applies to
    #[arg(long)]
    entity: String,

    /// Projection year index the calculation reads (0 = first year)
    #[arg(long, default_value_t = 0)]
    year: u32,

    /// Directory of rule files to use instead of the built-in set
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl RunCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let scenario = read_scenario(&self.scenario)?;
        let rules = load_rules(self.rules_dir.as_deref())?;
        let registry = Registry::standard();
        let state = scenario.into_state();

        let cal_id = CalcId::new(self.cal_id.as_str());
        let entity_id = EntityId::new(self.entity.as_str());
        let result = run_calculation(&registry, &rules, &state, &cal_id, &entity_id, self.year)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            let unit = registry.resolve(&cal_id)?;
            println!();
            println!("{} ({}) for {}", result.cal_id, unit.description(), result.entity_id);
            println!();
            println!("  value:        {}", result.value);
            println!("  rule version: {}", result.trace.rule_version);
            println!("  severity:     {}", result.trace.severity);
            println!();
            println!("  {}", result.trace.explanation);
        }
        Ok(())
    }
}
