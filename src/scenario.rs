//! The scenario document: everything a projection needs, as one JSON file.

use crate::cashflow::CashflowContext;
use crate::entity::EntityContext;
use crate::position::PositionContext;
use crate::state::{
    CalculationState, EconomicAssumptions, FinancialYear, GlobalContext, Intermediates,
};
use anyhow::Context;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One scenario as supplied by the user. Converts into the engine's
/// working state; validation happens against the state, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    pub scenario_id: String,
    pub financial_year: FinancialYear,
    /// Date rule sets are resolved against in year zero
    pub effective_date: NaiveDate,
    /// Years beyond the first to project; a CLI flag takes precedence
    #[serde(default)]
    pub horizon_years: Option<u32>,
    #[serde(default)]
    pub assumptions: EconomicAssumptions,
    #[serde(default)]
    pub entities: EntityContext,
    #[serde(default)]
    pub positions: PositionContext,
    #[serde(default)]
    pub cashflows: CashflowContext,
}

impl Scenario {
    pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Self> {
        serde_json::from_reader(reader).context("parsing scenario JSON")
    }

    pub fn into_state(self) -> CalculationState {
        CalculationState {
            global: GlobalContext {
                scenario_id: self.scenario_id,
                financial_year: self.financial_year,
                effective_date: self.effective_date,
                assumptions: self.assumptions,
            },
            entities: self.entities,
            positions: self.positions,
            cashflows: self.cashflows,
            intermediates: Intermediates::default(),
        }
    }
}
