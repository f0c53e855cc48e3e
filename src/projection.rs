//! Multi-year projection orchestration: plans, year advancement, summary
//! figures and the single-calculation facade.

use crate::entity::EntityId;
use crate::error::{EngineError, ProjectionError};
use crate::limits::{validate_state, SanityBounds};
use crate::position::AssetKind;
use crate::registry::{CalcId, CalcUnit, Registry};
use crate::rules::RuleStore;
use crate::state::{
    CalculationState, EconomicAssumptions, FinancialYear, Intermediates, OutputField,
};
use crate::trace::{TraceEntry, TraceLog};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Horizon applied when neither the scenario nor the caller names one
pub const DEFAULT_HORIZON_YEARS: u32 = 30;

/// One unit invocation against one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub cal_id: CalcId,
    pub entity_id: EntityId,
}

/// The ordered list of steps executed for every projected year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        ExecutionPlan { steps }
    }

    /// The default plan: for each person, in id order, every personal unit
    /// in catalogue order, plus the pension drawdown when the person holds
    /// pension-phase super; then company tax for each company.
    pub fn standard(state: &CalculationState) -> Self {
        const PERSON_UNITS: [CalcUnit; 12] = [
            CalcUnit::PitBaseTax,
            CalcUnit::PitMedicareLevy,
            CalcUnit::PitOffsets,
            CalcUnit::PitNetTax,
            CalcUnit::CgtRawGain,
            CalcUnit::CgtDiscountedGain,
            CalcUnit::SupConcessional,
            CalcUnit::SupCapUsage,
            CalcUnit::SupContributionsTax,
            CalcUnit::SupDivision293,
            CalcUnit::SupNetContribution,
            CalcUnit::PflNegativeGearing,
        ];

        let mut steps = Vec::new();
        for id in state.entities.persons.keys() {
            for unit in PERSON_UNITS {
                steps.push(PlanStep {
                    cal_id: unit.cal_id(),
                    entity_id: id.clone(),
                });
            }
            let pension = state.positions.balance_of_kind(id, AssetKind::SuperPension);
            if pension > Decimal::ZERO {
                steps.push(PlanStep {
                    cal_id: CalcUnit::RetPensionMinimum.cal_id(),
                    entity_id: id.clone(),
                });
            }
        }
        for id in state.entities.companies.keys() {
            steps.push(PlanStep {
                cal_id: CalcUnit::CtxCompanyTax.cal_id(),
                entity_id: id.clone(),
            });
        }
        ExecutionPlan { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Headline figures derived after a year's units have run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub net_wealth: Decimal,
    pub tax_paid: Decimal,
    pub surplus: Decimal,
    /// Super balances against the target multiple of living expenses,
    /// capped at 1
    pub retirement_adequacy: Decimal,
}

/// Frozen copy of one projected year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSnapshot {
    pub year_index: u32,
    pub financial_year: FinancialYear,
    pub summary: YearSummary,
    pub state: CalculationState,
}

/// The complete result of a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub scenario_id: String,
    pub years: Vec<YearSnapshot>,
    pub trace: TraceLog,
}

impl ProjectionOutput {
    pub fn summaries(&self) -> impl Iterator<Item = (FinancialYear, &YearSummary)> {
        self.years.iter().map(|y| (y.financial_year, &y.summary))
    }

    pub fn final_year(&self) -> Option<&YearSnapshot> {
        self.years.last()
    }
}

/// Result of a single unit invocation outside a projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub cal_id: CalcId,
    pub entity_id: EntityId,
    pub year_index: u32,
    pub value: Decimal,
    pub trace: TraceEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Initialized,
    Running,
    Complete,
    Failed,
}

/// Drives an execution plan across the projection horizon
pub struct Projector<'a> {
    registry: &'a Registry,
    rules: &'a RuleStore,
    bounds: SanityBounds,
}

impl<'a> Projector<'a> {
    pub fn new(registry: &'a Registry, rules: &'a RuleStore) -> Self {
        Projector {
            registry,
            rules,
            bounds: SanityBounds::default(),
        }
    }

    pub fn with_bounds(registry: &'a Registry, rules: &'a RuleStore, bounds: SanityBounds) -> Self {
        Projector {
            registry,
            rules,
            bounds,
        }
    }

    /// Run the plan over years 0..=horizon. Validation failures abort
    /// before year 0; a unit failure aborts the whole run.
    pub fn run(
        &self,
        state: &CalculationState,
        plan: &ExecutionPlan,
        horizon_years: u32,
    ) -> Result<ProjectionOutput, ProjectionError> {
        let scenario_id = &state.global.scenario_id;
        let mut status = RunStatus::Initialized;
        log::debug!("projection {scenario_id}: {status:?}");

        self.bounds
            .check_horizon(horizon_years)
            .map_err(ProjectionError::Setup)?;
        validate_state(state, &self.bounds).map_err(ProjectionError::Setup)?;
        self.registry
            .validate_plan(plan, state)
            .map_err(ProjectionError::Setup)?;

        status = RunStatus::Running;
        log::debug!(
            "projection {scenario_id}: {status:?}, {} steps over {} years",
            plan.len(),
            horizon_years + 1
        );

        match self.run_years(state, plan, horizon_years) {
            Ok(output) => {
                status = RunStatus::Complete;
                log::debug!("projection {scenario_id}: {status:?}");
                Ok(output)
            }
            Err(err) => {
                status = RunStatus::Failed;
                log::debug!("projection {scenario_id}: {status:?} ({err})");
                Err(err)
            }
        }
    }

    fn run_years(
        &self,
        initial: &CalculationState,
        plan: &ExecutionPlan,
        horizon_years: u32,
    ) -> Result<ProjectionOutput, ProjectionError> {
        let mut working = initial.clone();
        let mut trace = TraceLog::new();
        let mut years = Vec::with_capacity(horizon_years as usize + 1);

        for year_index in 0..=horizon_years {
            working.intermediates = Intermediates::default();

            for step in &plan.steps {
                let (field, value, entry) = self
                    .run_step(&working, step, year_index)
                    .map_err(|source| ProjectionError::Calculation {
                        cal_id: step.cal_id.clone(),
                        entity_id: step.entity_id.clone(),
                        year_index,
                        source,
                    })?;
                working.intermediates.record(&step.entity_id, field, value);
                trace.append(entry);
            }

            let summary = summarize(&working);
            years.push(YearSnapshot {
                year_index,
                financial_year: working.global.financial_year,
                summary,
                state: working.clone(),
            });

            if year_index < horizon_years {
                advance_year(&mut working);
            }
        }

        Ok(ProjectionOutput {
            scenario_id: initial.global.scenario_id.clone(),
            years,
            trace,
        })
    }

    fn run_step(
        &self,
        working: &CalculationState,
        step: &PlanStep,
        year_index: u32,
    ) -> Result<(OutputField, Decimal, TraceEntry), EngineError> {
        let unit = self.registry.resolve(&step.cal_id)?;
        let rule_set = self
            .rules
            .resolve(unit.rule_domain(), working.global.effective_date)?;
        let (value, entry) = unit.execute(working, &step.entity_id, year_index, rule_set)?;
        let field = unit.output_field();
        self.bounds.check_money(field.as_str(), value)?;
        Ok((field, value, entry))
    }
}

/// Headline figures for the year just calculated. Personal tax is taken
/// before withholding and floored at zero per person; refunds do not
/// offset another entity's tax.
fn summarize(state: &CalculationState) -> YearSummary {
    let mut tax_paid = Decimal::ZERO;
    for id in state.entities.persons.keys() {
        let get = |field| state.intermediates.get(id, field).unwrap_or_default();
        let personal = (get(OutputField::BaseTax) + get(OutputField::MedicareLevy)
            - get(OutputField::TaxOffsets))
        .max(Decimal::ZERO);
        tax_paid += personal
            + get(OutputField::ContributionsTax)
            + get(OutputField::Division293Tax);
    }
    for id in state.entities.companies.keys() {
        tax_paid += state
            .intermediates
            .get(id, OutputField::CompanyTax)
            .unwrap_or_default();
    }

    let surplus = state.cashflows.household_income() - state.cashflows.living_expenses - tax_paid;

    let target =
        state.global.assumptions.retirement_expense_multiple * state.cashflows.living_expenses;
    let retirement_adequacy = if target > Decimal::ZERO {
        (state.total_super_balance() / target)
            .min(Decimal::ONE)
            .round_dp(2)
    } else {
        Decimal::ZERO
    };

    YearSummary {
        net_wealth: state.net_wealth(),
        tax_paid,
        surplus,
        retirement_adequacy,
    }
}

fn grow(value: Decimal, rate: Decimal) -> Decimal {
    (value * (Decimal::ONE + rate)).round_dp(2)
}

fn growth_rate(kind: AssetKind, assumptions: &EconomicAssumptions) -> Decimal {
    match kind {
        AssetKind::Cash => assumptions.cash_return_rate,
        AssetKind::Portfolio => assumptions.investment_return_rate,
        AssetKind::Property => assumptions.property_growth_rate,
        AssetKind::SuperAccumulation | AssetKind::SuperPension => assumptions.super_return_rate,
    }
}

/// Move the state one year forward: index flows, grow balances, fold the
/// year's net super contributions in, amortize loans and step the clock.
fn advance_year(state: &mut CalculationState) {
    let assumptions = state.global.assumptions.clone();

    for (id, person) in &state.entities.persons {
        if !person.is_working() {
            continue;
        }
        if let Some(cashflow) = state.cashflows.entities.get_mut(id) {
            cashflow.income.salary_gross =
                grow(cashflow.income.salary_gross, assumptions.wage_growth_rate);
        }
    }

    state.cashflows.living_expenses = grow(state.cashflows.living_expenses, assumptions.cpi_rate);
    for cashflow in state.cashflows.entities.values_mut() {
        cashflow.income.rental_gross = grow(cashflow.income.rental_gross, assumptions.cpi_rate);
    }

    for asset in state.positions.assets.values_mut() {
        asset.value = grow(asset.value, growth_rate(asset.kind, &assumptions));
        asset.weekly_rent = grow(asset.weekly_rent, assumptions.cpi_rate);
        asset.annual_costs = grow(asset.annual_costs, assumptions.cpi_rate);
    }

    // This year's net contributions land in each person's first
    // accumulation asset. Ordering over asset ids keeps it deterministic.
    let person_ids: Vec<EntityId> = state.entities.persons.keys().cloned().collect();
    for id in person_ids {
        let Some(net) = state.intermediates.get(&id, OutputField::NetContribution) else {
            continue;
        };
        if net.is_zero() {
            continue;
        }
        let target = state
            .positions
            .assets
            .iter()
            .find(|(_, a)| a.kind == AssetKind::SuperAccumulation && !a.share_of(&id).is_zero())
            .map(|(asset_id, _)| asset_id.clone());
        match target {
            Some(asset_id) => {
                if let Some(asset) = state.positions.assets.get_mut(&asset_id) {
                    asset.value = (asset.value + net).round_dp(2);
                    log::debug!("{id}: {net} contribution added to {asset_id}");
                }
            }
            None => log::debug!("{id}: no accumulation asset, {net} contribution not applied"),
        }
    }

    for loan in state.positions.loans.values_mut() {
        if loan.interest_only {
            continue;
        }
        let principal_component =
            (loan.annual_repayment - loan.annual_interest()).max(Decimal::ZERO);
        loan.principal = (loan.principal - principal_component)
            .max(Decimal::ZERO)
            .round_dp(2);
    }

    state.global.financial_year = state.global.financial_year.next();
    let current = state.global.effective_date;
    state.global.effective_date = current.with_year(current.year() + 1).unwrap_or_else(|| {
        // 29 February has no anniversary next year
        NaiveDate::from_ymd_opt(current.year() + 1, 3, 1).unwrap()
    });
    log::debug!(
        "advanced to {} ({})",
        state.global.financial_year,
        state.global.effective_date
    );
}

/// Execute one registered unit against a state without mutating it
pub fn run_calculation(
    registry: &Registry,
    rules: &RuleStore,
    state: &CalculationState,
    cal_id: &CalcId,
    entity_id: &EntityId,
    year_index: u32,
) -> Result<CalculationResult, EngineError> {
    let unit = registry.resolve(cal_id)?;
    if !state.entities.contains(entity_id) {
        return Err(EngineError::UnknownEntity(entity_id.clone()));
    }
    let rule_set = rules.resolve(unit.rule_domain(), state.global.effective_date)?;
    let (value, trace) = unit.execute(state, entity_id, year_index, rule_set)?;
    Ok(CalculationResult {
        cal_id: cal_id.clone(),
        entity_id: entity_id.clone(),
        year_index,
        value,
        trace,
    })
}

/// Project a state with default bounds
pub fn run_projection(
    registry: &Registry,
    rules: &RuleStore,
    state: &CalculationState,
    plan: &ExecutionPlan,
    horizon_years: u32,
) -> Result<ProjectionOutput, ProjectionError> {
    Projector::new(registry, rules).run(state, plan, horizon_years)
}
