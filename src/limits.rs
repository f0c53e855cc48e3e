use crate::error::EngineError;
use crate::position::Ownership;
use crate::state::{CalculationState, FinancialYear};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Shares of one holding must sum to 1 within this tolerance
pub const OWNERSHIP_TOLERANCE: Decimal = dec!(0.0001);

/// Hard limits on inputs and intermediate values. Exceeding a bound always
/// aborts the run; values are never clamped back into range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityBounds {
    #[serde(default = "default_max_money")]
    pub max_money: Decimal,
    #[serde(default = "default_max_horizon")]
    pub max_horizon_years: u32,
    #[serde(default = "default_max_age")]
    pub max_age: i32,
    #[serde(default = "default_max_rate")]
    pub max_rate: Decimal,
}

fn default_max_money() -> Decimal {
    dec!(1_000_000_000)
}

fn default_max_horizon() -> u32 {
    60
}

fn default_max_age() -> i32 {
    120
}

fn default_max_rate() -> Decimal {
    Decimal::ONE
}

impl Default for SanityBounds {
    fn default() -> Self {
        SanityBounds {
            max_money: default_max_money(),
            max_horizon_years: default_max_horizon(),
            max_age: default_max_age(),
            max_rate: default_max_rate(),
        }
    }
}

impl SanityBounds {
    /// Monetary values may not exceed the cap in either direction
    pub fn check_money(&self, what: &str, value: Decimal) -> Result<(), EngineError> {
        if value.abs() > self.max_money {
            return Err(EngineError::SanityBoundExceeded {
                what: what.to_string(),
                value,
                limit: self.max_money,
            });
        }
        Ok(())
    }

    /// Rates may not exceed 100% in magnitude
    pub fn check_rate(&self, what: &str, value: Decimal) -> Result<(), EngineError> {
        if value.abs() > self.max_rate {
            return Err(EngineError::SanityBoundExceeded {
                what: what.to_string(),
                value,
                limit: self.max_rate,
            });
        }
        Ok(())
    }

    pub fn check_horizon(&self, years: u32) -> Result<(), EngineError> {
        if years > self.max_horizon_years {
            return Err(EngineError::SanityBoundExceeded {
                what: "projection horizon".to_string(),
                value: Decimal::from(years),
                limit: Decimal::from(self.max_horizon_years),
            });
        }
        Ok(())
    }

    pub fn check_age(&self, what: &str, age: i32) -> Result<(), EngineError> {
        if age > self.max_age {
            return Err(EngineError::SanityBoundExceeded {
                what: what.to_string(),
                value: Decimal::from(age),
                limit: Decimal::from(self.max_age),
            });
        }
        Ok(())
    }
}

/// A single validation finding, locating the offending input
#[derive(Debug, Clone, PartialEq)]
pub struct InputIssue {
    pub subject: String,
    pub error: EngineError,
}

impl InputIssue {
    fn new(subject: impl Into<String>, error: EngineError) -> Self {
        InputIssue {
            subject: subject.into(),
            error,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Check a state against the bounds, failing on the first issue found.
pub fn validate_state(state: &CalculationState, bounds: &SanityBounds) -> Result<(), EngineError> {
    match scan_state(state, bounds).into_iter().next() {
        Some(issue) => Err(issue.error),
        None => Ok(()),
    }
}

/// Collect every input problem in a state. Order is deterministic: global
/// context, persons, assets, loans, disposals, then cashflows.
pub fn scan_state(state: &CalculationState, bounds: &SanityBounds) -> Vec<InputIssue> {
    let mut issues = Vec::new();

    check_global(state, bounds, &mut issues);
    check_entities(state, bounds, &mut issues);
    check_positions(state, bounds, &mut issues);
    check_cashflows(state, bounds, &mut issues);

    issues
}

fn check_global(state: &CalculationState, bounds: &SanityBounds, issues: &mut Vec<InputIssue>) {
    let global = &state.global;
    let derived = FinancialYear::from_date(global.effective_date);
    if derived != global.financial_year {
        issues.push(InputIssue::new(
            "global",
            EngineError::ScenarioInput(format!(
                "effective date {} falls in {}, not {}",
                global.effective_date, derived, global.financial_year
            )),
        ));
    }

    let rates = [
        ("cpi_rate", global.assumptions.cpi_rate),
        ("wage_growth_rate", global.assumptions.wage_growth_rate),
        ("property_growth_rate", global.assumptions.property_growth_rate),
        (
            "investment_return_rate",
            global.assumptions.investment_return_rate,
        ),
        ("cash_return_rate", global.assumptions.cash_return_rate),
        ("super_return_rate", global.assumptions.super_return_rate),
    ];
    for (name, rate) in rates {
        if let Err(err) = bounds.check_rate(&format!("assumptions {name}"), rate) {
            issues.push(InputIssue::new("assumptions", err));
        }
    }
    if global.assumptions.retirement_expense_multiple < Decimal::ZERO {
        issues.push(InputIssue::new(
            "assumptions",
            EngineError::ScenarioInput("retirement expense multiple is negative".to_string()),
        ));
    }
}

fn check_entities(state: &CalculationState, bounds: &SanityBounds, issues: &mut Vec<InputIssue>) {
    let today = state.current_date();

    for (id, person) in &state.entities.persons {
        let subject = format!("person {id}");
        let age = person.age_on(today);
        if age < 0 {
            issues.push(InputIssue::new(
                &subject,
                EngineError::ScenarioInput(format!(
                    "{id} is born after the effective date ({})",
                    person.date_of_birth
                )),
            ));
        } else if let Err(err) = bounds.check_age(&format!("age of {id}"), age) {
            issues.push(InputIssue::new(&subject, err));
        }
    }

    for (id, company) in &state.entities.companies {
        let subject = format!("company {id}");
        for (name, value) in [
            ("aggregated_turnover", company.aggregated_turnover),
            ("taxable_income", company.taxable_income),
        ] {
            if let Err(err) = bounds.check_money(&format!("company {id} {name}"), value) {
                issues.push(InputIssue::new(&subject, err));
            }
        }
    }

    for (id, trust) in &state.entities.trusts {
        if let Err(err) = bounds.check_money(&format!("trust {id} net_income"), trust.net_income) {
            issues.push(InputIssue::new(format!("trust {id}"), err));
        }
    }

    for (id, fund) in &state.entities.funds {
        for member in &fund.members {
            if !state.entities.persons.contains_key(member) {
                issues.push(InputIssue::new(
                    format!("fund {id}"),
                    EngineError::ScenarioInput(format!("fund member {member} is not a person")),
                ));
            }
        }
    }
}

fn check_positions(state: &CalculationState, bounds: &SanityBounds, issues: &mut Vec<InputIssue>) {
    for (id, asset) in &state.positions.assets {
        let subject = format!("asset {id}");
        for (name, value) in [
            ("value", asset.value),
            ("cost_base", asset.cost_base),
            ("weekly_rent", asset.weekly_rent),
            ("annual_costs", asset.annual_costs),
        ] {
            if value < Decimal::ZERO {
                issues.push(InputIssue::new(
                    &subject,
                    EngineError::ScenarioInput(format!("asset {id} {name} is negative")),
                ));
            } else if let Err(err) = bounds.check_money(&format!("asset {id} {name}"), value) {
                issues.push(InputIssue::new(&subject, err));
            }
        }
        check_owners(state, bounds, &subject, &asset.owners, issues);
    }

    for (id, loan) in &state.positions.loans {
        let subject = format!("loan {id}");
        for (name, value) in [
            ("principal", loan.principal),
            ("annual_repayment", loan.annual_repayment),
        ] {
            if value < Decimal::ZERO {
                issues.push(InputIssue::new(
                    &subject,
                    EngineError::ScenarioInput(format!("loan {id} {name} is negative")),
                ));
            } else if let Err(err) = bounds.check_money(&format!("loan {id} {name}"), value) {
                issues.push(InputIssue::new(&subject, err));
            }
        }
        if loan.annual_interest_rate < Decimal::ZERO {
            issues.push(InputIssue::new(
                &subject,
                EngineError::ScenarioInput(format!("loan {id} interest rate is negative")),
            ));
        } else if let Err(err) =
            bounds.check_rate(&format!("loan {id} interest rate"), loan.annual_interest_rate)
        {
            issues.push(InputIssue::new(&subject, err));
        }
        if let Some(secured) = &loan.secured_asset_id {
            if !state.positions.assets.contains_key(secured) {
                issues.push(InputIssue::new(
                    &subject,
                    EngineError::ScenarioInput(format!(
                        "loan {id} is secured by unknown asset {secured}"
                    )),
                ));
            }
        }
        check_owners(state, bounds, &subject, &loan.owners, issues);
    }

    for (index, disposal) in state.positions.disposals.iter().enumerate() {
        let subject = format!("disposal {index}");
        if !state.positions.assets.contains_key(&disposal.asset_id) {
            issues.push(InputIssue::new(
                &subject,
                EngineError::ScenarioInput(format!(
                    "disposal references unknown asset {}",
                    disposal.asset_id
                )),
            ));
        }
        for (name, value) in [
            ("proceeds", disposal.proceeds),
            ("incidental_costs", disposal.incidental_costs),
        ] {
            if value < Decimal::ZERO {
                issues.push(InputIssue::new(
                    &subject,
                    EngineError::ScenarioInput(format!("disposal {name} is negative")),
                ));
            } else if let Err(err) = bounds.check_money(&format!("disposal {name}"), value) {
                issues.push(InputIssue::new(&subject, err));
            }
        }
        if let Err(err) = bounds.check_horizon(disposal.year_index) {
            issues.push(InputIssue::new(&subject, err));
        }
    }
}

fn check_owners(
    state: &CalculationState,
    bounds: &SanityBounds,
    subject: &str,
    owners: &[Ownership],
    issues: &mut Vec<InputIssue>,
) {
    let mut total = Decimal::ZERO;
    for owner in owners {
        if !state.entities.contains(&owner.entity_id) {
            issues.push(InputIssue::new(
                subject,
                EngineError::UnknownEntity(owner.entity_id.clone()),
            ));
        }
        if owner.share < Decimal::ZERO {
            issues.push(InputIssue::new(
                subject,
                EngineError::ScenarioInput(format!(
                    "ownership share for {} is negative",
                    owner.entity_id
                )),
            ));
        } else if let Err(err) = bounds.check_rate(
            &format!("{subject} share of {}", owner.entity_id),
            owner.share,
        ) {
            issues.push(InputIssue::new(subject, err));
        }
        total += owner.share;
    }

    if owners.is_empty() {
        issues.push(InputIssue::new(
            subject,
            EngineError::ScenarioInput(format!("{subject} has no owners")),
        ));
    } else if (total - Decimal::ONE).abs() > OWNERSHIP_TOLERANCE {
        issues.push(InputIssue::new(
            subject,
            EngineError::ScenarioInput(format!(
                "{subject} ownership shares sum to {total}, expected 1"
            )),
        ));
    }
}

fn check_cashflows(state: &CalculationState, bounds: &SanityBounds, issues: &mut Vec<InputIssue>) {
    for (id, cashflow) in &state.cashflows.entities {
        let subject = format!("cashflow {id}");
        if !state.entities.contains(id) {
            issues.push(InputIssue::new(
                &subject,
                EngineError::UnknownEntity(id.clone()),
            ));
        }

        let amounts = [
            ("salary_gross", cashflow.income.salary_gross),
            ("rental_gross", cashflow.income.rental_gross),
            ("dividends", cashflow.income.dividends),
            ("interest", cashflow.income.interest),
            ("other income", cashflow.income.other),
            ("work_related deductions", cashflow.deductions.work_related),
            (
                "investment_costs deductions",
                cashflow.deductions.investment_costs,
            ),
            ("other deductions", cashflow.deductions.other),
            ("employer_sg", cashflow.contributions.employer_sg),
            ("salary_sacrifice", cashflow.contributions.salary_sacrifice),
            (
                "personal_deductible",
                cashflow.contributions.personal_deductible,
            ),
            (
                "personal_non_concessional",
                cashflow.contributions.personal_non_concessional,
            ),
            ("payg_withheld", cashflow.payg_withheld),
        ];
        for (name, value) in amounts {
            if value < Decimal::ZERO {
                issues.push(InputIssue::new(
                    &subject,
                    EngineError::ScenarioInput(format!("{name} for {id} is negative")),
                ));
            } else if let Err(err) = bounds.check_money(&format!("{name} for {id}"), value) {
                issues.push(InputIssue::new(&subject, err));
            }
        }
    }

    if state.cashflows.living_expenses < Decimal::ZERO {
        issues.push(InputIssue::new(
            "cashflow",
            EngineError::ScenarioInput("living expenses are negative".to_string()),
        ));
    } else if let Err(err) = bounds.check_money("living expenses", state.cashflows.living_expenses)
    {
        issues.push(InputIssue::new("cashflow", err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_cap_is_inclusive() {
        let bounds = SanityBounds::default();
        assert!(bounds.check_money("salary", dec!(1_000_000_000)).is_ok());
        assert!(bounds.check_money("salary", dec!(-1_000_000_000)).is_ok());

        let err = bounds
            .check_money("salary", dec!(1_000_000_001))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::SanityBoundExceeded {
                what: "salary".to_string(),
                value: dec!(1_000_000_001),
                limit: dec!(1_000_000_000),
            }
        );
    }

    #[test]
    fn horizon_cap_is_inclusive() {
        let bounds = SanityBounds::default();
        assert!(bounds.check_horizon(60).is_ok());
        assert!(bounds.check_horizon(61).is_err());
    }

    #[test]
    fn rate_cap_is_inclusive() {
        let bounds = SanityBounds::default();
        assert!(bounds.check_rate("cpi", dec!(1)).is_ok());
        assert!(bounds.check_rate("cpi", dec!(-0.02)).is_ok());
        assert!(bounds.check_rate("cpi", dec!(1.01)).is_err());
    }

    #[test]
    fn age_cap_is_inclusive() {
        let bounds = SanityBounds::default();
        assert!(bounds.check_age("age", 120).is_ok());
        assert!(bounds.check_age("age", 121).is_err());
    }
}
