use crate::entity::EntityId;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annual gross income flows for one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeFlows {
    #[serde(default)]
    #[schemars(with = "f64")]
    pub salary_gross: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub rental_gross: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub dividends: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub interest: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub other: Decimal,
}

impl IncomeFlows {
    pub fn total(&self) -> Decimal {
        self.salary_gross + self.rental_gross + self.dividends + self.interest + self.other
    }
}

/// Annual deduction flows for one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeductionFlows {
    #[serde(default)]
    #[schemars(with = "f64")]
    pub work_related: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub investment_costs: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub other: Decimal,
}

impl DeductionFlows {
    pub fn total(&self) -> Decimal {
        self.work_related + self.investment_costs + self.other
    }
}

/// Annual super contribution flows for one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContributionFlows {
    #[serde(default)]
    #[schemars(with = "f64")]
    pub employer_sg: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub salary_sacrifice: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub personal_deductible: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub personal_non_concessional: Decimal,
}

impl ContributionFlows {
    /// Contributions taxed inside the fund
    pub fn concessional(&self) -> Decimal {
        self.employer_sg + self.salary_sacrifice + self.personal_deductible
    }

    pub fn total(&self) -> Decimal {
        self.concessional() + self.personal_non_concessional
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityCashflow {
    #[serde(default)]
    pub income: IncomeFlows,
    #[serde(default)]
    pub deductions: DeductionFlows,
    #[serde(default)]
    pub contributions: ContributionFlows,
    /// Tax already withheld from salary during the year
    #[serde(default)]
    #[schemars(with = "f64")]
    pub payg_withheld: Decimal,
}

/// Per-entity flows plus household-level spending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashflowContext {
    #[serde(default)]
    pub entities: BTreeMap<EntityId, EntityCashflow>,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub living_expenses: Decimal,
}

impl CashflowContext {
    pub fn for_entity(&self, entity_id: &EntityId) -> Option<&EntityCashflow> {
        self.entities.get(entity_id)
    }

    /// Gross income across all entities
    pub fn household_income(&self) -> Decimal {
        self.entities.values().map(|cf| cf.income.total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn income_total_sums_all_flows() {
        let income = IncomeFlows {
            salary_gross: dec!(80000),
            rental_gross: dec!(26000),
            dividends: dec!(1200),
            interest: dec!(300),
            other: dec!(500),
        };
        assert_eq!(income.total(), dec!(108000));
    }

    #[test]
    fn concessional_excludes_non_concessional() {
        let contributions = ContributionFlows {
            employer_sg: dec!(9200),
            salary_sacrifice: dec!(5000),
            personal_deductible: dec!(1000),
            personal_non_concessional: dec!(10000),
        };
        assert_eq!(contributions.concessional(), dec!(15200));
        assert_eq!(contributions.total(), dec!(25200));
    }

    #[test]
    fn household_income_sums_entities() {
        let mut cashflows = CashflowContext::default();
        cashflows.entities.insert(
            "alex".into(),
            EntityCashflow {
                income: IncomeFlows {
                    salary_gross: dec!(80000),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        cashflows.entities.insert(
            "sam".into(),
            EntityCashflow {
                income: IncomeFlows {
                    salary_gross: dec!(65000),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        assert_eq!(cashflows.household_income(), dec!(145000));
        assert!(cashflows.for_entity(&"alex".into()).is_some());
        assert!(cashflows.for_entity(&"kit".into()).is_none());
    }
}
