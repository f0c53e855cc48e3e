use crate::cashflow::CashflowContext;
use crate::entity::{EntityContext, EntityId, Person};
use crate::error::EngineError;
use crate::position::{AssetKind, PositionContext};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Australian financial year (runs 1 July to 30 June).
/// The value is the start calendar year, so 2024 = 2024-25.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// Financial year containing a date
    pub fn from_date(date: NaiveDate) -> Self {
        // 1 July or later falls in the year starting that July
        if date.month() >= 7 {
            FinancialYear(date.year())
        } else {
            FinancialYear(date.year() - 1)
        }
    }

    /// First day of the financial year (1 July)
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 7, 1).unwrap()
    }

    /// Last day of the financial year (30 June)
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 + 1, 6, 30).unwrap()
    }

    pub fn next(&self) -> FinancialYear {
        FinancialYear(self.0 + 1)
    }

    /// Display as "2024-25" format
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.0, (self.0 + 1) % 100)
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Deterministic growth and indexation rates applied between years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EconomicAssumptions {
    #[serde(default)]
    #[schemars(with = "f64")]
    pub cpi_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub wage_growth_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub property_growth_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub investment_return_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub cash_return_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub super_return_rate: Decimal,
    /// Years of spending the retirement adequacy score targets
    #[serde(default = "default_expense_multiple")]
    #[schemars(with = "f64")]
    pub retirement_expense_multiple: Decimal,
}

fn default_expense_multiple() -> Decimal {
    dec!(25)
}

impl Default for EconomicAssumptions {
    fn default() -> Self {
        EconomicAssumptions {
            cpi_rate: Decimal::ZERO,
            wage_growth_rate: Decimal::ZERO,
            property_growth_rate: Decimal::ZERO,
            investment_return_rate: Decimal::ZERO,
            cash_return_rate: Decimal::ZERO,
            super_return_rate: Decimal::ZERO,
            retirement_expense_multiple: default_expense_multiple(),
        }
    }
}

/// Scenario-wide context: identity, timeline and assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GlobalContext {
    pub scenario_id: String,
    pub financial_year: FinancialYear,
    /// Date rule sets are resolved against; advanced one year at a time
    /// during projections
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub assumptions: EconomicAssumptions,
}

/// The single field a calculation unit is allowed to populate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutputField {
    BaseTax,
    MedicareLevy,
    TaxOffsets,
    NetTaxPayable,
    CapitalGain,
    AssessableGain,
    ConcessionalContributions,
    ConcessionalCapUsed,
    ContributionsTax,
    Division293Tax,
    NetContribution,
    NegativeGearingBenefit,
    CompanyTax,
    PensionMinimum,
}

impl OutputField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputField::BaseTax => "base_tax",
            OutputField::MedicareLevy => "medicare_levy",
            OutputField::TaxOffsets => "tax_offsets",
            OutputField::NetTaxPayable => "net_tax_payable",
            OutputField::CapitalGain => "capital_gain",
            OutputField::AssessableGain => "assessable_gain",
            OutputField::ConcessionalContributions => "concessional_contributions",
            OutputField::ConcessionalCapUsed => "concessional_cap_used",
            OutputField::ContributionsTax => "contributions_tax",
            OutputField::Division293Tax => "division_293_tax",
            OutputField::NetContribution => "net_contribution",
            OutputField::NegativeGearingBenefit => "negative_gearing_benefit",
            OutputField::CompanyTax => "company_tax",
            OutputField::PensionMinimum => "pension_minimum",
        }
    }
}

impl fmt::Display for OutputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaxResults {
    #[schemars(with = "Option<f64>")]
    pub base_tax: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub medicare_levy: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub tax_offsets: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub net_tax_payable: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CgtResults {
    #[schemars(with = "Option<f64>")]
    pub capital_gain: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub assessable_gain: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SuperResults {
    #[schemars(with = "Option<f64>")]
    pub concessional_contributions: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub concessional_cap_used: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub contributions_tax: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub division_293_tax: Option<Decimal>,
    #[schemars(with = "Option<f64>")]
    pub net_contribution: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyResults {
    #[schemars(with = "Option<f64>")]
    pub negative_gearing_benefit: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompanyResults {
    #[schemars(with = "Option<f64>")]
    pub company_tax: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetirementResults {
    #[schemars(with = "Option<f64>")]
    pub pension_minimum: Option<Decimal>,
}

/// Per-entity results written during one projected year. Reset at the
/// start of every year; the only write path is `record`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Intermediates {
    #[serde(default)]
    pub tax: BTreeMap<EntityId, TaxResults>,
    #[serde(default)]
    pub cgt: BTreeMap<EntityId, CgtResults>,
    #[serde(default)]
    pub superannuation: BTreeMap<EntityId, SuperResults>,
    #[serde(default)]
    pub property: BTreeMap<EntityId, PropertyResults>,
    #[serde(default)]
    pub company: BTreeMap<EntityId, CompanyResults>,
    #[serde(default)]
    pub retirement: BTreeMap<EntityId, RetirementResults>,
}

impl Intermediates {
    pub fn record(&mut self, entity_id: &EntityId, field: OutputField, value: Decimal) {
        let id = entity_id.clone();
        match field {
            OutputField::BaseTax => self.tax.entry(id).or_default().base_tax = Some(value),
            OutputField::MedicareLevy => {
                self.tax.entry(id).or_default().medicare_levy = Some(value)
            }
            OutputField::TaxOffsets => self.tax.entry(id).or_default().tax_offsets = Some(value),
            OutputField::NetTaxPayable => {
                self.tax.entry(id).or_default().net_tax_payable = Some(value)
            }
            OutputField::CapitalGain => self.cgt.entry(id).or_default().capital_gain = Some(value),
            OutputField::AssessableGain => {
                self.cgt.entry(id).or_default().assessable_gain = Some(value)
            }
            OutputField::ConcessionalContributions => {
                self.superannuation
                    .entry(id)
                    .or_default()
                    .concessional_contributions = Some(value)
            }
            OutputField::ConcessionalCapUsed => {
                self.superannuation
                    .entry(id)
                    .or_default()
                    .concessional_cap_used = Some(value)
            }
            OutputField::ContributionsTax => {
                self.superannuation.entry(id).or_default().contributions_tax = Some(value)
            }
            OutputField::Division293Tax => {
                self.superannuation.entry(id).or_default().division_293_tax = Some(value)
            }
            OutputField::NetContribution => {
                self.superannuation.entry(id).or_default().net_contribution = Some(value)
            }
            OutputField::NegativeGearingBenefit => {
                self.property
                    .entry(id)
                    .or_default()
                    .negative_gearing_benefit = Some(value)
            }
            OutputField::CompanyTax => {
                self.company.entry(id).or_default().company_tax = Some(value)
            }
            OutputField::PensionMinimum => {
                self.retirement.entry(id).or_default().pension_minimum = Some(value)
            }
        }
    }

    pub fn get(&self, entity_id: &EntityId, field: OutputField) -> Option<Decimal> {
        match field {
            OutputField::BaseTax => self.tax.get(entity_id)?.base_tax,
            OutputField::MedicareLevy => self.tax.get(entity_id)?.medicare_levy,
            OutputField::TaxOffsets => self.tax.get(entity_id)?.tax_offsets,
            OutputField::NetTaxPayable => self.tax.get(entity_id)?.net_tax_payable,
            OutputField::CapitalGain => self.cgt.get(entity_id)?.capital_gain,
            OutputField::AssessableGain => self.cgt.get(entity_id)?.assessable_gain,
            OutputField::ConcessionalContributions => {
                self.superannuation.get(entity_id)?.concessional_contributions
            }
            OutputField::ConcessionalCapUsed => {
                self.superannuation.get(entity_id)?.concessional_cap_used
            }
            OutputField::ContributionsTax => self.superannuation.get(entity_id)?.contributions_tax,
            OutputField::Division293Tax => self.superannuation.get(entity_id)?.division_293_tax,
            OutputField::NetContribution => self.superannuation.get(entity_id)?.net_contribution,
            OutputField::NegativeGearingBenefit => {
                self.property.get(entity_id)?.negative_gearing_benefit
            }
            OutputField::CompanyTax => self.company.get(entity_id)?.company_tax,
            OutputField::PensionMinimum => self.retirement.get(entity_id)?.pension_minimum,
        }
    }
}

/// Full input and working state for one scenario year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalculationState {
    pub global: GlobalContext,
    pub entities: EntityContext,
    pub positions: PositionContext,
    pub cashflows: CashflowContext,
    #[serde(default)]
    pub intermediates: Intermediates,
}

impl CalculationState {
    pub fn person(&self, entity_id: &EntityId) -> Result<&Person, EngineError> {
        self.entities
            .persons
            .get(entity_id)
            .ok_or_else(|| EngineError::UnknownEntity(entity_id.clone()))
    }

    /// The date this state is positioned at
    pub fn current_date(&self) -> NaiveDate {
        self.global.effective_date
    }

    /// Age of a person at the state's current date
    pub fn age_of(&self, entity_id: &EntityId) -> Result<i32, EngineError> {
        Ok(self.person(entity_id)?.age_on(self.current_date()))
    }

    /// Household net wealth: all asset values less all loan principals
    pub fn net_wealth(&self) -> Decimal {
        let assets: Decimal = self.positions.assets.values().map(|a| a.value).sum();
        let debts: Decimal = self.positions.loans.values().map(|l| l.principal).sum();
        assets - debts
    }

    /// Combined accumulation and pension balances across the household
    pub fn total_super_balance(&self) -> Decimal {
        self.positions
            .assets
            .values()
            .filter(|a| {
                matches!(
                    a.kind,
                    AssetKind::SuperAccumulation | AssetKind::SuperPension
                )
            })
            .map(|a| a.value)
            .sum()
    }
}
