//! The calculation unit catalogue. Units are a closed enum resolved
//! through an ordered id map, so a run can only ever invoke code that is
//! registered, and iteration order is stable.

use crate::domains;
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::rules::{RuleDomain, RuleSet};
use crate::state::{CalculationState, OutputField};
use crate::trace::TraceEntry;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Public identifier of a calculation unit, e.g. CAL-PIT-001
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CalcId(String);

impl CalcId {
    pub fn new(id: impl Into<String>) -> Self {
        CalcId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CalcId {
    fn from(id: &str) -> Self {
        CalcId(id.to_string())
    }
}

/// Every calculation unit the engine knows. Each declares the rule domain
/// it reads and the single output field it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcUnit {
    PitBaseTax,
    PitMedicareLevy,
    PitOffsets,
    PitNetTax,
    CgtRawGain,
    CgtDiscountedGain,
    SupConcessional,
    SupCapUsage,
    SupContributionsTax,
    SupDivision293,
    SupNetContribution,
    PflNegativeGearing,
    CtxCompanyTax,
    RetPensionMinimum,
}

impl CalcUnit {
    /// Catalogue order; plans follow it within each entity
    pub const ALL: [CalcUnit; 14] = [
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
        CalcUnit::CtxCompanyTax,
        CalcUnit::RetPensionMinimum,
    ];

    pub fn id_str(&self) -> &'static str {
        match self {
            CalcUnit::PitBaseTax => "CAL-PIT-001",
            CalcUnit::PitMedicareLevy => "CAL-PIT-002",
            CalcUnit::PitOffsets => "CAL-PIT-004",
            CalcUnit::PitNetTax => "CAL-PIT-005",
            CalcUnit::CgtRawGain => "CAL-CGT-001",
            CalcUnit::CgtDiscountedGain => "CAL-CGT-002",
            CalcUnit::SupConcessional => "CAL-SUP-002",
            CalcUnit::SupCapUsage => "CAL-SUP-003",
            CalcUnit::SupContributionsTax => "CAL-SUP-007",
            CalcUnit::SupDivision293 => "CAL-SUP-008",
            CalcUnit::SupNetContribution => "CAL-SUP-009",
            CalcUnit::PflNegativeGearing => "CAL-PFL-104",
            CalcUnit::CtxCompanyTax => "CAL-CTX-001",
            CalcUnit::RetPensionMinimum => "CAL-RET-001",
        }
    }

    pub fn cal_id(&self) -> CalcId {
        CalcId::from(self.id_str())
    }

    /// The rule domain whose parameters the unit reads. Retirement units
    /// share the superannuation tables.
    pub fn rule_domain(&self) -> RuleDomain {
        match self {
            CalcUnit::PitBaseTax
            | CalcUnit::PitMedicareLevy
            | CalcUnit::PitOffsets
            | CalcUnit::PitNetTax => RuleDomain::PersonalTax,
            CalcUnit::CgtRawGain | CalcUnit::CgtDiscountedGain => RuleDomain::CapitalGains,
            CalcUnit::SupConcessional
            | CalcUnit::SupCapUsage
            | CalcUnit::SupContributionsTax
            | CalcUnit::SupDivision293
            | CalcUnit::SupNetContribution
            | CalcUnit::RetPensionMinimum => RuleDomain::Superannuation,
            CalcUnit::PflNegativeGearing => RuleDomain::Property,
            CalcUnit::CtxCompanyTax => RuleDomain::CompanyTax,
        }
    }

    /// The single intermediate field the unit's value is recorded under
    pub fn output_field(&self) -> OutputField {
        match self {
            CalcUnit::PitBaseTax => OutputField::BaseTax,
            CalcUnit::PitMedicareLevy => OutputField::MedicareLevy,
            CalcUnit::PitOffsets => OutputField::TaxOffsets,
            CalcUnit::PitNetTax => OutputField::NetTaxPayable,
            CalcUnit::CgtRawGain => OutputField::CapitalGain,
            CalcUnit::CgtDiscountedGain => OutputField::AssessableGain,
            CalcUnit::SupConcessional => OutputField::ConcessionalContributions,
            CalcUnit::SupCapUsage => OutputField::ConcessionalCapUsed,
            CalcUnit::SupContributionsTax => OutputField::ContributionsTax,
            CalcUnit::SupDivision293 => OutputField::Division293Tax,
            CalcUnit::SupNetContribution => OutputField::NetContribution,
            CalcUnit::PflNegativeGearing => OutputField::NegativeGearingBenefit,
            CalcUnit::CtxCompanyTax => OutputField::CompanyTax,
            CalcUnit::RetPensionMinimum => OutputField::PensionMinimum,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CalcUnit::PitBaseTax => "progressive base tax",
            CalcUnit::PitMedicareLevy => "Medicare levy",
            CalcUnit::PitOffsets => "low income tax offset",
            CalcUnit::PitNetTax => "net tax payable",
            CalcUnit::CgtRawGain => "raw capital gain",
            CalcUnit::CgtDiscountedGain => "discounted capital gain",
            CalcUnit::SupConcessional => "concessional contributions",
            CalcUnit::SupCapUsage => "concessional cap usage",
            CalcUnit::SupContributionsTax => "contributions tax",
            CalcUnit::SupDivision293 => "Division 293 tax",
            CalcUnit::SupNetContribution => "net super contribution",
            CalcUnit::PflNegativeGearing => "negative gearing benefit",
            CalcUnit::CtxCompanyTax => "company tax payable",
            CalcUnit::RetPensionMinimum => "minimum pension drawdown",
        }
    }

    /// Run the unit against a state. Reads only; the caller records the
    /// value and appends the trace entry.
    pub fn execute(
        &self,
        state: &CalculationState,
        entity_id: &EntityId,
        year_index: u32,
        rules: &RuleSet,
    ) -> Result<(Decimal, TraceEntry), EngineError> {
        let outcome = match self {
            CalcUnit::PitBaseTax => {
                domains::personal_tax::base_tax(state, entity_id, rules.personal_tax()?)?
            }
            CalcUnit::PitMedicareLevy => {
                domains::personal_tax::medicare_levy(state, entity_id, rules.personal_tax()?)?
            }
            CalcUnit::PitOffsets => {
                domains::personal_tax::low_income_offset(state, entity_id, rules.personal_tax()?)?
            }
            CalcUnit::PitNetTax => {
                domains::personal_tax::net_tax_payable(state, entity_id, rules.personal_tax()?)?
            }
            CalcUnit::CgtRawGain => domains::capital_gains::raw_gain(
                state,
                entity_id,
                year_index,
                rules.capital_gains()?,
            )?,
            CalcUnit::CgtDiscountedGain => domains::capital_gains::discounted_gain(
                state,
                entity_id,
                year_index,
                rules.capital_gains()?,
            )?,
            CalcUnit::SupConcessional => domains::superannuation::concessional_total(
                state,
                entity_id,
                rules.superannuation()?,
            )?,
            CalcUnit::SupCapUsage => {
                domains::superannuation::cap_usage(state, entity_id, rules.superannuation()?)?
            }
            CalcUnit::SupContributionsTax => domains::superannuation::contributions_tax(
                state,
                entity_id,
                rules.superannuation()?,
            )?,
            CalcUnit::SupDivision293 => {
                domains::superannuation::division_293(state, entity_id, rules.superannuation()?)?
            }
            CalcUnit::SupNetContribution => domains::superannuation::net_contribution(
                state,
                entity_id,
                rules.superannuation()?,
            )?,
            CalcUnit::PflNegativeGearing => {
                domains::property::negative_gearing(state, entity_id, rules.property()?)?
            }
            CalcUnit::CtxCompanyTax => {
                domains::company_tax::company_tax(state, entity_id, rules.company_tax()?)?
            }
            CalcUnit::RetPensionMinimum => {
                domains::retirement::pension_minimum(state, entity_id, rules.superannuation()?)?
            }
        };

        let entry = TraceEntry {
            cal_id: self.cal_id(),
            entity_id: entity_id.clone(),
            year_index,
            field: self.output_field(),
            value: outcome.value,
            rule_version: rules.version.clone(),
            explanation: outcome.explanation,
            severity: outcome.severity,
        };
        Ok((outcome.value, entry))
    }
}

impl fmt::Display for CalcUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id_str())
    }
}

/// Id-ordered map of registered units
#[derive(Debug, Clone, Default)]
pub struct Registry {
    units: BTreeMap<CalcId, CalcUnit>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry holding the full catalogue
    pub fn standard() -> Self {
        let mut registry = Registry::new();
        for unit in CalcUnit::ALL {
            registry.units.insert(unit.cal_id(), unit);
        }
        registry
    }

    pub fn register(&mut self, unit: CalcUnit) -> Result<(), EngineError> {
        let cal_id = unit.cal_id();
        if self.units.contains_key(&cal_id) {
            return Err(EngineError::DuplicateRegistration(cal_id));
        }
        self.units.insert(cal_id, unit);
        Ok(())
    }

    pub fn resolve(&self, cal_id: &CalcId) -> Result<CalcUnit, EngineError> {
        self.units
            .get(cal_id)
            .copied()
            .ok_or_else(|| EngineError::UnknownCalculationId(cal_id.clone()))
    }

    pub fn contains(&self, cal_id: &CalcId) -> bool {
        self.units.contains_key(cal_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &CalcId> {
        self.units.keys()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Check that every plan step names a registered unit and a known
    /// entity. Runs before any execution so a bad plan fails whole.
    pub fn validate_plan(
        &self,
        plan: &crate::projection::ExecutionPlan,
        state: &CalculationState,
    ) -> Result<(), EngineError> {
        for step in &plan.steps {
            self.resolve(&step.cal_id)?;
            if !state.entities.contains(&step.entity_id) {
                return Err(EngineError::UnknownEntity(step.entity_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{date, person_state, set_salary};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    #[test]
    fn standard_registry_holds_the_full_catalogue() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), CalcUnit::ALL.len());
        for unit in CalcUnit::ALL {
            assert_eq!(registry.resolve(&unit.cal_id()).unwrap(), unit);
        }
    }

    #[test]
    fn ids_and_output_fields_are_unique() {
        let ids: BTreeSet<&str> = CalcUnit::ALL.iter().map(|u| u.id_str()).collect();
        assert_eq!(ids.len(), CalcUnit::ALL.len());

        let fields: BTreeSet<&str> = CalcUnit::ALL
            .iter()
            .map(|u| u.output_field().as_str())
            .collect();
        assert_eq!(fields.len(), CalcUnit::ALL.len());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = Registry::standard();
        let err = registry.register(CalcUnit::PitBaseTax).unwrap_err();
        assert_eq!(err, EngineError::DuplicateRegistration("CAL-PIT-001".into()));
    }

    #[test]
    fn unknown_id_fails_to_resolve() {
        let registry = Registry::standard();
        let err = registry.resolve(&"CAL-XXX-999".into()).unwrap_err();
        assert_eq!(err, EngineError::UnknownCalculationId("CAL-XXX-999".into()));
    }

    #[test]
    fn retirement_units_read_the_superannuation_domain() {
        assert_eq!(
            CalcUnit::RetPensionMinimum.rule_domain(),
            RuleDomain::Superannuation
        );
    }

    #[test]
    fn execute_stamps_the_trace_entry() {
        let mut state = person_state("alex");
        set_salary(&mut state, "alex", dec!(80000));
        let store = crate::rules::RuleStore::builtin().unwrap();
        let rules = store
            .resolve(RuleDomain::PersonalTax, date("2024-07-01"))
            .unwrap();

        let (value, entry) = CalcUnit::PitBaseTax
            .execute(&state, &"alex".into(), 3, rules)
            .unwrap();
        assert_eq!(value, dec!(14788.00));
        assert_eq!(entry.cal_id, CalcId::from("CAL-PIT-001"));
        assert_eq!(entry.year_index, 3);
        assert_eq!(entry.field, OutputField::BaseTax);
        assert_eq!(entry.rule_version, "2024-25");
    }

    #[test]
    fn execute_rejects_mismatched_rule_set() {
        let mut state = person_state("alex");
        set_salary(&mut state, "alex", dec!(80000));
        let store = crate::rules::RuleStore::builtin().unwrap();
        let super_rules = store
            .resolve(RuleDomain::Superannuation, date("2024-07-01"))
            .unwrap();

        let err = CalcUnit::PitBaseTax
            .execute(&state, &"alex".into(), 0, super_rules)
            .unwrap_err();
        assert!(matches!(err, EngineError::RuleDomainMismatch { .. }));
    }
}
