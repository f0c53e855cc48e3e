//! Shared fixtures for unit tests.

use crate::cashflow::EntityCashflow;
use crate::entity::{Person, Residency, WorkStatus};
use crate::rules::{
    CapitalGainsParams, CompanyTaxParams, PersonalTaxParams, PropertyParams, RuleDomain,
    RuleStore, SuperannuationParams,
};
use crate::state::{
    CalculationState, EconomicAssumptions, FinancialYear, GlobalContext, Intermediates,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A minimal 2024-25 state holding one employed resident born 1984-03-15
/// (age 40 at 1 July 2024) with an empty cashflow record
pub(crate) fn person_state(id: &str) -> CalculationState {
    let mut state = CalculationState {
        global: GlobalContext {
            scenario_id: "test".to_string(),
            financial_year: FinancialYear(2024),
            effective_date: date("2024-07-01"),
            assumptions: EconomicAssumptions::default(),
        },
        entities: Default::default(),
        positions: Default::default(),
        cashflows: Default::default(),
        intermediates: Intermediates::default(),
    };
    state.entities.persons.insert(
        id.into(),
        Person {
            name: id.to_string(),
            date_of_birth: date("1984-03-15"),
            residency: Residency::Resident,
            work_status: WorkStatus::Employed,
        },
    );
    state
        .cashflows
        .entities
        .insert(id.into(), EntityCashflow::default());
    state
}

pub(crate) fn set_salary(state: &mut CalculationState, id: &str, salary: Decimal) {
    state
        .cashflows
        .entities
        .entry(id.into())
        .or_default()
        .income
        .salary_gross = salary;
}

fn builtin_2024_25(domain: RuleDomain) -> crate::rules::RuleSet {
    RuleStore::builtin()
        .unwrap()
        .resolve(domain, date("2024-10-01"))
        .unwrap()
        .clone()
}

pub(crate) fn personal_tax_params_2024_25() -> PersonalTaxParams {
    builtin_2024_25(RuleDomain::PersonalTax)
        .personal_tax()
        .unwrap()
        .clone()
}

pub(crate) fn superannuation_params_2024_25() -> SuperannuationParams {
    builtin_2024_25(RuleDomain::Superannuation)
        .superannuation()
        .unwrap()
        .clone()
}

pub(crate) fn capital_gains_params_2024_25() -> CapitalGainsParams {
    builtin_2024_25(RuleDomain::CapitalGains)
        .capital_gains()
        .unwrap()
        .clone()
}

pub(crate) fn property_params_2024_25() -> PropertyParams {
    builtin_2024_25(RuleDomain::Property).property().unwrap().clone()
}

pub(crate) fn company_tax_params_2024_25() -> CompanyTaxParams {
    builtin_2024_25(RuleDomain::CompanyTax)
        .company_tax()
        .unwrap()
        .clone()
}
