//! Superannuation contribution units: the concessional total, its cap
//! position, contributions tax, Division 293 and the net amount landing
//! in the fund.

use crate::domains::personal_tax::taxable_income;
use crate::domains::{require_intermediate, require_person, UnitOutcome};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::registry::CalcUnit;
use crate::rules::SuperannuationParams;
use crate::state::{CalculationState, OutputField};
use rust_decimal::Decimal;

/// CAL-SUP-002: total concessional contributions for the year
pub fn concessional_total(
    state: &CalculationState,
    entity_id: &EntityId,
    _params: &SuperannuationParams,
) -> Result<UnitOutcome, EngineError> {
    require_person(state, CalcUnit::SupConcessional, entity_id)?;
    let contributions = state
        .cashflows
        .for_entity(entity_id)
        .map(|cf| cf.contributions.clone())
        .unwrap_or_default();

    let total = contributions.concessional().round_dp(2);
    Ok(UnitOutcome::info(
        total,
        format!(
            "employer {} + salary sacrifice {} + personal deductible {}",
            contributions.employer_sg,
            contributions.salary_sacrifice,
            contributions.personal_deductible
        ),
    ))
}

/// CAL-SUP-003: concessional total measured against the annual cap.
/// A breach is reported, never clamped.
pub fn cap_usage(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &SuperannuationParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::SupCapUsage;
    require_person(state, unit, entity_id)?;
    let total =
        require_intermediate(state, unit, entity_id, OutputField::ConcessionalContributions)?;

    let cap = params.concessional_cap;
    let excess = (total - cap).max(Decimal::ZERO);
    if excess > Decimal::ZERO {
        Ok(UnitOutcome::warning(
            total,
            format!("contributions {total} exceed the {cap} cap by {excess}"),
        ))
    } else {
        Ok(UnitOutcome::info(
            total,
            format!(
                "contributions {} within the {} cap, {} remaining",
                total,
                cap,
                cap - total
            ),
        ))
    }
}

/// CAL-SUP-007: tax withheld inside the fund on concessional contributions
pub fn contributions_tax(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &SuperannuationParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::SupContributionsTax;
    require_person(state, unit, entity_id)?;
    let total =
        require_intermediate(state, unit, entity_id, OutputField::ConcessionalContributions)?;

    let tax = (total * params.contributions_tax_rate).round_dp(2);
    Ok(UnitOutcome::info(
        tax,
        format!("{} x {} contributions tax rate", total, params.contributions_tax_rate),
    ))
}

/// CAL-SUP-008: additional contributions tax for high income earners.
/// Levied on the lesser of the concessional contributions and the income
/// excess over the threshold.
pub fn division_293(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &SuperannuationParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::SupDivision293;
    require_person(state, unit, entity_id)?;
    let concessional =
        require_intermediate(state, unit, entity_id, OutputField::ConcessionalContributions)?;

    let div_income = taxable_income(state, entity_id) + concessional;
    let threshold = params.division_293_threshold;
    if div_income <= threshold {
        return Ok(UnitOutcome::info(
            Decimal::ZERO,
            format!("Division 293 income {div_income} at or below the {threshold} threshold"),
        ));
    }

    let taxed_amount = concessional.min(div_income - threshold);
    let tax = (taxed_amount * params.division_293_rate).round_dp(2);
    Ok(UnitOutcome::decision(
        tax,
        format!(
            "Division 293 income {} over {}; {} taxed at {}",
            div_income, threshold, taxed_amount, params.division_293_rate
        ),
    ))
}

/// CAL-SUP-009: what actually lands in the fund after contribution taxes
pub fn net_contribution(
    state: &CalculationState,
    entity_id: &EntityId,
    _params: &SuperannuationParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::SupNetContribution;
    require_person(state, unit, entity_id)?;
    let concessional =
        require_intermediate(state, unit, entity_id, OutputField::ConcessionalContributions)?;
    let tax = require_intermediate(state, unit, entity_id, OutputField::ContributionsTax)?;
    let div_293 = require_intermediate(state, unit, entity_id, OutputField::Division293Tax)?;

    let net = (concessional - tax - div_293).round_dp(2);
    Ok(UnitOutcome::info(
        net,
        format!("{concessional} - {tax} contributions tax - {div_293} Division 293"),
    ))
}
