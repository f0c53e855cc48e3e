//! Retirement unit: the age-based minimum drawdown on pension-phase super.

use crate::domains::{input_error, require_person, UnitOutcome};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::position::AssetKind;
use crate::registry::CalcUnit;
use crate::rules::SuperannuationParams;
use crate::state::CalculationState;
use rust_decimal::Decimal;

/// CAL-RET-001: pension balance times the minimum factor for the
/// person's age band
pub fn pension_minimum(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &SuperannuationParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::RetPensionMinimum;
    let person = require_person(state, unit, entity_id)?;
    let age = person.age_on(state.current_date());

    let balance = state.positions.balance_of_kind(entity_id, AssetKind::SuperPension);
    if balance.is_zero() {
        return Ok(UnitOutcome::info(
            Decimal::ZERO,
            "no pension-phase balance held".to_string(),
        ));
    }

    let factor = params.pension_factor_for_age(age).ok_or_else(|| {
        input_error(unit, entity_id, format!("no drawdown factor covers age {age}"))
    })?;
    let minimum = (balance * factor).round_dp(2);
    Ok(UnitOutcome::info(
        minimum,
        format!("pension balance {balance} x factor {factor} at age {age}"),
    ))
}
