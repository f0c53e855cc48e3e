//! Capital gains units: the raw gain on this year's planned disposals and
//! the assessable gain after the individual discount.

use crate::domains::{input_error, require_intermediate, require_person, UnitOutcome};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::position::Disposal;
use crate::registry::CalcUnit;
use crate::rules::CapitalGainsParams;
use crate::state::{CalculationState, OutputField};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Whole months elapsed between two dates
fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months
}

/// The entity's share of one disposal's gain plus the holding period
fn disposal_gain(
    state: &CalculationState,
    unit: CalcUnit,
    entity_id: &EntityId,
    disposal: &Disposal,
) -> Result<Option<(Decimal, i32)>, EngineError> {
    let asset = state.positions.assets.get(&disposal.asset_id).ok_or_else(|| {
        input_error(
            unit,
            entity_id,
            format!("disposal references unknown asset {}", disposal.asset_id),
        )
    })?;

    let share = asset.share_of(entity_id);
    if share.is_zero() {
        return Ok(None);
    }

    let gain = (disposal.proceeds - asset.cost_base - disposal.incidental_costs) * share;
    let held = months_between(asset.acquisition_date, state.current_date());
    Ok(Some((gain, held)))
}

/// CAL-CGT-001: the entity's share of gains and losses on this year's
/// disposals, before any discount
pub fn raw_gain(
    state: &CalculationState,
    entity_id: &EntityId,
    year_index: u32,
    _params: &CapitalGainsParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::CgtRawGain;
    require_person(state, unit, entity_id)?;

    let mut total = Decimal::ZERO;
    let mut parts: Vec<String> = Vec::new();
    for disposal in state.positions.disposals_for_year(year_index) {
        if let Some((gain, _)) = disposal_gain(state, unit, entity_id, disposal)? {
            parts.push(format!("{} {}", disposal.asset_id, gain.round_dp(2)));
            total += gain;
        }
    }

    let explanation = if parts.is_empty() {
        "no disposals this year".to_string()
    } else {
        format!("disposal gains: {}", parts.join(", "))
    };
    Ok(UnitOutcome::info(total.round_dp(2), explanation))
}

/// CAL-CGT-002: per-disposal discount for holdings past the qualifying
/// period; losses pass through undiscounted
pub fn discounted_gain(
    state: &CalculationState,
    entity_id: &EntityId,
    year_index: u32,
    params: &CapitalGainsParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::CgtDiscountedGain;
    require_person(state, unit, entity_id)?;
    require_intermediate(state, unit, entity_id, OutputField::CapitalGain)?;

    let mut total = Decimal::ZERO;
    let mut discounted = 0u32;
    for disposal in state.positions.disposals_for_year(year_index) {
        let Some((gain, held)) = disposal_gain(state, unit, entity_id, disposal)? else {
            continue;
        };
        if gain > Decimal::ZERO && held >= params.discount_holding_months as i32 {
            total += gain * (Decimal::ONE - params.individual_discount_rate);
            discounted += 1;
        } else {
            total += gain;
        }
    }

    let value = total.round_dp(2);
    if discounted > 0 {
        Ok(UnitOutcome::decision(
            value,
            format!(
                "discount rate {} applied to {} disposal(s) held {}+ months",
                params.individual_discount_rate, discounted, params.discount_holding_months
            ),
        ))
    } else {
        Ok(UnitOutcome::info(
            value,
            "no disposals qualified for the discount".to_string(),
        ))
    }
}
