//! Property cashflow unit: the tax benefit from negatively geared rentals.

use crate::domains::{require_person, UnitOutcome};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::position::AssetKind;
use crate::registry::CalcUnit;
use crate::rules::PropertyParams;
use crate::state::CalculationState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const WEEKS_PER_YEAR: Decimal = dec!(52);

/// CAL-PFL-104: when rental income falls short of interest and running
/// costs, the shortfall is deductible at the marginal rate. Properties
/// without rent are lived in, not investments, and are skipped.
pub fn negative_gearing(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &PropertyParams,
) -> Result<UnitOutcome, EngineError> {
    require_person(state, CalcUnit::PflNegativeGearing, entity_id)?;

    let mut net_cashflow = Decimal::ZERO;
    let mut rentals = 0u32;
    for (asset_id, asset) in &state.positions.assets {
        if asset.kind != AssetKind::Property || asset.weekly_rent.is_zero() {
            continue;
        }
        let share = asset.share_of(entity_id);
        if share.is_zero() {
            continue;
        }

        let annual_rent = asset.weekly_rent * WEEKS_PER_YEAR;
        let interest: Decimal = state
            .positions
            .loans_secured_by(asset_id)
            .map(|loan| loan.annual_interest())
            .sum();
        net_cashflow += (annual_rent - interest - asset.annual_costs) * share;
        rentals += 1;
    }

    if rentals == 0 {
        return Ok(UnitOutcome::info(
            Decimal::ZERO,
            "no rental property held".to_string(),
        ));
    }

    if net_cashflow < Decimal::ZERO {
        let benefit = (-net_cashflow * params.negative_gearing_marginal_rate).round_dp(2);
        Ok(UnitOutcome::info(
            benefit,
            format!(
                "rental shortfall {} deductible at {}",
                -net_cashflow, params.negative_gearing_marginal_rate
            ),
        ))
    } else {
        Ok(UnitOutcome::info(
            Decimal::ZERO,
            format!("rental cashflow {net_cashflow} is positive, no benefit"),
        ))
    }
}
