//! Personal income tax units: progressive base tax, the Medicare levy,
//! the low income tax offset and the net payable figure.

use crate::domains::{require_intermediate, require_person, UnitOutcome};
use crate::entity::{EntityId, Residency};
use crate::error::EngineError;
use crate::registry::CalcUnit;
use crate::rules::{PersonalTaxParams, TaxBracket};
use crate::state::{CalculationState, OutputField};
use rust_decimal::Decimal;

/// Gross assessable income for an entity; no cashflow record means zero
pub(crate) fn assessable_income(state: &CalculationState, entity_id: &EntityId) -> Decimal {
    state
        .cashflows
        .for_entity(entity_id)
        .map(|cf| cf.income.total())
        .unwrap_or(Decimal::ZERO)
}

/// Assessable income less deductions, floored at zero
pub(crate) fn taxable_income(state: &CalculationState, entity_id: &EntityId) -> Decimal {
    let deductions = state
        .cashflows
        .for_entity(entity_id)
        .map(|cf| cf.deductions.total())
        .unwrap_or(Decimal::ZERO);
    (assessable_income(state, entity_id) - deductions).max(Decimal::ZERO)
}

/// Tax accrued within one marginal bracket
fn tax_in_bracket(taxable: Decimal, bracket: &TaxBracket) -> Decimal {
    if taxable <= bracket.from {
        return Decimal::ZERO;
    }
    let top = bracket.to.map_or(taxable, |to| taxable.min(to));
    (top - bracket.from) * bracket.rate
}

/// CAL-PIT-001: tax from the marginal bracket table
pub fn base_tax(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &PersonalTaxParams,
) -> Result<UnitOutcome, EngineError> {
    require_person(state, CalcUnit::PitBaseTax, entity_id)?;
    let taxable = taxable_income(state, entity_id);

    let mut total = Decimal::ZERO;
    let mut parts: Vec<String> = Vec::new();
    for bracket in &params.brackets {
        let tax = tax_in_bracket(taxable, bracket);
        if !tax.is_zero() {
            parts.push(format!(
                "{}% over {} = {}",
                bracket.rate * Decimal::ONE_HUNDRED,
                bracket.from,
                tax.round_dp(2)
            ));
        }
        total += tax;
    }

    let explanation = if parts.is_empty() {
        format!("taxable income {taxable} is within the tax-free threshold")
    } else {
        format!("taxable income {}: {}", taxable, parts.join(", "))
    };
    Ok(UnitOutcome::info(total.round_dp(2), explanation))
}

/// CAL-PIT-002: levy on taxable income over the low income threshold
pub fn medicare_levy(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &PersonalTaxParams,
) -> Result<UnitOutcome, EngineError> {
    require_person(state, CalcUnit::PitMedicareLevy, entity_id)?;
    let taxable = taxable_income(state, entity_id);
    let medicare = &params.medicare;

    if taxable <= medicare.low_income_threshold {
        return Ok(UnitOutcome::info(
            Decimal::ZERO,
            format!(
                "taxable income {} at or below the levy threshold {}",
                taxable, medicare.low_income_threshold
            ),
        ));
    }

    let levy = ((taxable - medicare.low_income_threshold) * medicare.levy_rate).round_dp(2);
    Ok(UnitOutcome::info(
        levy,
        format!(
            "({} - {}) x {} levy rate",
            taxable, medicare.low_income_threshold, medicare.levy_rate
        ),
    ))
}

/// CAL-PIT-004: low income tax offset with a single taper
pub fn low_income_offset(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &PersonalTaxParams,
) -> Result<UnitOutcome, EngineError> {
    let person = require_person(state, CalcUnit::PitOffsets, entity_id)?;
    if person.residency == Residency::NonResident {
        return Ok(UnitOutcome::decision(
            Decimal::ZERO,
            "non-resident, low income offset does not apply",
        ));
    }

    let taxable = taxable_income(state, entity_id);
    let lito = &params.lito;
    if taxable <= lito.full_amount_limit {
        return Ok(UnitOutcome::info(
            lito.max_offset,
            format!(
                "taxable income {} within the full offset limit {}",
                taxable, lito.full_amount_limit
            ),
        ));
    }

    let tapered = lito.max_offset - (taxable - lito.full_amount_limit) * lito.taper_rate;
    let offset = tapered.max(Decimal::ZERO).round_dp(2);
    Ok(UnitOutcome::info(
        offset,
        format!(
            "{} tapered at {} per dollar over {}",
            lito.max_offset, lito.taper_rate, lito.full_amount_limit
        ),
    ))
}

/// CAL-PIT-005: base tax plus levy, less offsets and withholding.
/// Negative means a refund is due.
pub fn net_tax_payable(
    state: &CalculationState,
    entity_id: &EntityId,
    _params: &PersonalTaxParams,
) -> Result<UnitOutcome, EngineError> {
    let unit = CalcUnit::PitNetTax;
    require_person(state, unit, entity_id)?;

    let base = require_intermediate(state, unit, entity_id, OutputField::BaseTax)?;
    let levy = require_intermediate(state, unit, entity_id, OutputField::MedicareLevy)?;
    let offsets = require_intermediate(state, unit, entity_id, OutputField::TaxOffsets)?;
    let withheld = state
        .cashflows
        .for_entity(entity_id)
        .map(|cf| cf.payg_withheld)
        .unwrap_or(Decimal::ZERO);

    let net = (base + levy - offsets - withheld).round_dp(2);
    Ok(UnitOutcome::info(
        net,
        format!("{base} + {levy} - {offsets} offsets - {withheld} withheld"),
    ))
}
