//! Domain calculation logic. Each function is a pure computation over the
//! current state plus a typed rule parameter table; the registry turns the
//! outcome into a recorded value and a trace entry.

pub mod capital_gains;
pub mod company_tax;
pub mod personal_tax;
pub mod property;
pub mod retirement;
pub mod superannuation;

use crate::entity::{Company, EntityId, Person};
use crate::error::EngineError;
use crate::registry::CalcUnit;
use crate::state::{CalculationState, OutputField};
use crate::trace::Severity;
use rust_decimal::Decimal;

/// Value plus working produced by one calculation unit invocation
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub value: Decimal,
    pub explanation: String,
    pub severity: Severity,
}

impl UnitOutcome {
    pub fn info(value: Decimal, explanation: impl Into<String>) -> Self {
        UnitOutcome {
            value,
            explanation: explanation.into(),
            severity: Severity::Info,
        }
    }

    pub fn warning(value: Decimal, explanation: impl Into<String>) -> Self {
        UnitOutcome {
            value,
            explanation: explanation.into(),
            severity: Severity::Warning,
        }
    }

    pub fn decision(value: Decimal, explanation: impl Into<String>) -> Self {
        UnitOutcome {
            value,
            explanation: explanation.into(),
            severity: Severity::DecisionPoint,
        }
    }
}

/// Bad or missing input for a unit, attributed to the unit that noticed
pub(crate) fn input_error(
    unit: CalcUnit,
    entity_id: &EntityId,
    reason: impl Into<String>,
) -> EngineError {
    EngineError::CalculationInput {
        cal_id: unit.cal_id(),
        entity_id: entity_id.clone(),
        reason: reason.into(),
    }
}

/// A cross-unit read. Fails when the prerequisite unit has not run for
/// this entity in this year.
pub(crate) fn require_intermediate(
    state: &CalculationState,
    unit: CalcUnit,
    entity_id: &EntityId,
    field: OutputField,
) -> Result<Decimal, EngineError> {
    state.intermediates.get(entity_id, field).ok_or_else(|| {
        input_error(
            unit,
            entity_id,
            format!("requires {field} to be calculated first"),
        )
    })
}

/// The entity as a person, distinguishing "wrong kind" from "unknown"
pub(crate) fn require_person<'a>(
    state: &'a CalculationState,
    unit: CalcUnit,
    entity_id: &EntityId,
) -> Result<&'a Person, EngineError> {
    match state.entities.persons.get(entity_id) {
        Some(person) => Ok(person),
        None if state.entities.contains(entity_id) => {
            Err(input_error(unit, entity_id, "entity is not a person"))
        }
        None => Err(EngineError::UnknownEntity(entity_id.clone())),
    }
}

/// The entity as a company, distinguishing "wrong kind" from "unknown"
pub(crate) fn require_company<'a>(
    state: &'a CalculationState,
    unit: CalcUnit,
    entity_id: &EntityId,
) -> Result<&'a Company, EngineError> {
    match state.entities.companies.get(entity_id) {
        Some(company) => Ok(company),
        None if state.entities.contains(entity_id) => {
            Err(input_error(unit, entity_id, "entity is not a company"))
        }
        None => Err(EngineError::UnknownEntity(entity_id.clone())),
    }
}
