use crate::entity::EntityId;
use crate::registry::CalcId;
use crate::rules::RuleDomain;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Errors raised by the engine. Every failure aborts the surrounding run;
/// values are never clamped or defaulted to keep going.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no {domain} rule set in force on {date}")]
    RuleNotFound { domain: RuleDomain, date: NaiveDate },

    #[error("unknown calculation id: {0}")]
    UnknownCalculationId(CalcId),

    #[error("calculation id already registered: {0}")]
    DuplicateRegistration(CalcId),

    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("{cal_id} for {entity_id}: {reason}")]
    CalculationInput {
        cal_id: CalcId,
        entity_id: EntityId,
        reason: String,
    },

    #[error("scenario input invalid: {0}")]
    ScenarioInput(String),

    #[error("{what} is {value}, outside the sanity limit of {limit}")]
    SanityBoundExceeded {
        what: String,
        value: Decimal,
        limit: Decimal,
    },

    #[error("rule set {version} holds {found} parameters, expected {expected}")]
    RuleDomainMismatch {
        expected: RuleDomain,
        found: RuleDomain,
        version: String,
    },
}

/// A projection failure, locating the year and step that aborted the run.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("projection setup failed: {0}")]
    Setup(#[from] EngineError),

    #[error("projection aborted in year {year_index}: {cal_id} for {entity_id}")]
    Calculation {
        cal_id: CalcId,
        entity_id: EntityId,
        year_index: u32,
        #[source]
        source: EngineError,
    },
}

impl ProjectionError {
    /// The underlying engine error regardless of which phase failed.
    pub fn engine_error(&self) -> &EngineError {
        match self {
            ProjectionError::Setup(err) => err,
            ProjectionError::Calculation { source, .. } => source,
        }
    }
}
