//! Deterministic financial calculation engine: registered calculation units,
//! versioned rule sets and multi-year projections with a full audit trace.

pub mod cashflow;
pub mod cmd;
mod domains;
pub mod entity;
pub mod error;
pub mod limits;
pub mod position;
pub mod projection;
pub mod registry;
pub mod rules;
pub mod scenario;
pub mod state;
pub mod trace;

#[cfg(test)]
mod testutil;

pub use cashflow::{
    CashflowContext, ContributionFlows, DeductionFlows, EntityCashflow, IncomeFlows,
};
pub use entity::{
    Company, EntityContext, EntityId, Person, Residency, Smsf, SuperPhase, Trust, TrustKind,
    WorkStatus,
};
pub use error::{EngineError, ProjectionError};
pub use limits::{scan_state, validate_state, InputIssue, SanityBounds, OWNERSHIP_TOLERANCE};
pub use position::{Asset, AssetKind, Disposal, Loan, Ownership, PositionContext};
pub use projection::{
    run_calculation, run_projection, CalculationResult, ExecutionPlan, PlanStep, ProjectionOutput,
    Projector, YearSnapshot, YearSummary, DEFAULT_HORIZON_YEARS,
};
pub use registry::{CalcId, CalcUnit, Registry};
pub use rules::{
    CapitalGainsParams, CompanyTaxParams, LitoParams, MedicareParams, PensionFactor,
    PersonalTaxParams, PropertyParams, RuleDomain, RuleParams, RuleSet, RuleStore,
    SuperannuationParams, TaxBracket,
};
pub use scenario::Scenario;
pub use state::{
    CalculationState, EconomicAssumptions, FinancialYear, GlobalContext, Intermediates, OutputField,
};
pub use trace::{CsvField, Severity, TraceCsvRecord, TraceEntry, TraceLog};
