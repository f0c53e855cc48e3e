use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a household entity (person, company, trust or fund).
/// Ordered so contexts keyed by it iterate deterministically.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Residency {
    #[default]
    Resident,
    NonResident,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum WorkStatus {
    #[default]
    Employed,
    SelfEmployed,
    Retired,
    NotWorking,
}

/// Natural person in the household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Person {
    pub name: String,
    /// Date of birth; age is always derived from this, never stored
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub residency: Residency,
    #[serde(default)]
    pub work_status: WorkStatus,
}

impl Person {
    /// Age in completed years on the given date. Negative when the date
    /// precedes the date of birth.
    pub fn age_on(&self, date: NaiveDate) -> i32 {
        let mut age = date.year() - self.date_of_birth.year();
        if (date.month(), date.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age
    }

    pub fn is_working(&self) -> bool {
        matches!(
            self.work_status,
            WorkStatus::Employed | WorkStatus::SelfEmployed
        )
    }
}

/// Private company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Company {
    pub name: String,
    /// Aggregated turnover, used for the base rate entity test
    #[schemars(with = "f64")]
    pub aggregated_turnover: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub taxable_income: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum TrustKind {
    #[default]
    Discretionary,
    Unit,
}

/// Family or unit trust. Carried as state only; no distribution
/// calculation is registered for trusts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trust {
    pub name: String,
    #[serde(default)]
    pub kind: TrustKind,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub net_income: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum SuperPhase {
    #[default]
    Accumulation,
    Pension,
}

/// Self-managed super fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Smsf {
    pub name: String,
    #[serde(default)]
    pub phase: SuperPhase,
    /// Member entity ids; each must refer to a person
    #[serde(default)]
    pub members: Vec<EntityId>,
}

/// All entities in a scenario, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityContext {
    #[serde(default)]
    pub persons: BTreeMap<EntityId, Person>,
    #[serde(default)]
    pub companies: BTreeMap<EntityId, Company>,
    #[serde(default)]
    pub trusts: BTreeMap<EntityId, Trust>,
    #[serde(default)]
    pub funds: BTreeMap<EntityId, Smsf>,
}

impl EntityContext {
    pub fn contains(&self, id: &EntityId) -> bool {
        self.persons.contains_key(id)
            || self.companies.contains_key(id)
            || self.trusts.contains_key(id)
            || self.funds.contains_key(id)
    }

    /// All entity ids across the four groups, persons first
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.persons
            .keys()
            .chain(self.companies.keys())
            .chain(self.trusts.keys())
            .chain(self.funds.keys())
    }
}
