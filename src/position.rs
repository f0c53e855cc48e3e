use crate::entity::EntityId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AssetKind {
    Cash,
    Portfolio,
    Property,
    SuperAccumulation,
    SuperPension,
}

/// Fractional ownership of an asset or loan. Shares of one holding must
/// sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Ownership {
    pub entity_id: EntityId,
    #[schemars(with = "f64")]
    pub share: Decimal,
}

/// A held asset. Rent and running costs only apply to property and
/// default to zero elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    pub owners: Vec<Ownership>,
    pub kind: AssetKind,
    #[schemars(with = "f64")]
    pub value: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub cost_base: Decimal,
    pub acquisition_date: NaiveDate,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub weekly_rent: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub annual_costs: Decimal,
}

impl Asset {
    pub fn share_of(&self, entity_id: &EntityId) -> Decimal {
        owner_share(&self.owners, entity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Loan {
    pub owners: Vec<Ownership>,
    #[schemars(with = "f64")]
    pub principal: Decimal,
    #[schemars(with = "f64")]
    pub annual_interest_rate: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub annual_repayment: Decimal,
    #[serde(default)]
    pub interest_only: bool,
    /// Asset id the loan is secured against, if any
    #[serde(default)]
    pub secured_asset_id: Option<String>,
}

impl Loan {
    pub fn share_of(&self, entity_id: &EntityId) -> Decimal {
        owner_share(&self.owners, entity_id)
    }

    /// Interest charged over one year at the current principal
    pub fn annual_interest(&self) -> Decimal {
        self.principal * self.annual_interest_rate
    }
}

/// A planned sale of an asset in a given projection year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Disposal {
    pub asset_id: String,
    pub year_index: u32,
    #[schemars(with = "f64")]
    pub proceeds: Decimal,
    #[serde(default)]
    #[schemars(with = "f64")]
    pub incidental_costs: Decimal,
}

/// Assets, loans and planned disposals, keyed by holding id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PositionContext {
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
    #[serde(default)]
    pub loans: BTreeMap<String, Loan>,
    #[serde(default)]
    pub disposals: Vec<Disposal>,
}

impl PositionContext {
    pub fn disposals_for_year(&self, year_index: u32) -> impl Iterator<Item = &Disposal> {
        self.disposals
            .iter()
            .filter(move |d| d.year_index == year_index)
    }

    pub fn loans_secured_by<'a>(&'a self, asset_id: &'a str) -> impl Iterator<Item = &'a Loan> {
        self.loans
            .values()
            .filter(move |l| l.secured_asset_id.as_deref() == Some(asset_id))
    }

    /// Total value of the entity's share across assets of one kind
    pub fn balance_of_kind(&self, entity_id: &EntityId, kind: AssetKind) -> Decimal {
        self.assets
            .values()
            .filter(|a| a.kind == kind)
            .map(|a| a.value * a.share_of(entity_id))
            .sum()
    }
}

fn owner_share(owners: &[Ownership], entity_id: &EntityId) -> Decimal {
    owners
        .iter()
        .filter(|o| &o.entity_id == entity_id)
        .map(|o| o.share)
        .sum()
}
