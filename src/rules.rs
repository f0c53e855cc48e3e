//! Versioned regulatory parameters, one rule set per domain and financial
//! year. Sets are file-backed JSON; a compiled-in copy of the shipped files
//! keeps the engine usable without a rules directory.

use crate::error::EngineError;
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Accounting domain a rule set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleDomain {
    PersonalTax,
    Superannuation,
    CapitalGains,
    Property,
    CompanyTax,
}

impl RuleDomain {
    pub const ALL: [RuleDomain; 5] = [
        RuleDomain::PersonalTax,
        RuleDomain::Superannuation,
        RuleDomain::CapitalGains,
        RuleDomain::Property,
        RuleDomain::CompanyTax,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            RuleDomain::PersonalTax => "personal-tax",
            RuleDomain::Superannuation => "superannuation",
            RuleDomain::CapitalGains => "capital-gains",
            RuleDomain::Property => "property",
            RuleDomain::CompanyTax => "company-tax",
        }
    }
}

impl fmt::Display for RuleDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// One marginal tax bracket. Income above `from` up to `to` is taxed at
/// `rate`; an open `to` means the top bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub from: Decimal,
    #[serde(default)]
    pub to: Option<Decimal>,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicareParams {
    pub levy_rate: Decimal,
    pub low_income_threshold: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitoParams {
    pub max_offset: Decimal,
    pub full_amount_limit: Decimal,
    pub taper_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalTaxParams {
    pub brackets: Vec<TaxBracket>,
    pub medicare: MedicareParams,
    pub lito: LitoParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PensionFactor {
    pub from_age: i32,
    pub factor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperannuationParams {
    pub concessional_cap: Decimal,
    pub contributions_tax_rate: Decimal,
    pub division_293_threshold: Decimal,
    pub division_293_rate: Decimal,
    /// Minimum pension drawdown factors by age band, ordered by `from_age`
    pub pension_minimum_factors: Vec<PensionFactor>,
}

impl SuperannuationParams {
    /// Drawdown factor for an age: the highest band not exceeding it
    pub fn pension_factor_for_age(&self, age: i32) -> Option<Decimal> {
        self.pension_minimum_factors
            .iter()
            .filter(|band| band.from_age <= age)
            .max_by_key(|band| band.from_age)
            .map(|band| band.factor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainsParams {
    pub individual_discount_rate: Decimal,
    pub discount_holding_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyParams {
    pub negative_gearing_marginal_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyTaxParams {
    pub standard_rate: Decimal,
    pub base_rate: Decimal,
    pub base_rate_turnover_threshold: Decimal,
}

/// Typed parameter table, tagged by domain in the JSON files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "kebab-case")]
pub enum RuleParams {
    PersonalTax(PersonalTaxParams),
    Superannuation(SuperannuationParams),
    CapitalGains(CapitalGainsParams),
    Property(PropertyParams),
    CompanyTax(CompanyTaxParams),
}

impl RuleParams {
    pub fn domain(&self) -> RuleDomain {
        match self {
            RuleParams::PersonalTax(_) => RuleDomain::PersonalTax,
            RuleParams::Superannuation(_) => RuleDomain::Superannuation,
            RuleParams::CapitalGains(_) => RuleDomain::CapitalGains,
            RuleParams::Property(_) => RuleDomain::Property,
            RuleParams::CompanyTax(_) => RuleDomain::CompanyTax,
        }
    }
}

/// One versioned rule set with an inclusive effective date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: String,
    pub effective_from: NaiveDate,
    pub effective_to: NaiveDate,
    #[serde(flatten)]
    pub params: RuleParams,
}

impl RuleSet {
    pub fn domain(&self) -> RuleDomain {
        self.params.domain()
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && date <= self.effective_to
    }

    fn mismatch(&self, expected: RuleDomain) -> EngineError {
        EngineError::RuleDomainMismatch {
            expected,
            found: self.domain(),
            version: self.version.clone(),
        }
    }

    pub fn personal_tax(&self) -> Result<&PersonalTaxParams, EngineError> {
        match &self.params {
            RuleParams::PersonalTax(params) => Ok(params),
            _ => Err(self.mismatch(RuleDomain::PersonalTax)),
        }
    }

    pub fn superannuation(&self) -> Result<&SuperannuationParams, EngineError> {
        match &self.params {
            RuleParams::Superannuation(params) => Ok(params),
            _ => Err(self.mismatch(RuleDomain::Superannuation)),
        }
    }

    pub fn capital_gains(&self) -> Result<&CapitalGainsParams, EngineError> {
        match &self.params {
            RuleParams::CapitalGains(params) => Ok(params),
            _ => Err(self.mismatch(RuleDomain::CapitalGains)),
        }
    }

    pub fn property(&self) -> Result<&PropertyParams, EngineError> {
        match &self.params {
            RuleParams::Property(params) => Ok(params),
            _ => Err(self.mismatch(RuleDomain::Property)),
        }
    }

    pub fn company_tax(&self) -> Result<&CompanyTaxParams, EngineError> {
        match &self.params {
            RuleParams::CompanyTax(params) => Ok(params),
            _ => Err(self.mismatch(RuleDomain::CompanyTax)),
        }
    }
}

/// Rule sets shipped with the binary, compiled in from rules/
const BUILTIN_RULE_FILES: &[(&str, &str)] = &[
    (
        "personal-tax-2023-24.json",
        include_str!("../rules/personal-tax-2023-24.json"),
    ),
    (
        "personal-tax-2024-25.json",
        include_str!("../rules/personal-tax-2024-25.json"),
    ),
    (
        "superannuation-2023-24.json",
        include_str!("../rules/superannuation-2023-24.json"),
    ),
    (
        "superannuation-2024-25.json",
        include_str!("../rules/superannuation-2024-25.json"),
    ),
    (
        "capital-gains-2023-24.json",
        include_str!("../rules/capital-gains-2023-24.json"),
    ),
    (
        "capital-gains-2024-25.json",
        include_str!("../rules/capital-gains-2024-25.json"),
    ),
    (
        "property-2023-24.json",
        include_str!("../rules/property-2023-24.json"),
    ),
    (
        "property-2024-25.json",
        include_str!("../rules/property-2024-25.json"),
    ),
    (
        "company-tax-2023-24.json",
        include_str!("../rules/company-tax-2023-24.json"),
    ),
    (
        "company-tax-2024-25.json",
        include_str!("../rules/company-tax-2024-25.json"),
    ),
];

/// In-memory store of every loaded rule set. Loading is wholesale and
/// explicit; nothing re-reads files mid-run.
#[derive(Debug, Clone)]
pub struct RuleStore {
    source: Option<PathBuf>,
    sets: BTreeMap<RuleDomain, Vec<RuleSet>>,
}

impl RuleStore {
    /// Load the rule sets compiled into the binary
    pub fn builtin() -> anyhow::Result<Self> {
        let mut store = RuleStore {
            source: None,
            sets: BTreeMap::new(),
        };
        for (name, contents) in BUILTIN_RULE_FILES {
            let set: RuleSet = serde_json::from_str(contents)
                .with_context(|| format!("parsing builtin rule file {name}"))?;
            store
                .insert(set)
                .with_context(|| format!("loading builtin rule file {name}"))?;
        }
        log::debug!("loaded {} builtin rule sets", store.len());
        Ok(store)
    }

    /// Load every *.json rule file from a directory
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut store = RuleStore {
            source: Some(dir.to_path_buf()),
            sets: BTreeMap::new(),
        };
        store.read_dir(dir)?;
        Ok(store)
    }

    /// Re-read the source directory, replacing every cached set. A store
    /// built from the compiled-in files has nothing to re-read.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let Some(dir) = self.source.clone() else {
            return Ok(());
        };
        self.sets.clear();
        self.read_dir(&dir)
    }

    fn read_dir(&mut self, dir: &Path) -> anyhow::Result<()> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("reading rules directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in &paths {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading rule file {}", path.display()))?;
            let set: RuleSet = serde_json::from_str(&contents)
                .with_context(|| format!("parsing rule file {}", path.display()))?;
            self.insert(set)
                .with_context(|| format!("loading rule file {}", path.display()))?;
        }
        log::debug!("loaded {} rule sets from {}", self.len(), dir.display());
        Ok(())
    }

    fn insert(&mut self, set: RuleSet) -> anyhow::Result<()> {
        if set.effective_from > set.effective_to {
            anyhow::bail!(
                "{} {} effective range is inverted ({} to {})",
                set.domain(),
                set.version,
                set.effective_from,
                set.effective_to
            );
        }

        let versions = self.sets.entry(set.domain()).or_default();
        for existing in versions.iter() {
            let overlaps = set.effective_from <= existing.effective_to
                && existing.effective_from <= set.effective_to;
            if overlaps {
                anyhow::bail!(
                    "{} {} overlaps {} ({} to {})",
                    set.domain(),
                    set.version,
                    existing.version,
                    existing.effective_from,
                    existing.effective_to
                );
            }
        }

        versions.push(set);
        versions.sort_by_key(|s| s.effective_from);
        Ok(())
    }

    /// The unique rule set in force for a domain on a date
    pub fn resolve(&self, domain: RuleDomain, date: NaiveDate) -> Result<&RuleSet, EngineError> {
        self.sets
            .get(&domain)
            .and_then(|versions| versions.iter().find(|set| set.covers(date)))
            .ok_or(EngineError::RuleNotFound { domain, date })
    }

    /// All versions for a domain, ordered by effective date
    pub fn versions(&self, domain: RuleDomain) -> &[RuleSet] {
        self.sets
            .get(&domain)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn domains(&self) -> impl Iterator<Item = RuleDomain> + '_ {
        self.sets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
