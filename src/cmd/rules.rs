//! Rules command - list rule set versions and their coverage windows

use crate::cmd::load_rules;
use crate::rules::{RuleDomain, RuleSet};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RulesCommand {
    /// Limit the listing to one rule domain
    #[arg(long, value_enum)]
    domain: Option<DomainFilter>,

    /// Directory of rule files to use instead of the built-in set
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DomainFilter {
    PersonalTax,
    Superannuation,
    CapitalGains,
    Property,
    CompanyTax,
}

impl From<DomainFilter> for RuleDomain {
    fn from(filter: DomainFilter) -> Self {
        match filter {
            DomainFilter::PersonalTax => RuleDomain::PersonalTax,
            DomainFilter::Superannuation => RuleDomain::Superannuation,
            DomainFilter::CapitalGains => RuleDomain::CapitalGains,
            DomainFilter::Property => RuleDomain::Property,
            DomainFilter::CompanyTax => RuleDomain::CompanyTax,
        }
    }
}

impl RulesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let store = load_rules(self.rules_dir.as_deref())?;
        let domains: Vec<RuleDomain> = match self.domain {
            Some(filter) => vec![filter.into()],
            None => RuleDomain::ALL.to_vec(),
        };

        let rule_sets: Vec<&RuleSet> = domains
            .iter()
            .flat_map(|&domain| store.versions(domain))
            .collect();

        if self.json {
            self.print_json(&rule_sets)
        } else {
            self.print_table(&rule_sets);
            Ok(())
        }
    }

    fn print_table(&self, rule_sets: &[&RuleSet]) {
        if rule_sets.is_empty() {
            println!("No rule sets found");
            return;
        }

        let rows: Vec<RuleRow> = rule_sets
            .iter()
            .map(|set| RuleRow {
                domain: set.domain().to_string(),
                version: set.version.clone(),
                from: set.effective_from.format("%Y-%m-%d").to_string(),
                to: set.effective_to.format("%Y-%m-%d").to_string(),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn print_json(&self, rule_sets: &[&RuleSet]) -> anyhow::Result<()> {
        let output = RulesOutput { rule_sets };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[derive(Debug, Clone, Tabled)]
struct RuleRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

#[derive(Debug, Serialize)]
struct RulesOutput<'a> {
    rule_sets: &'a [&'a RuleSet],
}
