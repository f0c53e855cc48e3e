//! Append-only audit trail. Every calculation unit invocation produces
//! exactly one entry, in execution order, so a run can be replayed line by
//! line against the numbers it reported.

use crate::entity::EntityId;
use crate::registry::CalcId;
use crate::state::OutputField;
use finproj_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io;

/// How much attention a trace entry deserves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    /// Something the user should look at, e.g. a breached contribution cap
    Warning,
    /// A branch was taken that changed the outcome, e.g. a discount applied
    DecisionPoint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::DecisionPoint => "decision_point",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One calculation unit invocation: who computed what, from which rules,
/// and the human-readable working behind the number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub cal_id: CalcId,
    pub entity_id: EntityId,
    pub year_index: u32,
    pub field: OutputField,
    pub value: Decimal,
    pub rule_version: String,
    pub explanation: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Ordered log of every unit invocation in a run. Entries can be appended
/// and read, never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceLog {
    entries: Vec<TraceEntry>,
}

impl TraceLog {
    pub fn new() -> Self {
        TraceLog::default()
    }

    pub fn append(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for<'a>(
        &'a self,
        entity_id: &'a EntityId,
    ) -> impl Iterator<Item = &'a TraceEntry> {
        self.entries.iter().filter(move |e| &e.entity_id == entity_id)
    }

    pub fn entries_for_calc<'a>(
        &'a self,
        cal_id: &'a CalcId,
    ) -> impl Iterator<Item = &'a TraceEntry> {
        self.entries.iter().filter(move |e| &e.cal_id == cal_id)
    }

    pub fn for_year(&self, year_index: u32) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter().filter(move |e| e.year_index == year_index)
    }

    /// Write the log as CSV, one row per entry in execution order
    pub fn write_csv<W: io::Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            csv_writer.serialize(TraceCsvRecord::from(entry))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Column metadata emitted by the CsvSchema derive
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Flattened trace entry as it appears in CSV exports
#[derive(Debug, Clone, Serialize, CsvSchema)]
pub struct TraceCsvRecord {
    /// Calculation unit identifier, e.g. CAL-PIT-001
    pub cal_id: String,
    /// Entity the row applies to
    pub entity_id: String,
    /// Zero-based projection year
    pub year_index: u32,
    /// Output field the unit wrote
    pub field: String,
    /// Computed value, rounded to cents
    pub value: Decimal,
    /// Rule set version the unit read
    pub rule_version: String,
    /// info, warning or decision_point
    pub severity: String,
    /// Human-readable working behind the value
    pub explanation: String,
}

impl From<&TraceEntry> for TraceCsvRecord {
    fn from(entry: &TraceEntry) -> Self {
        TraceCsvRecord {
            cal_id: entry.cal_id.to_string(),
            entity_id: entry.entity_id.to_string(),
            year_index: entry.year_index,
            field: entry.field.as_str().to_string(),
            value: entry.value,
            rule_version: entry.rule_version.clone(),
            severity: entry.severity.as_str().to_string(),
            explanation: entry.explanation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(cal_id: &str, entity: &str, year: u32, value: Decimal) -> TraceEntry {
        TraceEntry {
            cal_id: CalcId::from(cal_id),
            entity_id: EntityId::from(entity),
            year_index: year,
            field: OutputField::BaseTax,
            value,
            rule_version: "2024-25".to_string(),
            explanation: format!("base tax {value}"),
            severity: Severity::Info,
        }
    }

    #[test]
    fn entries_keep_append_order() {
        let mut log = TraceLog::new();
        log.append(entry("CAL-PIT-001", "alice", 0, dec!(100)));
        log.append(entry("CAL-PIT-001", "bob", 0, dec!(200)));
        log.append(entry("CAL-PIT-001", "alice", 1, dec!(300)));

        assert_eq!(log.len(), 3);
        let values: Vec<Decimal> = log.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![dec!(100), dec!(200), dec!(300)]);

        let alice = EntityId::from("alice");
        assert_eq!(log.entries_for(&alice).count(), 2);
        assert_eq!(log.for_year(1).count(), 1);
    }

    #[test]
    fn csv_export_includes_header_and_rows() {
        let mut log = TraceLog::new();
        log.append(entry("CAL-PIT-001", "alice", 0, dec!(14788.00)));

        let mut out = Vec::new();
        log.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "cal_id,entity_id,year_index,field,value,rule_version,severity,explanation"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("CAL-PIT-001,alice,0,base_tax,14788.00,2024-25,info,"));
    }

    #[test]
    fn csv_schema_matches_serialized_columns() {
        let names: Vec<&str> = TraceCsvRecord::csv_schema().iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "cal_id",
                "entity_id",
                "year_index",
                "field",
                "value",
                "rule_version",
                "severity",
                "explanation"
            ]
        );
        assert!(TraceCsvRecord::csv_schema().iter().all(|f| f.required));
    }

    #[test]
    fn severity_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Severity::DecisionPoint).unwrap(),
            "\"decision_point\""
        );
        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }
}
