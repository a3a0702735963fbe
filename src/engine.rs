//! Session dataset engine
//!
//! Owns the two live tables: the upper system-of-record and the lower
//! staging area for incoming files. Everything ingested goes through the
//! schema normalizer once, so the matcher and calculator always see
//! canonical columns. The staged table can be promoted into the system of
//! record wholesale, optionally replacing system rows that share a key
//! with staged ones.

use crate::matcher::{self, MatchResult};
use crate::schema::{normalize, SchemaNormalizer};
use crate::types::{CellValue, Table, BUSINESS_UNIT, COST_CENTER};
use std::collections::HashMap;
use std::collections::HashSet;

/// Extra column recording which file a row came from.
pub const SOURCE_FILE: &str = "source_file";

/// Counts from a staged-table promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoteStats {
    /// System rows removed because their key appeared in the staged table
    pub removed: usize,
    /// Staged rows appended to the system of record
    pub added: usize,
}

/// Dominant key values found in the system table, usable as filter
/// prefills.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySuggestion {
    pub business_unit: Option<String>,
    pub cost_center: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DataEngine {
    normalizer: SchemaNormalizer,
    upper: Table,
    lower: Table,
    upper_sources: Vec<String>,
    lower_sources: Vec<String>,
}

impl DataEngine {
    pub fn new(normalizer: SchemaNormalizer) -> Self {
        Self {
            normalizer,
            ..Self::default()
        }
    }

    pub fn upper(&self) -> &Table {
        &self.upper
    }

    pub fn lower(&self) -> &Table {
        &self.lower
    }

    pub fn upper_sources(&self) -> &[String] {
        &self.upper_sources
    }

    pub fn lower_sources(&self) -> &[String] {
        &self.lower_sources
    }

    /// Normalize a raw table, tag it with its source, and append it to
    /// the system of record.
    pub fn append_upper(&mut self, raw: &Table, source: &str) {
        let table = self.ingest(raw, source);
        self.upper.append(table);
        if !self.upper_sources.iter().any(|s| s == source) {
            self.upper_sources.push(source.to_string());
        }
    }

    /// Same as [`append_upper`](Self::append_upper), into the staging table.
    pub fn append_lower(&mut self, raw: &Table, source: &str) {
        let table = self.ingest(raw, source);
        self.lower.append(table);
        if !self.lower_sources.iter().any(|s| s == source) {
            self.lower_sources.push(source.to_string());
        }
    }

    fn ingest(&self, raw: &Table, source: &str) -> Table {
        let mut table = self.normalizer.apply(raw);
        table.set_column(SOURCE_FILE, CellValue::Text(source.to_string()));
        table
    }

    pub fn reset_upper(&mut self) {
        self.upper = Table::default();
        self.upper_sources.clear();
    }

    pub fn reset_lower(&mut self) {
        self.lower = Table::default();
        self.lower_sources.clear();
    }

    pub fn reset_all(&mut self) {
        self.reset_upper();
        self.reset_lower();
    }

    /// Promote the staged table into the system of record. With
    /// `replace_on_keys`, system rows whose (business_unit, cost_center)
    /// key appears in the staged table are removed first, so staged data
    /// wins for the keys it covers. The staged table itself is left in
    /// place; resetting it is the caller's decision.
    pub fn promote_staged(&mut self, replace_on_keys: bool) -> PromoteStats {
        if self.lower.is_empty() {
            return PromoteStats {
                removed: 0,
                added: 0,
            };
        }

        let mut removed = 0;
        if replace_on_keys && !self.upper.is_empty() {
            let staged_keys: HashSet<(String, String)> =
                self.lower.rows.iter().map(row_key).collect();
            let before = self.upper.len();
            self.upper.rows.retain(|row| !staged_keys.contains(&row_key(row)));
            removed = before - self.upper.len();
        }

        let added = self.lower.len();
        self.upper.append(self.lower.clone());
        tracing::info!(removed, added, "staged table promoted into system of record");
        PromoteStats { removed, added }
    }

    /// Match the system of record against the staging table.
    pub fn match_tables(&self) -> MatchResult {
        matcher::match_tables(&self.upper, &self.lower)
    }

    /// Suggest filter prefills from the system table: for each key field,
    /// the single distinct value if there is one, otherwise the value
    /// covering at least 90% of non-empty cells.
    pub fn suggest_filter_values(&self) -> KeySuggestion {
        KeySuggestion {
            business_unit: dominant_value(&self.upper, BUSINESS_UNIT),
            cost_center: dominant_value(&self.upper, COST_CENTER),
        }
    }
}

fn row_key(row: &crate::types::Row) -> (String, String) {
    (
        normalize(&row.value(BUSINESS_UNIT).display()),
        normalize(&row.value(COST_CENTER).display()),
    )
}

fn dominant_value(table: &Table, field: &str) -> Option<String> {
    let mut counts: HashMap<String, (usize, String)> = HashMap::new();
    let mut total = 0usize;
    for row in &table.rows {
        let cell = row.value(field);
        if cell.is_empty() {
            continue;
        }
        let display = cell.display().trim().to_string();
        total += 1;
        let entry = counts
            .entry(normalize(&display))
            .or_insert((0, display.clone()));
        entry.0 += 1;
    }
    if total == 0 {
        return None;
    }
    if counts.len() == 1 {
        return counts.into_values().next().map(|(_, display)| display);
    }
    counts
        .into_values()
        .max_by_key(|(count, _)| *count)
        .filter(|(count, _)| (*count as f64) / (total as f64) >= 0.9)
        .map(|(_, display)| display)
}
