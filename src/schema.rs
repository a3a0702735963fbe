//! Header normalization and canonical-schema mapping
//!
//! Source files arrive with headers in every spelling the plants can
//! produce ("İş Yeri Kodu", "ISYERI", "plant code", ...). A static alias
//! table plus a pure normalization function maps them onto the canonical
//! fields; everything unrecognized rides along as an inert extra column.

use crate::error::MasrafResult;
use crate::resolver;
use crate::types::{CellValue, Component, Row, Table, BUSINESS_UNIT, COST_CENTER};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Turkish characters folded to their ASCII neighbors before lowercasing.
/// 'İ'.to_lowercase() would produce a combining mark, so the fold runs first.
const TURKISH_FOLD: &[(char, char)] = &[
    ('ı', 'i'),
    ('İ', 'i'),
    ('ş', 's'),
    ('Ş', 's'),
    ('ğ', 'g'),
    ('Ğ', 'g'),
    ('ö', 'o'),
    ('Ö', 'o'),
    ('ü', 'u'),
    ('Ü', 'u'),
    ('ç', 'c'),
    ('Ç', 'c'),
];

fn separator_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Fold a raw header or key value to its comparison form: trimmed,
/// Turkish-folded, ASCII-only, lowercase, separator runs collapsed to a
/// single space.
pub fn normalize(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = TURKISH_FOLD
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, to)| *to)
            .unwrap_or(c);
        if c.is_ascii() {
            folded.push(c.to_ascii_lowercase());
        }
    }
    separator_run().replace_all(&folded, " ").trim().to_string()
}

//==============================================================================
// Alias table
//==============================================================================

/// One canonical field and the raw spellings that map to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub field: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Many-to-one raw-header → canonical-field mapping. Built once, immutable
/// for the session.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    lookup: HashMap<String, String>,
}

impl AliasTable {
    /// The built-in alias set, covering the spellings seen in production
    /// cost exports (Turkish and English).
    pub fn builtin() -> Self {
        let entries = vec![
            entry(
                BUSINESS_UNIT,
                &[
                    "is yeri kodu",
                    "iş yeri kodu",
                    "is yeri",
                    "iş yeri",
                    "işyeri",
                    "isyeri",
                    "plant",
                    "site",
                    "plant code",
                ],
            ),
            entry(
                COST_CENTER,
                &[
                    "masraf yeri kodu",
                    "masraf yeri",
                    "cost center",
                    "cost centre",
                    "cc",
                    "masraf kodu",
                ],
            ),
            entry("AMOR", &["amortisman", "depreciation"]),
            entry(
                "DIS",
                &["direkt iscilik", "direkt işçilik", "direct labor", "dl"],
            ),
            entry(
                "EDIS",
                &[
                    "endirekt iscilik",
                    "endirekt işçilik",
                    "indirect labor",
                    "il",
                ],
            ),
            entry(
                "ENER",
                &["enerji", "electricity", "kwh", "energy cost", "elektrik"],
            ),
            entry(
                "GUG",
                &[
                    "güg",
                    "genel uretim gider",
                    "genel üretim gider",
                    "overhead",
                    "oh",
                ],
            ),
        ];
        Self::build(entries)
    }

    /// Load an alias table from a YAML file: a list of
    /// `{field, synonyms: [...]}` entries. Replaces the built-in set.
    pub fn from_yaml_file(path: &Path) -> MasrafResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<AliasEntry> = serde_yaml::from_str(&content)?;
        Ok(Self::build(entries))
    }

    fn build(entries: Vec<AliasEntry>) -> Self {
        let mut lookup = HashMap::new();
        for e in &entries {
            // the canonical name is always its own alias
            lookup
                .entry(normalize(&e.field))
                .or_insert_with(|| e.field.clone());
            for synonym in &e.synonyms {
                lookup
                    .entry(normalize(synonym))
                    .or_insert_with(|| e.field.clone());
            }
        }
        Self { entries, lookup }
    }

    pub fn canonical_for(&self, raw_header: &str) -> Option<&str> {
        self.lookup.get(&normalize(raw_header)).map(|s| s.as_str())
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }
}

fn entry(field: &str, synonyms: &[&str]) -> AliasEntry {
    AliasEntry {
        field: field.to_string(),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}

//==============================================================================
// Normalizer
//==============================================================================

/// Two raw headers claimed the same canonical field. Resolved, not fatal:
/// the later column keeps the slot, the earlier stays inert under its raw
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCollision {
    pub field: String,
    pub kept: String,
    pub displaced: String,
}

/// Result of mapping one header row.
#[derive(Debug, Clone, Default)]
pub struct HeaderMapping {
    /// raw header → canonical field, winners only
    pub canonical: HashMap<String, String>,
    pub collisions: Vec<HeaderCollision>,
}

impl HeaderMapping {
    /// The raw header that won the given canonical field, if any.
    pub fn source_of(&self, field: &str) -> Option<&str> {
        self.canonical
            .iter()
            .find(|(_, canonical)| canonical.as_str() == field)
            .map(|(raw, _)| raw.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    aliases: AliasTable,
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new(AliasTable::builtin())
    }
}

impl SchemaNormalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// The canonical column order: both key fields, then the components.
    pub fn canonical_columns() -> Vec<String> {
        let mut columns = vec![BUSINESS_UNIT.to_string(), COST_CENTER.to_string()];
        columns.extend(Component::ALL.iter().map(|c| c.name().to_string()));
        columns
    }

    /// Map raw headers onto canonical fields. When several headers claim
    /// the same field the LAST one in column order wins; earlier claimants
    /// are displaced back to inert extras and the collision is recorded.
    pub fn map_headers(&self, raw_headers: &[String]) -> HeaderMapping {
        let mut winners: HashMap<String, String> = HashMap::new(); // canonical -> raw
        let mut collisions = Vec::new();

        for raw in raw_headers {
            let Some(canonical) = self.aliases.canonical_for(raw) else {
                continue;
            };
            if let Some(previous) = winners.insert(canonical.to_string(), raw.clone()) {
                tracing::warn!(
                    field = canonical,
                    kept = raw.as_str(),
                    displaced = previous.as_str(),
                    "header collision: later column wins"
                );
                collisions.push(HeaderCollision {
                    field: canonical.to_string(),
                    kept: raw.clone(),
                    displaced: previous,
                });
            }
        }

        let canonical = winners
            .into_iter()
            .map(|(canonical, raw)| (raw, canonical))
            .collect();
        HeaderMapping {
            canonical,
            collisions,
        }
    }

    /// Rewrite a raw table onto the canonical schema. Canonical columns
    /// come first (key fields as text, components coerced to numbers or
    /// left absent); unrecognized raw columns follow in their original
    /// order, untouched.
    pub fn apply(&self, raw: &Table) -> Table {
        let mapping = self.map_headers(&raw.columns);

        let mut columns = Self::canonical_columns();
        let extras: Vec<String> = raw
            .columns
            .iter()
            .filter(|c| !mapping.canonical.contains_key(*c))
            .cloned()
            .collect();
        columns.extend(extras.iter().cloned());

        let mut table = Table::new(columns);
        for raw_row in &raw.rows {
            let mut row = Row::new();
            for key_field in [BUSINESS_UNIT, COST_CENTER] {
                let display = mapping
                    .source_of(key_field)
                    .map(|raw_header| raw_row.value(raw_header).display())
                    .unwrap_or_default();
                row.set(key_field, CellValue::Text(display.trim().to_string()));
            }
            for component in Component::ALL {
                let cell = mapping
                    .source_of(component.name())
                    .map(|raw_header| raw_row.value(raw_header));
                let value = match cell {
                    Some(CellValue::Number(n)) => CellValue::Number(*n),
                    Some(CellValue::Text(s)) => match resolver::parse_number(s) {
                        Some(n) => CellValue::Number(n),
                        None => CellValue::Empty,
                    },
                    Some(CellValue::Empty) | None => CellValue::Empty,
                };
                row.set(component.name(), value);
            }
            for extra in &extras {
                if let Some(cell) = raw_row.get(extra) {
                    row.set(extra.clone(), cell.clone());
                }
            }
            table.push_row(row);
        }
        table
    }
}
