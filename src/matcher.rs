//! Upper/lower table matching on the composite business-unit +
//! cost-center key
//!
//! Key comparison uses the same normalization as header matching, applied
//! to the values. A key may legitimately repeat within one table (several
//! line items for the same unit and cost center), so matching pairs every
//! same-key row on one side with every same-key row on the other.

use crate::schema::normalize;
use crate::types::{Row, Table, BUSINESS_UNIT, COST_CENTER};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Normalized composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    business_unit: String,
    cost_center: String,
}

fn key_of(row: &Row) -> MatchKey {
    MatchKey {
        business_unit: normalize(&row.value(BUSINESS_UNIT).display()),
        cost_center: normalize(&row.value(COST_CENTER).display()),
    }
}

/// One matched pair, both origin rows kept whole. Field collisions are
/// resolved lazily by [`MatchResult::merged_table`], never by overwrite.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedRow {
    pub upper: Row,
    pub lower: Row,
}

/// The three disjoint outcomes of a match. Rows are cloned out of the
/// inputs; mutating the source tables afterwards does not reach back into
/// a result already produced.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub matched: Vec<MatchedRow>,
    pub upper_only: Table,
    pub lower_only: Table,
    upper_columns: Vec<String>,
    lower_columns: Vec<String>,
}

impl MatchResult {
    /// Flatten the matched pairs into one table: key fields once, then
    /// upper fields, then lower fields. A non-key field present on both
    /// sides appears twice, tagged `upper.`/`lower.` by origin.
    pub fn merged_table(&self) -> Table {
        let upper_fields: Vec<String> = self
            .upper_columns
            .iter()
            .filter(|c| !is_key_field(c))
            .cloned()
            .collect();
        let lower_fields: Vec<String> = self
            .lower_columns
            .iter()
            .filter(|c| !is_key_field(c))
            .cloned()
            .collect();

        let mut columns = vec![BUSINESS_UNIT.to_string(), COST_CENTER.to_string()];
        for field in &upper_fields {
            columns.push(if lower_fields.contains(field) {
                format!("upper.{}", field)
            } else {
                (*field).clone()
            });
        }
        for field in &lower_fields {
            columns.push(if upper_fields.contains(field) {
                format!("lower.{}", field)
            } else {
                (*field).clone()
            });
        }

        let mut table = Table::new(columns);
        for pair in &self.matched {
            let mut row = Row::new();
            row.set(BUSINESS_UNIT, pair.upper.value(BUSINESS_UNIT).clone());
            row.set(COST_CENTER, pair.upper.value(COST_CENTER).clone());
            for field in &upper_fields {
                let name = if lower_fields.contains(field) {
                    format!("upper.{}", field)
                } else {
                    (*field).clone()
                };
                row.set(name, pair.upper.value(field).clone());
            }
            for field in &lower_fields {
                let name = if upper_fields.contains(field) {
                    format!("lower.{}", field)
                } else {
                    (*field).clone()
                };
                row.set(name, pair.lower.value(field).clone());
            }
            table.push_row(row);
        }
        table
    }
}

fn is_key_field(name: &str) -> bool {
    name == BUSINESS_UNIT || name == COST_CENTER
}

/// Join upper and lower on the composite key. Duplicate keys produce the
/// full cross-product for that key, so
/// `|matched| = Σ_key (upper count × lower count)`.
pub fn match_tables(upper: &Table, lower: &Table) -> MatchResult {
    let mut lower_index: HashMap<MatchKey, Vec<usize>> = HashMap::new();
    for (idx, row) in lower.rows.iter().enumerate() {
        lower_index.entry(key_of(row)).or_default().push(idx);
    }

    let mut matched = Vec::new();
    let mut upper_only = Table::new(upper.columns.clone());
    let mut matched_keys: HashSet<MatchKey> = HashSet::new();

    for row in &upper.rows {
        let key = key_of(row);
        match lower_index.get(&key) {
            Some(indices) => {
                matched_keys.insert(key);
                for &idx in indices {
                    matched.push(MatchedRow {
                        upper: row.clone(),
                        lower: lower.rows[idx].clone(),
                    });
                }
            }
            None => upper_only.push_row(row.clone()),
        }
    }

    let mut lower_only = Table::new(lower.columns.clone());
    for row in &lower.rows {
        if !matched_keys.contains(&key_of(row)) {
            lower_only.push_row(row.clone());
        }
    }

    MatchResult {
        matched,
        upper_only,
        lower_only,
        upper_columns: upper.columns.clone(),
        lower_columns: lower.columns.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn keyed_row(bu: &str, cc: &str, extra: &[(&str, f64)]) -> Row {
        let mut row = Row::new();
        row.set(BUSINESS_UNIT, CellValue::Text(bu.to_string()));
        row.set(COST_CENTER, CellValue::Text(cc.to_string()));
        for (field, value) in extra {
            row.set(*field, CellValue::Number(*value));
        }
        row
    }

    fn table_of(rows: Vec<Row>, extra_columns: &[&str]) -> Table {
        let mut columns = vec![BUSINESS_UNIT.to_string(), COST_CENTER.to_string()];
        columns.extend(extra_columns.iter().map(|c| c.to_string()));
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    #[test]
    fn test_match_accounting_with_unique_keys() {
        let upper = table_of(
            vec![
                keyed_row("A1", "C1", &[("AMOR", 1.0)]),
                keyed_row("A1", "C2", &[("AMOR", 2.0)]),
            ],
            &["AMOR"],
        );
        let lower = table_of(
            vec![
                keyed_row("A1", "C1", &[("AMOR", 9.0)]),
                keyed_row("B7", "C9", &[("AMOR", 3.0)]),
            ],
            &["AMOR"],
        );

        let result = match_tables(&upper, &lower);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.upper_only.len(), 1);
        assert_eq!(result.lower_only.len(), 1);
        // |matched| + |upper_only| == |upper|, same for lower
        assert_eq!(result.matched.len() + result.upper_only.len(), upper.len());
        assert_eq!(result.matched.len() + result.lower_only.len(), lower.len());
    }

    #[test]
    fn test_duplicate_keys_cross_product() {
        let upper = table_of(
            vec![
                keyed_row("A1", "C1", &[("AMOR", 1.0)]),
                keyed_row("A1", "C1", &[("AMOR", 2.0)]),
            ],
            &["AMOR"],
        );
        let lower = table_of(
            vec![
                keyed_row("A1", "C1", &[("AMOR", 10.0)]),
                keyed_row("A1", "C1", &[("AMOR", 20.0)]),
                keyed_row("A1", "C1", &[("AMOR", 30.0)]),
            ],
            &["AMOR"],
        );

        let result = match_tables(&upper, &lower);
        // 2 × 3 pairs for the shared key
        assert_eq!(result.matched.len(), 6);
        assert!(result.upper_only.is_empty());
        assert!(result.lower_only.is_empty());
    }

    #[test]
    fn test_key_comparison_is_normalized() {
        let upper = table_of(vec![keyed_row(" a1 ", "C1", &[])], &[]);
        let lower = table_of(vec![keyed_row("A1", " c1", &[])], &[]);
        let result = match_tables(&upper, &lower);
        assert_eq!(result.matched.len(), 1);
    }

    #[test]
    fn test_result_does_not_alias_inputs() {
        let mut upper = table_of(vec![keyed_row("A1", "C1", &[("AMOR", 1.0)])], &["AMOR"]);
        let lower = table_of(vec![keyed_row("A1", "C1", &[("AMOR", 2.0)])], &["AMOR"]);
        let result = match_tables(&upper, &lower);

        upper.rows[0].set("AMOR", CellValue::Number(99.0));
        assert_eq!(
            result.matched[0].upper.value("AMOR"),
            &CellValue::Number(1.0)
        );
    }

    #[test]
    fn test_merged_table_tags_colliding_fields() {
        let upper = table_of(
            vec![keyed_row("A1", "C1", &[("AMOR", 1.0), ("DIS", 2.0)])],
            &["AMOR", "DIS"],
        );
        let lower = table_of(vec![keyed_row("A1", "C1", &[("AMOR", 9.0)])], &["AMOR"]);

        let merged = match_tables(&upper, &lower).merged_table();
        assert_eq!(
            merged.columns,
            vec![
                BUSINESS_UNIT.to_string(),
                COST_CENTER.to_string(),
                "upper.AMOR".to_string(),
                "DIS".to_string(),
                "lower.AMOR".to_string(),
            ]
        );
        assert_eq!(merged.rows[0].value("upper.AMOR"), &CellValue::Number(1.0));
        assert_eq!(merged.rows[0].value("lower.AMOR"), &CellValue::Number(9.0));
        assert_eq!(merged.rows[0].value("DIS"), &CellValue::Number(2.0));
    }
}
