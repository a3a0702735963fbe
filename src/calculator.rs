//! Cost calculation over resolved rows
//!
//! For each row: resolve component bindings, evaluate every registered
//! formula. Each (row, formula) cell holds its own value or failure;
//! nothing aborts the batch. Aggregates are sums of per-row successes,
//! except ratio-shaped formulas, which are recomputed once from the
//! aggregate component sums, because summing per-row ratios is
//! statistically meaningless.

use crate::formula::{EvalFailure, FormulaRegistry};
use crate::resolver;
use crate::schema::normalize;
use crate::types::{ComponentBindings, Row, Table, BUSINESS_UNIT, COST_CENTER};
use serde::Serialize;

/// How a formula's aggregate was reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionMode {
    /// Sum of the per-row successes
    Sum,
    /// Formula re-evaluated against aggregate component sums
    RatioOfSums,
}

/// One evaluated cell: a formula applied to one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaCell {
    pub formula: String,
    pub outcome: Result<f64, EvalFailure>,
}

/// One row's worth of calculation: the row itself, its resolved
/// bindings, and a cell per registered formula (registry order).
#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub row: Row,
    pub components: ComponentBindings,
    pub cells: Vec<FormulaCell>,
}

impl RowResult {
    pub fn cell(&self, formula: &str) -> Option<&Result<f64, EvalFailure>> {
        self.cells
            .iter()
            .find(|c| c.formula == formula)
            .map(|c| &c.outcome)
    }
}

/// Per-formula aggregate. `successes + failures` always equals the number
/// of rows considered: failures are excluded from the reduction but
/// never silently dropped from the accounting.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateEntry {
    pub formula: String,
    pub mode: ReductionMode,
    pub outcome: Result<f64, EvalFailure>,
    pub successes: usize,
    pub failures: usize,
}

/// The full outcome of one calculation call.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationResult {
    pub rows: Vec<RowResult>,
    pub summary: Vec<AggregateEntry>,
    /// Sum of each component over the rows where it was present; a
    /// component absent in every row stays absent here too.
    pub component_totals: ComponentBindings,
}

impl CalculationResult {
    pub fn aggregate(&self, formula: &str) -> Option<&AggregateEntry> {
        self.summary.iter().find(|e| e.formula == formula)
    }
}

/// Evaluate every registered formula over the given rows.
pub fn calculate(rows: &[Row], registry: &FormulaRegistry) -> CalculationResult {
    let mut row_results = Vec::with_capacity(rows.len());
    let mut component_totals = ComponentBindings::new();

    for row in rows {
        let bindings = resolver::resolve(row);
        for (component, value) in bindings.iter() {
            if let Some(v) = value {
                component_totals.accumulate(component, v);
            }
        }
        let cells = registry
            .all()
            .map(|formula| FormulaCell {
                formula: formula.name.clone(),
                outcome: formula.evaluate(&bindings),
            })
            .collect();
        row_results.push(RowResult {
            row: row.clone(),
            components: bindings,
            cells,
        });
    }

    let summary = registry
        .all()
        .map(|formula| {
            let mut sum = 0.0;
            let mut successes = 0;
            let mut failures = 0;
            for row_result in &row_results {
                match row_result.cell(&formula.name) {
                    Some(Ok(value)) => {
                        sum += value;
                        successes += 1;
                    }
                    Some(Err(_)) => failures += 1,
                    None => {}
                }
            }
            let (mode, outcome) = if formula.is_ratio() {
                (
                    ReductionMode::RatioOfSums,
                    formula.evaluate(&component_totals),
                )
            } else {
                (ReductionMode::Sum, Ok(sum))
            };
            AggregateEntry {
                formula: formula.name.clone(),
                mode,
                outcome,
                successes,
                failures,
            }
        })
        .collect();

    CalculationResult {
        rows: row_results,
        summary,
        component_totals,
    }
}

/// Rows of `table` matching the given key filters, by exact
/// normalized-string equality. An empty or omitted filter does not
/// restrict that key.
pub fn filter_rows(
    table: &Table,
    business_unit: Option<&str>,
    cost_center: Option<&str>,
) -> Vec<Row> {
    let want_bu = business_unit
        .map(normalize)
        .filter(|s| !s.is_empty());
    let want_cc = cost_center.map(normalize).filter(|s| !s.is_empty());

    table
        .rows
        .iter()
        .filter(|row| {
            let bu_ok = want_bu
                .as_ref()
                .map(|want| &normalize(&row.value(BUSINESS_UNIT).display()) == want)
                .unwrap_or(true);
            let cc_ok = want_cc
                .as_ref()
                .map(|want| &normalize(&row.value(COST_CENTER).display()) == want)
                .unwrap_or(true);
            bu_ok && cc_ok
        })
        .cloned()
        .collect()
}

/// Filter then calculate: the entry point the display layer calls when
/// the operator has picked a business unit and/or cost center.
pub fn calculate_filtered(
    table: &Table,
    business_unit: Option<&str>,
    cost_center: Option<&str>,
    registry: &FormulaRegistry,
) -> CalculationResult {
    let rows = filter_rows(table, business_unit, cost_center);
    calculate(&rows, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::PROCESS_MALIYETI;
    use crate::types::{CellValue, Component};

    fn row(bu: &str, cc: &str, components: &[(&str, f64)]) -> Row {
        let mut row = Row::new();
        row.set(BUSINESS_UNIT, CellValue::Text(bu.to_string()));
        row.set(COST_CENTER, CellValue::Text(cc.to_string()));
        for (name, value) in components {
            row.set(*name, CellValue::Number(*value));
        }
        row
    }

    fn full_row(bu: &str, cc: &str, values: [f64; 5]) -> Row {
        let pairs: Vec<(&str, f64)> = Component::ALL
            .iter()
            .zip(values)
            .map(|(c, v)| (c.name(), v))
            .collect();
        row(bu, cc, &pairs)
    }

    #[test]
    fn test_single_row_process_maliyeti() {
        let registry = FormulaRegistry::with_defaults();
        let rows = vec![full_row("A1", "C1", [10.0, 5.0, 0.0, 2.0, 1.0])];
        let result = calculate(&rows, &registry);

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].cell(PROCESS_MALIYETI), Some(&Ok(18.0)));

        let aggregate = result.aggregate(PROCESS_MALIYETI).unwrap();
        assert_eq!(aggregate.outcome, Ok(18.0));
        assert_eq!(aggregate.mode, ReductionMode::Sum);
        assert_eq!(aggregate.successes, 1);
        assert_eq!(aggregate.failures, 0);
    }

    #[test]
    fn test_failure_is_cell_scoped() {
        let mut registry = FormulaRegistry::with_defaults();
        registry.register("SAFE_TOTAL", "AMOR + DIS").unwrap();

        // ENER missing: the default formula fails, the override-free one succeeds
        let rows = vec![row("A1", "C1", &[("AMOR", 3.0), ("DIS", 4.0)])];
        let result = calculate(&rows, &registry);

        assert_eq!(
            result.rows[0].cell(PROCESS_MALIYETI),
            Some(&Err(EvalFailure::MissingComponent(Component::Edis)))
        );
        assert_eq!(result.rows[0].cell("SAFE_TOTAL"), Some(&Ok(7.0)));
    }

    #[test]
    fn test_aggregate_counts_failures() {
        let registry = FormulaRegistry::with_defaults();
        let rows = vec![
            full_row("A1", "C1", [1.0, 1.0, 1.0, 1.0, 1.0]),
            row("A1", "C1", &[("AMOR", 2.0)]), // missing the rest
            full_row("A1", "C1", [2.0, 2.0, 2.0, 2.0, 2.0]),
        ];
        let result = calculate(&rows, &registry);
        let aggregate = result.aggregate(PROCESS_MALIYETI).unwrap();
        assert_eq!(aggregate.outcome, Ok(15.0));
        assert_eq!(aggregate.successes, 2);
        assert_eq!(aggregate.failures, 1);
        assert_eq!(aggregate.successes + aggregate.failures, rows.len());
    }

    #[test]
    fn test_ratio_formula_uses_sums_not_row_averages() {
        let mut registry = FormulaRegistry::new();
        registry.register("ENER_PAYI", "ENER / GUG").unwrap();

        let rows = vec![
            row("A1", "C1", &[("ENER", 1.0), ("GUG", 2.0)]), // 0.5
            row("A1", "C1", &[("ENER", 3.0), ("GUG", 2.0)]), // 1.5
        ];
        let result = calculate(&rows, &registry);
        let aggregate = result.aggregate("ENER_PAYI").unwrap();
        assert_eq!(aggregate.mode, ReductionMode::RatioOfSums);
        // (1+3) / (2+2) = 1.0, NOT the sum of per-row ratios (2.0)
        assert_eq!(aggregate.outcome, Ok(1.0));
        assert_eq!(aggregate.successes, 2);
    }

    #[test]
    fn test_ratio_aggregate_division_by_zero_sum() {
        let mut registry = FormulaRegistry::new();
        registry.register("ORAN", "AMOR / ENER").unwrap();
        let rows = vec![
            row("A1", "C1", &[("AMOR", 1.0), ("ENER", 2.0)]),
            row("A1", "C1", &[("AMOR", 1.0), ("ENER", -2.0)]),
        ];
        let result = calculate(&rows, &registry);
        let aggregate = result.aggregate("ORAN").unwrap();
        assert_eq!(aggregate.outcome, Err(EvalFailure::DivisionByZero));
    }

    #[test]
    fn test_component_totals_skip_absent() {
        let registry = FormulaRegistry::with_defaults();
        let rows = vec![
            row("A1", "C1", &[("AMOR", 1.0)]),
            row("A1", "C1", &[("AMOR", 2.0), ("DIS", 3.0)]),
        ];
        let result = calculate(&rows, &registry);
        assert_eq!(result.component_totals.get(Component::Amor), Some(3.0));
        assert_eq!(result.component_totals.get(Component::Dis), Some(3.0));
        assert_eq!(result.component_totals.get(Component::Ener), None);
    }

    #[test]
    fn test_filter_rows_exact_normalized() {
        let mut table = Table::new(vec![BUSINESS_UNIT.into(), COST_CENTER.into()]);
        table.push_row(row("A1", "C1", &[]));
        table.push_row(row("A1", "C2", &[]));
        table.push_row(row("B2", "C1", &[]));

        assert_eq!(filter_rows(&table, Some("a1"), None).len(), 2);
        assert_eq!(filter_rows(&table, Some("A1"), Some("C2")).len(), 1);
        assert_eq!(filter_rows(&table, None, None).len(), 3);
        // empty filter string means no restriction
        assert_eq!(filter_rows(&table, Some(""), None).len(), 3);
        // exact match only, no substring fallback
        assert_eq!(filter_rows(&table, Some("A"), None).len(), 0);
    }

    #[test]
    fn test_calculate_filtered_end_to_end() {
        let registry = FormulaRegistry::with_defaults();
        let mut table = Table::new(vec![BUSINESS_UNIT.into(), COST_CENTER.into()]);
        table.push_row(full_row("A1", "C1", [10.0, 5.0, 0.0, 2.0, 1.0]));
        table.push_row(full_row("ZZ", "C9", [100.0, 100.0, 100.0, 100.0, 100.0]));

        let result = calculate_filtered(&table, Some("A1"), Some("C1"), &registry);
        assert_eq!(result.rows.len(), 1);
        let aggregate = result.aggregate(PROCESS_MALIYETI).unwrap();
        assert_eq!(aggregate.outcome, Ok(18.0));
        assert_eq!(aggregate.failures, 0);
    }
}
