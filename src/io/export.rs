//! File export: tables and calculation results → CSV / Excel
//!
//! The export side owns all formatting concerns: numbers are written as
//! numbers where the format allows, evaluation failures as their
//! Excel-style markers (`#N/A`, `#DIV/0!`, ...).

use crate::calculator::CalculationResult;
use crate::error::MasrafResult;
use crate::types::{CellValue, Component, Table, BUSINESS_UNIT, COST_CENTER};
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Write a table as CSV, columns in table order.
pub fn write_table_csv(table: &Table, path: &Path) -> MasrafResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|column| row.value(column).display())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a table as a single-sheet Excel workbook.
pub fn write_table_xlsx(table: &Table, path: &Path) -> MasrafResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_table_sheet(worksheet, table)?;
    workbook.save(path)?;
    Ok(())
}

fn write_table_sheet(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    table: &Table,
) -> MasrafResult<()> {
    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, column) in table.columns.iter().enumerate() {
            let r = (row_idx + 1) as u32;
            let c = col_idx as u16;
            match row.value(column) {
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                CellValue::Empty => {}
            }
        }
    }
    Ok(())
}

/// The per-row detail of a calculation as a flat table: key fields,
/// components (absent cells stay empty), then one column per formula with
/// failures rendered as markers.
pub fn result_detail_table(result: &CalculationResult) -> Table {
    let formula_names: Vec<String> = result
        .rows
        .first()
        .map(|r| r.cells.iter().map(|c| c.formula.clone()).collect())
        .unwrap_or_else(|| {
            result
                .summary
                .iter()
                .map(|entry| entry.formula.clone())
                .collect()
        });

    let mut columns = vec![BUSINESS_UNIT.to_string(), COST_CENTER.to_string()];
    columns.extend(Component::ALL.iter().map(|c| c.name().to_string()));
    columns.extend(formula_names.clone());

    let mut table = Table::new(columns);
    for row_result in &result.rows {
        let mut row = crate::types::Row::new();
        row.set(
            BUSINESS_UNIT,
            row_result.row.value(BUSINESS_UNIT).clone(),
        );
        row.set(COST_CENTER, row_result.row.value(COST_CENTER).clone());
        for (component, value) in row_result.components.iter() {
            match value {
                Some(n) => row.set(component.name(), CellValue::Number(n)),
                None => row.set(component.name(), CellValue::Empty),
            }
        }
        for cell in &row_result.cells {
            match &cell.outcome {
                Ok(value) => row.set(cell.formula.clone(), CellValue::Number(*value)),
                Err(failure) => {
                    row.set(cell.formula.clone(), CellValue::Text(failure.code().to_string()))
                }
            }
        }
        table.push_row(row);
    }
    table
}

/// The aggregate summary as a table: one row per formula plus the
/// component totals.
pub fn result_summary_table(result: &CalculationResult) -> Table {
    let mut table = Table::new(vec![
        "name".to_string(),
        "reduction".to_string(),
        "value".to_string(),
        "successes".to_string(),
        "failures".to_string(),
    ]);

    for (component, total) in result.component_totals.iter() {
        let mut row = crate::types::Row::new();
        row.set("name", CellValue::Text(component.name().to_string()));
        row.set("reduction", CellValue::Text("sum".to_string()));
        match total {
            Some(n) => row.set("value", CellValue::Number(n)),
            None => row.set("value", CellValue::Empty),
        }
        table.push_row(row);
    }

    for entry in &result.summary {
        let mut row = crate::types::Row::new();
        row.set("name", CellValue::Text(entry.formula.clone()));
        let reduction = match entry.mode {
            crate::calculator::ReductionMode::Sum => "sum",
            crate::calculator::ReductionMode::RatioOfSums => "ratio_of_sums",
        };
        row.set("reduction", CellValue::Text(reduction.to_string()));
        match &entry.outcome {
            Ok(value) => row.set("value", CellValue::Number(*value)),
            Err(failure) => row.set("value", CellValue::Text(failure.code().to_string())),
        }
        row.set("successes", CellValue::Number(entry.successes as f64));
        row.set("failures", CellValue::Number(entry.failures as f64));
        table.push_row(row);
    }
    table
}

/// Write the per-row detail as CSV. The summary travels separately (the
/// CLI prints it; [`write_result_xlsx`] gives it its own sheet).
pub fn write_result_csv(result: &CalculationResult, path: &Path) -> MasrafResult<()> {
    write_table_csv(&result_detail_table(result), path)
}

/// Write a calculation result as a two-sheet workbook: `Rows` with the
/// per-row detail, `Summary` with the aggregates.
pub fn write_result_xlsx(result: &CalculationResult, path: &Path) -> MasrafResult<()> {
    let mut workbook = Workbook::new();

    let rows_sheet = workbook.add_worksheet();
    rows_sheet.set_name("Rows")?;
    write_table_sheet(rows_sheet, &result_detail_table(result))?;

    let summary_sheet = workbook.add_worksheet();
    summary_sheet.set_name("Summary")?;
    write_table_sheet(summary_sheet, &result_summary_table(result))?;

    workbook.save(path)?;
    Ok(())
}
