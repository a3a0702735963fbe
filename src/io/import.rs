//! File import: CSV and Excel → raw tables, formula sources → (name, expr) pairs
//!
//! Readers produce RAW tables (original headers, cells as found); schema
//! normalization happens in the engine, not here.

use crate::error::{MasrafError, MasrafResult};
use crate::schema::normalize;
use crate::types::{CellValue, Row, Table};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Read a tabular file by extension: `.csv` via the csv reader, `.xlsx`
/// and `.xls` via calamine (first worksheet). Headers come from the first
/// row.
pub fn read_table(path: &Path) -> MasrafResult<Table> {
    match extension_of(path).as_deref() {
        Some("csv") => read_csv_table(path),
        Some("xlsx") | Some("xls") | Some("xlsm") => read_excel_table(path),
        _ => Err(MasrafError::UnsupportedFormat(path.display().to_string())),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn read_csv_table(path: &Path) -> MasrafResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = dedup_headers(
        reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
    );

    let mut table = Table::new(headers.clone());
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (idx, header) in headers.iter().enumerate() {
            let cell = match record.get(idx) {
                Some(s) if !s.trim().is_empty() => CellValue::Text(s.to_string()),
                _ => CellValue::Empty,
            };
            row.set(header.clone(), cell);
        }
        table.push_row(row);
    }
    Ok(table)
}

fn read_excel_table(path: &Path) -> MasrafResult<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| MasrafError::InvalidTable("workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let (height, width) = range.get_size();
    if height == 0 {
        return Ok(Table::default());
    }

    let mut headers = Vec::with_capacity(width);
    for col in 0..width {
        let name = match range.get((0, col)) {
            Some(Data::String(s)) => s.trim().to_string(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => f.to_string(),
            _ => format!("col_{}", col),
        };
        headers.push(if name.is_empty() {
            format!("col_{}", col)
        } else {
            name
        });
    }
    let headers = dedup_headers(headers);

    let mut table = Table::new(headers.clone());
    for row_idx in 1..height {
        let mut row = Row::new();
        for (col_idx, header) in headers.iter().enumerate() {
            let cell = match range.get((row_idx, col_idx)) {
                Some(data) => convert_cell(data),
                None => CellValue::Empty,
            };
            row.set(header.clone(), cell);
        }
        table.push_row(row);
    }
    Ok(table)
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Repeated header names get a numeric suffix so no column silently
/// shadows another.
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            let count = seen.entry(header.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                header
            } else {
                format!("{}_{}", header, count)
            }
        })
        .collect()
}

const NAME_CANDIDATES: &[&str] = &["name", "formul adi", "formül adı", "kod"];
const EXPR_CANDIDATES: &[&str] = &["expr", "formul", "formül", "expression"];

/// Read an external formula source: a two-column tabular file with `name`
/// and `expr` headers (Turkish spellings accepted). Rows that are blank on
/// both columns are dropped here; malformed expressions are the registry
/// loader's concern.
pub fn read_formula_pairs(path: &Path) -> MasrafResult<Vec<(String, String)>> {
    let table = read_table(path)?;

    let name_col = find_column(&table, NAME_CANDIDATES)
        .ok_or_else(|| MasrafError::MissingColumn("name".to_string()))?;
    let expr_col = find_column(&table, EXPR_CANDIDATES)
        .ok_or_else(|| MasrafError::MissingColumn("expr".to_string()))?;

    Ok(table
        .rows
        .iter()
        .map(|row| {
            (
                row.value(&name_col).display().trim().to_string(),
                row.value(&expr_col).display().trim().to_string(),
            )
        })
        .filter(|(name, expr)| !name.is_empty() || !expr.is_empty())
        .collect())
}

fn find_column(table: &Table, candidates: &[&str]) -> Option<String> {
    table
        .columns
        .iter()
        .find(|column| {
            let normalized = normalize(column);
            candidates.iter().any(|c| normalize(c) == normalized)
        })
        .cloned()
}
