//! Per-row component resolution
//!
//! Pulls the five component fields out of a canonical row and coerces
//! them to numbers. Cells that are empty, "-", or fail coercion resolve
//! to absent, never to zero, so ratio formulas can tell a missing
//! component apart from a genuinely zero one.

use crate::types::{CellValue, Component, ComponentBindings, Row};

/// Locale-tolerant numeric coercion. Accepts grouping separators and both
/// decimal-comma and decimal-point: when both appear, the rightmost one is
/// the decimal separator. Currency symbols and spaces are stripped.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if matches!(lower.as_str(), "nan" | "<na>" | "none" | "null") {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let candidate = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // decimal comma, dots are grouping: 1.234,50
        (Some(comma), Some(dot)) if comma > dot => {
            cleaned.replace('.', "").replace(',', ".")
        }
        // decimal point, commas are grouping: 1,234.50
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        // lone comma is a decimal separator: 12,5
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    candidate.parse::<f64>().ok()
}

/// Resolve a row's component fields to present/absent numeric bindings.
/// Pure, and idempotent on rows whose components are already numeric.
pub fn resolve(row: &Row) -> ComponentBindings {
    let mut bindings = ComponentBindings::new();
    for component in Component::ALL {
        let value = match row.value(component.name()) {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Empty => None,
        };
        bindings.set(component, value);
    }
    bindings
}
