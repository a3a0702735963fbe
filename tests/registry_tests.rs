//! Formula registry lifecycle: defaults, overrides, external loading

use masraf::formula::{FormulaRegistry, PROCESS_MALIYETI};
use masraf::io::read_formula_pairs;
use masraf::types::{Component, ComponentBindings};
use std::io::Write;

fn bindings_with(pairs: &[(Component, f64)]) -> ComponentBindings {
    let mut bindings = ComponentBindings::new();
    for (component, value) in pairs {
        bindings.set(*component, Some(*value));
    }
    bindings
}

#[test]
fn override_replaces_default_completely() {
    let mut registry = FormulaRegistry::with_defaults();
    registry
        .override_formula(PROCESS_MALIYETI, "AMOR * 2")
        .unwrap();

    assert_eq!(registry.get(PROCESS_MALIYETI).unwrap().expr, "AMOR * 2");

    // no residual default leaks into evaluation: only AMOR is needed now
    let bindings = bindings_with(&[(Component::Amor, 7.0)]);
    assert_eq!(
        registry.get(PROCESS_MALIYETI).unwrap().evaluate(&bindings),
        Ok(14.0)
    );
}

#[test]
fn load_from_csv_file_overrides_and_skips() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "name,expr").unwrap();
    writeln!(file, "PROCESS_MALIYETI,AMOR + DIS").unwrap();
    writeln!(file, "ISCILIK,DIS + EDIS").unwrap();
    writeln!(file, "KIRIK,AMOR + + DIS").unwrap();
    writeln!(file, "YABANCI,REVENUE / COST").unwrap();

    let pairs = read_formula_pairs(file.path()).unwrap();
    let mut registry = FormulaRegistry::with_defaults();
    let report = registry.load_pairs(pairs);

    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped.len(), 2);

    // override landed
    assert_eq!(registry.get(PROCESS_MALIYETI).unwrap().expr, "AMOR + DIS");
    // addition landed
    assert!(registry.get("ISCILIK").is_some());
    // malformed entries left no trace
    assert!(registry.get("KIRIK").is_none());
    assert!(registry.get("YABANCI").is_none());
}

#[test]
fn registry_stays_usable_when_every_entry_is_bad() {
    let mut registry = FormulaRegistry::with_defaults();
    let report = registry.load_pairs(vec![
        ("".to_string(), "".to_string()),
        ("X".to_string(), ")".to_string()),
    ]);
    assert_eq!(report.loaded, 0);
    assert_eq!(report.skipped.len(), 2);
    // defaults untouched
    assert_eq!(
        registry.get(PROCESS_MALIYETI).unwrap().expr,
        "AMOR + DIS + EDIS + ENER + GUG"
    );
}

#[test]
fn formula_pairs_from_excel_shaped_headers() {
    // the loader accepts the Turkish header spellings used by the plan files
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "Kod,Expression").unwrap();
    writeln!(file, "ORAN,ENER / GUG").unwrap();

    let pairs = read_formula_pairs(file.path()).unwrap();
    assert_eq!(
        pairs,
        vec![("ORAN".to_string(), "ENER / GUG".to_string())]
    );

    let mut registry = FormulaRegistry::with_defaults();
    registry.load_pairs(pairs);
    assert!(registry.get("ORAN").unwrap().is_ratio());
}

#[test]
fn lookup_is_by_exact_name() {
    let registry = FormulaRegistry::with_defaults();
    assert!(registry.get(PROCESS_MALIYETI).is_some());
    assert!(registry.get("process_maliyeti").is_none());
}
