//! Named-formula registry and the expression engine behind it
//!
//! Formulas are arithmetic expressions over the five canonical cost
//! components. The registry seeds built-in defaults at construction and
//! can be extended from an external (name, expr) source; an override
//! replaces the default of the same name outright, it never merges.

pub mod evaluator;
pub mod parser;
pub mod tokenizer;

pub use evaluator::{evaluate, evaluate_ast, EvalFailure};
pub use parser::{parse_expr, BinOp, Expr, ParseError};

use crate::error::{MasrafError, MasrafResult};
use crate::types::ComponentBindings;
use std::collections::HashMap;

/// Name of the built-in total-process-cost formula.
pub const PROCESS_MALIYETI: &str = "PROCESS_MALIYETI";
const PROCESS_MALIYETI_EXPR: &str = "AMOR + DIS + EDIS + ENER + GUG";

/// A named formula, parsed once at insert time.
#[derive(Debug, Clone)]
pub struct Formula {
    pub name: String,
    pub expr: String,
    ast: Expr,
}

impl Formula {
    pub fn parse(name: impl Into<String>, expr: impl Into<String>) -> Result<Self, ParseError> {
        let expr = expr.into();
        let ast = parse_expr(&expr)?;
        Ok(Self {
            name: name.into(),
            expr,
            ast,
        })
    }

    pub fn evaluate(&self, bindings: &ComponentBindings) -> Result<f64, EvalFailure> {
        evaluate_ast(&self.ast, bindings)
    }

    pub fn is_ratio(&self) -> bool {
        self.ast.is_ratio()
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }
}

/// An entry skipped during an external load, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedFormula {
    pub name: String,
    pub expr: String,
    pub reason: String,
}

/// What an external formula load did: how many entries landed, and which
/// were skipped. Skips are never fatal; the registry stays usable with
/// defaults plus whatever was valid.
#[derive(Debug, Clone, Default)]
pub struct FormulaLoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedFormula>,
}

/// Insertion-ordered set of named formulas with O(1) lookup. Owned by the
/// caller and passed by reference into each calculation; there is no
/// shared mutable default to leak state between sessions.
#[derive(Debug, Clone, Default)]
pub struct FormulaRegistry {
    order: Vec<String>,
    formulas: HashMap<String, Formula>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in defaults.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(PROCESS_MALIYETI, PROCESS_MALIYETI_EXPR)
            .expect("built-in formula must parse");
        registry
    }

    /// Register a new formula. Fails on a duplicate name or an expression
    /// that does not parse.
    pub fn register(&mut self, name: &str, expr: &str) -> MasrafResult<()> {
        if self.formulas.contains_key(name) {
            return Err(MasrafError::DuplicateFormula(name.to_string()));
        }
        let formula = Formula::parse(name, expr)?;
        self.order.push(name.to_string());
        self.formulas.insert(name.to_string(), formula);
        Ok(())
    }

    /// Replace the formula of this name, or insert it if absent. The old
    /// expression is gone entirely, with no merging.
    pub fn override_formula(&mut self, name: &str, expr: &str) -> MasrafResult<()> {
        let formula = Formula::parse(name, expr)?;
        if self.formulas.insert(name.to_string(), formula).is_none() {
            self.order.push(name.to_string());
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Formula> {
        self.formulas.get(name)
    }

    /// All formulas in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Formula> + '_ {
        self.order.iter().filter_map(|name| self.formulas.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Load an external (name, expr) source, override-or-insert per entry.
    /// Malformed entries (blank name/expr, expression that fails to parse)
    /// are skipped and reported, never fatal.
    pub fn load_pairs<I>(&mut self, pairs: I) -> FormulaLoadReport
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut report = FormulaLoadReport::default();
        for (name, expr) in pairs {
            let name = name.trim().to_string();
            let expr = expr.trim().to_string();
            if name.is_empty() || expr.is_empty() {
                skip(&mut report, name, expr, "missing name or expr".to_string());
                continue;
            }
            match self.override_formula(&name, &expr) {
                Ok(()) => report.loaded += 1,
                Err(e) => skip(&mut report, name, expr, e.to_string()),
            }
        }
        report
    }
}

fn skip(report: &mut FormulaLoadReport, name: String, expr: String, reason: String) {
    tracing::warn!(name = name.as_str(), reason = reason.as_str(), "formula entry skipped");
    report.skipped.push(SkippedFormula { name, expr, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Component;

    #[test]
    fn test_defaults_seed_process_maliyeti() {
        let registry = FormulaRegistry::with_defaults();
        let formula = registry.get(PROCESS_MALIYETI).unwrap();
        assert_eq!(formula.expr, "AMOR + DIS + EDIS + ENER + GUG");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = FormulaRegistry::with_defaults();
        let err = registry.register(PROCESS_MALIYETI, "AMOR").unwrap_err();
        assert!(matches!(err, MasrafError::DuplicateFormula(_)));
    }

    #[test]
    fn test_override_replaces_not_merges() {
        let mut registry = FormulaRegistry::with_defaults();
        registry
            .override_formula(PROCESS_MALIYETI, "AMOR + DIS")
            .unwrap();
        let formula = registry.get(PROCESS_MALIYETI).unwrap();
        assert_eq!(formula.expr, "AMOR + DIS");

        // no residue of the default: a row without ENER now evaluates fine
        let mut bindings = ComponentBindings::new();
        bindings.set(Component::Amor, Some(1.0));
        bindings.set(Component::Dis, Some(2.0));
        assert_eq!(formula.evaluate(&bindings), Ok(3.0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut registry = FormulaRegistry::with_defaults();
        registry.register("ISCILIK", "DIS + EDIS").unwrap();
        registry.register("ENERJI_ORAN", "ENER / GUG").unwrap();
        let names: Vec<&str> = registry.all().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![PROCESS_MALIYETI, "ISCILIK", "ENERJI_ORAN"]);
    }

    #[test]
    fn test_load_pairs_skips_malformed_keeps_valid() {
        let mut registry = FormulaRegistry::with_defaults();
        let report = registry.load_pairs(vec![
            ("ISCILIK".to_string(), "DIS + EDIS".to_string()),
            ("".to_string(), "AMOR".to_string()),
            ("BROKEN".to_string(), "AMOR +".to_string()),
        ]);

        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(registry.get("ISCILIK").is_some());
        assert!(registry.get("BROKEN").is_none());
        // defaults untouched for names not overridden
        assert!(registry.get(PROCESS_MALIYETI).is_some());
    }

    #[test]
    fn test_load_pairs_unknown_identifier_is_skipped() {
        let mut registry = FormulaRegistry::with_defaults();
        let report = registry.load_pairs(vec![(
            "KAR".to_string(),
            "CIRO - MALIYET".to_string(),
        )]);
        assert_eq!(report.loaded, 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("CIRO"));
    }
}
