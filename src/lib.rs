//! Masraf - cost-component reconciliation and formula engine
//!
//! This library matches two tabular cost datasets (an upper
//! system-of-record table and a lower staged table, keyed by
//! business-unit and cost-center codes) and evaluates named arithmetic
//! formulas over the five canonical cost components
//! (AMOR, DIS, EDIS, ENER, GUG).
//!
//! # Features
//!
//! - Header normalization with Turkish/English synonym aliases
//! - Locale-tolerant numeric coercion (decimal comma and point)
//! - A closed arithmetic formula language, parsed to an AST
//! - Composite-key matching with duplicate-key cross products
//! - Per-row and aggregate calculation with explicit failure markers
//!
//! # Example
//!
//! ```
//! use masraf::calculator::calculate_filtered;
//! use masraf::formula::FormulaRegistry;
//! use masraf::schema::SchemaNormalizer;
//! use masraf::types::{CellValue, Row, Table};
//!
//! let mut raw = Table::new(vec!["İş Yeri".into(), "Masraf Yeri".into(), "Enerji".into()]);
//! let mut row = Row::new();
//! row.set("İş Yeri", CellValue::Text("A1".into()));
//! row.set("Masraf Yeri", CellValue::Text("C1".into()));
//! row.set("Enerji", CellValue::Text("12,5".into()));
//! raw.push_row(row);
//!
//! let table = SchemaNormalizer::default().apply(&raw);
//! let registry = FormulaRegistry::with_defaults();
//! let result = calculate_filtered(&table, Some("A1"), None, &registry);
//!
//! assert_eq!(result.rows.len(), 1);
//! ```

pub mod calculator;
pub mod cli;
pub mod engine;
pub mod error;
pub mod formula;
pub mod io;
pub mod matcher;
pub mod resolver;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use calculator::{calculate, calculate_filtered, CalculationResult};
pub use engine::DataEngine;
pub use error::{MasrafError, MasrafResult};
pub use formula::{EvalFailure, Formula, FormulaRegistry};
pub use matcher::{match_tables, MatchResult};
pub use schema::SchemaNormalizer;
pub use types::{CellValue, Component, ComponentBindings, Row, Table};
