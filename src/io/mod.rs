//! Import/export collaborators around the in-memory core

pub mod export;
pub mod import;

pub use export::{
    result_detail_table, result_summary_table, write_result_csv, write_result_xlsx,
    write_table_csv, write_table_xlsx,
};
pub use import::{read_formula_pairs, read_table};
