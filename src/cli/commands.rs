//! CLI command handlers

use crate::calculator::{self, ReductionMode};
use crate::engine::DataEngine;
use crate::error::MasrafResult;
use crate::formula::FormulaRegistry;
use crate::io;
use crate::schema::{AliasTable, SchemaNormalizer};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Build the registry: defaults plus an optional external formula file.
/// `quiet` suppresses the status lines (JSON output mode).
fn load_registry(formulas: Option<&Path>, quiet: bool) -> MasrafResult<FormulaRegistry> {
    let mut registry = FormulaRegistry::with_defaults();
    if let Some(path) = formulas {
        let pairs = io::read_formula_pairs(path)?;
        let report = registry.load_pairs(pairs);
        if !quiet {
            println!(
                "   Formulas: {} loaded from {}",
                report.loaded,
                path.display()
            );
            for skipped in &report.skipped {
                println!(
                    "{}",
                    format!("   ⚠ skipped `{}`: {}", skipped.name, skipped.reason).yellow()
                );
            }
        }
    }
    Ok(registry)
}

/// Header aliases: the built-in table, or a YAML override file.
fn build_normalizer(aliases: Option<&Path>) -> MasrafResult<SchemaNormalizer> {
    Ok(match aliases {
        Some(path) => SchemaNormalizer::new(AliasTable::from_yaml_file(path)?),
        None => SchemaNormalizer::default(),
    })
}

fn load_into<F>(engine: &mut DataEngine, files: &[PathBuf], mut append: F) -> MasrafResult<usize>
where
    F: FnMut(&mut DataEngine, &crate::types::Table, &str),
{
    let mut rows = 0;
    for path in files {
        let table = io::read_table(path)?;
        rows += table.len();
        append(engine, &table, &file_name_of(path));
    }
    Ok(rows)
}

/// Execute the calculate command
pub fn calc(
    files: Vec<PathBuf>,
    formulas: Option<PathBuf>,
    aliases: Option<PathBuf>,
    business_unit: Option<String>,
    cost_center: Option<String>,
    output: Option<PathBuf>,
    json: bool,
    verbose: bool,
) -> MasrafResult<()> {
    if !json {
        println!("{}", "Masraf - Calculating cost components".bold().green());
    }

    let registry = load_registry(formulas.as_deref(), json)?;

    let mut engine = DataEngine::new(build_normalizer(aliases.as_deref())?);
    let rows_read = load_into(&mut engine, &files, |e, t, source| e.append_upper(t, source))?;
    if verbose && !json {
        println!("   Read {} rows from {} file(s)", rows_read, files.len());
        let suggestion = engine.suggest_filter_values();
        if suggestion.business_unit.is_some() || suggestion.cost_center.is_some() {
            println!(
                "   Dominant keys: business_unit={:?} cost_center={:?}",
                suggestion.business_unit, suggestion.cost_center
            );
        }
    }

    let result = calculator::calculate_filtered(
        engine.upper(),
        business_unit.as_deref(),
        cost_center.as_deref(),
        &registry,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "   {} row(s) after filter (business_unit={}, cost_center={})",
            result.rows.len(),
            business_unit.as_deref().unwrap_or("*"),
            cost_center.as_deref().unwrap_or("*"),
        );
        println!();
        println!("{}", "Component totals".bold());
        for (component, total) in result.component_totals.iter() {
            match total {
                Some(n) => println!("   {:<6} {}", component.name(), format_number(n)),
                None => println!("   {:<6} {}", component.name(), "absent".dimmed()),
            }
        }
        println!();
        println!("{}", "Formulas".bold());
        for entry in &result.summary {
            let value = match &entry.outcome {
                Ok(n) => format_number(*n).green().to_string(),
                Err(failure) => failure.code().red().to_string(),
            };
            let mode = match entry.mode {
                ReductionMode::Sum => "sum",
                ReductionMode::RatioOfSums => "ratio of sums",
            };
            println!(
                "   {:<20} {}  ({}; ok {}, failed {})",
                entry.formula, value, mode, entry.successes, entry.failures
            );
        }
    }

    if let Some(path) = output {
        write_result(&result, &path)?;
        if !json {
            println!();
            println!("{}", format!("✓ Written to {}", path.display()).green());
        }
    }

    Ok(())
}

fn write_result(
    result: &crate::calculator::CalculationResult,
    path: &Path,
) -> MasrafResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => io::write_result_xlsx(result, path),
        _ => io::write_result_csv(result, path),
    }
}

/// Execute the reconcile command: match the upper (system) files against
/// the lower (staged) files on the composite key.
pub fn reconcile(
    upper: Vec<PathBuf>,
    lower: Vec<PathBuf>,
    aliases: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    verbose: bool,
) -> MasrafResult<()> {
    println!("{}", "Masraf - Reconciling tables".bold().green());

    let mut engine = DataEngine::new(build_normalizer(aliases.as_deref())?);
    let upper_rows = load_into(&mut engine, &upper, |e, t, source| e.append_upper(t, source))?;
    let lower_rows = load_into(&mut engine, &lower, |e, t, source| e.append_lower(t, source))?;
    if verbose {
        println!("   Upper: {} rows, lower: {} rows", upper_rows, lower_rows);
    }

    let result = engine.match_tables();
    println!("   {} {}", "matched:".bold(), result.matched.len());
    println!("   {} {}", "upper only:".bold(), result.upper_only.len());
    println!("   {} {}", "lower only:".bold(), result.lower_only.len());

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(&dir)?;
        io::write_table_csv(&result.merged_table(), &dir.join("matched.csv"))?;
        io::write_table_csv(&result.upper_only, &dir.join("upper_only.csv"))?;
        io::write_table_csv(&result.lower_only, &dir.join("lower_only.csv"))?;
        println!(
            "{}",
            format!("✓ Written matched/upper_only/lower_only to {}", dir.display()).green()
        );
    }

    Ok(())
}

/// Execute the formulas command: show the effective registry.
pub fn formulas(formulas: Option<PathBuf>) -> MasrafResult<()> {
    println!("{}", "Masraf - Formula registry".bold().green());
    let registry = load_registry(formulas.as_deref(), false)?;
    for formula in registry.all() {
        let mode = if formula.is_ratio() {
            " (aggregated as ratio of sums)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("   {:<20} = {}{}", formula.name, formula.expr, mode);
    }
    Ok(())
}
