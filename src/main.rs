use clap::{Parser, Subcommand};
use masraf::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "masraf")]
#[command(about = "Reconcile plant cost tables and evaluate cost-component formulas")]
#[command(long_about = "Masraf - cost-component reconciliation

Loads cost exports (CSV/XLSX) with headers in any of the known spellings
(Turkish or English), maps them onto the canonical business_unit /
cost_center / AMOR / DIS / EDIS / ENER / GUG schema, and evaluates the
registered formulas per row and in aggregate.

COMMANDS:
  calculate  - Filter rows and evaluate every registered formula
  reconcile  - Match a system-of-record table against a staged table
  formulas   - Show the effective formula registry

EXAMPLES:
  masraf calculate maliyet.xlsx --business-unit A1 --cost-center C1
  masraf calculate ocak.csv subat.csv --formulas IS_PLAN_FORMULLER.xlsx -o out.xlsx
  masraf reconcile --upper sistem.xlsx --lower yeni.xlsx -d farklar/
  masraf formulas --formulas IS_PLAN_FORMULLER.xlsx")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter rows and evaluate every registered formula
    Calculate {
        /// Cost table file(s) (.csv, .xlsx); several files are appended
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// External formula file (columns: name, expr); overrides defaults by name
        #[arg(short, long)]
        formulas: Option<PathBuf>,

        /// YAML header-alias file replacing the built-in synonym table
        #[arg(long)]
        aliases: Option<PathBuf>,

        /// Restrict to this business-unit code (exact match)
        #[arg(short, long)]
        business_unit: Option<String>,

        /// Restrict to this cost-center code (exact match)
        #[arg(short, long)]
        cost_center: Option<String>,

        /// Write the per-row detail to this file (.csv or .xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the full result as JSON instead of the summary
        #[arg(long)]
        json: bool,

        /// Show verbose loading steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Match a system-of-record table against a staged table on the
    /// (business_unit, cost_center) key
    Reconcile {
        /// System-of-record file(s)
        #[arg(short, long, required = true, num_args = 1..)]
        upper: Vec<PathBuf>,

        /// Staged/incoming file(s)
        #[arg(short, long, required = true, num_args = 1..)]
        lower: Vec<PathBuf>,

        /// YAML header-alias file replacing the built-in synonym table
        #[arg(long)]
        aliases: Option<PathBuf>,

        /// Write matched/upper_only/lower_only CSVs into this directory
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Show verbose loading steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the effective formula registry (defaults plus overrides)
    Formulas {
        /// External formula file (columns: name, expr)
        #[arg(short, long)]
        formulas: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("masraf=warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calculate {
            files,
            formulas,
            aliases,
            business_unit,
            cost_center,
            output,
            json,
            verbose,
        } => cli::calc(
            files,
            formulas,
            aliases,
            business_unit,
            cost_center,
            output,
            json,
            verbose,
        )?,

        Commands::Reconcile {
            upper,
            lower,
            aliases,
            output_dir,
            verbose,
        } => cli::reconcile(upper, lower, aliases, output_dir, verbose)?,

        Commands::Formulas { formulas } => cli::formulas(formulas)?,
    }

    Ok(())
}
