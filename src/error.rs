use thiserror::Error;

pub type MasrafResult<T> = Result<T, MasrafError>;

/// Construction- and load-time failures. Formula evaluation failures are
/// row-and-formula scoped and live in [`crate::formula::EvalFailure`]
/// instead; they never surface through this type.
#[derive(Error, Debug)]
pub enum MasrafError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),

    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("formula parse error: {0}")]
    Formula(#[from] crate::formula::ParseError),

    #[error("formula `{0}` is already registered")]
    DuplicateFormula(String),

    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
}
