use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Canonical key field: business-unit code (İş Yeri Kodu).
pub const BUSINESS_UNIT: &str = "business_unit";
/// Canonical key field: cost-center code (Masraf Yeri Kodu).
pub const COST_CENTER: &str = "cost_center";

//==============================================================================
// Cost Components
//==============================================================================

/// The five canonical cost components. The formula grammar is closed over
/// exactly this set; anything else is an unknown identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Component {
    /// Depreciation (amortisman)
    Amor,
    /// Direct labor (direkt işçilik)
    Dis,
    /// Indirect labor (endirekt işçilik)
    Edis,
    /// Energy (enerji)
    Ener,
    /// Overhead (genel üretim gideri)
    Gug,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Amor,
        Component::Dis,
        Component::Edis,
        Component::Ener,
        Component::Gug,
    ];

    /// Canonical (uppercase) field name
    pub fn name(self) -> &'static str {
        match self {
            Component::Amor => "AMOR",
            Component::Dis => "DIS",
            Component::Edis => "EDIS",
            Component::Ener => "ENER",
            Component::Gug => "GUG",
        }
    }

    /// Resolve a canonical component name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Component> {
        Component::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-row component values. Absent is a first-class state, never a
/// sentinel zero: downstream arithmetic must see the difference between
/// a missing component and one that is genuinely 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentBindings {
    #[serde(rename = "AMOR")]
    amor: Option<f64>,
    #[serde(rename = "DIS")]
    dis: Option<f64>,
    #[serde(rename = "EDIS")]
    edis: Option<f64>,
    #[serde(rename = "ENER")]
    ener: Option<f64>,
    #[serde(rename = "GUG")]
    gug: Option<f64>,
}

impl ComponentBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, component: Component) -> Option<f64> {
        match component {
            Component::Amor => self.amor,
            Component::Dis => self.dis,
            Component::Edis => self.edis,
            Component::Ener => self.ener,
            Component::Gug => self.gug,
        }
    }

    pub fn set(&mut self, component: Component, value: Option<f64>) {
        let slot = match component {
            Component::Amor => &mut self.amor,
            Component::Dis => &mut self.dis,
            Component::Edis => &mut self.edis,
            Component::Ener => &mut self.ener,
            Component::Gug => &mut self.gug,
        };
        *slot = value;
    }

    /// Add to a component's running total, treating the first present
    /// value as the start of the sum.
    pub fn accumulate(&mut self, component: Component, value: f64) {
        let current = self.get(component).unwrap_or(0.0);
        self.set(component, Some(current + value));
    }

    pub fn is_present(&self, component: Component) -> bool {
        self.get(component).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Component, Option<f64>)> + '_ {
        Component::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

//==============================================================================
// Cells, Rows, Tables
//==============================================================================

/// A single cell. Never an error value: anything that fails coercion
/// upstream lands here as `Text` or `Empty`, not as a poison marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Render for display/keys. Whole numbers drop their fraction so a
    /// numeric code like 1020.0 compares equal to the string "1020".
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Empty => String::new(),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One record: field name → cell value. Column order lives on the owning
/// [`Table`]; absent fields read as `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    #[serde(flatten)]
    fields: HashMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: CellValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    /// Like [`get`](Self::get) but missing fields read as `Empty`.
    pub fn value(&self, field: &str) -> &CellValue {
        self.fields.get(field).unwrap_or(&EMPTY_CELL)
    }
}

impl FromIterator<(String, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// An ordered sequence of rows sharing one schema. `columns` carries the
/// display/serialization order; rows may omit fields, which read back as
/// `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Set `name` to the same value in every row, registering the column
    /// if it is new. Used for source-file tagging at import time.
    pub fn set_column(&mut self, name: &str, value: CellValue) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
        for row in &mut self.rows {
            row.set(name, value.clone());
        }
    }

    /// Outer-join append: the column set becomes the union (this table's
    /// order first), and rows from either side read `Empty` for columns
    /// they never had.
    pub fn append(&mut self, other: Table) {
        for column in other.columns {
            if !self.has_column(&column) {
                self.columns.push(column);
            }
        }
        self.rows.extend(other.rows);
    }
}
