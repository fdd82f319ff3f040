use std::fmt;

use super::index::IndexColumns;
use super::validate::TableShape;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a variable column
// ---------------------------------------------------------------------------

/// A typed cell value. Columns are homogeneous: every non-null cell of a
/// column has the variant matching the column's [`ColumnType`].
/// Categorical levels are collected into `BTreeSet`s, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Null => write!(f, ""),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64` (numeric cells only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column metadata and typed columns
// ---------------------------------------------------------------------------

/// Declared scalar type of a variable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Integer => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        };
        f.write_str(s)
    }
}

/// Name and "is factor" flag of a variable, read from the two header rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMeta {
    pub name: String,
    /// The flag exactly as written in the sheet (free text).
    pub factor_flag: String,
}

impl VariableMeta {
    /// Lenient reading of the free-text factor flag.
    pub fn is_factor(&self) -> bool {
        matches!(
            self.factor_flag.trim().to_lowercase().as_str(),
            "sim" | "s" | "yes" | "y" | "true" | "1" | "x"
        )
    }
}

/// Where a column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// A variable column of the uploaded sheet.
    Sheet,
    /// Derived from the compound index (year / month / region).
    Index,
}

/// One typed variable column.
#[derive(Debug, Clone)]
pub struct Column {
    pub meta: VariableMeta,
    pub dtype: ColumnType,
    pub origin: ColumnOrigin,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Build a sheet column from raw cells, inferring the narrowest type that
    /// fits every non-empty cell (integer → float → text).
    pub fn from_raw(meta: VariableMeta, raw: &[&str]) -> Self {
        let mut dtype = ColumnType::Integer;
        for cell in raw.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if dtype == ColumnType::Integer && cell.parse::<i64>().is_err() {
                dtype = ColumnType::Float;
            }
            if dtype == ColumnType::Float && cell.parse::<f64>().is_err() {
                dtype = ColumnType::Text;
                break;
            }
        }

        let values = raw
            .iter()
            .map(|c| {
                let cell = c.trim();
                if cell.is_empty() {
                    return CellValue::Null;
                }
                match dtype {
                    ColumnType::Integer => cell
                        .parse::<i64>()
                        .map(CellValue::Integer)
                        .unwrap_or(CellValue::Null),
                    ColumnType::Float => cell
                        .parse::<f64>()
                        .map(CellValue::Float)
                        .unwrap_or(CellValue::Null),
                    ColumnType::Text => CellValue::Text(cell.to_string()),
                }
            })
            .collect();

        Column {
            meta,
            dtype,
            origin: ColumnOrigin::Sheet,
            values,
        }
    }

    /// A text column derived from the compound index.
    pub fn derived_text(name: &str, values: &[String]) -> Self {
        Column {
            meta: VariableMeta {
                name: name.to_string(),
                factor_flag: String::new(),
            },
            dtype: ColumnType::Text,
            origin: ColumnOrigin::Index,
            values: values
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::Text(v.clone())
                    }
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype.is_numeric()
    }

    /// Non-null numeric values in row order (empty for text columns).
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(CellValue::as_f64).collect()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

// ---------------------------------------------------------------------------
// RawSheet – the file as read, before typing
// ---------------------------------------------------------------------------

/// Untyped sheet: header row, factor-flag row, data records.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    /// Row 1, including the (usually blank) cell above the index column.
    pub headers: Vec<String>,
    /// Row 2, aligned with `headers`. May be shorter than `headers`.
    pub factor_flags: Vec<String>,
    /// Rows 3 onwards.
    pub records: Vec<Vec<String>>,
}

impl TableShape for RawSheet {
    fn n_columns(&self) -> usize {
        self.headers.len()
    }
}

// ---------------------------------------------------------------------------
// PanelDataset – the typed table
// ---------------------------------------------------------------------------

/// Typed panel table: compound index plus ordered variable columns.
#[derive(Debug, Clone)]
pub struct PanelDataset {
    /// Header of the index column (often blank in the sheet).
    pub index_name: String,
    /// Compound index strings, one per row.
    pub index: Vec<String>,
    /// Year / month / region parts of `index`.
    pub decomposed: IndexColumns,
    /// Variable columns: sheet columns first, then index-derived ones.
    pub columns: Vec<Column>,
}

impl PanelDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.meta.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    /// Columns that came from the uploaded sheet.
    pub fn sheet_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.origin == ColumnOrigin::Sheet)
    }

    /// Numeric sheet columns, the candidates for the dependent variable.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.sheet_columns().filter(|c| c.is_numeric())
    }
}

impl TableShape for PanelDataset {
    /// Index column plus sheet variables; derived columns do not count.
    fn n_columns(&self) -> usize {
        1 + self.sheet_columns().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, flag: &str) -> VariableMeta {
        VariableMeta {
            name: name.to_string(),
            factor_flag: flag.to_string(),
        }
    }

    #[test]
    fn test_infers_integer_column() {
        let col = Column::from_raw(meta("y", ""), &["1", " 2", "", "10"]);
        assert_eq!(col.dtype, ColumnType::Integer);
        assert_eq!(col.values[2], CellValue::Null);
        assert_eq!(col.numeric_values(), vec![1.0, 2.0, 10.0]);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_mixed_int_and_float_widens_to_float() {
        let col = Column::from_raw(meta("x", ""), &["1", "2.5"]);
        assert_eq!(col.dtype, ColumnType::Float);
        assert_eq!(col.values[0], CellValue::Float(1.0));
    }

    #[test]
    fn test_any_text_makes_text_column() {
        let col = Column::from_raw(meta("g", ""), &["1", "north", "2.0"]);
        assert_eq!(col.dtype, ColumnType::Text);
        assert_eq!(col.values[0], CellValue::Text("1".into()));
        assert!(col.numeric_values().is_empty());
    }

    #[test]
    fn test_factor_flag_is_lenient() {
        assert!(meta("a", "Sim").is_factor());
        assert!(meta("a", " yes ").is_factor());
        assert!(meta("a", "1").is_factor());
        assert!(!meta("a", "não").is_factor());
        assert!(!meta("a", "").is_factor());
    }

    #[test]
    fn test_cell_ordering_groups_by_variant() {
        let mut v = vec![
            CellValue::Text("b".into()),
            CellValue::Integer(3),
            CellValue::Null,
            CellValue::Integer(-1),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                CellValue::Null,
                CellValue::Integer(-1),
                CellValue::Integer(3),
                CellValue::Text("b".into()),
            ]
        );
    }
}
