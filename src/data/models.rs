//! Data models for filtered reads over the prepared CSV assets.

use serde::Serialize;

use super::error::QueryError;

/// A single typed value read from a CSV cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Type a raw CSV field: empty is null, numeric literals become numbers.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }
        // Only plain decimal literals; keeps "nan", "inf" and the like as text
        let numeric_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        if numeric_chars && trimmed.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Cell::Float(f);
            }
        }
        Cell::Text(raw.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Rows read from an asset, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
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

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over the values of one column
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Cell> + 'a {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)))
    }

    /// Keep only the first `n` rows
    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
    }
}

/// Outcome of one filtered read.
///
/// `error` being set implies `table` is empty; `total_rows` is the count of
/// matching rows before the row ceiling was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub table: Table,
    pub sql: String,
    pub params: Vec<String>,
    pub error: Option<QueryError>,
    pub total_rows: usize,
}

impl QueryResult {
    pub fn ok(table: Table, sql: String, params: Vec<String>, total_rows: usize) -> Self {
        QueryResult {
            table,
            sql,
            params,
            error: None,
            total_rows,
        }
    }

    pub fn failed(sql: String, params: Vec<String>, error: QueryError) -> Self {
        QueryResult {
            table: Table::default(),
            sql,
            params,
            error: Some(error),
            total_rows: 0,
        }
    }

    /// Number of rows actually returned
    pub fn row_count(&self) -> usize {
        self.table.len()
    }

    /// Whether the row ceiling cut the result short
    pub fn truncated(&self) -> bool {
        self.total_rows > self.table.len()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

/// Debug report for a single asset file
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub asset: String,
    pub path: String,
    pub exists: bool,
    pub size_mb: Option<f64>,
    pub row_count: Option<usize>,
    pub columns: Vec<String>,
    pub sample: Vec<Vec<Cell>>,
    pub error: Option<String>,
}

/// Summary line for the asset listing
#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub row_count: Option<usize>,
    pub records_last_week: Option<usize>,
    pub first_date: Option<chrono::NaiveDate>,
    pub last_date: Option<chrono::NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_typing() {
        assert_eq!(Cell::from_text(""), Cell::Null);
        assert_eq!(Cell::from_text("  "), Cell::Null);
        assert_eq!(Cell::from_text("42"), Cell::Int(42));
        assert_eq!(Cell::from_text("-3"), Cell::Int(-3));
        assert_eq!(Cell::from_text("2.5"), Cell::Float(2.5));
        assert_eq!(Cell::from_text("GB1"), Cell::Text("GB1".to_string()));
        assert_eq!(Cell::from_text("nan"), Cell::Text("nan".to_string()));
        assert_eq!(
            Cell::from_text("2020-01-01"),
            Cell::Text("2020-01-01".to_string())
        );
    }

    #[test]
    fn test_cell_as_i64() {
        assert_eq!(Cell::Int(11).as_i64(), Some(11));
        assert_eq!(Cell::Float(11.0).as_i64(), Some(11));
        assert_eq!(Cell::Float(11.5).as_i64(), None);
        assert_eq!(Cell::Null.as_i64(), None);
    }

    #[test]
    fn test_failed_result_is_empty() {
        let result = QueryResult::failed(
            String::new(),
            Vec::new(),
            QueryError::InvalidFilter("bad".to_string()),
        );
        assert!(result.table.is_empty());
        assert_eq!(result.total_rows, 0);
        assert!(!result.truncated());
        assert!(result.error_message().unwrap().contains("bad"));
    }

    #[test]
    fn test_column_iterator() {
        let mut table = Table::new(vec!["a".to_string(), "b".to_string()]);
        table.rows.push(vec![Cell::Int(1), Cell::Int(2)]);
        table.rows.push(vec![Cell::Int(3), Cell::Int(4)]);
        let b: Vec<_> = table.column("b").cloned().collect();
        assert_eq!(b, vec![Cell::Int(2), Cell::Int(4)]);
        assert_eq!(table.column("missing").count(), 0);
    }
}
