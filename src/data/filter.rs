//! Typed filters and their translation into parameter-bound SQL.
//!
//! A [`FilterSpec`] holds at most one date-range constraint, at most one
//! club-membership constraint and any number of column equality matches.
//! [`SelectQuery::build`] turns it into a single `SELECT *` whose values are
//! all bound parameters; identifiers spliced into the statement text are
//! always quoted.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput};

use super::catalog::{Asset, Membership};
use super::error::QueryError;

/// Date format used for bound date parameters
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date interval with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping reversed bounds
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self::normalized(start, end).0
    }

    /// Build a range and report whether the bounds had to be swapped
    pub fn normalized(start: NaiveDate, end: NaiveDate) -> (Self, bool) {
        if start > end {
            (DateRange { start: end, end: start }, true)
        } else {
            (DateRange { start, end }, false)
        }
    }

    /// Parse `YYYY-MM-DD` bounds
    pub fn parse(start: &str, end: &str) -> Result<(Self, bool), QueryError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
                QueryError::InvalidFilter(format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
            })
        };
        Ok(Self::normalized(parse(start)?, parse(end)?))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateFilter {
    pub column: String,
    pub range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClubFilter {
    pub columns: Vec<String>,
    pub mode: Membership,
    pub club_ids: BTreeSet<i64>,
}

/// A column that must equal a value, compared as text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnMatch {
    pub column: String,
    pub value: String,
}

impl ColumnMatch {
    /// Parse `column=value`. The value may be empty, the column may not.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let (column, value) = input.split_once('=').ok_or_else(|| {
            QueryError::InvalidFilter(format!("expected COLUMN=VALUE, got '{input}'"))
        })?;
        let column = column.trim();
        if column.is_empty() {
            return Err(QueryError::InvalidFilter(format!(
                "missing column name in '{input}'"
            )));
        }
        Ok(ColumnMatch {
            column: column.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl std::fmt::Display for ColumnMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

/// Constraints for one read of one asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    pub date: Option<DateFilter>,
    pub club: Option<ClubFilter>,
    pub matches: Vec<ColumnMatch>,
}

impl FilterSpec {
    /// No constraints: the whole asset
    pub fn all() -> Self {
        Self::default()
    }

    /// Build the constraints that apply to `asset`.
    ///
    /// The date range is dropped for assets without a date column and the
    /// club ids for assets without club columns. An empty id set means no
    /// club constraint.
    pub fn for_asset(asset: &Asset, range: Option<DateRange>, club_ids: &BTreeSet<i64>) -> Self {
        let date = match (&asset.date_column, range) {
            (Some(column), Some(range)) => Some(DateFilter {
                column: column.clone(),
                range,
            }),
            _ => None,
        };

        let club = match &asset.club_columns {
            Some(config) if !club_ids.is_empty() => Some(ClubFilter {
                columns: config.columns.clone(),
                mode: config.mode,
                club_ids: club_ids.clone(),
            }),
            _ => None,
        };

        FilterSpec {
            date,
            club,
            matches: Vec::new(),
        }
    }

    /// Add column equality matches; repeated columns must all match
    pub fn with_matches(mut self, matches: impl IntoIterator<Item = ColumnMatch>) -> Self {
        self.matches.extend(matches);
        self
    }

    /// Columns the filters refer to
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        if let Some(date) = &self.date {
            columns.push(date.column.as_str());
        }
        if let Some(club) = &self.club {
            match club.mode {
                Membership::Single => columns.extend(club.columns.first().map(String::as_str)),
                Membership::Any => columns.extend(club.columns.iter().map(String::as_str)),
            }
        }
        columns.extend(self.matches.iter().map(|m| m.column.as_str()));
        columns
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.club.is_none() && self.matches.is_empty()
    }
}

/// A bound SQL value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Text(s) => s.to_sql(),
            SqlParam::Int(i) => i.to_sql(),
        }
    }
}

impl std::fmt::Display for SqlParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlParam::Text(s) => write!(f, "'{s}'"),
            SqlParam::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"col" IN (?, ?, ...)`, pushing one parameter per value.
///
/// CSV columns are read as text, so ids are bound as text.
fn in_clause<'a>(
    column: &str,
    values: impl Iterator<Item = &'a i64>,
    params: &mut Vec<SqlParam>,
) -> String {
    let placeholders: Vec<&str> = values
        .map(|v| {
            params.push(SqlParam::Text(v.to_string()));
            "?"
        })
        .collect();
    format!("{} IN ({})", quote_ident(column), placeholders.join(", "))
}

/// A SELECT over one source table with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    sql: String,
    params: Vec<SqlParam>,
}

impl SelectQuery {
    /// Translate a filter spec into `SELECT * FROM <source> [WHERE ...]`
    pub fn build(source: &str, spec: &FilterSpec) -> Result<Self, QueryError> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(date) = &spec.date {
            conditions.push(format!(
                "date({}) BETWEEN ? AND ?",
                quote_ident(&date.column)
            ));
            params.push(SqlParam::Text(date.range.start().format(DATE_FORMAT).to_string()));
            params.push(SqlParam::Text(date.range.end().format(DATE_FORMAT).to_string()));
        }

        if let Some(club) = &spec.club {
            if club.columns.is_empty() {
                return Err(QueryError::InvalidFilter(
                    "club filter has no columns to match".to_string(),
                ));
            }
            if club.club_ids.is_empty() {
                return Err(QueryError::InvalidFilter(
                    "club filter has no club ids".to_string(),
                ));
            }
            match club.mode {
                Membership::Single => {
                    conditions.push(in_clause(&club.columns[0], club.club_ids.iter(), &mut params));
                }
                Membership::Any => {
                    let per_column: Vec<String> = club
                        .columns
                        .iter()
                        .map(|col| in_clause(col, club.club_ids.iter(), &mut params))
                        .collect();
                    conditions.push(format!("({})", per_column.join(" OR ")));
                }
            }
        }

        for m in &spec.matches {
            if m.column.is_empty() {
                return Err(QueryError::InvalidFilter(
                    "column match has no column".to_string(),
                ));
            }
            conditions.push(format!("{} = ?", quote_ident(&m.column)));
            params.push(SqlParam::Text(m.value.clone()));
        }

        let mut sql = format!("SELECT * FROM {}", quote_ident(source));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        Ok(SelectQuery { sql, params })
    }

    /// Wrap a hand-written statement; values must still go through `params`
    pub fn from_parts(sql: String, params: Vec<SqlParam>) -> Self {
        SelectQuery { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Parameters rendered for display
    pub fn params_display(&self) -> Vec<String> {
        self.params.iter().map(|p| p.to_string()).collect()
    }

    /// `SELECT COUNT(*)` over the same rows
    pub fn count(&self) -> SelectQuery {
        SelectQuery {
            sql: format!("SELECT COUNT(*) FROM ({})", self.sql),
            params: self.params.clone(),
        }
    }

    /// The same query capped at `limit` rows
    pub fn limited(&self, limit: usize) -> SelectQuery {
        let mut params = self.params.clone();
        params.push(SqlParam::Int(limit as i64));
        SelectQuery {
            sql: format!("{} LIMIT ?", self.sql),
            params,
        }
    }
}
