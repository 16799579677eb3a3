//! Embedded SQL access to the prepared CSV assets.
//!
//! Every call opens its own in-memory SQLite connection, mounts the asset's
//! CSV file as a virtual table named `asset`, runs its statements and closes
//! the connection again before returning. Nothing is shared between calls
//! except the caches held by [`Storage`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, NaiveDate};
use moka::sync::Cache;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use super::catalog::Asset;
use super::error::QueryError;
use super::filter::{quote_ident, FilterSpec, SelectQuery, SqlParam, DATE_FORMAT};
use super::models::{Cell, ProbeReport, QueryResult, Table};

/// Name of the virtual table the CSV file is mounted as
pub const SOURCE_TABLE: &str = "asset";

/// Lifetime of every cached entry
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Query results kept across interactions
const QUERY_CACHE_ENTRIES: u64 = 5;

/// Date bounds kept, one entry per asset file
const DATE_CACHE_ENTRIES: u64 = 20;

/// Rows shown by [`Storage::probe`]
const PROBE_SAMPLE_ROWS: usize = 5;

/// Convert a SQLite value into a cell. CSV columns arrive as text.
fn cell_from_ref(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Int(i),
        ValueRef::Real(f) => Cell::Float(f),
        ValueRef::Text(t) => Cell::from_text(&String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => Cell::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

/// Parse a date returned by SQLite's `date()` function
fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), DATE_FORMAT).ok())
}

/// Quote `path` as a csv module argument.
///
/// The module strips one pair of matching outer quotes and keeps the rest
/// verbatim, so the delimiter must be a quote character absent from the path.
fn filename_arg(path: &Path) -> Result<String, QueryError> {
    let raw = path.to_string_lossy();
    if !raw.contains('\'') {
        Ok(format!("'{raw}'"))
    } else if !raw.contains('"') {
        Ok(format!("\"{raw}\""))
    } else {
        Err(QueryError::UnsupportedPath(path.to_path_buf()))
    }
}

/// Open a fresh connection with the CSV file at `path` mounted as [`SOURCE_TABLE`]
fn open_source(path: &Path) -> Result<Connection, QueryError> {
    if !path.exists() {
        return Err(QueryError::MissingFile(path.to_path_buf()));
    }
    let filename = filename_arg(path)?;
    let conn = Connection::open_in_memory().map_err(QueryError::from_engine)?;
    rusqlite::vtab::csvtab::load_module(&conn).map_err(QueryError::from_engine)?;
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE {} USING csv(filename={filename}, header=yes)",
        quote_ident(SOURCE_TABLE),
    ))
    .map_err(QueryError::from_engine)?;
    Ok(conn)
}

/// Ask SQLite to hand back memory, then close the connection
fn release(conn: Connection) {
    if let Err(e) = conn.execute_batch("PRAGMA shrink_memory") {
        log::debug!("shrink_memory failed: {e}");
    }
    if let Err((_, e)) = conn.close() {
        log::warn!("Failed to close query connection: {e}");
    }
}

/// Header of the mounted CSV file
fn source_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(SOURCE_TABLE)))?;
    let columns = stmt.column_names().into_iter().map(String::from).collect();
    Ok(columns)
}

fn count_rows(conn: &Connection, query: &SelectQuery) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row(query.sql(), params_from_iter(query.params()), |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as usize)
}

fn read_table(conn: &Connection, query: &SelectQuery) -> rusqlite::Result<Table> {
    let mut stmt = conn.prepare(query.sql())?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut table = Table::new(columns);

    let mut rows = stmt.query(params_from_iter(query.params()))?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(cell_from_ref(row.get_ref(idx)?));
        }
        table.rows.push(cells);
    }
    Ok(table)
}

/// Fail with [`QueryError::InvalidFilter`] if any column is absent from the header
fn ensure_columns(conn: &Connection, asset: &Asset, columns: &[&str]) -> Result<(), QueryError> {
    let header = source_columns(conn).map_err(QueryError::from_engine)?;
    match columns.iter().find(|c| !header.iter().any(|h| h == *c)) {
        Some(missing) => Err(QueryError::InvalidFilter(format!(
            "column '{missing}' not found in {}",
            asset.file_name
        ))),
        None => Ok(()),
    }
}

/// Run `f` against a freshly mounted copy of the asset
fn with_source<T>(
    asset: &Asset,
    f: impl FnOnce(&Connection) -> Result<T, QueryError>,
) -> Result<T, QueryError> {
    let conn = open_source(&asset.prep_path())?;
    let result = f(&conn);
    release(conn);
    result
}

/// Filtered read without caching.
///
/// Counts matching rows first and caps the read at the asset's ceiling;
/// every failure ends up in the returned [`QueryResult`].
pub fn run_query(asset: &Asset, spec: &FilterSpec) -> QueryResult {
    let path = asset.prep_path();
    if !path.exists() {
        return QueryResult::failed(String::new(), Vec::new(), QueryError::MissingFile(path));
    }

    let select = match SelectQuery::build(SOURCE_TABLE, spec) {
        Ok(q) => q,
        Err(e) => return QueryResult::failed(String::new(), Vec::new(), e),
    };

    let started = Instant::now();
    let mut executed = select.clone();
    let outcome = with_source(asset, |conn| {
        ensure_columns(conn, asset, &spec.referenced_columns())?;

        let total = count_rows(conn, &select.count()).map_err(QueryError::from_engine)?;
        if total > asset.query_row_cap {
            log::info!(
                "{}: {total} matching rows, limiting read to {}",
                asset.name,
                asset.query_row_cap
            );
            executed = select.limited(asset.query_row_cap);
        }

        let table = read_table(conn, &executed).map_err(QueryError::from_engine)?;
        Ok((table, total))
    });

    let sql = executed.sql().to_string();
    let params = executed.params_display();
    match outcome {
        Ok((table, total)) => {
            log::debug!(
                "{}: read {} of {total} rows in {:?}",
                asset.name,
                table.len(),
                started.elapsed()
            );
            QueryResult::ok(table, sql, params, total)
        }
        Err(e) => {
            log::warn!("{}: {e}", asset.name);
            QueryResult::failed(sql, params, e)
        }
    }
}

/// Data-access entry point, holding the per-process caches
pub struct Storage {
    query_cache: Cache<(String, FilterSpec), QueryResult>,
    date_cache: Cache<PathBuf, (NaiveDate, NaiveDate)>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    pub fn new() -> Self {
        Storage {
            query_cache: Cache::builder()
                .time_to_live(CACHE_TTL)
                .max_capacity(QUERY_CACHE_ENTRIES)
                .build(),
            date_cache: Cache::builder()
                .time_to_live(CACHE_TTL)
                .max_capacity(DATE_CACHE_ENTRIES)
                .build(),
        }
    }

    /// Filtered read, served from cache when the same asset and filters were
    /// read recently. Failed reads are not cached.
    pub fn query(&self, asset: &Asset, spec: &FilterSpec) -> QueryResult {
        let key = (asset.name.clone(), spec.clone());
        if let Some(hit) = self.query_cache.get(&key) {
            log::debug!("{}: served from cache", asset.name);
            return hit;
        }
        let result = run_query(asset, spec);
        if result.error.is_none() {
            self.query_cache.insert(key, result.clone());
        }
        result
    }

    /// Forget every cached result and date bound
    pub fn clear_cache(&self) {
        self.query_cache.invalidate_all();
        self.date_cache.invalidate_all();
    }

    /// Run an arbitrary select against the asset
    pub fn fetch(&self, asset: &Asset, query: &SelectQuery) -> Result<Table, QueryError> {
        with_source(asset, |conn| {
            read_table(conn, query).map_err(QueryError::from_engine)
        })
    }

    /// Read a subset of columns in full
    pub fn read_columns(&self, asset: &Asset, columns: &[&str]) -> Result<Table, QueryError> {
        with_source(asset, |conn| {
            ensure_columns(conn, asset, columns)?;
            let projection: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            let query = SelectQuery::from_parts(
                format!(
                    "SELECT {} FROM {}",
                    projection.join(", "),
                    quote_ident(SOURCE_TABLE)
                ),
                Vec::new(),
            );
            read_table(conn, &query).map_err(QueryError::from_engine)
        })
    }

    pub fn row_count(&self, asset: &Asset) -> Result<usize, QueryError> {
        with_source(asset, |conn| {
            let query = SelectQuery::from_parts(
                format!("SELECT COUNT(*) FROM {}", quote_ident(SOURCE_TABLE)),
                Vec::new(),
            );
            count_rows(conn, &query).map_err(QueryError::from_engine)
        })
    }

    /// Earliest and latest date in the asset's date column.
    ///
    /// Only found bounds are cached, so an asset pulled later is picked up.
    pub fn date_bounds(&self, asset: &Asset) -> Option<(NaiveDate, NaiveDate)> {
        let column = asset.date_column.as_deref()?;
        let key = asset.prep_path();
        if let Some(bounds) = self.date_cache.get(&key) {
            return Some(bounds);
        }
        let bounds = Self::scan_date_bounds(asset, column)?;
        self.date_cache.insert(key, bounds);
        Some(bounds)
    }

    fn scan_date_bounds(asset: &Asset, column: &str) -> Option<(NaiveDate, NaiveDate)> {
        let result = with_source(asset, |conn| {
            ensure_columns(conn, asset, &[column])?;
            let sql = format!(
                "SELECT MIN(date({col})), MAX(date({col})) FROM {}",
                quote_ident(SOURCE_TABLE),
                col = quote_ident(column),
            );
            conn.query_row(&sql, [], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(QueryError::from_engine)
        });

        match result {
            Ok((min, max)) => Some((parse_date(min)?, parse_date(max)?)),
            Err(e) => {
                log::debug!("{}: no date bounds: {e}", asset.name);
                None
            }
        }
    }

    /// Rows dated strictly after `today - days`
    pub fn records_delta(&self, asset: &Asset, days: i64, today: NaiveDate) -> Option<usize> {
        let column = asset.date_column.as_deref()?;
        let cutoff = today - ChronoDuration::days(days);
        with_source(asset, |conn| {
            ensure_columns(conn, asset, &[column])?;
            let query = SelectQuery::from_parts(
                format!(
                    "SELECT COUNT(*) FROM {} WHERE date({}) > ?",
                    quote_ident(SOURCE_TABLE),
                    quote_ident(column)
                ),
                vec![SqlParam::Text(cutoff.format(DATE_FORMAT).to_string())],
            );
            count_rows(conn, &query).map_err(QueryError::from_engine)
        })
        .ok()
    }

    /// File, size, row count, header and a short sample of an asset
    pub fn probe(&self, asset: &Asset) -> ProbeReport {
        let path = asset.prep_path();
        let mut report = ProbeReport {
            asset: asset.name.clone(),
            path: path.display().to_string(),
            exists: path.exists(),
            size_mb: std::fs::metadata(&path)
                .ok()
                .map(|m| m.len() as f64 / (1024.0 * 1024.0)),
            row_count: None,
            columns: Vec::new(),
            sample: Vec::new(),
            error: None,
        };
        if !report.exists {
            report.error = Some(QueryError::MissingFile(path).to_string());
            return report;
        }

        let outcome = with_source(asset, |conn| {
            let total = count_rows(
                conn,
                &SelectQuery::from_parts(
                    format!("SELECT COUNT(*) FROM {}", quote_ident(SOURCE_TABLE)),
                    Vec::new(),
                ),
            )
            .map_err(QueryError::from_engine)?;
            let sample = read_table(
                conn,
                &SelectQuery::build(SOURCE_TABLE, &FilterSpec::all())?.limited(PROBE_SAMPLE_ROWS),
            )
            .map_err(QueryError::from_engine)?;
            Ok((total, sample))
        });

        match outcome {
            Ok((total, sample)) => {
                report.row_count = Some(total);
                report.columns = sample.columns;
                report.sample = sample.rows;
            }
            Err(e) => report.error = Some(e.to_string()),
        }
        report
    }
}
