//! Error types for the data-access layer.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single filtered read against an asset.
///
/// Carried inside a [`QueryResult`](super::QueryResult) instead of being
/// propagated, so every variant owns plain data and can be cloned into the
/// query cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Data file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Cannot mount {}: the path contains both quote characters", .0.display())]
    UnsupportedPath(PathBuf),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Query ran out of memory, narrow the date range or add club filters ({0})")]
    OutOfMemory(String),

    #[error("Query failed: {0}")]
    Engine(String),
}

impl QueryError {
    /// Classify a SQLite failure as memory-related or generic.
    pub fn from_engine(err: rusqlite::Error) -> Self {
        let is_memory = match &err {
            rusqlite::Error::SqliteFailure(e, _) => {
                e.code == rusqlite::ErrorCode::OutOfMemory
            }
            _ => false,
        } || err.to_string().to_lowercase().contains("out of memory");

        if is_memory {
            QueryError::OutOfMemory(err.to_string())
        } else {
            QueryError::Engine(err.to_string())
        }
    }
}

/// Registry lookups and startup validation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown asset '{name}'. Available assets: {available}")]
    UnknownAsset { name: String, available: String },

    #[error("Missing required assets: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_failure_is_classified() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_NOMEM),
            None,
        );
        assert!(matches!(QueryError::from_engine(err), QueryError::OutOfMemory(_)));
    }

    #[test]
    fn test_generic_failure_is_classified() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some("no such column: foo".to_string()),
        );
        match QueryError::from_engine(err) {
            QueryError::Engine(msg) => assert!(msg.contains("no such column")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
