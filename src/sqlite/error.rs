//! Error types for SQLite operations.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("cannot open database {}: {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("schema error: {0}")]
    Schema(String),

    #[error("unknown field `{field}` on table `{table}`")]
    UnknownField { table: &'static str, field: String },

    // -------------------------------------------------------------------------
    // Write Errors
    // -------------------------------------------------------------------------
    #[error("no row in `{table}` with key {key}")]
    NotFound { table: &'static str, key: i64 },

    #[error("constraint violated on `{table}`: {source}")]
    Constraint {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("batch aborted at record {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    // -------------------------------------------------------------------------
    // Mapping Errors
    // -------------------------------------------------------------------------
    #[error("mapping error: {0}")]
    Mapping(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl Error {
    /// Innermost error, looking through batch wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Batch { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn batch(index: usize, source: Error) -> Self {
        Error::Batch {
            index,
            source: Box::new(source),
        }
    }

    /// Classifies a driver error raised while writing to `table`.
    pub(crate) fn from_write(table: &'static str, err: rusqlite::Error) -> Self {
        let constraint = matches!(
            &err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
        );
        if constraint {
            Error::Constraint { table, source: err }
        } else {
            Error::Database(err)
        }
    }
}
