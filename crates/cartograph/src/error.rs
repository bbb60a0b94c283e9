#![forbid(unsafe_code)]

//! Error taxonomy for the graph construction pipeline.
//!
//! Identity errors are recovered locally: the offending record is dropped and
//! a diagnostic is attached to the file summary. Store errors are never
//! recovered locally; they abort the whole file's transaction.

use thiserror::Error;

/// A record could not be assigned a valid semantic id, or an id string could
/// not be parsed back into its components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("empty entity name for {kind} in {file}")]
    EmptyName { file: String, kind: &'static str },

    #[error("scope segment '{segment}' contains reserved separator")]
    ReservedSeparator { segment: String },

    #[error("malformed semantic id '{id}': {reason}")]
    Malformed { id: String, reason: &'static str },

    #[error("unknown node kind tag '{tag}' in id '{id}'")]
    UnknownKind { id: String, tag: String },
}

/// Failures at the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no open transaction for {operation}")]
    NoTransaction { operation: &'static str },

    #[error("transaction already open")]
    TransactionOpen,

    #[error("metadata serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level failures for one file's analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to parse {file}")]
    Parse { file: String },

    #[error("unsupported language for {file}")]
    UnsupportedLanguage { file: String },

    #[error("assembler used in state {state} where {expected} was required")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
