//! Error types for the melt pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Which registry limit was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Tables,
    Columns,
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capacity::Tables => f.write_str("tables"),
            Capacity::Columns => f.write_str("columns"),
        }
    }
}

/// Errors raised while building, inferring or emitting a document
#[derive(Debug, Error)]
pub enum MeltError {
    /// Input bytes are not a JSON document.
    #[error("JSON parsing failed: {0}")]
    Parse(#[from] serde_json::Error),
    /// Opening or creating an output location failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record could not be written to the sink for `table`.
    #[error("failed to write record to table {table}: {source}")]
    Sink {
        table: String,
        #[source]
        source: std::io::Error,
    },
    /// A registry limit was reached; the overflow was dropped.
    #[error("maximum number of {kind} ({limit}) exceeded{}", on_table(.table))]
    CapacityExceeded {
        kind: Capacity,
        limit: usize,
        table: Option<String>,
    },
    /// A node reference does not resolve inside its document.
    #[error("malformed node reference #{0}")]
    MalformedNode(usize),
    /// The tree builder was asked to give a node a second parent.
    #[error("node #{0} is already attached to a parent")]
    AlreadyAttached(usize),
}

fn on_table(table: &Option<String>) -> String {
    match table {
        Some(name) => format!(" for table {name}"),
        None => String::new(),
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MeltError>;
