//! # json-melt - JSON to relational CSV
//!
//! Normalizes one JSON document into a set of relational tables, written as
//! CSV files with generated primary and foreign keys.
//!
//! ## Modules
//!
//! - **tree**: arena document tree with parent links and session ids
//! - **schema**: shape signatures, table naming and the table registry
//! - **melt**: the row emitter and the CSV record sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use json_melt::melt::{Melter, MemorySink};
//! use json_melt::MeltConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let input = br#"{
//!     "name": "Alice",
//!     "posts": [
//!         {"title": "First Post"},
//!         {"title": "Second Post"}
//!     ]
//! }"#;
//!
//! let mut melter = Melter::new(MeltConfig::default());
//! let mut sink = MemorySink::new();
//! let outcome = melter.melt(input, &mut sink)?;
//!
//! // root (id, name) and posts (id, root_id, seq, title)
//! assert_eq!(outcome.registry.len(), 2);
//! assert_eq!(sink.rows("posts").len(), 2);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

pub mod error;
pub mod melt;
pub mod schema;
pub mod tree;
pub mod types;

// Re-export commonly used types for convenience
pub use error::MeltError;
pub use melt::{CsvDirWriter, EmitReport, MeltOutcome, Melter, MemorySink, RecordSink};
pub use schema::{infer_schema, signature, Registry, TableNamer};
pub use tree::{parse_document, Document, IdGenerator, Node, NodeRef};
pub use types::{Limits, MeltConfig};

/// Main entry point: melt one JSON document into `<out_dir>/<table>.csv` files
pub fn melt_to_dir<R: Read, P: AsRef<Path>>(mut reader: R, out_dir: P, config: MeltConfig) -> Result<MeltOutcome> {
    let mut input = Vec::new();
    reader
        .read_to_end(&mut input)
        .context("Failed to read JSON input")?;

    let out_dir = out_dir.as_ref();
    let mut writer = CsvDirWriter::new(out_dir)
        .with_context(|| format!("Failed to prepare output directory {}", out_dir.display()))?;

    let outcome = Melter::new(config)
        .melt(&input, &mut writer)
        .context("Failed to parse JSON")?;
    Ok(outcome)
}
