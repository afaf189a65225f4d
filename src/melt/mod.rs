//! JSON melting - turn a document into rows of relational tables
//!
//! A [`Melter`] owns one session: its configuration, its naming rules and
//! the id counter shared by every document it builds. Melting runs two walks
//! over the same tree. The first infers the [`Registry`], the second emits
//! one record per object (and per scalar array element) into a
//! [`RecordSink`].
//!
//! ```rust
//! use json_melt::melt::{Melter, MemorySink};
//! use json_melt::MeltConfig;
//!
//! # fn main() -> json_melt::error::Result<()> {
//! let mut melter = Melter::new(MeltConfig::default());
//! let mut sink = MemorySink::new();
//! let outcome = melter.melt(br#"{"a": 1, "tags": ["x", "y"]}"#, &mut sink)?;
//!
//! assert_eq!(outcome.registry.len(), 2);
//! assert_eq!(sink.rows("tags").len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod emitter;
pub mod writer;

pub use emitter::{format_scalar, EmitReport, RowContext, RowEmitter};
pub use writer::{escape, format_record, CsvDirWriter, Field, MemorySink, RecordSink};

use crate::error::Result;
use crate::schema::inference::SchemaInferrer;
use crate::schema::naming::TableNamer;
use crate::schema::registry::Registry;
use crate::tree::{parse_document, Document, IdGenerator};
use crate::types::MeltConfig;
use serde_json::Value;
use tracing::{debug, info};

/// Schema and emission report of one melted document
#[derive(Debug)]
pub struct MeltOutcome {
    pub document: Document,
    pub registry: Registry,
    pub report: EmitReport,
}

/// One normalization session
pub struct Melter {
    config: MeltConfig,
    namer: TableNamer,
    ids: IdGenerator,
}

impl Melter {
    pub fn new(config: MeltConfig) -> Self {
        let namer = TableNamer::new(&config);
        Melter {
            config,
            namer,
            ids: IdGenerator::new(),
        }
    }

    /// Use custom naming rules instead of the defaults.
    pub fn with_namer(mut self, namer: TableNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn config(&self) -> &MeltConfig {
        &self.config
    }

    pub fn namer(&self) -> &TableNamer {
        &self.namer
    }

    /// Parse raw JSON into a tree, drawing ids from this session.
    pub fn parse(&mut self, input: &[u8]) -> Result<Document> {
        parse_document(input, &mut self.ids)
    }

    /// Build a tree from an already-parsed value.
    pub fn build(&mut self, value: &Value) -> Result<Document> {
        Document::from_json(value, &mut self.ids)
    }

    /// First walk: infer the tables of `doc`.
    pub fn infer(&self, doc: &Document) -> Registry {
        let mut registry = Registry::new(self.config.limits);
        SchemaInferrer::new(doc, &self.namer, &self.config).infer_document(&mut registry);
        debug!(tables = registry.len(), "schema inferred");
        registry
    }

    /// Second walk: write every table header and row of `doc` into `sink`.
    pub fn emit<S: RecordSink + ?Sized>(&self, doc: &Document, registry: &Registry, sink: &mut S) -> EmitReport {
        RowEmitter::new(doc, registry, &self.config).emit_document(sink)
    }

    /// Parse, infer and emit in one go.
    ///
    /// Only parse failures are returned as errors. Capacity problems end up
    /// in the registry diagnostics and sink failures in the report.
    pub fn melt<S: RecordSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) -> Result<MeltOutcome> {
        let document = self.parse(input)?;
        let registry = self.infer(&document);
        let report = self.emit(&document, &registry, sink);
        info!(
            nodes = document.len(),
            tables = registry.len(),
            records = report.records,
            errors = report.errors.len(),
            "melted document"
        );
        Ok(MeltOutcome {
            document,
            registry,
            report,
        })
    }

    /// Restart id numbering so the next document is numbered from 1.
    pub fn reset(&mut self) {
        self.ids.reset();
    }
}
