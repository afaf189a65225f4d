//! Second pass: turn the document into rows of the inferred tables
//!
//! The emitter maps every object to its table with the same signature
//! lookup inference used, so it never invents a table: objects whose shape
//! has no table are skipped together with their subtree.

use crate::error::MeltError;
use crate::melt::writer::{Field, RecordSink};
use crate::schema::registry::{Column, ColumnKind, Registry, Table};
use crate::schema::signature::signature;
use crate::tree::{Document, Node, NodeRef};
use crate::types::{MeltConfig, FK_SUFFIX};
use tracing::debug;

/// Outcome of one emission pass
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Records accepted by the sink
    pub records: usize,
    /// Sink failures; the walk carried on past each of them
    pub errors: Vec<MeltError>,
}

impl EmitReport {
    fn track(&mut self, result: crate::error::Result<()>) {
        match result {
            Ok(()) => self.records += 1,
            Err(err) => self.errors.push(err),
        }
    }
}

/// Where the row being written sits relative to its parent row
#[derive(Debug, Clone, Copy, Default)]
pub struct RowContext<'a> {
    pub parent_id: Option<u64>,
    pub array_index: Option<usize>,
    pub parent_table: Option<&'a str>,
}

pub struct RowEmitter<'a> {
    doc: &'a Document,
    registry: &'a Registry,
    config: &'a MeltConfig,
}

impl<'a> RowEmitter<'a> {
    pub fn new(doc: &'a Document, registry: &'a Registry, config: &'a MeltConfig) -> Self {
        RowEmitter {
            doc,
            registry,
            config,
        }
    }

    /// Write headers for every table, then every row of the document.
    pub fn emit_document<S: RecordSink + ?Sized>(&self, sink: &mut S) -> EmitReport {
        let mut report = EmitReport::default();
        for table in self.registry.tables() {
            if let Err(err) = sink.write_header(&table.name, &table.column_names()) {
                report.errors.push(err);
            }
        }

        let root = self.doc.root();
        match self.doc.node(root) {
            Some(Node::Object(_)) => self.emit(root, sink, &mut report, RowContext::default()),
            Some(Node::Array(elements)) => {
                let root_table = self.config.root_table.as_str();
                match elements.first().and_then(|f| self.doc.node(*f)) {
                    Some(Node::Object(_)) => {
                        for (i, element) in elements.iter().enumerate() {
                            let ctx = RowContext {
                                parent_id: None,
                                array_index: Some(i),
                                parent_table: Some(root_table),
                            };
                            self.emit(*element, sink, &mut report, ctx);
                        }
                    }
                    Some(node) if node.is_scalar() => {
                        if let Some(table) = self.registry.junction(root_table, &self.config.root_values_table) {
                            self.emit_junction(table, elements, None, sink, &mut report);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        if let Err(err) = sink.flush() {
            report.errors.push(err);
        }
        report
    }

    /// Write the row for object `node` and recurse into its children.
    pub fn emit<S: RecordSink + ?Sized>(
        &self,
        node: NodeRef,
        sink: &mut S,
        report: &mut EmitReport,
        ctx: RowContext<'_>,
    ) {
        let Some(sig) = signature(self.doc, node) else {
            return;
        };
        let (Some(table), Some(id)) = (self.registry.by_signature(&sig), self.doc.id(node)) else {
            debug!(signature = %sig, "no table for object shape, skipping subtree");
            return;
        };

        let fields: Vec<Field> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| match column.kind {
                ColumnKind::Identity => Field::bare(id),
                // a child table's parent link sits right after the identity
                ColumnKind::ForeignKey if table.is_child && i == 1 => {
                    if column.references.as_deref() == ctx.parent_table {
                        ctx.parent_id.map_or(Field::Empty, Field::bare)
                    } else {
                        Field::Empty
                    }
                }
                _ => self.resolve(column, node, ctx),
            })
            .collect();
        report.track(sink.write_record(&table.name, &fields));

        for (key, value) in self.doc.pairs(node) {
            match self.doc.node(*value) {
                Some(Node::Object(_)) => {
                    let child = RowContext {
                        parent_id: Some(id),
                        array_index: None,
                        parent_table: Some(table.name.as_str()),
                    };
                    self.emit(*value, sink, report, child);
                }
                Some(Node::Array(elements)) => match elements.first().and_then(|f| self.doc.node(*f)) {
                    Some(Node::Object(_)) => {
                        for (i, element) in elements.iter().enumerate() {
                            if self.doc.is_object(*element) {
                                let child = RowContext {
                                    parent_id: Some(id),
                                    array_index: Some(i),
                                    parent_table: Some(table.name.as_str()),
                                };
                                self.emit(*element, sink, report, child);
                            }
                        }
                    }
                    Some(first) if first.is_scalar() => {
                        if let Some(junction) = self.registry.junction(&table.name, key) {
                            self.emit_junction(junction, elements, Some(id), sink, report);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// One record per element of a scalar array.
    fn emit_junction<S: RecordSink + ?Sized>(
        &self,
        table: &Table,
        elements: &[NodeRef],
        parent_id: Option<u64>,
        sink: &mut S,
        report: &mut EmitReport,
    ) {
        for (i, element) in elements.iter().enumerate() {
            let Some(data) = self.doc.get(*element) else {
                continue;
            };
            let fields: Vec<Field> = table
                .columns
                .iter()
                .map(|column| match column.kind {
                    ColumnKind::Identity => Field::bare(data.id),
                    ColumnKind::ForeignKey => parent_id.map_or(Field::Empty, Field::bare),
                    ColumnKind::ArrayIndex => Field::bare(i),
                    _ => format_scalar(&data.node),
                })
                .collect();
            report.track(sink.write_record(&table.name, &fields));
        }
    }

    fn resolve(&self, column: &Column, node: NodeRef, ctx: RowContext<'_>) -> Field {
        match column.kind {
            ColumnKind::ArrayIndex => ctx.array_index.map_or(Field::Empty, Field::bare),
            ColumnKind::ForeignKey => column
                .name
                .strip_suffix(FK_SUFFIX)
                .and_then(|field| self.doc.field(node, field))
                .filter(|target| self.doc.is_object(*target))
                .and_then(|target| self.doc.id(target))
                .map_or(Field::Empty, Field::bare),
            _ => match self.doc.field(node, &column.name).and_then(|v| self.doc.node(v)) {
                Some(value) => format_scalar(value),
                None => Field::Empty,
            },
        }
    }
}

/// CSV cell for a scalar node. Objects, arrays and null become empty cells.
pub fn format_scalar(node: &Node) -> Field {
    match node {
        Node::String(s) => Field::Text(s.clone()),
        Node::Integer(i) => Field::bare(i),
        // Debug keeps the shortest round-trip digits and a trailing `.0`
        Node::Float(f) => Field::Bare(format!("{:?}", f)),
        Node::Boolean(b) => Field::bare(b),
        Node::Null | Node::Object(_) | Node::Array(_) => Field::Empty,
    }
}
