//! Relational schema inference
//!
//! This module fingerprints object shapes, names tables, and fills a
//! [`Registry`] with the tables and columns a document normalizes into.

pub mod inference;
pub mod naming;
pub mod registry;
pub mod signature;

pub use inference::{infer_schema, SchemaInferrer};
pub use naming::{sanitize, NameContext, NamingRule, TableNamer};
pub use registry::{Column, ColumnKind, JunctionKey, Registry, Table, TableIdx};
pub use signature::signature;
