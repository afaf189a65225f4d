//! Schema inference over a document tree
//!
//! Every object is fingerprinted with [`signature`]. The first object of a
//! given shape creates a table; every later object with the same shape,
//! wherever it sits in the document, reuses it. Arrays of objects become
//! child tables linked by foreign key and position, arrays of scalars become
//! junction tables.

use crate::schema::naming::{sanitize, TableNamer};
use crate::schema::registry::{Column, ColumnKind, JunctionKey, Registry};
use crate::schema::signature::signature;
use crate::tree::{Document, Node, NodeRef};
use crate::types::{fk_column, MeltConfig, INDEX_COLUMN, SEQ_COLUMN, VALUE_COLUMN};
use tracing::{debug, warn};

/// Walks a document once and fills a [`Registry`]
pub struct SchemaInferrer<'a> {
    doc: &'a Document,
    namer: &'a TableNamer,
    config: &'a MeltConfig,
}

impl<'a> SchemaInferrer<'a> {
    pub fn new(doc: &'a Document, namer: &'a TableNamer, config: &'a MeltConfig) -> Self {
        SchemaInferrer { doc, namer, config }
    }

    /// Infer tables for the whole document, starting at its root.
    pub fn infer_document(&self, registry: &mut Registry) {
        let root = self.doc.root();
        match self.doc.node(root) {
            Some(Node::Object(_)) => {
                self.infer(registry, root, None, None);
            }
            Some(Node::Array(elements)) => {
                let first = elements.first().and_then(|f| self.doc.node(*f));
                match first {
                    Some(Node::Object(_)) => {
                        for (i, element) in elements.iter().enumerate() {
                            if self.doc.is_object(*element) {
                                self.infer(registry, *element, Some(self.config.root_table.as_str()), Some(i));
                            }
                        }
                    }
                    Some(node) if node.is_scalar() => {
                        self.infer_junction(registry, &self.config.root_table, &self.config.root_values_table);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Assign `node` to a table, creating it if its shape is new.
    ///
    /// Returns the name of the table the node resolves to, or `None` when
    /// the node is not an object or no table could be created for it.
    pub fn infer(
        &self,
        registry: &mut Registry,
        node: NodeRef,
        parent_table: Option<&str>,
        array_index: Option<usize>,
    ) -> Option<String> {
        let sig = signature(self.doc, node)?;
        if let Some(existing) = registry.by_signature(&sig) {
            return Some(existing.name.clone());
        }

        let name = match parent_table {
            None => self.namer.name_root(self.doc, node),
            Some(parent) => self.namer.name_nested(self.doc, node, parent),
        };

        if registry.contains_name(&name) {
            if self.namer.is_singleton(&name) {
                debug!(table = %name, "shape folded into existing singleton table");
                return Some(name);
            }
            warn!(table = %name, signature = %sig, "table name shared by a second shape");
        }

        let is_child = array_index.is_some();
        let idx = registry.add_table(&name, Some(sig), is_child)?;
        debug!(table = %name, child = is_child, "created table");

        if is_child {
            if let Some(parent) = parent_table {
                registry.add_column(idx, Column::foreign_key(fk_column(parent), parent));
                registry.add_column(idx, Column::new(SEQ_COLUMN, ColumnKind::ArrayIndex));
            }
        }

        for (key, value) in self.doc.pairs(node) {
            let Some(child) = self.doc.node(*value) else {
                continue;
            };
            match child {
                Node::Object(_) => {
                    if let Some(target) = self.infer(registry, *value, Some(name.as_str()), None) {
                        registry.add_column(idx, Column::foreign_key(fk_column(key), target));
                    }
                }
                Node::Array(elements) => self.infer_array(registry, &name, key, elements),
                scalar => {
                    registry.add_column(idx, Column::new(key.as_str(), scalar_kind(scalar)));
                }
            }
        }

        Some(name)
    }

    fn infer_array(&self, registry: &mut Registry, owner: &str, key: &str, elements: &[NodeRef]) {
        let first = elements.first().and_then(|f| self.doc.node(*f));
        match first {
            // empty arrays carry no type information
            None => {}
            Some(Node::Object(_)) => {
                for (i, element) in elements.iter().enumerate() {
                    if self.doc.is_object(*element) {
                        self.infer(registry, *element, Some(owner), Some(i));
                    }
                }
            }
            Some(Node::Array(_)) => {
                debug!(table = owner, field = key, "skipping array of arrays");
            }
            Some(_) => self.infer_junction(registry, owner, key),
        }
    }

    fn infer_junction(&self, registry: &mut Registry, owner: &str, field: &str) {
        if registry.index_of_junction(owner, field).is_some() {
            return;
        }

        let mut name = sanitize(field);
        if name.is_empty() {
            name = owner.to_string();
        }
        if registry.contains_name(&name) {
            let base = format!("{}_{}", owner, name);
            name = base.clone();
            let mut n = 2;
            while registry.contains_name(&name) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
        }

        let key = JunctionKey {
            owner: owner.to_string(),
            field: field.to_string(),
        };
        let Some(idx) = registry.add_junction(&name, key) else {
            return;
        };
        debug!(table = %name, owner, "created junction table");

        registry.add_column(idx, Column::foreign_key(fk_column(owner), owner));
        registry.add_column(idx, Column::new(INDEX_COLUMN, ColumnKind::ArrayIndex));
        registry.add_column(idx, Column::new(VALUE_COLUMN, ColumnKind::String));
    }
}

/// Column type for a scalar value; null has no type and falls back to string.
pub fn scalar_kind(node: &Node) -> ColumnKind {
    match node {
        Node::Integer(_) => ColumnKind::Integer,
        Node::Float(_) => ColumnKind::Float,
        Node::Boolean(_) => ColumnKind::Boolean,
        _ => ColumnKind::String,
    }
}

/// Infer the schema of `doc` with the default naming rules.
pub fn infer_schema(doc: &Document, config: &MeltConfig) -> Registry {
    let namer = TableNamer::new(config);
    let mut registry = Registry::new(config.limits);
    SchemaInferrer::new(doc, &namer, config).infer_document(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::IdGenerator;
    use crate::types::Limits;
    use serde_json::{json, Value};

    fn schema_of(value: Value) -> Registry {
        schema_with(value, MeltConfig::default())
    }

    fn schema_with(value: Value, config: MeltConfig) -> Registry {
        let mut ids = IdGenerator::new();
        let doc = Document::from_json(&value, &mut ids).unwrap();
        infer_schema(&doc, &config)
    }

    fn names(registry: &Registry) -> Vec<&str> {
        registry.tables().iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_flat_object() {
        let registry = schema_of(json!({"a": 1, "b": "x", "c": 2.5, "d": false, "e": null}));

        assert_eq!(names(&registry), vec!["root"]);
        let table = &registry.tables()[0];
        assert_eq!(table.column_names(), vec!["id", "a", "b", "c", "d", "e"]);
        let kinds: Vec<ColumnKind> = table.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Identity,
                ColumnKind::Integer,
                ColumnKind::String,
                ColumnKind::Float,
                ColumnKind::Boolean,
                ColumnKind::String,
            ]
        );
        assert!(!table.is_child);
    }

    #[test]
    fn test_nested_object_gets_foreign_key() {
        let registry = schema_of(json!({"a": {"b": 1}}));

        // the nested table is created while the outer one is being filled
        assert_eq!(names(&registry), vec!["root", "a"]);
        let root = &registry.tables()[0];
        assert_eq!(root.column_names(), vec!["id", "a_id"]);
        assert_eq!(root.columns[1].kind, ColumnKind::ForeignKey);
        assert_eq!(root.columns[1].references.as_deref(), Some("a"));
        assert_eq!(registry.tables()[1].column_names(), vec!["id", "b"]);
    }

    #[test]
    fn test_array_of_objects_becomes_child_table() {
        let registry = schema_of(json!({"items": [{"x": 1}, {"x": 2}]}));

        assert_eq!(names(&registry), vec!["root", "items"]);
        let items = &registry.tables()[1];
        assert!(items.is_child);
        assert_eq!(items.column_names(), vec!["id", "root_id", "seq", "x"]);
        assert_eq!(items.columns[1].references.as_deref(), Some("root"));
        assert_eq!(items.columns[2].kind, ColumnKind::ArrayIndex);
    }

    #[test]
    fn test_scalar_array_becomes_junction() {
        let registry = schema_of(json!({"tags": ["a", 1, true]}));

        assert_eq!(names(&registry), vec!["root", "tags"]);
        let tags = &registry.tables()[1];
        assert!(tags.is_junction);
        assert!(tags.signature.is_none());
        assert_eq!(tags.column_names(), vec!["id", "root_id", "index", "value"]);
        assert_eq!(tags.columns[3].kind, ColumnKind::String);
        // the array field itself is not a column of the owner
        assert_eq!(registry.tables()[0].column_names(), vec!["id"]);
    }

    #[test]
    fn test_empty_array_contributes_nothing() {
        let registry = schema_of(json!({"a": 1, "none": []}));

        assert_eq!(names(&registry), vec!["root"]);
        assert_eq!(registry.tables()[0].column_names(), vec!["id", "a"]);
    }

    #[test]
    fn test_same_shape_deduplicated_across_positions() {
        let registry = schema_of(json!({
            "home": {"street": "a", "zip": 1},
            "people": [
                {"name": "x", "office": {"zip": 2, "street": "b"}}
            ]
        }));

        let shape: Vec<_> = registry
            .tables()
            .iter()
            .filter(|t| t.signature.as_deref() == Some("street,s,zip,i"))
            .collect();
        assert_eq!(shape.len(), 1);
        assert_eq!(shape[0].name, "home");

        // office_id points at the shared table
        let people = registry.tables().iter().find(|t| t.name == "people").unwrap();
        let office = people.columns.iter().find(|c| c.name == "office_id").unwrap();
        assert_eq!(office.references.as_deref(), Some("home"));
    }

    #[test]
    fn test_distinct_sibling_shapes_fan_out() {
        let registry = schema_of(json!({"events": [{"a": 1}, {"b": "x"}, {"a": 2}]}));

        assert_eq!(names(&registry), vec!["root", "events", "events"]);
        assert_eq!(registry.tables()[1].column_names(), vec!["id", "root_id", "seq", "a"]);
        assert_eq!(registry.tables()[2].column_names(), vec!["id", "root_id", "seq", "b"]);
    }

    #[test]
    fn test_empty_objects_share_one_table() {
        let registry = schema_of(json!({"a": {}, "b": {}}));

        assert_eq!(names(&registry), vec!["root", "a"]);
        let root = &registry.tables()[0];
        assert_eq!(root.column_names(), vec!["id", "a_id", "b_id"]);
        assert_eq!(root.columns[2].references.as_deref(), Some("a"));
    }

    #[test]
    fn test_singleton_table_not_recreated() {
        let registry = schema_of(json!({
            "author": {"uid": "u1", "name": "Ann"},
            "comments": [{"uid": "u2", "text": "hi"}]
        }));

        let users: Vec<_> = registry.tables().iter().filter(|t| t.name == "users").collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].column_names(), vec!["id", "uid", "name"]);
        assert_eq!(names(&registry), vec!["root", "users"]);
    }

    #[test]
    fn test_order_document() {
        let registry = schema_of(json!({
            "orderId": 7,
            "customer": {"id": 1, "name": "Ann"},
            "items": [{"sku": "A", "qty": 2}, {"sku": "B", "qty": 1}],
            "total": 9.5
        }));

        assert_eq!(names(&registry), vec!["orders", "customers", "order_items"]);
        let orders = &registry.tables()[0];
        assert_eq!(orders.column_names(), vec!["id", "orderId", "customer_id", "total"]);
        let items = &registry.tables()[2];
        assert_eq!(items.column_names(), vec!["id", "orders_id", "seq", "sku", "qty"]);
    }

    #[test]
    fn test_root_array_of_objects() {
        let registry = schema_of(json!([{"a": 1}, {"a": 2}, 3]));

        assert_eq!(names(&registry), vec!["root"]);
        let table = &registry.tables()[0];
        assert!(table.is_child);
        assert_eq!(table.column_names(), vec!["id", "root_id", "seq", "a"]);
    }

    #[test]
    fn test_root_array_of_scalars() {
        let registry = schema_of(json!([1, 2, 3]));

        assert_eq!(names(&registry), vec!["values"]);
        assert!(registry.tables()[0].is_junction);
        assert!(registry.junction("root", "values").is_some());
    }

    #[test]
    fn test_scalar_root_is_ignored() {
        assert!(schema_of(json!("just a string")).is_empty());
    }

    #[test]
    fn test_junction_names_do_not_collide() {
        let registry = schema_of(json!({
            "tags": ["a"],
            "posts": [{"title": "t", "tags": ["b"]}]
        }));

        assert!(registry.junction("root", "tags").is_some());
        let nested = registry.junction("posts", "tags").unwrap();
        assert_eq!(nested.name, "posts_tags");
        assert_eq!(nested.columns[1].name, "posts_id");
    }

    #[test]
    fn test_junction_name_skips_every_taken_name() {
        let registry = schema_of(json!({
            "posts_tags": {"q": 1},
            "tags": ["a"],
            "posts": [{"title": "t", "tags": ["b"]}]
        }));

        assert_eq!(names(&registry), vec!["root", "posts_tags", "tags", "posts", "posts_tags_2"]);
        let nested = registry.junction("posts", "tags").unwrap();
        assert_eq!(nested.name, "posts_tags_2");
        assert_eq!(nested.column_names(), vec!["id", "posts_id", "index", "value"]);
        assert_eq!(registry.tables()[1].column_names(), vec!["id", "q"]);
    }

    #[test]
    fn test_table_limit_drops_overflow() {
        let config = MeltConfig {
            limits: Limits {
                max_tables: 2,
                max_columns: 128,
            },
            ..MeltConfig::default()
        };
        let registry = schema_with(json!({"a": {"x": 1}, "b": {"y": 1}, "c": 1}), config);

        assert_eq!(names(&registry), vec!["root", "a"]);
        // no foreign key towards a table that was never created
        assert_eq!(registry.tables()[0].column_names(), vec!["id", "a_id", "c"]);
        assert_eq!(registry.diagnostics().len(), 1);
    }

    #[test]
    fn test_column_limit_narrows_table() {
        let config = MeltConfig {
            limits: Limits {
                max_tables: 10,
                max_columns: 3,
            },
            ..MeltConfig::default()
        };
        let registry = schema_with(json!({"a": 1, "b": 2, "c": 3, "d": 4}), config);

        assert_eq!(registry.tables()[0].column_names(), vec!["id", "a", "b"]);
        assert_eq!(registry.diagnostics().len(), 2);
    }

    #[test]
    fn test_zero_column_limit_still_has_identity() {
        let config = MeltConfig {
            limits: Limits {
                max_tables: 10,
                max_columns: 0,
            },
            ..MeltConfig::default()
        };
        let registry = schema_with(json!({"a": 1, "items": [{"x": 1}]}), config);

        for table in registry.tables() {
            assert_eq!(table.column_names(), vec!["id"]);
        }
        assert_eq!(registry.len(), 2);
    }
}
