//! Catalog of inferred tables and columns

use crate::error::{Capacity, MeltError};
use crate::types::{Limits, ID_COLUMN};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Primary key, always the first column
    Identity,
    /// Identity value of a row in another table
    ForeignKey,
    /// Position of the source element inside its array
    ArrayIndex,
    String,
    Integer,
    Float,
    Boolean,
}

impl ColumnKind {
    fn label(self) -> &'static str {
        match self {
            ColumnKind::Identity => "ID",
            ColumnKind::ForeignKey => "FK",
            ColumnKind::ArrayIndex => "INDEX",
            ColumnKind::String => "STRING",
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Float => "NUMBER",
            ColumnKind::Boolean => "BOOLEAN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Target table of a foreign key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Column {
            name: name.into(),
            kind,
            references: None,
        }
    }

    pub fn foreign_key(name: impl Into<String>, target: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            kind: ColumnKind::ForeignKey,
            references: Some(target.into()),
        }
    }
}

/// Identifies the junction table for one scalar-array field of one owner table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JunctionKey {
    pub owner: String,
    pub field: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    /// Emission order
    pub columns: Vec<Column>,
    /// Shape of the objects stored here; `None` for junction tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub is_junction: bool,
    pub is_child: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub junction: Option<JunctionKey>,
}

impl Table {
    /// Whether a column other than the identity already uses `name`.
    pub fn has_data_column(&self, name: &str) -> bool {
        self.columns.iter().skip(1).any(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Position of a table in its registry
pub type TableIdx = usize;

/// Every table of one inference run, in creation order
#[derive(Debug, Serialize)]
pub struct Registry {
    tables: Vec<Table>,
    #[serde(skip)]
    limits: Limits,
    /// Capacity problems hit while building; the schema is narrower for them
    #[serde(skip)]
    diagnostics: Vec<MeltError>,
}

impl Registry {
    pub fn new(limits: Limits) -> Self {
        Registry {
            tables: Vec::new(),
            limits,
            diagnostics: Vec::new(),
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, idx: TableIdx) -> Option<&Table> {
        self.tables.get(idx)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn diagnostics(&self) -> &[MeltError] {
        &self.diagnostics
    }

    /// Add an object table keyed by `signature`. The identity column is
    /// added automatically. Returns `None` once the table limit is reached.
    pub fn add_table(&mut self, name: &str, signature: Option<String>, is_child: bool) -> Option<TableIdx> {
        self.push_table(name, signature, is_child, None)
    }

    /// Add a junction table for scalar array `key.field` of `key.owner`.
    pub fn add_junction(&mut self, name: &str, key: JunctionKey) -> Option<TableIdx> {
        self.push_table(name, None, false, Some(key))
    }

    fn push_table(
        &mut self,
        name: &str,
        signature: Option<String>,
        is_child: bool,
        junction: Option<JunctionKey>,
    ) -> Option<TableIdx> {
        if self.tables.len() >= self.limits.max_tables {
            self.overflow(Capacity::Tables, self.limits.max_tables, None);
            return None;
        }
        let is_junction = junction.is_some();
        self.tables.push(Table {
            name: name.to_string(),
            columns: Vec::new(),
            signature,
            is_junction,
            is_child,
            junction,
        });
        let idx = self.tables.len() - 1;
        self.add_column(idx, Column::new(ID_COLUMN, ColumnKind::Identity));
        Some(idx)
    }

    /// Append a column. Duplicate data column names and columns past the
    /// limit are dropped; returns whether the column was added. The identity
    /// column is always admitted.
    pub fn add_column(&mut self, idx: TableIdx, column: Column) -> bool {
        let limit = self.limits.max_columns;
        let Some(table) = self.tables.get_mut(idx) else {
            return false;
        };
        let is_identity = column.kind == ColumnKind::Identity;
        if !is_identity && table.has_data_column(&column.name) {
            return false;
        }
        if !is_identity && table.columns.len() >= limit {
            let name = table.name.clone();
            self.overflow(Capacity::Columns, limit, Some(name));
            return false;
        }
        table.columns.push(column);
        true
    }

    fn overflow(&mut self, kind: Capacity, limit: usize, table: Option<String>) {
        let err = MeltError::CapacityExceeded { kind, limit, table };
        warn!("{}", err);
        self.diagnostics.push(err);
    }

    pub fn index_by_signature(&self, signature: &str) -> Option<TableIdx> {
        self.tables
            .iter()
            .position(|t| t.signature.as_deref() == Some(signature))
    }

    pub fn by_signature(&self, signature: &str) -> Option<&Table> {
        self.index_by_signature(signature).map(|idx| &self.tables[idx])
    }

    pub fn index_by_name(&self, name: &str) -> Option<TableIdx> {
        self.tables.iter().position(|t| t.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.index_by_name(name).is_some()
    }

    pub fn index_of_junction(&self, owner: &str, field: &str) -> Option<TableIdx> {
        self.tables.iter().position(|t| {
            t.junction
                .as_ref()
                .is_some_and(|key| key.owner == owner && key.field == field)
        })
    }

    pub fn junction(&self, owner: &str, field: &str) -> Option<&Table> {
        self.index_of_junction(owner, field).map(|idx| &self.tables[idx])
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schema ({} tables):", self.tables.len())?;
        for table in &self.tables {
            write!(f, "Table: {}", table.name)?;
            if table.is_junction {
                write!(f, " (junction)")?;
            }
            if table.is_child {
                write!(f, " (child)")?;
            }
            writeln!(f)?;
            for column in &table.columns {
                match (&column.kind, &column.references) {
                    (ColumnKind::ForeignKey, Some(target)) => {
                        writeln!(f, "  {}: FK -> {}", column.name, target)?
                    }
                    (kind, _) => writeln!(f, "  {}: {}", column.name, kind.label())?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_column_first() {
        let mut registry = Registry::new(Limits::default());
        let idx = registry.add_table("root", Some("a,i".to_string()), false).unwrap();
        registry.add_column(idx, Column::new("a", ColumnKind::Integer));

        let table = registry.table(idx).unwrap();
        assert_eq!(table.column_names(), vec!["id", "a"]);
        assert_eq!(table.columns[0].kind, ColumnKind::Identity);
    }

    #[test]
    fn test_duplicate_data_column_dropped() {
        let mut registry = Registry::new(Limits::default());
        let idx = registry.add_table("t", None, false).unwrap();
        assert!(registry.add_column(idx, Column::new("a", ColumnKind::String)));
        assert!(!registry.add_column(idx, Column::new("a", ColumnKind::Integer)));
        // a data column may shadow the identity name
        assert!(registry.add_column(idx, Column::new("id", ColumnKind::Integer)));
        assert_eq!(registry.table(idx).unwrap().column_names(), vec!["id", "a", "id"]);
    }

    #[test]
    fn test_table_limit_degrades() {
        let mut registry = Registry::new(Limits {
            max_tables: 1,
            max_columns: 128,
        });
        assert!(registry.add_table("a", None, false).is_some());
        assert!(registry.add_table("b", None, false).is_none());
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.diagnostics()[0],
            MeltError::CapacityExceeded { kind: Capacity::Tables, limit: 1, .. }
        ));
    }

    #[test]
    fn test_column_limit_degrades() {
        let mut registry = Registry::new(Limits {
            max_tables: 10,
            max_columns: 2,
        });
        let idx = registry.add_table("t", None, false).unwrap();
        assert!(registry.add_column(idx, Column::new("a", ColumnKind::String)));
        assert!(!registry.add_column(idx, Column::new("b", ColumnKind::String)));
        assert_eq!(registry.table(idx).unwrap().columns.len(), 2);
        assert_eq!(registry.diagnostics().len(), 1);
    }

    #[test]
    fn test_zero_column_limit_keeps_identity() {
        let mut registry = Registry::new(Limits {
            max_tables: 10,
            max_columns: 0,
        });
        let idx = registry.add_table("t", Some("a,i".to_string()), false).unwrap();
        assert!(!registry.add_column(idx, Column::new("a", ColumnKind::Integer)));

        let table = registry.table(idx).unwrap();
        assert_eq!(table.column_names(), vec!["id"]);
        assert_eq!(table.columns[0].kind, ColumnKind::Identity);
        assert_eq!(registry.diagnostics().len(), 1);
    }

    #[test]
    fn test_lookups() {
        let mut registry = Registry::new(Limits::default());
        registry.add_table("root", Some("tags,[]".to_string()), false);
        registry.add_junction(
            "tags",
            JunctionKey {
                owner: "root".to_string(),
                field: "tags".to_string(),
            },
        );

        assert_eq!(registry.index_by_signature("tags,[]"), Some(0));
        assert_eq!(registry.index_by_name("tags"), Some(1));
        assert!(registry.junction("root", "tags").unwrap().is_junction);
        assert!(registry.junction("other", "tags").is_none());
    }

    #[test]
    fn test_display_listing() {
        let mut registry = Registry::new(Limits::default());
        let root = registry.add_table("root", Some(String::new()), false).unwrap();
        let child = registry.add_table("items", Some("x,i".to_string()), true).unwrap();
        registry.add_column(child, Column::foreign_key("root_id", "root"));
        registry.add_column(child, Column::new("seq", ColumnKind::ArrayIndex));
        registry.add_column(root, Column::new("ok", ColumnKind::Boolean));

        let expected = "\
Schema (2 tables):
Table: root
  id: ID
  ok: BOOLEAN
Table: items (child)
  id: ID
  root_id: FK -> root
  seq: INDEX
";
        assert_eq!(registry.to_string(), expected);
    }
}
