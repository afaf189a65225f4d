use serde::Serialize;

/// Hard caps on the size of one inferred schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    /// Maximum number of tables in a registry (default: 100)
    pub max_tables: usize,

    /// Maximum number of columns per table, identity included (default: 128)
    pub max_columns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_tables: 100,
            max_columns: 128,
        }
    }
}

/// Configuration for one inference + emission session
#[derive(Debug, Clone)]
pub struct MeltConfig {
    /// Registry capacity
    pub limits: Limits,

    /// Table name used for a root object no root rule recognises, and the
    /// synthetic parent name for elements of a root-level array
    pub root_table: String,

    /// Junction table name for a root-level array of scalars
    pub root_values_table: String,

    /// Name nested objects after their `type`/`kind`/`name`/... string value
    pub name_from_values: bool,
}

impl Default for MeltConfig {
    fn default() -> Self {
        MeltConfig {
            limits: Limits::default(),
            root_table: String::from("root"),
            root_values_table: String::from("values"),
            name_from_values: false,
        }
    }
}

/// Name of the identity column every table starts with.
pub const ID_COLUMN: &str = "id";

/// Array position column of a child table.
pub const SEQ_COLUMN: &str = "seq";

/// Array position column of a junction table.
pub const INDEX_COLUMN: &str = "index";

/// Scalar payload column of a junction table.
pub const VALUE_COLUMN: &str = "value";

/// Suffix appended to foreign-key column names.
pub const FK_SUFFIX: &str = "_id";

/// Foreign-key column name pointing at `target`.
pub fn fk_column(target: &str) -> String {
    format!("{}{}", target, FK_SUFFIX)
}
