//! Table declarations.

use super::{ColumnSchema, ForeignKey, ObjectKind, QualifiedName, Selectable};
use super::column::Column;
use crate::types::SqlType;

/// Table declaration.
///
/// ```rust,ignore
/// let posts = Table::new("Post")
///     .column(Column::new("id", SqlType::BigSerial).primary_key())
///     .column(Column::new("author_id", SqlType::Integer).not_null().references("user", "id").cascade())
///     .column(Column::new("title", SqlType::Text).not_null())
///     .column(Column::new("created_at", SqlType::TimestampTz).default_sql("now()"));
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) type_name: String,
    pub(crate) name_override: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) if_not_exists: bool,
    pub(crate) columns: Vec<Column>,
    pub(crate) primary_key: Vec<String>,
    pub(crate) unique: Vec<Vec<String>>,
}

impl Table {
    /// `type_name` is normalised (`UserProfile` -> `user_profile`) unless
    /// [`Table::name`] overrides it.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name_override: None,
            schema: None,
            if_not_exists: true,
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique: Vec::new(),
        }
    }

    /// Uses `name` verbatim as the table name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Emit `CREATE TABLE IF NOT EXISTS` (default) or plain `CREATE TABLE`.
    pub fn if_not_exists(mut self, enabled: bool) -> Self {
        self.if_not_exists = enabled;
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns<I: IntoIterator<Item = Column>>(mut self, columns: I) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Composite primary key. Columns must not also be flagged with
    /// [`Column::primary_key`].
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Multi-column `UNIQUE (...)` constraint.
    pub fn unique<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// A declared, validated table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub(crate) name: QualifiedName,
    pub(crate) columns: Vec<ColumnSchema>,
    pub(crate) primary_key: Vec<String>,
    pub(crate) unique: Vec<Vec<String>>,
    pub(crate) if_not_exists: bool,
}

impl TableSchema {
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key column names, empty if the table has none.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Multi-column unique constraints. Single-column ones live on the column.
    pub fn unique_constraints(&self) -> &[Vec<String>] {
        &self.unique
    }

    pub fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }

    /// Foreign-key edges in column order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnSchema, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref().map(|fk| (c, fk)))
    }

    /// Enums used by this table's columns.
    pub fn enum_dependencies(&self) -> Vec<QualifiedName> {
        let mut deps: Vec<QualifiedName> = Vec::new();
        for column in &self.columns {
            if let Some(name) = enum_of(&column.ty) {
                let name = QualifiedName::parse(name, &self.name.schema);
                if !deps.contains(&name) {
                    deps.push(name);
                }
            }
        }
        deps
    }

    /// Columns the server fills in when they are omitted from an insert.
    pub fn generated_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.is_generated())
    }
}

impl Selectable for TableSchema {
    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Table
    }
}

/// Enum name referenced by a column type, looking through arrays.
pub(crate) fn enum_of(ty: &SqlType) -> Option<&str> {
    match ty {
        SqlType::Enum(name) => Some(name),
        SqlType::Array(inner) => enum_of(inner),
        _ => None,
    }
}
