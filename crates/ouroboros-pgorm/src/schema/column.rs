//! Column declarations.

use serde::{Deserialize, Serialize};

use super::QualifiedName;
use crate::registry::TypeEntry;
use crate::types::SqlType;

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ReferenceDecl {
    pub(crate) table: String,
    pub(crate) column: String,
    pub(crate) on_delete: Option<ReferentialAction>,
    pub(crate) on_update: Option<ReferentialAction>,
}

/// Column declaration.
///
/// Columns are nullable by default. Nothing is validated until the owning
/// table is declared on a [`Catalog`](crate::Catalog).
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) ty: SqlType,
    pub(crate) nullable: bool,
    pub(crate) primary_key: bool,
    pub(crate) unique: bool,
    pub(crate) index: bool,
    pub(crate) default: Option<String>,
    pub(crate) references: Option<ReferenceDecl>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
            unique: false,
            index: false,
            default: None,
            references: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks this column as the table's single-column primary key.
    ///
    /// Composite keys are declared with [`Table::primary_key`](crate::Table::primary_key).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Creates a btree index on this column.
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Raw SQL default expression, emitted verbatim (`now()`, `'draft'`, `0`).
    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Foreign key to `table.column`.
    ///
    /// `table` is either `schema.table` or a bare name in the owning
    /// table's schema, and must already be declared.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ReferenceDecl {
            table: table.into(),
            column: column.into(),
            on_delete: None,
            on_update: None,
        });
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_delete = Some(action);
        }
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_update = Some(action);
        }
        self
    }

    /// `ON DELETE CASCADE ON UPDATE CASCADE`
    pub fn cascade(self) -> Self {
        self.on_delete(ReferentialAction::Cascade)
            .on_update(ReferentialAction::Cascade)
    }
}

/// Resolved foreign-key edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: QualifiedName,
    pub column: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// A validated column of a declared table or view.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub(crate) name: String,
    pub(crate) ty: SqlType,
    pub(crate) entry: TypeEntry,
    pub(crate) nullable: bool,
    pub(crate) primary_key: bool,
    pub(crate) unique: bool,
    pub(crate) index: bool,
    pub(crate) default: Option<String>,
    pub(crate) foreign_key: Option<ForeignKey>,
}

impl ColumnSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> &SqlType {
        &self.ty
    }

    /// Codec information resolved from the type registry.
    pub fn type_entry(&self) -> &TypeEntry {
        &self.entry
    }

    pub fn ddl_type(&self) -> &str {
        self.entry.ddl_name()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_indexed(&self) -> bool {
        self.index
    }

    pub fn default_sql(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    /// Server-assigned when omitted from an insert (serial or defaulted).
    pub fn is_generated(&self) -> bool {
        self.ty.is_serial() || self.default.is_some()
    }

    /// `$n` plus any cast this column type needs.
    ///
    /// NULL values are always cast so they bind to the column type rather
    /// than to the untyped text they are sent as.
    pub fn placeholder(&self, index: usize, value_is_null: bool) -> String {
        if value_is_null || self.entry.placeholder_cast().is_some() {
            format!("${}::{}", index, self.cast_type())
        } else {
            format!("${}", index)
        }
    }

    /// Type name used in explicit casts. Serial pseudo-types map to their
    /// integer type.
    pub fn cast_type(&self) -> &str {
        if let Some(cast) = self.entry.placeholder_cast() {
            return cast;
        }
        match self.ty {
            SqlType::SmallSerial => "SMALLINT",
            SqlType::Serial => "INTEGER",
            SqlType::BigSerial => "BIGINT",
            _ => self.entry.ddl_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(column: Column, entry: TypeEntry) -> ColumnSchema {
        ColumnSchema {
            name: column.name,
            ty: column.ty,
            entry,
            nullable: column.nullable,
            primary_key: column.primary_key,
            unique: column.unique,
            index: column.index,
            default: column.default,
            foreign_key: None,
        }
    }

    #[test]
    fn test_column_builder_flags() {
        let column = Column::new("id", SqlType::Serial).primary_key().not_null();
        assert!(column.primary_key);
        assert!(!column.nullable);
        assert!(column.references.is_none());

        let column = Column::new("user_id", SqlType::Integer)
            .references("users", "id")
            .cascade();
        let reference = column.references.unwrap();
        assert_eq!(reference.table, "users");
        assert_eq!(reference.on_delete, Some(ReferentialAction::Cascade));
        assert_eq!(reference.on_update, Some(ReferentialAction::Cascade));
    }

    #[test]
    fn test_on_delete_without_reference_is_ignored() {
        let column = Column::new("x", SqlType::Integer).on_delete(ReferentialAction::SetNull);
        assert!(column.references.is_none());
    }

    #[test]
    fn test_generated_columns() {
        let id = resolved(Column::new("id", SqlType::Serial), TypeEntry::new("SERIAL"));
        assert!(id.is_generated());

        let created = resolved(
            Column::new("created_at", SqlType::TimestampTz).default_sql("now()"),
            TypeEntry::new("TIMESTAMP WITH TIME ZONE"),
        );
        assert!(created.is_generated());

        let name = resolved(Column::new("name", SqlType::Text), TypeEntry::new("TEXT"));
        assert!(!name.is_generated());
    }

    #[test]
    fn test_placeholder_casts() {
        let name = resolved(Column::new("name", SqlType::Text), TypeEntry::new("TEXT"));
        assert_eq!(name.placeholder(1, false), "$1");
        assert_eq!(name.placeholder(2, true), "$2::TEXT");

        let id = resolved(Column::new("id", SqlType::Serial), TypeEntry::new("SERIAL"));
        assert_eq!(id.placeholder(1, true), "$1::INTEGER");

        let mood = resolved(
            Column::new("mood", SqlType::Enum("public.mood".into())),
            TypeEntry::new("\"public\".\"mood\"").cast("\"public\".\"mood\""),
        );
        assert_eq!(mood.placeholder(3, false), "$3::\"public\".\"mood\"");
    }
}
