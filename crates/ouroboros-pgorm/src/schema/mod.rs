//! Schema model: tables, views and enumerations.
//!
//! Declarations are plain builder values ([`Table`], [`View`],
//! [`EnumType`], [`Column`]). Handing one to a [`Catalog`] validates it and
//! returns an immutable, shareable schema ([`TableSchema`], [`ViewSchema`],
//! [`EnumSchema`]).
//!
//! ```rust,ignore
//! use ouroboros_pgorm::{Catalog, Column, SqlType, Table};
//!
//! let mut catalog = Catalog::new();
//! let users = catalog.declare_table(
//!     Table::new("User")
//!         .column(Column::new("id", SqlType::Serial).primary_key())
//!         .column(Column::new("name", SqlType::Text).not_null())
//!         .column(Column::new("age", SqlType::Integer)),
//! )?;
//! assert_eq!(users.name().to_string(), "public.user");
//! ```

mod catalog;
mod column;
mod enums;
mod table;
mod view;

use std::fmt;
use std::sync::Arc;

use crate::query::quote_identifier;

pub use catalog::{Catalog, ObjectKind, SchemaObject};
pub use column::{Column, ColumnSchema, ForeignKey, ReferentialAction};
pub use enums::{EnumSchema, EnumType};
pub use table::{Table, TableSchema};
pub use view::{View, ViewSchema};

/// Schema used when a declaration does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// A schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parses `schema.name`, or `name` in `default_schema`.
    pub fn parse(raw: &str, default_schema: &str) -> Self {
        match raw.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::new(default_schema, raw),
        }
    }

    /// `"schema"."name"`
    pub fn quoted(&self) -> String {
        quote_identifier(&self.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Anything rows can be selected from.
pub trait Selectable: Send + Sync {
    fn name(&self) -> &QualifiedName;

    /// Columns in declared order.
    fn columns(&self) -> &[ColumnSchema];

    fn kind(&self) -> ObjectKind;

    fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns().iter().find(|c| c.name() == name)
    }
}

impl<T: Selectable + ?Sized> Selectable for Arc<T> {
    fn name(&self) -> &QualifiedName {
        (**self).name()
    }

    fn columns(&self) -> &[ColumnSchema] {
        (**self).columns()
    }

    fn kind(&self) -> ObjectKind {
        (**self).kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        let name = QualifiedName::parse("users", DEFAULT_SCHEMA);
        assert_eq!(name, QualifiedName::new("public", "users"));
        assert_eq!(name.to_string(), "public.users");
        assert_eq!(name.quoted(), "\"public\".\"users\"");

        let name = QualifiedName::parse("auth.accounts", DEFAULT_SCHEMA);
        assert_eq!(name.schema, "auth");
        assert_eq!(name.name, "accounts");
    }
}
