//! View declarations.

use super::{ColumnSchema, ObjectKind, QualifiedName, Selectable};
use crate::types::SqlType;

#[derive(Debug, Clone)]
pub(crate) struct ViewColumnDecl {
    pub(crate) name: String,
    pub(crate) ty: SqlType,
    pub(crate) expression: String,
}

/// View declaration.
///
/// The generated DDL is
/// `CREATE [OR REPLACE] VIEW name (col, ...) AS SELECT expr AS col, ... <query>`.
///
/// ```rust,ignore
/// let adults = View::new("Adult")
///     .column("id", SqlType::Integer, "u.id")
///     .column("name", SqlType::Text, "u.name")
///     .depends_on("user")
///     .query("FROM public.user u WHERE u.age >= 18");
/// ```
#[derive(Debug, Clone)]
pub struct View {
    pub(crate) type_name: String,
    pub(crate) name_override: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) or_replace: bool,
    pub(crate) columns: Vec<ViewColumnDecl>,
    pub(crate) sources: Vec<String>,
    pub(crate) query: String,
}

impl View {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name_override: None,
            schema: None,
            or_replace: true,
            columns: Vec::new(),
            sources: Vec::new(),
            query: String::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Emit `CREATE OR REPLACE VIEW` (default) or plain `CREATE VIEW`.
    pub fn or_replace(mut self, enabled: bool) -> Self {
        self.or_replace = enabled;
        self
    }

    /// Output column `name` of type `ty`, computed by the raw SQL `expression`.
    pub fn column(mut self, name: impl Into<String>, ty: SqlType, expression: impl Into<String>) -> Self {
        self.columns.push(ViewColumnDecl {
            name: name.into(),
            ty,
            expression: expression.into(),
        });
        self
    }

    /// A table or view the query reads from. Must already be declared.
    pub fn depends_on(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Raw SQL following the select list (`FROM ... WHERE ...`).
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

/// A declared view.
#[derive(Debug, Clone)]
pub struct ViewSchema {
    pub(crate) name: QualifiedName,
    pub(crate) columns: Vec<ColumnSchema>,
    pub(crate) expressions: Vec<String>,
    pub(crate) sources: Vec<QualifiedName>,
    pub(crate) query: String,
    pub(crate) or_replace: bool,
}

impl ViewSchema {
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// `(column, select expression)` pairs in declared order.
    pub fn select_list(&self) -> impl Iterator<Item = (&ColumnSchema, &str)> {
        self.columns
            .iter()
            .zip(self.expressions.iter().map(String::as_str))
    }

    pub fn sources(&self) -> &[QualifiedName] {
        &self.sources
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn or_replace(&self) -> bool {
        self.or_replace
    }
}

impl Selectable for ViewSchema {
    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::View
    }
}
