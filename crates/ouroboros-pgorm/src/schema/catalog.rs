//! Declaration registry with eager validation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::{Acquire, Postgres};
use tracing::debug;

use super::column::{Column, ColumnSchema, ForeignKey};
use super::enums::{EnumSchema, EnumType};
use super::table::{enum_of, Table, TableSchema};
use super::view::{View, ViewSchema};
use super::{QualifiedName, DEFAULT_SCHEMA};
use crate::ddl::DdlGenerator;
use crate::query::{normalise_name, validate_identifier_part};
use crate::registry::{TypeEntry, TypeRegistry};
use crate::types::SqlType;
use crate::{OrmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Enum,
    Table,
    View,
}

impl ObjectKind {
    /// Keyword used in `CREATE` / `DROP` statements.
    pub fn to_sql(&self) -> &'static str {
        match self {
            ObjectKind::Enum => "TYPE",
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

/// Any declared object.
#[derive(Debug, Clone)]
pub enum SchemaObject {
    Enum(Arc<EnumSchema>),
    Table(Arc<TableSchema>),
    View(Arc<ViewSchema>),
}

impl SchemaObject {
    pub fn name(&self) -> &QualifiedName {
        match self {
            SchemaObject::Enum(e) => &e.name,
            SchemaObject::Table(t) => &t.name,
            SchemaObject::View(v) => &v.name,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            SchemaObject::Enum(_) => ObjectKind::Enum,
            SchemaObject::Table(_) => ObjectKind::Table,
            SchemaObject::View(_) => ObjectKind::View,
        }
    }

    /// Objects that must exist before this one can be created.
    pub fn dependencies(&self) -> Vec<QualifiedName> {
        match self {
            SchemaObject::Enum(_) => Vec::new(),
            SchemaObject::Table(table) => {
                let mut deps = table.enum_dependencies();
                for (_, fk) in table.foreign_keys() {
                    if fk.table != table.name && !deps.contains(&fk.table) {
                        deps.push(fk.table.clone());
                    }
                }
                deps
            }
            SchemaObject::View(view) => {
                let mut deps: Vec<QualifiedName> = view.sources.clone();
                for column in &view.columns {
                    if let Some(name) = enum_of(&column.ty) {
                        let name = QualifiedName::parse(name, &view.name.schema);
                        if !deps.contains(&name) {
                            deps.push(name);
                        }
                    }
                }
                deps
            }
        }
    }
}

impl From<Arc<TableSchema>> for SchemaObject {
    fn from(table: Arc<TableSchema>) -> Self {
        SchemaObject::Table(table)
    }
}

impl From<Arc<ViewSchema>> for SchemaObject {
    fn from(view: Arc<ViewSchema>) -> Self {
        SchemaObject::View(view)
    }
}

impl From<Arc<EnumSchema>> for SchemaObject {
    fn from(e: Arc<EnumSchema>) -> Self {
        SchemaObject::Enum(e)
    }
}

/// Ordered set of declared objects.
///
/// Declaration order is dependency order: a foreign key, enum column or
/// view source may only name objects declared before it. Build the catalog
/// once at startup, then share it (it is `Send + Sync`).
#[derive(Debug, Clone)]
pub struct Catalog {
    registry: Arc<TypeRegistry>,
    objects: Vec<SchemaObject>,
    by_name: HashMap<QualifiedName, usize>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Catalog using the process-wide [`TypeRegistry`].
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::global())
    }

    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            objects: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Declared objects in declaration order.
    pub fn objects(&self) -> &[SchemaObject] {
        &self.objects
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&SchemaObject> {
        self.by_name.get(name).map(|&idx| &self.objects[idx])
    }

    /// Looks up a table by `schema.name` or bare name in `public`.
    pub fn table(&self, name: &str) -> Option<Arc<TableSchema>> {
        match self.get(&QualifiedName::parse(name, DEFAULT_SCHEMA)) {
            Some(SchemaObject::Table(t)) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn view(&self, name: &str) -> Option<Arc<ViewSchema>> {
        match self.get(&QualifiedName::parse(name, DEFAULT_SCHEMA)) {
            Some(SchemaObject::View(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn enum_type(&self, name: &str) -> Option<Arc<EnumSchema>> {
        match self.get(&QualifiedName::parse(name, DEFAULT_SCHEMA)) {
            Some(SchemaObject::Enum(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// DDL generator over every declared object.
    pub fn ddl(&self) -> DdlGenerator {
        DdlGenerator::new(self.objects.iter().cloned())
    }

    /// DDL script for the whole catalog.
    pub fn export_ddl(&self) -> Result<String> {
        self.ddl().export()
    }

    /// Creates every declared object in one transaction.
    pub async fn create_all<'a, A>(&self, conn: A) -> Result<()>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        self.ddl().create(conn).await
    }

    /// Drops every declared object, dependents first, in one transaction.
    pub async fn drop_all<'a, A>(&self, conn: A) -> Result<()>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        self.ddl().drop(conn).await
    }

    pub fn declare_enum(&mut self, decl: EnumType) -> Result<Arc<EnumSchema>> {
        let name = self.object_name(&decl.type_name, decl.name_override.as_deref(), decl.schema.as_deref())?;

        if decl.labels.is_empty() {
            return Err(OrmError::Configuration(format!("Enum '{}' has no labels", name)));
        }
        let mut seen = HashSet::new();
        for label in &decl.labels {
            if label.is_empty() || label.len() > 63 {
                return Err(OrmError::Configuration(format!(
                    "Enum '{}' label '{}' must be 1 to 63 bytes long",
                    name, label
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(OrmError::Configuration(format!(
                    "Enum '{}' repeats label '{}'",
                    name, label
                )));
            }
        }

        let schema = Arc::new(EnumSchema {
            name,
            labels: decl.labels,
            if_not_exists: decl.if_not_exists,
        });
        self.push(SchemaObject::Enum(schema.clone()));
        Ok(schema)
    }

    pub fn declare_table(&mut self, decl: Table) -> Result<Arc<TableSchema>> {
        let name = self.object_name(&decl.type_name, decl.name_override.as_deref(), decl.schema.as_deref())?;

        if decl.columns.is_empty() {
            return Err(OrmError::Configuration(format!("Table '{}' has no columns", name)));
        }

        let mut column_names = HashSet::new();
        for column in &decl.columns {
            validate_identifier_part(&column.name)?;
            if !column_names.insert(column.name.as_str()) {
                return Err(OrmError::Configuration(format!(
                    "Table '{}' declares column '{}' twice",
                    name, column.name
                )));
            }
        }

        let primary_key = Self::primary_key(&name, &decl)?;

        for set in &decl.unique {
            if set.is_empty() {
                return Err(OrmError::Configuration(format!(
                    "Table '{}' has an empty unique constraint",
                    name
                )));
            }
            for col in set {
                if !column_names.contains(col.as_str()) {
                    return Err(OrmError::Configuration(format!(
                        "Unique constraint on '{}' names unknown column '{}'",
                        name, col
                    )));
                }
            }
        }

        let mut columns = Vec::with_capacity(decl.columns.len());
        for column in &decl.columns {
            let foreign_key = match &column.references {
                Some(reference) => {
                    let target = QualifiedName::parse(&reference.table, &name.schema);
                    self.check_reference(&name, &decl, column, &target, &reference.column)?;
                    Some(ForeignKey {
                        table: target,
                        column: reference.column.clone(),
                        on_delete: reference.on_delete,
                        on_update: reference.on_update,
                    })
                }
                None => None,
            };

            let (ty, entry) = self.resolve_type(&column.ty, &name.schema)
                .map_err(|e| Self::context(e, &name, &column.name))?;

            columns.push(ColumnSchema {
                name: column.name.clone(),
                ty,
                entry,
                nullable: column.nullable,
                primary_key: primary_key.contains(&column.name),
                unique: column.unique,
                index: column.index,
                default: column.default.clone(),
                foreign_key,
            });
        }

        let schema = Arc::new(TableSchema {
            name,
            columns,
            primary_key,
            unique: decl.unique,
            if_not_exists: decl.if_not_exists,
        });
        debug!(table = %schema.name, columns = schema.columns.len(), "Declared table");
        self.push(SchemaObject::Table(schema.clone()));
        Ok(schema)
    }

    pub fn declare_view(&mut self, decl: View) -> Result<Arc<ViewSchema>> {
        let name = self.object_name(&decl.type_name, decl.name_override.as_deref(), decl.schema.as_deref())?;

        if decl.columns.is_empty() {
            return Err(OrmError::Configuration(format!("View '{}' has no columns", name)));
        }

        let mut sources = Vec::with_capacity(decl.sources.len());
        for source in &decl.sources {
            let source = QualifiedName::parse(source, &name.schema);
            match self.get(&source) {
                Some(SchemaObject::Table(_)) | Some(SchemaObject::View(_)) => sources.push(source),
                _ => {
                    return Err(OrmError::Configuration(format!(
                        "View '{}' depends on '{}', which is not a declared table or view",
                        name, source
                    )))
                }
            }
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(decl.columns.len());
        let mut expressions = Vec::with_capacity(decl.columns.len());
        for column in decl.columns {
            validate_identifier_part(&column.name)?;
            if !seen.insert(column.name.clone()) {
                return Err(OrmError::Configuration(format!(
                    "View '{}' declares column '{}' twice",
                    name, column.name
                )));
            }
            let (ty, entry) = self.resolve_type(&column.ty, &name.schema)
                .map_err(|e| Self::context(e, &name, &column.name))?;
            columns.push(ColumnSchema {
                name: column.name,
                ty,
                entry,
                nullable: true,
                primary_key: false,
                unique: false,
                index: false,
                default: None,
                foreign_key: None,
            });
            expressions.push(column.expression);
        }

        let schema = Arc::new(ViewSchema {
            name,
            columns,
            expressions,
            sources,
            query: decl.query,
            or_replace: decl.or_replace,
        });
        self.push(SchemaObject::View(schema.clone()));
        Ok(schema)
    }

    fn push(&mut self, object: SchemaObject) {
        self.by_name.insert(object.name().clone(), self.objects.len());
        self.objects.push(object);
    }

    /// Normalised, validated and not yet taken.
    fn object_name(
        &self,
        type_name: &str,
        name_override: Option<&str>,
        schema: Option<&str>,
    ) -> Result<QualifiedName> {
        let name = match name_override {
            Some(name) => name.to_string(),
            None => normalise_name(type_name),
        };
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        validate_identifier_part(schema)?;
        validate_identifier_part(&name)?;

        let name = QualifiedName::new(schema, name);
        if self.by_name.contains_key(&name) {
            return Err(OrmError::Configuration(format!(
                "'{}' is already declared",
                name
            )));
        }
        Ok(name)
    }

    fn primary_key(name: &QualifiedName, decl: &Table) -> Result<Vec<String>> {
        let flagged: Vec<&Column> = decl.columns.iter().filter(|c| c.primary_key).collect();

        if flagged.len() > 1 {
            let names: Vec<&str> = flagged.iter().map(|c| c.name.as_str()).collect();
            return Err(OrmError::Configuration(format!(
                "Table '{}' marks {} columns as primary key ({}); declare a composite key with Table::primary_key",
                name,
                flagged.len(),
                names.join(", ")
            )));
        }

        if !decl.primary_key.is_empty() {
            if let Some(column) = flagged.first() {
                return Err(OrmError::Configuration(format!(
                    "Table '{}' declares both a composite primary key and primary-key column '{}'",
                    name, column.name
                )));
            }
            let mut seen = HashSet::new();
            for col in &decl.primary_key {
                if !decl.columns.iter().any(|c| &c.name == col) {
                    return Err(OrmError::Configuration(format!(
                        "Primary key of '{}' names unknown column '{}'",
                        name, col
                    )));
                }
                if !seen.insert(col) {
                    return Err(OrmError::Configuration(format!(
                        "Primary key of '{}' repeats column '{}'",
                        name, col
                    )));
                }
            }
            return Ok(decl.primary_key.clone());
        }

        Ok(flagged.iter().map(|c| c.name.clone()).collect())
    }

    /// Foreign keys may target an earlier table or a column of the table
    /// being declared.
    fn check_reference(
        &self,
        owner: &QualifiedName,
        decl: &Table,
        column: &Column,
        target: &QualifiedName,
        target_column: &str,
    ) -> Result<()> {
        if target == owner {
            if decl.columns.iter().any(|c| c.name == target_column) {
                return Ok(());
            }
        } else {
            match self.get(target) {
                Some(SchemaObject::Table(table)) => {
                    if table.column(target_column).is_some() {
                        return Ok(());
                    }
                }
                _ => {
                    return Err(OrmError::Configuration(format!(
                        "Column '{}.{}' references '{}', which is not a declared table (declare it first)",
                        owner, column.name, target
                    )))
                }
            }
        }

        Err(OrmError::Configuration(format!(
            "Column '{}.{}' references unknown column '{}.{}'",
            owner, column.name, target, target_column
        )))
    }

    /// Resolves a column type, qualifying enum names against `schema`.
    fn resolve_type(&self, ty: &SqlType, schema: &str) -> Result<(SqlType, TypeEntry)> {
        let ty = qualify_enums(ty, schema);
        let lookup = |name: &str| match self.get(&QualifiedName::parse(name, schema)) {
            Some(SchemaObject::Enum(e)) => Some(e.name.quoted()),
            _ => None,
        };
        let entry = self.registry.resolve(&ty, &lookup)?;
        Ok((ty, entry))
    }

    fn context(err: OrmError, table: &QualifiedName, column: &str) -> OrmError {
        match err {
            OrmError::Configuration(msg) => {
                OrmError::Configuration(format!("{}.{}: {}", table, column, msg))
            }
            other => other,
        }
    }
}

fn qualify_enums(ty: &SqlType, schema: &str) -> SqlType {
    match ty {
        SqlType::Enum(name) => SqlType::Enum(QualifiedName::parse(name, schema).to_string()),
        SqlType::Array(inner) => SqlType::Array(Box::new(qualify_enums(inner, schema))),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Selectable;
    use crate::types::SqlType;

    fn catalog() -> Catalog {
        Catalog::with_registry(Arc::new(TypeRegistry::new()))
    }

    fn users(catalog: &mut Catalog) -> Arc<TableSchema> {
        catalog
            .declare_table(
                Table::new("User")
                    .name("users")
                    .column(Column::new("id", SqlType::Serial).primary_key())
                    .column(Column::new("name", SqlType::Text).not_null())
                    .column(Column::new("age", SqlType::Integer)),
            )
            .unwrap()
    }

    #[test]
    fn test_declare_table_accessors() {
        let mut catalog = catalog();
        let users = users(&mut catalog);

        assert_eq!(users.name().to_string(), "public.users");
        let names: Vec<&str> = users.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "name", "age"]);
        assert_eq!(users.primary_key(), &["id".to_string()]);
        assert_eq!(users.kind(), ObjectKind::Table);
        assert!(catalog.table("users").is_some());
        assert!(catalog.table("public.users").is_some());
    }

    #[test]
    fn test_name_normalisation_and_schema() {
        let mut catalog = catalog();
        let table = catalog
            .declare_table(
                Table::new("UserProfile")
                    .schema("auth")
                    .column(Column::new("id", SqlType::Uuid).primary_key()),
            )
            .unwrap();
        assert_eq!(table.name(), &QualifiedName::new("auth", "user_profile"));
        assert!(table.if_not_exists());
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let mut catalog = catalog();
        users(&mut catalog);
        let err = catalog
            .declare_table(Table::new("users").column(Column::new("id", SqlType::Integer)))
            .unwrap_err();
        assert!(err.to_string().contains("already declared"));
    }

    #[test]
    fn test_full_width_names_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(
                Table::new("t")
                    .column(Column::new("name", SqlType::Text))
                    .column(Column::new("\u{ff4e}\u{ff41}\u{ff4d}\u{ff45}", SqlType::Text)),
            )
            .unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
        assert!(err.to_string().contains("NFKC"));

        let err = catalog
            .declare_table(
                Table::new("t")
                    .name("\u{ff55}sers")
                    .column(Column::new("id", SqlType::Integer)),
            )
            .unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
        assert!(catalog.objects().is_empty());
    }

    #[test]
    fn test_reserved_words_as_column_names() {
        let mut catalog = catalog();
        let table = catalog
            .declare_table(
                Table::new("Ledger")
                    .column(Column::new("order", SqlType::Integer).primary_key())
                    .column(Column::new("group", SqlType::Text))
                    .column(Column::new("end", SqlType::Date))
                    .column(Column::new("all", SqlType::Boolean)),
            )
            .unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["order", "group", "end", "all"]);
        let sql = crate::ddl::create_table_sql(&table, false);
        assert!(sql.contains("\"order\" INTEGER"));
        assert!(sql.contains("PRIMARY KEY (\"order\")"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(
                Table::new("t")
                    .column(Column::new("a", SqlType::Integer))
                    .column(Column::new("a", SqlType::Text)),
            )
            .unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
    }

    #[test]
    fn test_multiple_primary_key_flags_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(
                Table::new("t")
                    .column(Column::new("a", SqlType::Integer).primary_key())
                    .column(Column::new("b", SqlType::Integer).primary_key()),
            )
            .unwrap_err();
        assert!(err.to_string().contains("composite key"));
    }

    #[test]
    fn test_composite_primary_key() {
        let mut catalog = catalog();
        let table = catalog
            .declare_table(
                Table::new("Membership")
                    .column(Column::new("user_id", SqlType::Integer))
                    .column(Column::new("group_id", SqlType::Integer))
                    .primary_key(["user_id", "group_id"]),
            )
            .unwrap();
        assert_eq!(table.primary_key(), &["user_id".to_string(), "group_id".to_string()]);
        assert!(table.column("user_id").unwrap().is_primary_key());
    }

    #[test]
    fn test_composite_and_flag_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(
                Table::new("t")
                    .column(Column::new("a", SqlType::Integer).primary_key())
                    .column(Column::new("b", SqlType::Integer))
                    .primary_key(["a", "b"]),
            )
            .unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));

        let err = catalog
            .declare_table(
                Table::new("t")
                    .column(Column::new("a", SqlType::Integer))
                    .primary_key(["a", "missing"]),
            )
            .unwrap_err();
        assert!(err.to_string().contains("unknown column 'missing'"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(
                Table::new("Post")
                    .column(Column::new("id", SqlType::Serial).primary_key())
                    .column(Column::new("author_id", SqlType::Integer).references("users", "id")),
            )
            .unwrap_err();
        assert!(err.to_string().contains("not a declared table"));
    }

    #[test]
    fn test_reference_to_unknown_column_rejected() {
        let mut catalog = catalog();
        users(&mut catalog);
        let err = catalog
            .declare_table(
                Table::new("Post")
                    .column(Column::new("author_id", SqlType::Integer).references("users", "uid")),
            )
            .unwrap_err();
        assert!(err.to_string().contains("unknown column 'public.users.uid'"));
    }

    #[test]
    fn test_reference_edges() {
        let mut catalog = catalog();
        users(&mut catalog);
        let posts = catalog
            .declare_table(
                Table::new("Post")
                    .column(Column::new("id", SqlType::Serial).primary_key())
                    .column(Column::new("parent_id", SqlType::Integer).references("post", "id"))
                    .column(Column::new("author_id", SqlType::Integer).references("users", "id").cascade()),
            )
            .unwrap();

        let edges: Vec<(String, String)> = posts
            .foreign_keys()
            .map(|(c, fk)| (c.name().to_string(), fk.table.to_string()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("parent_id".to_string(), "public.post".to_string()),
                ("author_id".to_string(), "public.users".to_string()),
            ]
        );

        // Self references are not ordering dependencies
        let object = catalog.get(posts.name()).unwrap();
        assert_eq!(object.dependencies(), vec![QualifiedName::new("public", "users")]);
    }

    #[test]
    fn test_enum_column_requires_declared_enum() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(
                Table::new("t").column(Column::new("mood", SqlType::Enum("mood".into()))),
            )
            .unwrap_err();
        assert!(err.to_string().contains("public.t.mood"));

        catalog.declare_enum(EnumType::new("Mood", ["happy", "sad"])).unwrap();
        let table = catalog
            .declare_table(
                Table::new("t").column(Column::new("mood", SqlType::Enum("mood".into()))),
            )
            .unwrap();
        let column = table.column("mood").unwrap();
        assert_eq!(column.sql_type(), &SqlType::Enum("public.mood".into()));
        assert_eq!(column.ddl_type(), "\"public\".\"mood\"");
        assert_eq!(table.enum_dependencies(), vec![QualifiedName::new("public", "mood")]);
    }

    #[test]
    fn test_enum_label_validation() {
        let mut catalog = catalog();
        assert!(catalog.declare_enum(EnumType::new("Empty", Vec::<String>::new())).is_err());
        assert!(catalog.declare_enum(EnumType::new("Twice", ["a", "a"])).is_err());
    }

    #[test]
    fn test_unregistered_custom_type_rejected() {
        let mut catalog = catalog();
        let err = catalog
            .declare_table(Table::new("t").column(Column::new("path", SqlType::Custom("ltree".into()))))
            .unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_declare_view() {
        let mut catalog = catalog();
        users(&mut catalog);
        let view = catalog
            .declare_view(
                View::new("Adult")
                    .column("id", SqlType::Integer, "u.id")
                    .column("name", SqlType::Text, "u.name")
                    .depends_on("users")
                    .query("FROM public.users u WHERE u.age >= 18"),
            )
            .unwrap();
        assert_eq!(view.name().to_string(), "public.adult");
        assert_eq!(view.sources(), &[QualifiedName::new("public", "users")]);
        assert_eq!(view.kind(), ObjectKind::View);
        assert!(catalog.view("adult").is_some());

        let err = catalog
            .declare_view(View::new("Orphan").column("id", SqlType::Integer, "x.id").depends_on("missing"))
            .unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
    }
}
