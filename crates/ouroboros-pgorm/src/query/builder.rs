//! Statement builders for the CRUD operations.
//!
//! Every builder validates column names against the schema and returns a
//! [`CompiledStatement`]; nothing here touches the database.

use super::compiler::compile_where;
use super::filter::FilterSet;
use super::helpers::quote_identifier;
use super::statement::CompiledStatement;
use super::types::OrderDirection;
use crate::row::Row;
use crate::schema::{ColumnSchema, ObjectKind, QualifiedName, Selectable, TableSchema};
use crate::types::SqlValue;
use crate::{OrmError, Result};

/// PostgreSQL's limit on bind parameters per statement.
const MAX_PARAMS: usize = u16::MAX as usize;

/// Conflict handling for inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// `ON CONFLICT DO NOTHING`
    DoNothing,
    /// `ON CONFLICT (pk) DO UPDATE SET col = EXCLUDED.col` for every
    /// supplied non-key column
    UpdatePrimaryKey,
}

/// What an insert reads back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Returning {
    /// Omitted serial and defaulted columns
    #[default]
    Generated,
    /// `RETURNING *`
    All,
    Columns(Vec<String>),
    Nothing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOptions {
    pub on_conflict: Option<OnConflict>,
    pub returning: Returning,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    pub fn returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }
}

/// Ordering and paging for fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub order_by: Vec<(String, OrderDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

fn column<'a>(source: &'a dyn Selectable, name: &str) -> Result<&'a ColumnSchema> {
    source.column(name).ok_or_else(|| {
        OrmError::Configuration(format!("Unknown column '{}' on {}", name, source.name()))
    })
}

/// Supplied values in declared column order, validated.
fn supplied_columns<'a>(
    table: &'a TableSchema,
    values: &'a [(String, SqlValue)],
) -> Result<Vec<(&'a ColumnSchema, &'a SqlValue)>> {
    for (i, (name, _)) in values.iter().enumerate() {
        column(table, name)?;
        if values[..i].iter().any(|(other, _)| other == name) {
            return Err(OrmError::Configuration(format!(
                "Column '{}' is supplied more than once",
                name
            )));
        }
    }

    let mut supplied = Vec::with_capacity(values.len());
    for column in table.columns() {
        if let Some((_, value)) = values.iter().find(|(name, _)| name == column.name()) {
            if !column.type_entry().accepts_value(value) {
                return Err(OrmError::Compilation(format!(
                    "Column '{}' of type {} does not accept {:?} values",
                    column.name(),
                    column.ddl_type(),
                    value.kind()
                )));
            }
            supplied.push((column, value));
        }
    }
    Ok(supplied)
}

fn column_list<'a, I: IntoIterator<Item = &'a str>>(names: I) -> String {
    names
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_clause(sql: &mut String, clause: &str) {
    if !clause.is_empty() {
        sql.push(' ');
        sql.push_str(clause);
    }
}

fn push_on_conflict(
    sql: &mut String,
    table: &TableSchema,
    columns: &[&ColumnSchema],
    on_conflict: Option<OnConflict>,
) -> Result<()> {
    match on_conflict {
        None => {}
        Some(OnConflict::DoNothing) => sql.push_str(" ON CONFLICT DO NOTHING"),
        Some(OnConflict::UpdatePrimaryKey) => {
            if !table.has_primary_key() {
                return Err(OrmError::Configuration(format!(
                    "Table '{}' has no primary key to resolve conflicts on",
                    table.name()
                )));
            }
            let target = column_list(table.primary_key().iter().map(String::as_str));
            let updates: Vec<String> = columns
                .iter()
                .filter(|c| !c.is_primary_key())
                .map(|c| {
                    let name = quote_identifier(c.name());
                    format!("{} = EXCLUDED.{}", name, name)
                })
                .collect();
            if updates.is_empty() {
                sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", target));
            } else {
                sql.push_str(&format!(
                    " ON CONFLICT ({}) DO UPDATE SET {}",
                    target,
                    updates.join(", ")
                ));
            }
        }
    }
    Ok(())
}

fn returning_clause(
    table: &TableSchema,
    supplied: &[&ColumnSchema],
    returning: &Returning,
) -> Result<Option<String>> {
    Ok(match returning {
        Returning::Generated => {
            let names: Vec<&str> = table
                .generated_columns()
                .filter(|c| !supplied.iter().any(|s| s.name() == c.name()))
                .map(|c| c.name())
                .collect();
            (!names.is_empty()).then(|| column_list(names))
        }
        Returning::All => Some("*".to_string()),
        Returning::Columns(names) => {
            for name in names {
                column(table, name)?;
            }
            (!names.is_empty()).then(|| column_list(names.iter().map(String::as_str)))
        }
        Returning::Nothing => None,
    })
}

/// `INSERT INTO t (cols) VALUES (...)`, or `DEFAULT VALUES` when nothing
/// is supplied.
pub fn build_insert(
    table: &TableSchema,
    values: &[(String, SqlValue)],
    options: &InsertOptions,
) -> Result<CompiledStatement> {
    let supplied = supplied_columns(table, values)?;
    let columns: Vec<&ColumnSchema> = supplied.iter().map(|(c, _)| *c).collect();

    let mut sql = format!("INSERT INTO {}", table.name().quoted());
    let mut params = Vec::with_capacity(supplied.len());

    if supplied.is_empty() {
        sql.push_str(" DEFAULT VALUES");
    } else {
        let placeholders: Vec<String> = supplied
            .iter()
            .enumerate()
            .map(|(i, (column, value))| column.placeholder(i + 1, value.is_null()))
            .collect();
        sql.push_str(&format!(
            " ({}) VALUES ({})",
            column_list(columns.iter().map(|c| c.name())),
            placeholders.join(", ")
        ));
        params.extend(supplied.iter().map(|(_, value)| (*value).clone()));
    }

    push_on_conflict(&mut sql, table, &columns, options.on_conflict)?;

    let returning = returning_clause(table, &columns, &options.returning)?;
    let returns_rows = returning.is_some();
    if let Some(returning) = returning {
        sql.push_str(" RETURNING ");
        sql.push_str(&returning);
    }

    Ok(CompiledStatement::new(sql, params, returns_rows))
}

/// Multi-row insert. Columns are the union of the supplied ones; a row
/// that omits a column gets `DEFAULT`.
pub fn build_insert_many(
    table: &TableSchema,
    rows: &[Vec<(String, SqlValue)>],
    on_conflict: Option<OnConflict>,
) -> Result<CompiledStatement> {
    if rows.is_empty() {
        return Err(OrmError::Compilation("insert_many needs at least one row".to_string()));
    }

    let supplied: Vec<Vec<(&ColumnSchema, &SqlValue)>> = rows
        .iter()
        .map(|values| supplied_columns(table, values))
        .collect::<Result<_>>()?;

    let columns: Vec<&ColumnSchema> = table
        .columns()
        .iter()
        .filter(|c| supplied.iter().any(|row| row.iter().any(|(s, _)| s.name() == c.name())))
        .collect();
    if columns.is_empty() {
        return Err(OrmError::Compilation(format!(
            "insert_many into '{}' supplies no columns",
            table.name()
        )));
    }

    let mut params = Vec::new();
    let mut tuples = Vec::with_capacity(rows.len());
    for row in &supplied {
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            match row.iter().find(|(s, _)| s.name() == column.name()) {
                Some((_, value)) => {
                    params.push((*value).clone());
                    placeholders.push(column.placeholder(params.len(), value.is_null()));
                }
                None => placeholders.push("DEFAULT".to_string()),
            }
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    if params.len() > MAX_PARAMS {
        return Err(OrmError::Compilation(format!(
            "insert_many binds {} parameters, more than the {} PostgreSQL allows",
            params.len(),
            MAX_PARAMS
        )));
    }

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table.name().quoted(),
        column_list(columns.iter().map(|c| c.name())),
        tuples.join(", ")
    );
    push_on_conflict(&mut sql, table, &columns, on_conflict)?;

    Ok(CompiledStatement::new(sql, params, false))
}

/// `SELECT * FROM source WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub fn build_select(
    source: &dyn Selectable,
    filters: &FilterSet,
    options: &FetchOptions,
) -> Result<CompiledStatement> {
    build_select_list(source, "*", filters, options)
}

/// Single column of the first matching row.
pub fn build_select_value(
    source: &dyn Selectable,
    column_name: &str,
    filters: &FilterSet,
    options: &FetchOptions,
) -> Result<CompiledStatement> {
    let target = quote_identifier(column(source, column_name)?.name());
    let options = FetchOptions {
        limit: Some(1),
        ..options.clone()
    };
    build_select_list(source, &target, filters, &options)
}

fn build_select_list(
    source: &dyn Selectable,
    select_list: &str,
    filters: &FilterSet,
    options: &FetchOptions,
) -> Result<CompiledStatement> {
    let clause = compile_where(source, filters, 0)?;

    let mut sql = format!("SELECT {} FROM {}", select_list, source.name().quoted());
    push_clause(&mut sql, &clause.sql);

    if !options.order_by.is_empty() {
        let mut terms = Vec::with_capacity(options.order_by.len());
        for (name, direction) in &options.order_by {
            let col = column(source, name)?;
            terms.push(format!("{} {}", quote_identifier(col.name()), direction.to_sql()));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }
    if let Some(limit) = options.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = options.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    Ok(CompiledStatement::new(sql, clause.params, true))
}

/// `UPDATE t SET ... WHERE ...`. SET placeholders come first and the
/// WHERE placeholders continue the sequence.
pub fn build_update(
    table: &TableSchema,
    values: &[(String, SqlValue)],
    filters: &FilterSet,
) -> Result<CompiledStatement> {
    if filters.is_empty() {
        return Err(OrmError::Compilation(format!(
            "Update of '{}' needs at least one filter",
            table.name()
        )));
    }
    if values.is_empty() {
        return Err(OrmError::Compilation(format!(
            "Update of '{}' sets no columns",
            table.name()
        )));
    }

    let supplied = supplied_columns(table, values)?;
    let assignments: Vec<String> = supplied
        .iter()
        .enumerate()
        .map(|(i, (column, value))| {
            format!(
                "{} = {}",
                quote_identifier(column.name()),
                column.placeholder(i + 1, value.is_null())
            )
        })
        .collect();

    let clause = compile_where(table, filters, supplied.len())?;

    let mut sql = format!(
        "UPDATE {} SET {}",
        table.name().quoted(),
        assignments.join(", ")
    );
    push_clause(&mut sql, &clause.sql);

    let mut params: Vec<SqlValue> = supplied.iter().map(|(_, v)| (*v).clone()).collect();
    params.extend(clause.params);
    Ok(CompiledStatement::new(sql, params, false))
}

/// `DELETE FROM t [WHERE ...]`. An empty filter set deletes every row.
pub fn build_delete(table: &TableSchema, filters: &FilterSet) -> Result<CompiledStatement> {
    let clause = compile_where(table, filters, 0)?;
    let mut sql = format!("DELETE FROM {}", table.name().quoted());
    push_clause(&mut sql, &clause.sql);
    Ok(CompiledStatement::new(sql, clause.params, false))
}

/// Equality filters on the primary key, taken from `row`.
pub fn primary_key_filters(table: &TableSchema, row: &Row) -> Result<FilterSet> {
    if !table.has_primary_key() {
        return Err(OrmError::Configuration(format!(
            "Table '{}' has no primary key",
            table.name()
        )));
    }

    let mut filters = FilterSet::new();
    for key in table.primary_key() {
        match row.get(key) {
            Some(SqlValue::Null) | None => {
                return Err(OrmError::Configuration(format!(
                    "Row has no value for primary-key column '{}' of '{}'",
                    key,
                    table.name()
                )))
            }
            Some(value) => filters = filters.eq(key.as_str(), value.clone()),
        }
    }
    Ok(filters)
}

pub fn build_update_record(
    table: &TableSchema,
    row: &Row,
    values: &[(String, SqlValue)],
) -> Result<CompiledStatement> {
    build_update(table, values, &primary_key_filters(table, row)?)
}

pub fn build_delete_record(table: &TableSchema, row: &Row) -> Result<CompiledStatement> {
    build_delete(table, &primary_key_filters(table, row)?)
}

/// Existence check against the system catalogs.
pub fn build_exists(name: &QualifiedName, kind: ObjectKind) -> CompiledStatement {
    let sql = match kind {
        ObjectKind::Table => {
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)"
        }
        ObjectKind::View => {
            "SELECT EXISTS (SELECT FROM information_schema.views WHERE table_schema = $1 AND table_name = $2)"
        }
        ObjectKind::Enum => {
            "SELECT EXISTS (SELECT FROM pg_type t JOIN pg_namespace n ON n.oid = t.typnamespace WHERE n.nspname = $1 AND t.typname = $2)"
        }
    };
    CompiledStatement::new(
        sql.to_string(),
        vec![
            SqlValue::String(name.schema.clone()),
            SqlValue::String(name.name.clone()),
        ],
        true,
    )
}
