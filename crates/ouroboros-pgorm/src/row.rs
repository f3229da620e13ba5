//! Row representation and the CRUD façade.
//!
//! The façade functions are thin: build a statement with the
//! [`query`](crate::query) builders, run it through [`executor`](crate::executor)
//! on whatever `sqlx` executor the caller passes, decode the result. Pool
//! and transaction lifetimes stay with the caller.

use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Executor, Postgres};
use tracing::{debug, info, instrument};

use crate::executor;
use crate::query::{
    build_delete, build_delete_record, build_exists, build_insert, build_insert_many, build_select,
    build_select_value, build_update, build_update_record, FetchOptions, FilterSet, InsertOptions,
    OnConflict,
};
use crate::schema::{ObjectKind, QualifiedName, Selectable, TableSchema};
use crate::types::{row_to_values, SqlValue};
use crate::Result;

/// A row read from (or written to) the database, columns in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub(crate) columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> &[(String, SqlValue)] {
        &self.columns
    }

    pub fn into_values(self) -> Vec<(String, SqlValue)> {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Sets `column`, replacing an existing value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Converts row to a JSON object.
    pub fn to_json(&self) -> JsonValue {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.columns {
            map.insert(key.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }

    /// Converts from a `sqlx` row.
    pub fn from_pg(row: &PgRow) -> Result<Self> {
        Ok(Self {
            columns: row_to_values(row)?,
        })
    }

    fn merge(&mut self, other: Row) {
        for (column, value) in other.columns {
            self.set(column, value);
        }
    }

    /// Inserts one row and returns the supplied values merged with the
    /// server-generated ones (serial ids, defaults).
    #[instrument(skip(executor, table, values), fields(table = %table.name(), value_count = values.len()))]
    pub async fn insert<'a, E>(
        executor: E,
        table: &TableSchema,
        values: &[(String, SqlValue)],
    ) -> Result<Row>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let inserted = Self::insert_with(executor, table, values, &InsertOptions::default()).await?;
        Ok(inserted.unwrap_or_else(|| Row::new(values.to_vec())))
    }

    /// Insert with conflict handling and a custom `RETURNING` list.
    ///
    /// `None` when a conflict clause skipped the row.
    #[instrument(skip(executor, table, values, options), fields(table = %table.name(), value_count = values.len()))]
    pub async fn insert_with<'a, E>(
        executor: E,
        table: &TableSchema,
        values: &[(String, SqlValue)],
        options: &InsertOptions,
    ) -> Result<Option<Row>>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_insert(table, values, options)?;
        let mut row = Row::new(values.to_vec());

        if statement.returns_rows {
            match executor::fetch_optional(executor, &statement).await? {
                Some(returned) => row.merge(returned),
                None => {
                    debug!("Insert skipped by conflict clause");
                    return Ok(None);
                }
            }
        } else if executor::execute(executor, &statement).await? == 0 {
            debug!("Insert skipped by conflict clause");
            return Ok(None);
        }

        info!("Insert complete");
        Ok(Some(row))
    }

    /// Inserts several rows with one statement. Returns the number of rows
    /// written.
    #[instrument(skip(executor, table, rows), fields(table = %table.name(), row_count = rows.len()))]
    pub async fn insert_many<'a, E>(
        executor: E,
        table: &TableSchema,
        rows: &[Vec<(String, SqlValue)>],
        on_conflict: Option<OnConflict>,
    ) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        if rows.is_empty() {
            return Ok(0);
        }
        let statement = build_insert_many(table, rows, on_conflict)?;
        let affected = executor::execute(executor, &statement).await?;
        info!(affected, "Insert complete");
        Ok(affected)
    }

    /// All rows matching `filters`.
    #[instrument(skip(executor, source, filters, options), fields(source = %source.name(), filter_count = filters.len()))]
    pub async fn fetch<'a, E>(
        executor: E,
        source: &dyn Selectable,
        filters: &FilterSet,
        options: &FetchOptions,
    ) -> Result<Vec<Row>>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_select(source, filters, options)?;
        let rows = executor::fetch_all(executor, &statement).await?;
        debug!(row_count = rows.len(), "Fetch complete");
        Ok(rows)
    }

    /// Rows matching a raw clause (`"age > $1 AND name LIKE $2"`).
    pub async fn fetch_where<'a, E>(
        executor: E,
        source: &dyn Selectable,
        clause: &str,
        params: Vec<SqlValue>,
        options: &FetchOptions,
    ) -> Result<Vec<Row>>
    where
        E: Executor<'a, Database = Postgres>,
    {
        Self::fetch(executor, source, &FilterSet::new().raw(clause, params), options).await
    }

    /// First row matching `filters`, `None` when nothing matches.
    #[instrument(skip(executor, source, filters), fields(source = %source.name(), filter_count = filters.len()))]
    pub async fn fetch_row<'a, E>(
        executor: E,
        source: &dyn Selectable,
        filters: &FilterSet,
    ) -> Result<Option<Row>>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_select(source, filters, &FetchOptions::new().limit(1))?;
        executor::fetch_optional(executor, &statement).await
    }

    pub async fn fetch_row_where<'a, E>(
        executor: E,
        source: &dyn Selectable,
        clause: &str,
        params: Vec<SqlValue>,
    ) -> Result<Option<Row>>
    where
        E: Executor<'a, Database = Postgres>,
    {
        Self::fetch_row(executor, source, &FilterSet::new().raw(clause, params)).await
    }

    /// One column of the first matching row.
    ///
    /// `None` when no row matches; `Some(SqlValue::Null)` when the row
    /// holds NULL.
    #[instrument(skip(executor, source, filters, options), fields(source = %source.name(), column = %column))]
    pub async fn fetch_value<'a, E>(
        executor: E,
        source: &dyn Selectable,
        column: &str,
        filters: &FilterSet,
        options: &FetchOptions,
    ) -> Result<Option<SqlValue>>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_select_value(source, column, filters, options)?;
        Ok(executor::fetch_optional(executor, &statement)
            .await?
            .and_then(|row| row.columns.into_iter().next().map(|(_, value)| value)))
    }

    /// Updates matching rows. At least one filter is required.
    #[instrument(skip(executor, table, values, filters), fields(table = %table.name(), value_count = values.len(), filter_count = filters.len()))]
    pub async fn update<'a, E>(
        executor: E,
        table: &TableSchema,
        values: &[(String, SqlValue)],
        filters: &FilterSet,
    ) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_update(table, values, filters)?;
        let affected = executor::execute(executor, &statement).await?;
        info!(affected, "Update complete");
        Ok(affected)
    }

    pub async fn update_where<'a, E>(
        executor: E,
        table: &TableSchema,
        values: &[(String, SqlValue)],
        clause: &str,
        params: Vec<SqlValue>,
    ) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        Self::update(executor, table, values, &FilterSet::new().raw(clause, params)).await
    }

    /// Updates the row identified by `row`'s primary key.
    #[instrument(skip(executor, table, row, values), fields(table = %table.name(), value_count = values.len()))]
    pub async fn update_record<'a, E>(
        executor: E,
        table: &TableSchema,
        row: &Row,
        values: &[(String, SqlValue)],
    ) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_update_record(table, row, values)?;
        executor::execute(executor, &statement).await
    }

    /// Deletes matching rows; an empty filter set deletes every row.
    #[instrument(skip(executor, table, filters), fields(table = %table.name(), filter_count = filters.len()))]
    pub async fn delete<'a, E>(executor: E, table: &TableSchema, filters: &FilterSet) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_delete(table, filters)?;
        let affected = executor::execute(executor, &statement).await?;
        info!(affected, "Delete complete");
        Ok(affected)
    }

    pub async fn delete_where<'a, E>(
        executor: E,
        table: &TableSchema,
        clause: &str,
        params: Vec<SqlValue>,
    ) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        Self::delete(executor, table, &FilterSet::new().raw(clause, params)).await
    }

    /// Deletes the row identified by `row`'s primary key.
    ///
    /// Tables without a primary key are a configuration error and no
    /// statement is sent.
    #[instrument(skip(executor, table, row), fields(table = %table.name()))]
    pub async fn delete_record<'a, E>(executor: E, table: &TableSchema, row: &Row) -> Result<u64>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_delete_record(table, row)?;
        executor::execute(executor, &statement).await
    }

    /// Whether a table, view or enum exists in the database.
    #[instrument(skip(executor), fields(object = %name))]
    pub async fn exists<'a, E>(executor: E, name: &QualifiedName, kind: ObjectKind) -> Result<bool>
    where
        E: Executor<'a, Database = Postgres>,
    {
        let statement = build_exists(name, kind);
        let row = executor::fetch_optional(executor, &statement).await?;
        Ok(matches!(
            row.as_ref().and_then(|r| r.values().first()),
            Some((_, SqlValue::Bool(true)))
        ))
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
