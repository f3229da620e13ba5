//! Declarative PostgreSQL table layer with a typed predicate compiler.
//!
//! Tables, views and enums are declared once with builders and validated
//! eagerly by a [`Catalog`]. From the validated schema the crate generates
//! DDL in dependency order and compiles structured filters into
//! parameterized SQL. Execution goes through any `sqlx` executor the caller
//! owns (pool, pooled connection or transaction).
//!
//! # Architecture
//!
//! ```text
//! TypeRegistry  (type tag -> DDL name + codec)
//!       |
//!    Catalog    (Table / View / EnumType -> TableSchema / ViewSchema / EnumSchema)
//!     /    \
//! DdlGenerator  query::compile_where + statement builders
//!                      |
//!                 Row façade (insert / fetch / update / delete)
//!                      |
//!                    SQLx
//! ```
//!
//! Everything above the façade is synchronous and works on immutable,
//! `Send + Sync` data; only the façade and [`DdlGenerator::create`] await.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use ouroboros_pgorm::{Catalog, Column, Connection, FetchOptions, FilterSet, Row, SqlType, Table};
//!
//! # async fn example() -> ouroboros_pgorm::Result<()> {
//! let mut catalog = Catalog::new();
//! let users = catalog.declare_table(
//!     Table::new("User")
//!         .name("users")
//!         .column(Column::new("id", SqlType::Serial).primary_key())
//!         .column(Column::new("name", SqlType::Text).not_null())
//!         .column(Column::new("age", SqlType::Integer)),
//! )?;
//!
//! let conn = Connection::from_env().await?;
//! catalog.create_all(conn.pool()).await?;
//!
//! let alice = Row::insert(conn.pool(), &users, &[
//!     ("name".into(), "Alice".into()),
//!     ("age".into(), 30.into()),
//! ]).await?;
//!
//! // SELECT * FROM "public"."users" WHERE ("age" > $1) AND ("name" = $2)
//! let filters = FilterSet::new().gt("age", 18).or_eq("name", "admin");
//! let adults = Row::fetch(conn.pool(), users.as_ref(), &filters, &FetchOptions::new()).await?;
//!
//! Row::delete_record(conn.pool(), &users, &alice).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod ddl;
pub mod executor;
pub mod export;
pub mod query;
pub mod registry;
pub mod row;
pub mod schema;
pub mod transaction;
pub mod types;

pub use connection::{Connection, PoolConfig, RetryConfig};
pub use ddl::{create_object, drop_object, DdlGenerator};
pub use executor::ExecutorConfig;
pub use export::{
    export_ddl, export_ddl_to_file, rows_to_csv, rows_to_csv_file, rows_to_csv_string, rows_to_json,
    rows_to_json_string,
};
pub use query::{
    compile_where, CompiledStatement, FetchOptions, Filter, FilterSet, Group, InsertOptions,
    OnConflict, Operator, OrderDirection, Returning, WhereClause,
};
pub use registry::{TypeEntry, TypeRegistry};
pub use row::Row;
pub use schema::{
    Catalog, Column, ColumnSchema, EnumSchema, EnumType, ForeignKey, ObjectKind, QualifiedName,
    ReferentialAction, SchemaObject, Selectable, Table, TableSchema, View, ViewSchema,
};
pub use transaction::{IsolationLevel, Transaction, TransactionOptions};
pub use types::{SqlType, SqlValue, ValueKind};

pub use ouroboros_common::{OrmError, Result};
