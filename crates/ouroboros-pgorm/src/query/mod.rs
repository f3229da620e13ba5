//! Predicate compiler and statement builders.
//!
//! # Examples
//!
//! ## WHERE clause
//!
//! ```ignore
//! use ouroboros_pgorm::{compile_where, FilterSet};
//!
//! let filters = FilterSet::new().gt("age", 18).or_eq("name", "admin");
//! let clause = compile_where(users.as_ref(), &filters, 0)?;
//! // clause.sql    == r#"WHERE ("age" > $1) AND ("name" = $2)"#
//! // clause.params == [18, "admin"]
//! ```
//!
//! ## UPDATE
//!
//! ```ignore
//! use ouroboros_pgorm::query::build_update;
//! use ouroboros_pgorm::FilterSet;
//!
//! let stmt = build_update(&users, &[("name".into(), "Bob".into())], &FilterSet::new().eq("id", 42))?;
//! // stmt.sql == r#"UPDATE "public"."users" SET "name" = $1 WHERE ("id" = $2)"#
//! ```

mod builder;
mod compiler;
mod filter;
mod helpers;
mod statement;
mod types;


pub use builder::{
    build_delete, build_delete_record, build_exists, build_insert, build_insert_many, build_select,
    build_select_value, build_update, build_update_record, primary_key_filters, FetchOptions,
    InsertOptions, OnConflict, Returning,
};
pub use compiler::{compile_where, WhereClause};
pub use filter::{Filter, FilterSet};
pub use helpers::{
    adjust_param_indices, max_placeholder, normalise_name, quote_identifier, validate_identifier,
    validate_identifier_part,
};
pub use statement::CompiledStatement;
pub use types::{Group, Operator, OrderDirection};
