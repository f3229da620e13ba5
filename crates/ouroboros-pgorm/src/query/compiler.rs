//! Predicate compiler: [`FilterSet`] -> parameterized `WHERE` clause.
//!
//! Rules:
//! - AND-group terms are joined with `AND`, OR-group terms with `OR`; each
//!   non-empty group is parenthesized and the two groups are joined with
//!   `AND`. An empty group contributes nothing, an empty set gives no
//!   `WHERE` at all.
//! - Placeholders are numbered in filter order across both groups, starting
//!   after `offset`, with no gaps.
//! - Columns are checked against the source before any SQL is produced.

use super::filter::{Filter, FilterSet};
use super::helpers::{adjust_param_indices, max_placeholder, quote_identifier};
use super::types::{Group, Operator};
use crate::schema::{ColumnSchema, Selectable};
use crate::types::{SqlValue, ValueKind};
use crate::{OrmError, Result};

/// Compiled `WHERE` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    /// `WHERE ...`, or empty when there were no filters.
    pub sql: String,
    /// Parameters for `$offset+1 ..`, in placeholder order.
    pub params: Vec<SqlValue>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

struct Term {
    sql: String,
    raw: bool,
}

/// Compiles `filters` against `source`, numbering placeholders from
/// `offset + 1`.
pub fn compile_where(source: &dyn Selectable, filters: &FilterSet, offset: usize) -> Result<WhereClause> {
    let mut and_terms: Vec<Term> = Vec::new();
    let mut or_terms: Vec<Term> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    for filter in filters {
        let next = offset + params.len() + 1;
        let (term, group) = match filter {
            Filter::Condition { column, operator, value, group } => {
                let schema = source.column(column).ok_or_else(|| {
                    OrmError::Configuration(format!(
                        "Unknown column '{}' on {}",
                        column,
                        source.name()
                    ))
                })?;
                let sql = compile_condition(schema, *operator, value, next, &mut params)?;
                (Term { sql, raw: false }, *group)
            }
            Filter::Raw { sql, params: raw_params, group } => {
                if *group == Group::Or {
                    return Err(OrmError::Compilation(
                        "Raw SQL fragments cannot be placed in the OR group".to_string(),
                    ));
                }
                let highest = max_placeholder(sql);
                if highest != raw_params.len() {
                    return Err(OrmError::Compilation(format!(
                        "Raw fragment '{}' uses {} placeholder(s) but was given {} parameter(s)",
                        sql,
                        highest,
                        raw_params.len()
                    )));
                }
                let shifted = adjust_param_indices(sql, next - 1);
                params.extend(raw_params.iter().cloned());
                (Term { sql: shifted, raw: true }, *group)
            }
        };

        match group {
            Group::And => and_terms.push(term),
            Group::Or => or_terms.push(term),
        }
    }

    let mut groups = Vec::with_capacity(2);
    if !and_terms.is_empty() {
        groups.push(format!("({})", join_terms(&and_terms, " AND ")));
    }
    if !or_terms.is_empty() {
        groups.push(format!("({})", join_terms(&or_terms, " OR ")));
    }

    if groups.is_empty() {
        return Ok(WhereClause::default());
    }

    Ok(WhereClause {
        sql: format!("WHERE {}", groups.join(" AND ")),
        params,
    })
}

fn join_terms(terms: &[Term], separator: &str) -> String {
    if terms.len() == 1 {
        return terms[0].sql.clone();
    }
    terms
        .iter()
        .map(|term| {
            if term.raw {
                format!("({})", term.sql)
            } else {
                term.sql.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn compile_condition(
    column: &ColumnSchema,
    operator: Operator,
    value: &SqlValue,
    index: usize,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let name = quote_identifier(column.name());

    if value.is_null() {
        return match operator {
            Operator::Eq => Ok(format!("{} IS NULL", name)),
            Operator::Ne => Ok(format!("{} IS NOT NULL", name)),
            other => Err(OrmError::Compilation(format!(
                "Operator {:?} on '{}' cannot compare against NULL",
                other,
                column.name()
            ))),
        };
    }

    match operator {
        Operator::In => {
            let SqlValue::Array(items) = value else {
                return Err(OrmError::Compilation(format!(
                    "Operator In on '{}' needs an array value",
                    column.name()
                )));
            };
            let entry = column.type_entry();
            if entry.element().is_some() {
                return Err(OrmError::Compilation(format!(
                    "Operator In is not supported on array column '{}'",
                    column.name()
                )));
            }
            if let Some(bad) = items.iter().find(|item| !entry.accepts_value(item)) {
                return Err(rejected(column, bad));
            }
            params.push(value.clone());
            Ok(format!("{} = ANY(${}::{}[])", name, index, column.cast_type()))
        }
        Operator::Like | Operator::ILike => {
            if !column.type_entry().accepts_kind(ValueKind::Text) {
                return Err(OrmError::Compilation(format!(
                    "Operator {:?} needs a text column, '{}' is {}",
                    operator,
                    column.name(),
                    column.ddl_type()
                )));
            }
            if !matches!(value, SqlValue::String(_)) {
                return Err(OrmError::Compilation(format!(
                    "Operator {:?} on '{}' needs a text pattern",
                    operator,
                    column.name()
                )));
            }
            params.push(value.clone());
            // The pattern is text even when the column is an enum or other
            // cast-bound type, so match against the column's text form.
            if column.type_entry().placeholder_cast().is_some() {
                return Ok(format!("{}::text {} ${}", name, operator.to_sql(), index));
            }
            Ok(format!("{} {} {}", name, operator.to_sql(), column.placeholder(index, false)))
        }
        _ => {
            if !column.type_entry().accepts_value(value) {
                return Err(rejected(column, value));
            }
            params.push(value.clone());
            Ok(format!("{} {} {}", name, operator.to_sql(), column.placeholder(index, false)))
        }
    }
}

fn rejected(column: &ColumnSchema, value: &SqlValue) -> OrmError {
    OrmError::Compilation(format!(
        "Column '{}' of type {} does not accept {:?} values",
        column.name(),
        column.ddl_type(),
        value.kind()
    ))
}
