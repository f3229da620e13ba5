//! Filter descriptors.

use super::types::{Group, Operator};
use crate::types::SqlValue;

/// One predicate term.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column <operator> value`, checked against the schema.
    Condition {
        column: String,
        operator: Operator,
        value: SqlValue,
        group: Group,
    },
    /// Verbatim SQL with its own `$1..$k` placeholders.
    ///
    /// Raw fragments are only allowed in the AND group.
    Raw {
        sql: String,
        params: Vec<SqlValue>,
        group: Group,
    },
}

impl Filter {
    pub fn condition(column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Filter::Condition {
            column: column.into(),
            operator,
            value: value.into(),
            group: Group::And,
        }
    }

    pub fn raw(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Filter::Raw {
            sql: sql.into(),
            params,
            group: Group::And,
        }
    }

    /// Moves this filter into the OR group.
    pub fn or(self) -> Self {
        self.with_group(Group::Or)
    }

    pub fn with_group(self, group: Group) -> Self {
        match self {
            Filter::Condition { column, operator, value, .. } => Filter::Condition {
                column,
                operator,
                value,
                group,
            },
            Filter::Raw { sql, params, .. } => Filter::Raw { sql, params, group },
        }
    }

    pub fn group(&self) -> Group {
        match self {
            Filter::Condition { group, .. } | Filter::Raw { group, .. } => *group,
        }
    }
}

/// Ordered list of filters.
///
/// ```rust,ignore
/// // WHERE ("age" > $1) AND ("name" = $2)
/// let filters = FilterSet::new().gt("age", 18).or_eq("name", "admin");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// AND-group condition.
    pub fn and(self, column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        self.filter(Filter::condition(column, operator, value))
    }

    /// OR-group condition.
    pub fn or(self, column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        self.filter(Filter::condition(column, operator, value).or())
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and(column, Operator::Eq, value)
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and(column, Operator::Ne, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and(column, Operator::Lt, value)
    }

    pub fn le(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and(column, Operator::Le, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and(column, Operator::Gt, value)
    }

    pub fn ge(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.and(column, Operator::Ge, value)
    }

    /// `column = ANY(values)`
    pub fn is_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.and(column, Operator::In, SqlValue::array(values))
    }

    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.and(column, Operator::Like, pattern.into())
    }

    pub fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.and(column, Operator::ILike, pattern.into())
    }

    pub fn or_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.or(column, Operator::Eq, value)
    }

    /// Raw AND-group fragment with its own `$1..$k` placeholders.
    pub fn raw(self, sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        self.filter(Filter::raw(sql, params))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl From<Vec<Filter>> for FilterSet {
    fn from(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
