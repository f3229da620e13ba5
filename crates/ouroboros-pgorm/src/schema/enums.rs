//! User-defined enumerations (`CREATE TYPE ... AS ENUM`).

use super::QualifiedName;

/// Enum declaration.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub(crate) type_name: String,
    pub(crate) name_override: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) labels: Vec<String>,
    pub(crate) if_not_exists: bool,
}

impl EnumType {
    /// `type_name` is normalised (`OrderStatus` -> `order_status`) unless
    /// [`EnumType::name`] overrides it.
    pub fn new<I, S>(type_name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            name_override: None,
            schema: None,
            labels: labels.into_iter().map(Into::into).collect(),
            if_not_exists: true,
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

    pub fn if_not_exists(mut self, enabled: bool) -> Self {
        self.if_not_exists = enabled;
        self
    }
}

/// A declared enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub(crate) name: QualifiedName,
    pub(crate) labels: Vec<String>,
    pub(crate) if_not_exists: bool,
}

impl EnumSchema {
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Labels in declared (sort) order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn if_not_exists(&self) -> bool {
        self.if_not_exists
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
