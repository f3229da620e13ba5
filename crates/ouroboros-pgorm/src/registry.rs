//! Type registry: semantic type tag -> DDL name and codec behaviour.
//!
//! The built-in tags are fixed. Additional tags are registered as
//! [`SqlType::Custom`] entries on a [`TypeRegistry`] and published once at
//! startup with [`TypeRegistry::install`]. After installation the registry
//! is read-only and shared by every [`Catalog`](crate::Catalog) created with
//! [`Catalog::new`](crate::Catalog::new).

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::types::{SqlType, SqlValue, ValueKind};
use crate::{OrmError, Result};

static GLOBAL_REGISTRY: OnceCell<Arc<TypeRegistry>> = OnceCell::new();

/// Resolved codec information for one column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    ddl_name: String,
    accepts: Vec<ValueKind>,
    cast: Option<String>,
    element: Option<Box<TypeEntry>>,
}

impl TypeEntry {
    /// Creates an entry that accepts text values and binds without a cast.
    pub fn new(ddl_name: impl Into<String>) -> Self {
        Self {
            ddl_name: ddl_name.into(),
            accepts: vec![ValueKind::Text],
            cast: None,
            element: None,
        }
    }

    /// Sets the value kinds this type accepts.
    pub fn accepts(mut self, kinds: &[ValueKind]) -> Self {
        self.accepts = kinds.to_vec();
        self
    }

    /// Appends `::<cast>` to every placeholder bound to this type.
    ///
    /// Needed when the driver-side type of the bound value differs from
    /// the column type, e.g. text labels bound to an enum column.
    pub fn cast(mut self, cast: impl Into<String>) -> Self {
        self.cast = Some(cast.into());
        self
    }

    pub fn ddl_name(&self) -> &str {
        &self.ddl_name
    }

    pub fn placeholder_cast(&self) -> Option<&str> {
        self.cast.as_deref()
    }

    /// Element entry for array types.
    pub fn element(&self) -> Option<&TypeEntry> {
        self.element.as_deref()
    }

    pub fn accepts_kind(&self, kind: ValueKind) -> bool {
        self.accepts.contains(&kind)
    }

    /// Whether `value` can be bound to a column of this type.
    ///
    /// NULL is always accepted here; nullability is enforced by the server.
    pub fn accepts_value(&self, value: &SqlValue) -> bool {
        match (value, &self.element) {
            (SqlValue::Null, _) => true,
            (SqlValue::Array(items), Some(element)) => {
                items.iter().all(|item| element.accepts_value(item))
            }
            (other, _) => other
                .kind()
                .map(|kind| self.accepts_kind(kind))
                .unwrap_or(true),
        }
    }

    fn array_of(element: TypeEntry) -> Self {
        let ddl_name = format!("{}[]", element.ddl_name);
        Self {
            cast: Some(ddl_name.clone()),
            ddl_name,
            accepts: vec![ValueKind::Array],
            element: Some(Box::new(element)),
        }
    }
}

/// Mapping from type tags to [`TypeEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    custom: HashMap<String, TypeEntry>,
}

impl TypeRegistry {
    /// Registry holding only the built-in tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a registry for [`TypeRegistry::register`] chains.
    pub fn builder() -> Self {
        Self::new()
    }

    /// Adds a custom tag. Existing tags are never replaced.
    pub fn register(mut self, tag: impl Into<String>, entry: TypeEntry) -> Result<Self> {
        let tag = tag.into();
        if self.custom.contains_key(&tag) {
            return Err(OrmError::Configuration(format!(
                "Type tag '{}' is already registered",
                tag
            )));
        }
        self.custom.insert(tag, entry);
        Ok(self)
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.custom.contains_key(tag)
    }

    /// Publishes this registry process-wide.
    ///
    /// Must run before the first [`TypeRegistry::global`] call; a second
    /// installation is a configuration error.
    pub fn install(self) -> Result<()> {
        GLOBAL_REGISTRY.set(Arc::new(self)).map_err(|_| {
            OrmError::Configuration("Type registry is already installed".to_string())
        })?;
        tracing::info!("Installed type registry");
        Ok(())
    }

    /// The installed registry, or the built-in one if none was installed.
    pub fn global() -> Arc<TypeRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(TypeRegistry::new()))
            .clone()
    }

    /// Resolves a type tag.
    ///
    /// `enum_name` maps a declared enum to its quoted DDL name and returns
    /// `None` for enums that were never declared.
    pub fn resolve(
        &self,
        ty: &SqlType,
        enum_name: &dyn Fn(&str) -> Option<String>,
    ) -> Result<TypeEntry> {
        match ty {
            SqlType::Enum(name) => {
                let ddl_name = enum_name(name).ok_or_else(|| {
                    OrmError::Configuration(format!("Enum type '{}' is not declared", name))
                })?;
                Ok(TypeEntry::new(ddl_name.clone())
                    .accepts(ty.builtin_accepts())
                    .cast(ddl_name))
            }
            SqlType::Custom(tag) => self.custom.get(tag).cloned().ok_or_else(|| {
                OrmError::Configuration(format!("Type tag '{}' is not registered", tag))
            }),
            SqlType::Array(inner) => {
                if inner.is_serial() {
                    return Err(OrmError::Configuration(format!(
                        "Arrays of serial types are not supported: {:?}",
                        inner
                    )));
                }
                let element = self.resolve(inner, enum_name)?;
                if element.element.is_some() {
                    // PostgreSQL arrays are not typed by dimension
                    return Ok(element);
                }
                Ok(TypeEntry::array_of(element))
            }
            builtin => {
                let ddl_name = builtin.builtin_ddl_name().ok_or_else(|| {
                    OrmError::Configuration(format!("Unresolvable type {:?}", builtin))
                })?;
                let entry = TypeEntry::new(ddl_name).accepts(builtin.builtin_accepts());
                Ok(match builtin {
                    // MONEY and JSON have no driver-side encoding of their own
                    SqlType::Money => entry.cast("MONEY"),
                    SqlType::Json => entry.cast("JSON"),
                    _ => entry,
                })
            }
        }
    }
}
