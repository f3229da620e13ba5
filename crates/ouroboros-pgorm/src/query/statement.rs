use sqlx::postgres::PgArguments;

use crate::types::SqlValue;
use crate::Result;

/// SQL text plus its positional parameters.
///
/// `params[i]` binds `$i+1`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// Whether executing the statement yields rows (`SELECT`, `RETURNING`).
    pub returns_rows: bool,
}

impl CompiledStatement {
    pub(crate) fn new(sql: String, params: Vec<SqlValue>, returns_rows: bool) -> Self {
        Self {
            sql,
            params,
            returns_rows,
        }
    }

    /// Binds every parameter in order.
    pub fn arguments(&self) -> Result<PgArguments> {
        let mut args = PgArguments::default();
        for param in &self.params {
            param.bind_to_arguments(&mut args)?;
        }
        Ok(args)
    }
}
