//! Transactions for running several façade calls atomically.
//!
//! [`Transaction::executor`] is accepted anywhere a pool is, so the same
//! `Row` calls run inside or outside a transaction. Dropping an uncommitted
//! transaction rolls it back.

use sqlx::postgres::{PgConnection, PgPool};
use sqlx::Postgres;
use tracing::{debug, instrument};

use crate::{OrmError, Result};

/// Isolation level requested with `SET TRANSACTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// How a transaction is opened. The default adds nothing to the server's
/// own defaults and costs no extra round trip.
///
/// ```rust,ignore
/// let mut tx = conn
///     .begin_with(TransactionOptions::new().isolation(IsolationLevel::Serializable).read_only())
///     .await?;
/// let rows = Row::fetch(tx.executor(), users.as_ref(), &FilterSet::new(), &FetchOptions::new()).await?;
/// tx.commit().await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionOptions {
    isolation: Option<IsolationLevel>,
    read_only: bool,
    deferrable: bool,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Waits for a safe snapshot instead of risking serialization failures.
    /// Needs a serializable, read-only transaction.
    pub fn deferrable(mut self) -> Self {
        self.deferrable = true;
        self
    }

    /// `SET TRANSACTION` statement for these options, `None` when there is
    /// nothing to set.
    pub fn set_statement(&self) -> Result<Option<String>> {
        if self.deferrable
            && !(self.read_only && self.isolation == Some(IsolationLevel::Serializable))
        {
            return Err(OrmError::Configuration(
                "DEFERRABLE needs a serializable read-only transaction".to_string(),
            ));
        }

        let mut modes = Vec::with_capacity(3);
        match self.isolation {
            Some(IsolationLevel::ReadCommitted) => modes.push("ISOLATION LEVEL READ COMMITTED"),
            Some(IsolationLevel::RepeatableRead) => modes.push("ISOLATION LEVEL REPEATABLE READ"),
            Some(IsolationLevel::Serializable) => modes.push("ISOLATION LEVEL SERIALIZABLE"),
            None => {}
        }
        if self.read_only {
            modes.push("READ ONLY");
        }
        if self.deferrable {
            modes.push("DEFERRABLE");
        }

        if modes.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("SET TRANSACTION {}", modes.join(" "))))
    }
}

/// An open transaction on one pooled connection.
pub struct Transaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").finish_non_exhaustive()
    }
}

impl Transaction {
    #[instrument(skip(pool))]
    pub(crate) async fn begin(pool: &PgPool, options: TransactionOptions) -> Result<Self> {
        // Rejected options never check out a connection.
        let set = options.set_statement()?;
        let mut tx = pool.begin().await?;
        if let Some(sql) = set {
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        debug!(?options, "Started transaction");
        Ok(Self { tx })
    }

    /// Executor for running statements inside this transaction.
    pub fn executor(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    #[instrument(skip(self))]
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!("Committed transaction");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        debug!("Rolled back transaction");
        Ok(())
    }
}
