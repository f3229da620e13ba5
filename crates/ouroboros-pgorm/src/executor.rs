//! Statement execution with slow-query logging.
//!
//! Every function takes any `sqlx` executor (pool, connection or
//! transaction), runs one [`CompiledStatement`] and returns driver errors
//! unmodified. There are no retries here; callers that want them use
//! [`OrmError::is_retryable`](crate::OrmError::is_retryable).

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use sqlx::{Executor, Postgres};
use tracing::{debug, warn};

use crate::query::CompiledStatement;
use crate::row::Row;
use crate::Result;

/// Execution settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Threshold for slow query logging in milliseconds
    pub slow_query_threshold_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 1000, // 1 second
        }
    }
}

impl ExecutorConfig {
    /// Defaults, with `PGORM_SLOW_QUERY_MS` overriding the threshold.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = std::env::var("PGORM_SLOW_QUERY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.slow_query_threshold_ms = ms;
        }
        config
    }
}

static CONFIG: Lazy<ExecutorConfig> = Lazy::new(ExecutorConfig::from_env);

/// Runs a statement and returns the number of affected rows.
pub async fn execute<'e, E>(executor: E, statement: &CompiledStatement) -> Result<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let start = Instant::now();
    let result = sqlx::query_with(&statement.sql, statement.arguments()?)
        .execute(executor)
        .await;
    let result = finish(&statement.sql, start, result)?;
    Ok(result.rows_affected())
}

/// Runs a statement and decodes every returned row.
pub async fn fetch_all<'e, E>(executor: E, statement: &CompiledStatement) -> Result<Vec<Row>>
where
    E: Executor<'e, Database = Postgres>,
{
    let start = Instant::now();
    let result = sqlx::query_with(&statement.sql, statement.arguments()?)
        .fetch_all(executor)
        .await;
    let rows = finish(&statement.sql, start, result)?;
    rows.iter().map(Row::from_pg).collect()
}

/// Runs a statement and decodes the first row, if any.
pub async fn fetch_optional<'e, E>(executor: E, statement: &CompiledStatement) -> Result<Option<Row>>
where
    E: Executor<'e, Database = Postgres>,
{
    let start = Instant::now();
    let result = sqlx::query_with(&statement.sql, statement.arguments()?)
        .fetch_optional(executor)
        .await;
    match finish(&statement.sql, start, result)? {
        Some(row) => Ok(Some(Row::from_pg(&row)?)),
        None => Ok(None),
    }
}

fn finish<T>(sql: &str, start: Instant, result: std::result::Result<T, sqlx::Error>) -> Result<T> {
    let elapsed = start.elapsed();
    match result {
        Ok(value) => {
            log_query_completion(sql, elapsed, CONFIG.slow_query_threshold_ms);
            Ok(value)
        }
        Err(e) => {
            warn!(
                sql = %sql.chars().take(100).collect::<String>(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Query failed"
            );
            Err(e.into())
        }
    }
}

fn log_query_completion(sql: &str, elapsed: Duration, threshold_ms: u64) {
    let elapsed_ms = elapsed.as_millis() as u64;
    let sql_preview: String = sql.chars().take(100).collect();

    if elapsed_ms >= threshold_ms {
        warn!(
            sql = %sql_preview,
            elapsed_ms = elapsed_ms,
            threshold_ms = threshold_ms,
            "Slow query detected"
        );
    } else {
        debug!(sql = %sql_preview, elapsed_ms = elapsed_ms, "Query completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        assert_eq!(ExecutorConfig::default().slow_query_threshold_ms, 1000);
    }

    #[test]
    fn test_finish_passes_driver_errors_through() {
        let result: std::result::Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err = finish("SELECT 1", Instant::now(), result).unwrap_err();
        assert!(matches!(err, crate::OrmError::Database(sqlx::Error::RowNotFound)));
    }
}
