//! Database access for the question pipeline.
//!
//! A connector owns at most one live connection. The pipeline asks the
//! factory for a fresh connector per run, uses it for its query (and the one
//! fallback query), then closes it. There is no pooling across runs.

pub mod mysql;
pub mod postgres;

use crate::domain::db_config::{DbBackend, DbConfig};
use crate::domain::error::{AppError, Result};
use crate::domain::query_result::QueryResult;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::future::Future;
use std::time::Duration;

pub use mysql::MySqlConnector;
pub use postgres::PostgresConnector;

#[async_trait]
pub trait DbConnector: Send {
    /// Opens the connection. Fails with `AppError::ConnectionError`.
    async fn connect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Runs one statement and fetches every row. Fails with
    /// `AppError::DatabaseError`, or `AppError::ConnectionError` when called
    /// before `connect`.
    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Releases the connection. Safe to call when never connected.
    async fn close(&mut self);
}

/// Hands out one connector per pipeline run.
pub trait ConnectorFactory: Send + Sync {
    fn create(&self) -> Box<dyn DbConnector>;
}

/// Picks the connector variant from `DbConfig::backend`.
pub struct SqlConnectorFactory {
    config: DbConfig,
}

impl SqlConnectorFactory {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    pub fn backend(&self) -> DbBackend {
        self.config.backend
    }
}

impl ConnectorFactory for SqlConnectorFactory {
    fn create(&self) -> Box<dyn DbConnector> {
        match self.config.backend {
            DbBackend::Postgres => Box::new(PostgresConnector::new(self.config.clone())),
            DbBackend::MySql => Box::new(MySqlConnector::new(self.config.clone())),
        }
    }
}

pub(crate) async fn with_timeout<T, F>(
    secs: Option<u64>,
    what: &str,
    on_timeout: fn(String) -> AppError,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| on_timeout(format!("{} timed out after {} seconds", what, secs)))?,
        None => fut.await,
    }
}

/// NUMERIC columns become JSON numbers when they fit in an f64.
pub(crate) fn decimal_to_json(value: &BigDecimal) -> serde_json::Value {
    let text = value.to_string();
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::String(text))
}
