use super::{decimal_to_json, with_timeout, DbConnector};
use crate::domain::db_config::DbConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::query_result::QueryResult;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Row};
use tracing::{info, warn};

pub struct PostgresConnector {
    config: DbConfig,
    connection: Option<PgConnection>,
}

impl PostgresConnector {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }

    fn extract_column_value(row: &PgRow, index: usize) -> serde_json::Value {
        if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            return v
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            return v
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
            return v
                .and_then(|n| serde_json::Number::from_f64(n as f64))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(index) {
            return v
                .map(|d| decimal_to_json(&d))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            return v
                .map(serde_json::Value::Bool)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index) {
            return v
                .map(|dt| serde_json::Value::String(dt.to_rfc3339()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
            return v
                .map(|dt| serde_json::Value::String(dt.to_string()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
            return v
                .map(|d| serde_json::Value::String(d.to_string()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(index) {
            return v.unwrap_or(serde_json::Value::Null);
        }

        serde_json::Value::Null
    }
}

#[async_trait]
impl DbConnector for PostgresConnector {
    async fn connect(&mut self) -> Result<()> {
        let options = self.connect_options();
        let connection = with_timeout(
            self.config.query_timeout_secs,
            "PostgreSQL connect",
            AppError::ConnectionError,
            async {
                PgConnection::connect_with(&options).await.map_err(|e| {
                    AppError::ConnectionError(format!("Failed to connect to PostgreSQL: {}", e))
                })
            },
        )
        .await?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            "Connected to PostgreSQL"
        );
        self.connection = Some(connection);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let timeout_secs = self.config.query_timeout_secs;
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| AppError::ConnectionError("PostgreSQL connector is not connected".to_string()))?;

        let rows = with_timeout(timeout_secs, "Query", AppError::DatabaseError, async {
            sqlx::query(sql)
                .fetch_all(&mut *connection)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Query execution failed: {}", e)))
        })
        .await?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let values: Vec<Vec<serde_json::Value>> = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| Self::extract_column_value(row, i))
                    .collect()
            })
            .collect();

        Ok(QueryResult::new(columns, values))
    }

    async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                warn!(error = %e, "Failed to close PostgreSQL connection cleanly");
            }
        }
    }
}
