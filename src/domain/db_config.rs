use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    Postgres,
    MySql,
}

impl DbBackend {
    pub fn default_port(&self) -> u16 {
        match self {
            DbBackend::Postgres => 5432,
            DbBackend::MySql => 3306,
        }
    }

    /// Dialect name as it should appear in prompts.
    pub fn dialect(&self) -> &'static str {
        match self {
            DbBackend::Postgres => "PostgreSQL",
            DbBackend::MySql => "MySQL",
        }
    }
}

impl FromStr for DbBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DbBackend::Postgres),
            "mysql" | "mariadb" => Ok(DbBackend::MySql),
            other => Err(AppError::ConfigError(format!(
                "Unsupported database backend '{}' (expected postgres or mysql)",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DbConfig {
    pub backend: DbBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Applied to connect and to each query when set.
    pub query_timeout_secs: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: DbBackend::Postgres,
            host: "localhost".to_string(),
            port: DbBackend::Postgres.default_port(),
            user: "postgres".to_string(),
            password: String::new(),
            database: "forecast".to_string(),
            query_timeout_secs: None,
        }
    }
}
