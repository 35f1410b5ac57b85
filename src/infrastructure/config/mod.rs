//! Environment-driven configuration.
//!
//! A `.env` file is read first when present; real environment variables
//! override it. Every variable has a default, see `Settings::default`.

use crate::domain::db_config::{DbBackend, DbConfig};
use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

// Parsed by figment's env provider, which infers numbers.
const NUMERIC_ENV_KEYS: &[&str] = &[
    "OPENAI_MAX_TOKENS",
    "LLM_TIMEOUT_SECS",
    "DB_PORT",
    "DB_QUERY_TIMEOUT_SECS",
    "SERVER_PORT",
];

// Taken verbatim, so values like `123456` or `true` stay strings.
const STRING_ENV_KEYS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_API_BASE",
    "OPENAI_MODEL",
    "DB_BACKEND",
    "DB_HOST",
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
    "ANSWER_CACHE_PATH",
    "ANSWER_LANGUAGE",
    "SERVER_HOST",
];

/// Raw settings, one field per environment variable (lowercased).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
    pub openai_max_tokens: Option<u32>,
    pub llm_timeout_secs: Option<u64>,
    pub db_backend: String,
    pub db_host: String,
    pub db_port: Option<u16>,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_query_timeout_secs: Option<u64>,
    pub answer_cache_path: Option<PathBuf>,
    pub answer_language: String,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        let llm = LLMConfig::default();
        let db = DbConfig::default();
        Self {
            openai_api_key: None,
            openai_api_base: llm.base_url,
            openai_model: llm.model,
            openai_max_tokens: llm.max_tokens,
            llm_timeout_secs: None,
            db_backend: "postgres".to_string(),
            db_host: db.host,
            db_port: None,
            db_user: db.user,
            db_password: db.password,
            db_name: db.database,
            db_query_timeout_secs: None,
            answer_cache_path: Some(PathBuf::from("answers.json")),
            answer_language: "Chinese".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Typed configuration handed to the bootstrap code.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LLMConfig,
    pub database: DbConfig,
    pub server: ServerConfig,
    pub answer_cache_path: Option<PathBuf>,
    pub answer_language: String,
}

pub struct ConfigService;

impl ConfigService {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> Result<AppConfig> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!(path = %path.display(), "Loaded .env file");
        }
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Env::raw().only(NUMERIC_ENV_KEYS));

        STRING_ENV_KEYS.iter().fold(figment, |figment, key| match env::var(key) {
            Ok(value) => figment.merge(Serialized::default(&key.to_ascii_lowercase(), value)),
            Err(_) => figment,
        })
    }

    pub fn from_figment(figment: Figment) -> Result<AppConfig> {
        let settings: Settings = figment.extract()?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<AppConfig> {
        let backend: DbBackend = settings.db_backend.parse()?;

        let llm = LLMConfig {
            base_url: settings.openai_api_base,
            model: settings.openai_model,
            api_key: settings.openai_api_key.filter(|key| !key.is_empty()),
            max_tokens: settings.openai_max_tokens,
            timeout_secs: settings.llm_timeout_secs,
            ..LLMConfig::default()
        };

        let database = DbConfig {
            backend,
            host: settings.db_host,
            port: settings.db_port.unwrap_or_else(|| backend.default_port()),
            user: settings.db_user,
            password: settings.db_password,
            database: settings.db_name,
            query_timeout_secs: settings.db_query_timeout_secs,
        };

        Ok(AppConfig {
            llm,
            database,
            server: ServerConfig {
                host: settings.server_host,
                port: settings.server_port,
            },
            answer_cache_path: settings.answer_cache_path,
            answer_language: settings.answer_language,
        })
    }
}
