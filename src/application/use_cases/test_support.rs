//! Scripted stand-ins for the LLM client and database connectors.

use crate::domain::completion::{Completion, CompletionError, CompletionResult};
use crate::domain::error::{AppError, Result};
use crate::domain::prompt::PromptPair;
use crate::domain::query_result::QueryResult;
use crate::infrastructure::db::{ConnectorFactory, DbConnector};
use crate::infrastructure::llm_clients::CompletionClient;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays queued completions in order and records every prompt it receives.
pub struct ScriptedClient {
    pub responses: Mutex<VecDeque<CompletionResult>>,
    pub prompts: Mutex<Vec<PromptPair>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<CompletionResult>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &PromptPair) -> CompletionResult {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::fatal("no scripted response left")))
    }
}

#[derive(Default)]
pub struct DbLog {
    pub created: usize,
    pub connects: usize,
    pub closes: usize,
    pub connect_failures: usize,
    pub executed: Vec<String>,
    pub outcomes: VecDeque<Result<QueryResult>>,
}

pub struct ScriptedFactory {
    pub log: Arc<Mutex<DbLog>>,
}

impl ScriptedFactory {
    /// Queries pop `outcomes` front to back; once drained they return `one_row()`.
    pub fn new(outcomes: Vec<Result<QueryResult>>) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Mutex::new(DbLog {
                outcomes: outcomes.into(),
                ..DbLog::default()
            })),
        })
    }

    pub fn failing_connects(self: Arc<Self>, count: usize) -> Arc<Self> {
        self.log.lock().unwrap().connect_failures = count;
        self
    }
}

impl ConnectorFactory for ScriptedFactory {
    fn create(&self) -> Box<dyn DbConnector> {
        self.log.lock().unwrap().created += 1;
        Box::new(ScriptedConnector {
            log: self.log.clone(),
            connected: false,
        })
    }
}

struct ScriptedConnector {
    log: Arc<Mutex<DbLog>>,
    connected: bool,
}

#[async_trait]
impl DbConnector for ScriptedConnector {
    async fn connect(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.connects += 1;
        if log.connect_failures > 0 {
            log.connect_failures -= 1;
            return Err(AppError::ConnectionError("connection refused".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let mut log = self.log.lock().unwrap();
        log.executed.push(sql.to_string());
        log.outcomes.pop_front().unwrap_or_else(|| Ok(one_row()))
    }

    async fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
        self.connected = false;
    }
}

pub fn one_row() -> QueryResult {
    QueryResult::new(
        vec!["model_name".to_string(), "mae".to_string()],
        vec![vec![json!("arima"), json!(0.12)]],
    )
}

pub fn ok(text: &str) -> CompletionResult {
    Ok(Completion {
        text: text.to_string(),
    })
}
