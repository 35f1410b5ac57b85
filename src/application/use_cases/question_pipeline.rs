//! Question -> SQL -> rows -> answer.
//!
//! Stages run strictly in order:
//! cache check, SQL generation, SQL extraction, query execution, answer
//! synthesis. Transient completion failures and extraction misses degrade to
//! the default policy values. A failed query is retried exactly once with the
//! default statement. Fatal completion failures and a second query failure
//! abort the run.

use crate::application::use_cases::answer_cache::AnswerCache;
use crate::application::use_cases::prompt_builder::PromptBuilder;
use crate::application::use_cases::sql_extractor::extract_sql;
use crate::domain::error::{AppError, Result};
use crate::domain::policy::DefaultPolicy;
use crate::domain::query_result::QueryResult;
use crate::infrastructure::db::{ConnectorFactory, DbConnector};
use crate::infrastructure::llm_clients::CompletionClient;
use crate::infrastructure::response::clean_llm_response;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    CacheCheck,
    SqlGeneration,
    SqlExtraction,
    QueryExecution,
    AnswerSynthesis,
}

/// A default-policy substitution made during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    pub stage: PipelineStage,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Cache,
    Pipeline,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub answer: String,
    pub source: AnswerSource,
    /// Statement whose rows fed the answer. `None` for cache hits.
    pub sql: Option<String>,
    pub fallbacks: Vec<Fallback>,
}

impl PipelineOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

pub struct QuestionPipeline {
    llm_client: Arc<dyn CompletionClient + Send + Sync>,
    connectors: Arc<dyn ConnectorFactory>,
    cache: Arc<AnswerCache>,
    prompts: PromptBuilder,
    policy: DefaultPolicy,
}

impl QuestionPipeline {
    pub fn new(
        llm_client: Arc<dyn CompletionClient + Send + Sync>,
        connectors: Arc<dyn ConnectorFactory>,
        cache: Arc<AnswerCache>,
        prompts: PromptBuilder,
        policy: DefaultPolicy,
    ) -> Self {
        Self {
            llm_client,
            connectors,
            cache,
            prompts,
            policy,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<PipelineOutcome> {
        let span = info_span!("pipeline_run", run_id = %Uuid::new_v4());
        self.run(question).instrument(span).await
    }

    async fn run(&self, question: &str) -> Result<PipelineOutcome> {
        if let Some(answer) = self.cache.lookup(question) {
            info!(stage = ?PipelineStage::CacheCheck, "Answer served from cache");
            return Ok(PipelineOutcome {
                answer: answer.to_string(),
                source: AnswerSource::Cache,
                sql: None,
                fallbacks: Vec::new(),
            });
        }

        let mut fallbacks = Vec::new();
        let sql = self.generate_sql(question, &mut fallbacks).await?;
        let (executed_sql, rows) = self.execute_with_fallback(&sql, &mut fallbacks).await?;
        let answer = self
            .synthesize_answer(question, &rows, &mut fallbacks)
            .await?;

        info!(
            sql = %executed_sql,
            rows = rows.row_count(),
            fallbacks = fallbacks.len(),
            "Pipeline run finished"
        );

        Ok(PipelineOutcome {
            answer,
            source: AnswerSource::Pipeline,
            sql: Some(executed_sql),
            fallbacks,
        })
    }

    /// SqlGeneration and SqlExtraction.
    async fn generate_sql(&self, question: &str, fallbacks: &mut Vec<Fallback>) -> Result<String> {
        let prompt = self.prompts.build_sql_prompt(question);

        let completion = match self.llm_client.complete(&prompt).await {
            Ok(completion) => completion,
            Err(err) if err.is_transient() => {
                record_fallback(fallbacks, PipelineStage::SqlGeneration, err.to_string());
                return Ok(self.policy.sql.clone());
            }
            Err(err) => {
                error!(stage = ?PipelineStage::SqlGeneration, error = %err, "Completion failed");
                return Err(err.into());
            }
        };

        let cleaned = clean_llm_response(&completion.text);
        match extract_sql(&cleaned) {
            Some(sql) => {
                info!(stage = ?PipelineStage::SqlExtraction, sql = %sql, "Extracted statement");
                Ok(sql)
            }
            None => {
                record_fallback(
                    fallbacks,
                    PipelineStage::SqlExtraction,
                    "no SELECT ... FROM statement in model output".to_string(),
                );
                Ok(self.policy.sql.clone())
            }
        }
    }

    /// QueryExecution. One connector per run, closed on every path.
    async fn execute_with_fallback(
        &self,
        sql: &str,
        fallbacks: &mut Vec<Fallback>,
    ) -> Result<(String, QueryResult)> {
        let mut connector = self.connectors.create();
        let result = self.query_with_retry(connector.as_mut(), sql, fallbacks).await;
        connector.close().await;
        result
    }

    async fn query_with_retry(
        &self,
        connector: &mut dyn DbConnector,
        sql: &str,
        fallbacks: &mut Vec<Fallback>,
    ) -> Result<(String, QueryResult)> {
        let first_error = match execute_once(connector, sql).await {
            Ok(rows) => return Ok((sql.to_string(), rows)),
            Err(err) => err,
        };

        record_fallback(
            fallbacks,
            PipelineStage::QueryExecution,
            format!("{}; retrying with default statement", first_error),
        );

        match execute_once(connector, &self.policy.sql).await {
            Ok(rows) => Ok((self.policy.sql.clone(), rows)),
            Err(err) => {
                error!(
                    stage = ?PipelineStage::QueryExecution,
                    error = %err,
                    "Default statement failed after retry"
                );
                Err(AppError::DatabaseError(format!(
                    "Query failed ({}) and the default statement also failed ({})",
                    first_error, err
                )))
            }
        }
    }

    /// AnswerSynthesis.
    async fn synthesize_answer(
        &self,
        question: &str,
        rows: &QueryResult,
        fallbacks: &mut Vec<Fallback>,
    ) -> Result<String> {
        let prompt = self.prompts.build_answer_prompt(question, rows);

        match self.llm_client.complete(&prompt).await {
            Ok(completion) => Ok(clean_llm_response(&completion.text)),
            Err(err) if err.is_transient() => {
                record_fallback(fallbacks, PipelineStage::AnswerSynthesis, err.to_string());
                Ok(self.policy.answer.clone())
            }
            Err(err) => {
                error!(stage = ?PipelineStage::AnswerSynthesis, error = %err, "Completion failed");
                Err(err.into())
            }
        }
    }
}

async fn execute_once(connector: &mut dyn DbConnector, sql: &str) -> Result<QueryResult> {
    if !connector.is_connected() {
        connector.connect().await?;
    }
    connector.execute_query(sql).await
}

fn record_fallback(fallbacks: &mut Vec<Fallback>, stage: PipelineStage, reason: String) {
    warn!(stage = ?stage, reason = %reason, "Falling back to default policy");
    fallbacks.push(Fallback { stage, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::answer_cache::AnswerRecord;
    use crate::application::use_cases::test_support::{ok, one_row, ScriptedClient, ScriptedFactory};
    use crate::domain::completion::CompletionError;
    use crate::domain::policy::DEFAULT_SQL;
    use crate::domain::schema::FORECAST_RESULT;

    fn pipeline_with_cache(
        client: Arc<ScriptedClient>,
        factory: Arc<ScriptedFactory>,
        cache: AnswerCache,
    ) -> QuestionPipeline {
        QuestionPipeline::new(
            client,
            factory,
            Arc::new(cache),
            PromptBuilder::new(FORECAST_RESULT, "PostgreSQL", DEFAULT_SQL, "English"),
            DefaultPolicy::default(),
        )
    }

    fn pipeline(client: Arc<ScriptedClient>, factory: Arc<ScriptedFactory>) -> QuestionPipeline {
        pipeline_with_cache(client, factory, AnswerCache::empty())
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_calls() {
        let client = ScriptedClient::new(vec![]);
        let factory = ScriptedFactory::new(vec![]);
        let cache = AnswerCache::from_records(vec![AnswerRecord {
            question: "best model?".to_string(),
            result: "arima".to_string(),
        }]);
        let pipeline = pipeline_with_cache(client.clone(), factory.clone(), cache);

        let outcome = pipeline.answer("best model?").await.unwrap();

        assert_eq!(outcome.answer, "arima");
        assert_eq!(outcome.source, AnswerSource::Cache);
        assert_eq!(outcome.sql, None);
        assert_eq!(client.calls(), 0);
        assert_eq!(factory.log.lock().unwrap().created, 0);
    }

    #[tokio::test]
    async fn test_show_me_one_row() {
        let client = ScriptedClient::new(vec![
            ok("SELECT * FROM forecast_result LIMIT 1;"),
            ok("The first row is the arima model with an MAE of 0.12."),
        ]);
        let factory = ScriptedFactory::new(vec![Ok(one_row())]);
        let pipeline = pipeline(client.clone(), factory.clone());

        let outcome = pipeline.answer("show me one row").await.unwrap();

        assert_eq!(
            outcome.answer,
            "The first row is the arima model with an MAE of 0.12."
        );
        assert_eq!(outcome.source, AnswerSource::Pipeline);
        assert_eq!(
            outcome.sql.as_deref(),
            Some("SELECT * FROM forecast_result LIMIT 1")
        );
        assert!(!outcome.is_degraded());

        let log = factory.log.lock().unwrap();
        assert_eq!(log.executed, vec!["SELECT * FROM forecast_result LIMIT 1"]);
        assert_eq!(log.connects, 1);
        assert_eq!(log.closes, 1);

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].instruction.contains("```show me one row```"));
        assert!(prompts[1].instruction.contains("('arima', 0.12)"));
    }

    #[tokio::test]
    async fn test_fenced_sql_is_cleaned_before_extraction() {
        let client = ScriptedClient::new(vec![
            ok("```sql\nSELECT model_name FROM forecast_result ORDER BY mae LIMIT 1\n```"),
            ok("arima"),
        ]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client, factory.clone());

        pipeline.answer("best model?").await.unwrap();

        assert_eq!(
            factory.log.lock().unwrap().executed,
            vec!["SELECT model_name FROM forecast_result ORDER BY mae LIMIT 1"]
        );
    }

    #[tokio::test]
    async fn test_transient_sql_generation_uses_default_sql() {
        let client = ScriptedClient::new(vec![
            Err(CompletionError::transient("rate limited")),
            ok("Here is one row."),
        ]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client.clone(), factory.clone());

        let outcome = pipeline.answer("anything").await.unwrap();

        assert_eq!(outcome.answer, "Here is one row.");
        assert_eq!(outcome.sql.as_deref(), Some(DEFAULT_SQL));
        assert_eq!(outcome.fallbacks.len(), 1);
        assert_eq!(outcome.fallbacks[0].stage, PipelineStage::SqlGeneration);
        assert_eq!(factory.log.lock().unwrap().executed, vec![DEFAULT_SQL]);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_extraction_miss_uses_default_sql() {
        let client = ScriptedClient::new(vec![
            ok("I am not sure what you mean."),
            ok("Here is one row."),
        ]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client, factory.clone());

        let outcome = pipeline.answer("hello").await.unwrap();

        assert_eq!(outcome.fallbacks[0].stage, PipelineStage::SqlExtraction);
        assert_eq!(factory.log.lock().unwrap().executed, vec![DEFAULT_SQL]);
    }

    #[tokio::test]
    async fn test_failed_query_retried_once_with_default() {
        let client = ScriptedClient::new(vec![
            ok("SELECT bogus FROM nowhere"),
            ok("Here is one row."),
        ]);
        let factory = ScriptedFactory::new(vec![
            Err(AppError::DatabaseError("relation \"nowhere\" does not exist".to_string())),
            Ok(one_row()),
        ]);
        let pipeline = pipeline(client, factory.clone());

        let outcome = pipeline.answer("bogus").await.unwrap();

        assert_eq!(outcome.sql.as_deref(), Some(DEFAULT_SQL));
        assert_eq!(outcome.fallbacks[0].stage, PipelineStage::QueryExecution);

        let log = factory.log.lock().unwrap();
        assert_eq!(log.executed, vec!["SELECT bogus FROM nowhere", DEFAULT_SQL]);
        assert_eq!(log.created, 1);
        assert_eq!(log.connects, 1);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn test_double_query_failure_aborts() {
        let client = ScriptedClient::new(vec![ok("SELECT bogus FROM nowhere"), ok("unused")]);
        let factory = ScriptedFactory::new(vec![
            Err(AppError::DatabaseError("first".to_string())),
            Err(AppError::DatabaseError("second".to_string())),
            Ok(one_row()),
        ]);
        let pipeline = pipeline(client.clone(), factory.clone());

        let err = pipeline.answer("bogus").await.unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(client.calls(), 1);

        let log = factory.log.lock().unwrap();
        assert_eq!(log.executed.len(), 2);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn test_connect_failure_reconnects_for_default() {
        let client = ScriptedClient::new(vec![ok("SELECT a FROM t"), ok("answer")]);
        let factory = ScriptedFactory::new(vec![]).failing_connects(1);
        let pipeline = pipeline(client, factory.clone());

        let outcome = pipeline.answer("q").await.unwrap();

        assert_eq!(outcome.sql.as_deref(), Some(DEFAULT_SQL));
        let log = factory.log.lock().unwrap();
        assert_eq!(log.connects, 2);
        assert_eq!(log.executed, vec![DEFAULT_SQL]);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn test_fatal_sql_generation_aborts() {
        let client = ScriptedClient::new(vec![Err(CompletionError::fatal("invalid api key"))]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client.clone(), factory.clone());

        let err = pipeline.answer("q").await.unwrap_err();

        assert!(matches!(err, AppError::LLMError(_)));
        assert_eq!(client.calls(), 1);
        assert_eq!(factory.log.lock().unwrap().created, 0);
    }

    #[tokio::test]
    async fn test_fatal_answer_synthesis_aborts() {
        let client = ScriptedClient::new(vec![
            ok("SELECT a FROM t"),
            Err(CompletionError::fatal("model not found")),
        ]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client, factory.clone());

        let err = pipeline.answer("q").await.unwrap_err();

        assert!(matches!(err, AppError::LLMError(_)));
        assert_eq!(factory.log.lock().unwrap().closes, 1);
    }

    #[tokio::test]
    async fn test_transient_answer_synthesis_uses_default_answer() {
        let client = ScriptedClient::new(vec![
            ok("SELECT a FROM t"),
            Err(CompletionError::transient("timed out")),
        ]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client, factory);

        let outcome = pipeline.answer("q").await.unwrap();

        assert_eq!(outcome.answer, DefaultPolicy::default().answer);
        assert_eq!(outcome.sql.as_deref(), Some("SELECT a FROM t"));
        assert_eq!(outcome.fallbacks[0].stage, PipelineStage::AnswerSynthesis);
    }

    #[tokio::test]
    async fn test_repeated_question_runs_full_pipeline_again() {
        let client = ScriptedClient::new(vec![
            ok("SELECT * FROM forecast_result LIMIT 1;"),
            ok("first answer"),
            ok("SELECT * FROM forecast_result LIMIT 1;"),
            ok("second answer"),
        ]);
        let factory = ScriptedFactory::new(vec![]);
        let pipeline = pipeline(client.clone(), factory.clone());

        let first = pipeline.answer("show me one row").await.unwrap();
        let second = pipeline.answer("show me one row").await.unwrap();

        assert_eq!(first.answer, "first answer");
        assert_eq!(second.answer, "second answer");
        assert_eq!(second.source, AnswerSource::Pipeline);
        assert_eq!(client.calls(), 4);
        assert_eq!(factory.log.lock().unwrap().executed.len(), 2);
    }
}
