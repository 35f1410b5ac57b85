use crate::application::use_cases::answer_cache::AnswerCache;
use crate::application::use_cases::prompt_builder::PromptBuilder;
use crate::application::use_cases::question_pipeline::QuestionPipeline;
use crate::domain::error::AppError;
use crate::domain::policy::DefaultPolicy;
use crate::domain::schema::FORECAST_RESULT;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::db::SqlConnectorFactory;
use crate::infrastructure::llm_clients::OpenAIClient;
use crate::interfaces::http::{add_log, start_server, HttpState};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

fn to_io_error(err: AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

pub async fn run() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = ConfigService::load().map_err(to_io_error)?;
    let logs = Arc::new(Mutex::new(Vec::new()));

    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; every uncached question will fail");
    }

    let llm_client = Arc::new(OpenAIClient::new(config.llm.clone()).map_err(to_io_error)?);
    let connectors = Arc::new(SqlConnectorFactory::new(config.database.clone()));

    let cache = match AnswerCache::load(config.answer_cache_path.as_deref()) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load answer snapshot, starting with an empty cache");
            add_log(
                &logs,
                "ERROR",
                "Bootstrap",
                &format!("Failed to load answer snapshot: {}", e),
            );
            AnswerCache::empty()
        }
    };

    if cache.is_empty() {
        tracing::info!("No cached answers; every question runs the full pipeline");
    }

    let policy = DefaultPolicy::default();
    let dialect = connectors.backend().dialect();
    let prompts = PromptBuilder::new(
        FORECAST_RESULT,
        dialect,
        &policy.sql,
        &config.answer_language,
    );

    let pipeline = QuestionPipeline::new(llm_client, connectors, Arc::new(cache), prompts, policy);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        backend = dialect,
        model = %config.llm.model,
        "Starting HTTP server"
    );
    add_log(
        &logs,
        "INFO",
        "Bootstrap",
        &format!(
            "Listening on {}:{}",
            config.server.host, config.server.port
        ),
    );

    let state = HttpState {
        pipeline: Arc::new(pipeline),
        logs,
    };
    start_server(state, &config.server)?.await
}
