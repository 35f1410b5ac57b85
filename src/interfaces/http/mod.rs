use crate::application::use_cases::question_pipeline::QuestionPipeline;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::ServerConfig;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use validator::Validate;

const MAX_LOG_ENTRIES: usize = 100;
const MAX_QUESTION_CHARS: usize = 4096;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub pipeline: Arc<QuestionPipeline>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub code: u16,
    pub result: String,
}

/// Form body of the browser page. Older pages post the field as `animal`.
#[derive(Debug, Deserialize)]
pub struct QuestionForm {
    #[serde(default, alias = "animal")]
    pub question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    result: Option<String>,
}

#[post("/ask")]
async fn ask(data: web::Data<HttpState>, req: web::Json<AskRequest>) -> impl Responder {
    let question = match req.question.as_deref() {
        Some(question) if !question.trim().is_empty() => question,
        _ => {
            add_log(&data.logs, "WARN", "HttpApi", "Rejected request: question missing");
            return HttpResponse::BadRequest().json(json!({ "error": "Question missing" }));
        }
    };

    let outcome = match req.validate() {
        Ok(()) => answer_question(&data, question, "HttpApi").await,
        Err(e) => {
            add_log(
                &data.logs,
                "WARN",
                "HttpApi",
                &format!("Rejected request: {}", e),
            );
            Err(AppError::from(e))
        }
    };

    match outcome {
        Ok(result) => HttpResponse::Ok().json(AskResponse { code: 200, result }),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &AppError) -> HttpResponse {
    let body = json!({ "error": err.to_string() });
    if err.is_client_error() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(PoisonError::into_inner);
    HttpResponse::Ok().json(&*logs)
}

#[get("/")]
async fn index(query: web::Query<IndexQuery>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_index(query.result.as_deref()))
}

#[post("/")]
async fn submit_question(
    data: web::Data<HttpState>,
    form: web::Form<QuestionForm>,
) -> impl Responder {
    let question = match form.question.as_deref() {
        Some(question) if !question.trim().is_empty() => question,
        _ => {
            add_log(&data.logs, "WARN", "WebForm", "Rejected form: question missing");
            return HttpResponse::BadRequest()
                .content_type("text/html; charset=utf-8")
                .body(render_index(Some("Question missing")));
        }
    };

    if question.chars().count() > MAX_QUESTION_CHARS {
        return HttpResponse::BadRequest()
            .content_type("text/html; charset=utf-8")
            .body(render_index(Some("Question too long")));
    }

    match answer_question(&data, question, "WebForm").await {
        Ok(result) => HttpResponse::SeeOther()
            .insert_header((header::LOCATION, result_location(&result)))
            .finish(),
        Err(e) => HttpResponse::InternalServerError()
            .content_type("text/html; charset=utf-8")
            .body(render_index(Some(&e.to_string()))),
    }
}

async fn answer_question(data: &HttpState, question: &str, source: &str) -> Result<String> {
    add_log(
        &data.logs,
        "INFO",
        source,
        &format!("Question received ({} chars)", question.chars().count()),
    );

    let outcome = match data.pipeline.answer(question).await {
        Ok(outcome) => outcome,
        Err(e) => {
            add_log(&data.logs, "ERROR", source, &format!("Pipeline failed: {}", e));
            return Err(e);
        }
    };

    for fallback in &outcome.fallbacks {
        add_log(
            &data.logs,
            "WARN",
            "Pipeline",
            &format!("Fallback at {:?}: {}", fallback.stage, fallback.reason),
        );
    }

    let level = if outcome.is_degraded() { "WARN" } else { "INFO" };
    add_log(
        &data.logs,
        level,
        source,
        &format!(
            "Answered from {:?}{}",
            outcome.source,
            outcome
                .sql
                .as_deref()
                .map(|sql| format!(" using `{}`", sql))
                .unwrap_or_default()
        ),
    );

    Ok(outcome.answer)
}

fn result_location(result: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("result", result)
        .finish();
    format!("/?{}", query)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_index(result: Option<&str>) -> String {
    let result_block = result
        .map(|r| format!("<div class=\"result\">{}</div>\n", escape_html(r)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Ask the forecast database</title>
</head>
<body>
<h3>Ask the forecast database</h3>
<form action="/" method="post">
<input type="text" name="question" placeholder="Enter a question" required>
<input type="submit" value="Ask">
</form>
{}</body>
</html>
"#,
        result_block
    )
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(PoisonError::into_inner);
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

fn json_error_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = json!({ "error": err.to_string() });
        actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
            .into()
    })
}

/// Routes shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_error_config())
        .service(web::scope("/api").service(ask).service(get_logs))
        .service(index)
        .service(submit_question);
}

pub fn start_server(state: HttpState, server: &ServerConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let http_server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((server.host.as_str(), server.port))?
    .run();

    Ok(http_server)
}
