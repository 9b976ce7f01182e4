use crate::application::{ColumnsView, ExportOptions, IncomingFile};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::schema::MergeMode;
use crate::domain::tabular::FileSummary;
use crate::interfaces::state::AppState;
use actix_cors::Cors;
use actix_web::http::{header, StatusCode};
use actix_web::{
    dev::Server, get, post, put, web, App, HttpResponse, HttpServer, ResponseError,
};
use base64::Engine as _;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub app_state: Arc<AppState>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
pub struct UploadRequest {
    pub files: Vec<UploadFile>,
}

#[derive(Deserialize)]
pub struct UploadFile {
    pub name: String,
    #[serde(default)]
    pub media_type: Option<String>,
    pub content: String,
    /// `"base64"` for binary-safe uploads, plain text otherwise
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Serialize)]
pub struct FilesResponse {
    pub added: Vec<FileSummary>,
    pub files: Vec<FileSummary>,
}

#[derive(Deserialize)]
pub struct ColumnsUpdate {
    pub selection: BTreeMap<String, bool>,
}

#[derive(Deserialize, Default)]
pub struct UnifyRequest {
    #[serde(default)]
    pub config: Option<LLMConfig>,
}

#[derive(Deserialize, Default)]
pub struct ExportRequest {
    #[serde(default)]
    pub mode: Option<MergeMode>,
    #[serde(default)]
    pub include_source: Option<bool>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::UnsupportedFileType(_)
            | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LLMError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}

impl UploadFile {
    fn into_incoming(self) -> Result<IncomingFile> {
        let bytes = match self.encoding.as_deref().map(str::trim) {
            Some(enc) if enc.eq_ignore_ascii_case("base64") => {
                base64::engine::general_purpose::STANDARD
                    .decode(self.content.trim())
                    .map_err(|e| {
                        AppError::ValidationError(format!(
                            "Invalid base64 content for {}: {}",
                            self.name, e
                        ))
                    })?
            }
            None | Some("") | Some("text") | Some("utf-8") | Some("utf8") => {
                self.content.into_bytes()
            }
            Some(other) => {
                return Err(AppError::ValidationError(format!(
                    "Unsupported content encoding: {}",
                    other
                )))
            }
        };

        Ok(IncomingFile::new(self.name, self.media_type, bytes))
    }
}

/// Record a failed request in the in-app log and hand the error back
fn log_failure(logs: &Mutex<Vec<LogEntry>>, source: &str, context: &str, err: AppError) -> AppError {
    add_log(logs, "ERROR", source, &format!("{}: {}", context, err));
    err
}

fn blocking_error(err: actix_web::error::BlockingError) -> AppError {
    AppError::Internal(format!("Worker thread failed: {}", err))
}

#[post("/files")]
async fn upload_files(
    data: web::Data<HttpState>,
    req: web::Json<UploadRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    add_log(
        &data.logs,
        "INFO",
        "Intake",
        &format!("Receiving {} file(s)", req.files.len()),
    );

    let files = req
        .files
        .into_iter()
        .map(UploadFile::into_incoming)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| log_failure(&data.logs, "Intake", "Upload rejected", e))?;

    let state = data.app_state.clone();
    let added = web::block(move || state.file_intake_use_case.execute(files))
        .await
        .map_err(blocking_error)?
        .map_err(|e| log_failure(&data.logs, "Intake", "Upload rejected", e))?;

    let files = data.app_state.file_intake_use_case.list()?;
    add_log(
        &data.logs,
        "INFO",
        "Intake",
        &format!("Added {} file(s), {} in workspace", added.len(), files.len()),
    );

    Ok(HttpResponse::Ok().json(FilesResponse { added, files }))
}

#[get("/files")]
async fn list_files(data: web::Data<HttpState>) -> Result<HttpResponse> {
    let files = data.app_state.file_intake_use_case.list()?;
    Ok(HttpResponse::Ok().json(files))
}

#[post("/reset")]
async fn reset(data: web::Data<HttpState>) -> Result<HttpResponse> {
    data.app_state.file_intake_use_case.reset()?;
    add_log(&data.logs, "INFO", "Workspace", "Workspace reset");
    Ok(HttpResponse::NoContent().finish())
}

#[get("/columns")]
async fn get_columns(data: web::Data<HttpState>) -> Result<HttpResponse> {
    let view: ColumnsView = data.app_state.column_selection_use_case.view()?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/columns")]
async fn update_columns(
    data: web::Data<HttpState>,
    req: web::Json<ColumnsUpdate>,
) -> Result<HttpResponse> {
    let view = data
        .app_state
        .column_selection_use_case
        .update(&req.selection)
        .map_err(|e| log_failure(&data.logs, "Columns", "Selection update failed", e))?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/unify")]
async fn unify(data: web::Data<HttpState>, body: web::Bytes) -> Result<HttpResponse> {
    let req: UnifyRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UnifyRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let config = data.app_state.llm_config(req.config)?;
    add_log(
        &data.logs,
        "INFO",
        "Unify",
        &format!(
            "Unifying columns (provider={:?} base_url={} model={})",
            config.provider, config.base_url, config.model
        ),
    );

    let schema = data
        .app_state
        .schema_unification_use_case
        .execute(&config)
        .await
        .map_err(|e| log_failure(&data.logs, "Unify", "Unification failed", e))?;

    add_log(
        &data.logs,
        "INFO",
        "Unify",
        &format!("Unified into {} column(s)", schema.columns.len()),
    );
    Ok(HttpResponse::Ok().json(schema))
}

#[get("/schema")]
async fn get_schema(data: web::Data<HttpState>) -> Result<HttpResponse> {
    match data.app_state.schema_unification_use_case.current()? {
        Some(schema) => Ok(HttpResponse::Ok().json(schema)),
        None => Err(AppError::NotFound(
            "No unified schema; run unification first".to_string(),
        )),
    }
}

#[post("/export")]
async fn export(data: web::Data<HttpState>, req: web::Json<ExportRequest>) -> Result<HttpResponse> {
    let defaults = &data.app_state.config.export;
    let options = ExportOptions {
        mode: req.mode.unwrap_or(defaults.default_mode),
        include_source: req.include_source.unwrap_or(defaults.include_source),
    };

    let state = data.app_state.clone();
    let exported = web::block(move || state.export_use_case.execute(options))
        .await
        .map_err(blocking_error)?
        .map_err(|e| log_failure(&data.logs, "Export", "Export failed", e))?;

    add_log(
        &data.logs,
        "INFO",
        "Export",
        &format!(
            "Exported {} row(s) x {} column(s) ({} mode)",
            exported.row_count,
            exported.columns.len(),
            options.mode
        ),
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"merged.csv\"",
        ))
        .body(exported.csv))
}

#[post("/models")]
async fn list_models(
    data: web::Data<HttpState>,
    config: web::Json<LLMConfig>,
) -> Result<HttpResponse> {
    let config = data.app_state.llm_config(Some(config.into_inner()))?;
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Fetching models (provider={:?} base_url={})",
            config.provider, config.base_url
        ),
    );

    let models = data
        .app_state
        .llm_client
        .list_models(&config)
        .await
        .map_err(|e| log_failure(&data.logs, "HttpApi", "Failed to list models", e))?;
    Ok(HttpResponse::Ok().json(models))
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> Result<HttpResponse> {
    let logs = data.logs.lock()?.clone();
    Ok(HttpResponse::Ok().json(logs))
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

    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    // A poisoned buffer only loses UI log lines
    if let Ok(mut logs) = logs.lock() {
        logs.push(entry.clone());
        if logs.len() > MAX_LOG_ENTRIES {
            let overflow = logs.len() - MAX_LOG_ENTRIES;
            logs.drain(..overflow);
        }
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes under `/api`, shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(upload_files)
            .service(list_files)
            .service(reset)
            .service(get_columns)
            .service(update_columns)
            .service(unify)
            .service(get_schema)
            .service(export)
            .service(list_models)
            .service(get_logs),
    );
}

pub fn start_server(
    app_state: Arc<AppState>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
) -> std::io::Result<Server> {
    let host = app_state.config.server.host.clone();
    let port = app_state.config.server.port;
    let limit = app_state.config.server.max_payload_bytes;
    let state = web::Data::new(HttpState { app_state, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(limit))
            .app_data(web::PayloadConfig::new(limit))
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run();

    tracing::info!(host = %host, port, "HTTP API listening");
    Ok(server)
}
