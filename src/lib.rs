pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod processing;
pub mod templates;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use config::Config;
use db::Database;
use error::{AppError, ImportError};
use models::{ImportRecord, Workout};
use processing::{FitImporter, ImportOptions, ImportOutcome};
use templates::{render_import_error, render_import_summary, render_landing_page};

/// Header carrying the authenticated caller, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Imports listed per request.
const IMPORT_LIST_LIMIT: i64 = 50;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub importer: FitImporter,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let importer = FitImporter::new(db).with_batch_size(config.record_batch_size);
        Self { importer, config }
    }

    pub fn db(&self) -> &Database {
        self.importer.database()
    }
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(landing_page))
        .route("/upload", post(handle_upload))
        .route("/api/imports", post(create_import).get(list_imports))
        .route("/api/imports/:id", get(get_import))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    status: &'static str,
    import_id: Uuid,
    workout: Workout,
    warnings: Vec<String>,
}

impl From<ImportOutcome> for ImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            status: if outcome.duplicate {
                "duplicate"
            } else {
                "success"
            },
            import_id: outcome.import.id,
            workout: outcome.workout,
            warnings: outcome.warnings,
        }
    }
}

async fn landing_page() -> Html<String> {
    Html(render_landing_page())
}

async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    match upload_and_import(&state, &headers, &mut multipart).await {
        Ok(outcome) => Html(render_import_summary(&outcome)).into_response(),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(error = %err, "FIT upload failed");
            }
            (status, Html(render_import_error(&err.to_string()))).into_response()
        }
    }
}

async fn create_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportResponse>), AppError> {
    let outcome = upload_and_import(&state, &headers, &mut multipart).await?;
    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ImportResponse::from(outcome))))
}

async fn list_imports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ImportRecord>>, AppError> {
    let user_id = caller(&headers)?;
    let imports = state
        .db()
        .list_imports(user_id, IMPORT_LIST_LIMIT)
        .await
        .map_err(ImportError::from)?;
    Ok(Json(imports))
}

async fn get_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ImportRecord>, AppError> {
    let user_id = caller(&headers)?;
    state
        .db()
        .get_import_for_user(user_id, id)
        .await
        .map_err(ImportError::from)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("import {id}")))
}

fn caller(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AppError::Unauthorized)
}

async fn upload_and_import(
    state: &AppState,
    headers: &HeaderMap,
    multipart: &mut Multipart,
) -> Result<ImportOutcome, AppError> {
    let user_id = caller(headers)?;
    let upload = spool_upload(multipart, state.config.max_upload_bytes).await?;

    tracing::info!(
        %user_id,
        filename = %upload.filename,
        "Received FIT upload"
    );

    let options = ImportOptions {
        original_filename: Some(upload.filename.clone()),
        session_id: upload.session_id,
        ..ImportOptions::default()
    };
    let outcome = state
        .importer
        .import_file(upload.file.path(), user_id, options)
        .await?;
    Ok(outcome)
}

/// A multipart upload written to a temporary file, removed on drop.
struct SpooledUpload {
    file: NamedTempFile,
    filename: String,
    session_id: Option<i64>,
}

async fn spool_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<SpooledUpload, AppError> {
    let mut spooled: Option<(NamedTempFile, String)> = None;
    let mut session_id = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("Failed to read upload: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if !filename.to_ascii_lowercase().ends_with(".fit") {
                    return Err(AppError::BadRequest(
                        "Only .fit files are supported".to_string(),
                    ));
                }

                let temp = tempfile::Builder::new()
                    .prefix("upload-")
                    .suffix(".fit")
                    .tempfile()
                    .map_err(ImportError::from)?;
                let mut out = tokio::fs::File::from_std(temp.reopen().map_err(ImportError::from)?);

                let mut written = 0usize;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|err| AppError::BadRequest(format!("Failed to read upload: {err}")))?
                {
                    written += chunk.len();
                    if written > max_bytes {
                        return Err(AppError::BadRequest(format!(
                            "File exceeds the {} byte upload limit",
                            max_bytes
                        )));
                    }
                    out.write_all(&chunk).await.map_err(ImportError::from)?;
                }
                out.flush().await.map_err(ImportError::from)?;

                if written == 0 {
                    return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
                }
                spooled = Some((temp, filename));
            }
            Some("session_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::BadRequest(format!("Failed to read upload: {err}")))?;
                let text = text.trim();
                if !text.is_empty() {
                    session_id = Some(text.parse().map_err(|_| {
                        AppError::BadRequest("session_id must be an integer".to_string())
                    })?);
                }
            }
            _ => {}
        }
    }

    let (file, filename) =
        spooled.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    Ok(SpooledUpload {
        file,
        filename,
        session_id,
    })
}
