use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use slidecheck_core::report::REPORT_FILE_NAME;
use slidecheck_core::PresentationFormat;
use slidecheck_translate::GoogleConfig;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::ApiError;
use crate::jobs::{self, JobSettings};
use crate::state::{AppState, Job};
use crate::uploads::{new_token, save_upload};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

pub fn create_routes(state: AppState) -> Router {
    let body_limit = state.config.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/", get(index))
        .route("/compare", post(compare_files))
        .route("/progress", get(progress))
        .route("/report", get(report))
        // Health check
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct JobQuery {
    job: Option<String>,
}

struct Upload {
    filename: String,
    data: Bytes,
}

#[derive(Default)]
struct CompareForm {
    english: Option<Upload>,
    translated: Option<Upload>,
    target_lang: Option<String>,
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": state.jobs.len()
    }))
}

async fn compare_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_compare_form(&mut multipart).await?;
    let (Some(english), Some(translated)) = (form.english, form.translated) else {
        return Err(ApiError::BadRequest("Please upload both files".to_string()));
    };
    ensure_pptx(&english)?;
    ensure_pptx(&translated)?;

    let config = &state.config;
    let source_path = save_upload(&config.upload_dir, &english.filename, &english.data)
        .await
        .map_err(|e| state.internal_error(e))?;
    let translated_path = save_upload(&config.upload_dir, &translated.filename, &translated.data)
        .await
        .map_err(|e| state.internal_error(e))?;

    let job_id = new_token(10);
    let job = Arc::new(Job::new(job_id.clone(), config.report_dir.join(&job_id)));
    state.register_job(job.clone());

    let settings = JobSettings {
        source_path,
        translated_path,
        source_name: english.filename,
        translated_name: translated.filename,
        threshold: config.threshold,
        translator: GoogleConfig::default()
            .with_endpoint(&config.translate_endpoint)
            .with_source_lang(form.target_lang.unwrap_or_default())
            .with_target_lang(&config.backtrans_target),
    };
    log::info!("Queued job {}", job_id);
    tokio::task::spawn_blocking(move || jobs::run(job, settings));

    Ok(Json(json!({
        "message": "Processing started",
        "job_id": job_id
    })))
}

async fn read_compare_form(multipart: &mut Multipart) -> Result<CompareForm, ApiError> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        ApiError::BadRequest(format!("Invalid upload: {}", e))
    };
    let mut form = CompareForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "english" | "translated" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_upload)?;
                // Browsers send an empty part for an unselected file input
                if data.is_empty() {
                    continue;
                }
                let upload = Some(Upload { filename, data });
                if name == "english" {
                    form.english = upload;
                } else {
                    form.translated = upload;
                }
            }
            "target_lang" => {
                form.target_lang = Some(field.text().await.map_err(bad_upload)?);
            }
            _ => log::debug!("Ignoring form field {:?}", name),
        }
    }
    Ok(form)
}

fn ensure_pptx(upload: &Upload) -> Result<(), ApiError> {
    match PresentationFormat::from_magic(&upload.data) {
        Some(PresentationFormat::Pptx) => Ok(()),
        Some(PresentationFormat::LegacyPpt) => Err(ApiError::BadRequest(format!(
            "{}: legacy .ppt files are not supported, save it as .pptx",
            upload.filename
        ))),
        None => Err(ApiError::BadRequest(format!(
            "{} is not a .pptx file",
            upload.filename
        ))),
    }
}

async fn progress(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let job = state
        .find_job(query.job.as_deref())
        .ok_or_else(|| ApiError::NotFound("No comparison in progress".to_string()))?;
    Ok(Sse::new(progress_stream(job, PROGRESS_INTERVAL)).keep_alive(KeepAlive::default()))
}

/// One event right away, then one per `interval` until the job is done.
fn progress_stream(
    job: Arc<Job>,
    interval: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some((job, true)), move |state| async move {
        let (job, first) = state?;
        if !first {
            tokio::time::sleep(interval).await;
        }
        let progress = job.snapshot();
        let event = Event::default()
            .json_data(&progress)
            .unwrap_or_else(|_| Event::default().data("{}"));
        let next = if progress.done { None } else { Some((job, false)) };
        Some((Ok(event), next))
    })
}

async fn report(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Response, ApiError> {
    let path = match query.job.as_deref() {
        Some(id) => state.find_job(Some(id)).map(|job| job.report_path()),
        None => {
            let dir = state.config.report_dir.clone();
            tokio::task::spawn_blocking(move || latest_report(&dir))
                .await
                .map_err(|e| state.internal_error(e))?
        }
    };
    let path = path.ok_or_else(|| ApiError::NotFound("No report found".to_string()))?;

    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("No report found".to_string()))
        }
        Err(e) => Err(state.internal_error(e)),
    }
}

/// Most recently modified report anywhere under `dir`.
fn latest_report(dir: &Path) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                pending.push(path);
            } else if path.file_name().and_then(|n| n.to_str()) == Some(REPORT_FILE_NAME) {
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                if newest.as_ref().map_or(true, |(time, _)| modified > *time) {
                    newest = Some((modified, path));
                }
            }
        }
    }
    newest.map(|(_, path)| path)
}
