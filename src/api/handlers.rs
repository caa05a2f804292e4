//! API request handlers

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{info, warn};

use super::models::{HealthResponse, ModelsResponse, UploadResponse};
use super::server::{ApiError, AppState};
use crate::processing;
use crate::store::ResultRecord;
use crate::subtitles::{self, ExportFormat};
use crate::transcription::ModelTier;

/// Handle health check requests
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// List model tiers and which ones are loaded
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let loaded = state
        .transcriber
        .cache()
        .loaded_tiers()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();

    Json(ModelsResponse {
        models: ModelTier::names().iter().map(|name| name.to_string()).collect(),
        default: state.default_tier().to_string(),
        engine: state.transcriber.cache().engine_name().to_string(),
        loaded,
    })
}

/// Fields collected from the upload form
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Vec<u8>,
    model_size: Option<String>,
    language: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audio" => {
                form.file_name = field.file_name().map(str::to_string);
                form.bytes = field.bytes().await?.to_vec();
            }
            "model_size" => form.model_size = Some(field.text().await?),
            "language" => form.language = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

/// Transcribe an uploaded audio file and store the result
pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_upload_form(multipart).await?;

    let file_name = match form.file_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ApiError::BadRequest("no file selected".to_string())),
    };

    let tier = match form.model_size.as_deref().map(str::trim) {
        Some(size) if !size.is_empty() => size.parse::<ModelTier>()?,
        _ => state.default_tier(),
    };
    let language = form
        .language
        .or_else(|| state.config.transcription.language.clone());

    info!("📤 Upload received: {} ({} bytes, model {})", file_name, form.bytes.len(), tier);

    let result = processing::transcribe_upload(
        &state.converter,
        &state.transcriber,
        &file_name,
        &form.bytes,
        tier,
        language.as_deref(),
    )
    .await?;

    let id = state.store.put_with(result, Some(tier), Some(file_name)).await;
    let record = state.store.get_by_uuid(id).await?;

    Ok(Json(UploadResponse::new(id, &record.result)))
}

/// Fetch a stored record
pub async fn get_transcription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultRecord>, ApiError> {
    let record = state.store.get(&id).await?;
    Ok(Json(record.as_ref().clone()))
}

/// Render a stored record as a downloadable file
pub async fn export_transcription(
    State(state): State<AppState>,
    Path((id, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = format.parse()?;
    let record = state.store.get(&id).await?;

    let content = subtitles::render(&record.result, format).map_err(|e| {
        warn!("Export of {} as {} failed: {}", record.id, format, e);
        e
    })?;

    let disposition = format!(
        "attachment; filename=\"transcription_{}.{}\"",
        record.id,
        format.extension()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}
