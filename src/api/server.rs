//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use super::{handlers, models::ApiResponse};
use crate::audio::AudioConverter;
use crate::config::Config;
use crate::error::ScribeError;
use crate::store::ResultStore;
use crate::transcription::{ModelTier, Transcriber};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub transcriber: Arc<Transcriber>,
    pub store: Arc<ResultStore>,
    pub converter: Arc<AudioConverter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Arc<Config>, transcriber: Arc<Transcriber>) -> Self {
        Self {
            converter: Arc::new(AudioConverter::new(&config.audio)),
            store: Arc::new(ResultStore::new()),
            transcriber,
            config,
        }
    }

    /// Tier used when a request does not name one
    pub fn default_tier(&self) -> ModelTier {
        self.config
            .transcription
            .default_model
            .parse()
            .unwrap_or_default()
    }
}

/// Error returned by handlers, rendered as an `ApiResponse` envelope
#[derive(Debug)]
pub enum ApiError {
    Scribe(ScribeError),
    Multipart(MultipartError),
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Scribe(e) => match e {
                ScribeError::UnsupportedFormat { .. }
                | ScribeError::InvalidModelTier(_)
                | ScribeError::InvalidExportFormat(_)
                | ScribeError::EmptySegments(_) => StatusCode::BAD_REQUEST,
                ScribeError::NotFound(_) | ScribeError::FileNotFound(_) => StatusCode::NOT_FOUND,
                ScribeError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Multipart(e) => e.status(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Input problems are logged at warn level, internal failures at error level
    pub fn is_user_facing(&self) -> bool {
        match self {
            ApiError::Scribe(e) => e.is_user_facing(),
            ApiError::Multipart(_) | ApiError::BadRequest(_) => true,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Scribe(e) => e.to_string(),
            ApiError::Multipart(e) => e.body_text(),
            ApiError::BadRequest(message) => message.clone(),
        }
    }
}

impl From<ScribeError> for ApiError {
    fn from(e: ScribeError) -> Self {
        ApiError::Scribe(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if self.is_user_facing() {
            warn!("Request rejected ({}): {}", status, message);
        } else {
            error!("Request failed ({}): {}", status, message);
        }

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        // Health check endpoints (both paths for compatibility)
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        .route("/api/models", get(handlers::list_models))
        // Upload endpoints
        .route("/upload", post(handlers::upload))
        .route("/api/transcriptions", post(handlers::upload))
        // Stored results
        .route("/api/transcriptions/:id", get(handlers::get_transcription))
        .route("/api/transcriptions/:id/export/:format", get(handlers::export_transcription))
        .route("/download/:id/:format", get(handlers::export_transcription))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> Result<()> {
    info!("🚀 Starting HTTP server on {}:{}", host, port);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("🌐 API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::engine::{ModelHandle, RawTranscript, RecognitionEngine};
    use crate::transcription::{ModelCache, Segment};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "audioscribe-test-boundary";

    #[derive(Debug)]
    struct StubModel {
        tier: ModelTier,
    }

    #[async_trait]
    impl ModelHandle for StubModel {
        fn tier(&self) -> ModelTier {
            self.tier
        }

        async fn transcribe(&self, _audio_path: &Path, language: Option<&str>) -> crate::Result<RawTranscript> {
            Ok(RawTranscript {
                text: " good morning".to_string(),
                language: language.map(str::to_string),
                segments: Some(vec![Segment::new(0.0, 1.25, " good morning ")]),
                duration: Some(1.25),
            })
        }
    }

    struct StubEngine;

    #[async_trait]
    impl RecognitionEngine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        async fn load(&self, tier: ModelTier) -> crate::Result<Arc<dyn ModelHandle>> {
            Ok(Arc::new(StubModel { tier }))
        }
    }

    fn test_state() -> AppState {
        let transcriber = Transcriber::new(Arc::new(ModelCache::new(Arc::new(StubEngine))));
        AppState::new(Arc::new(Config::default()), Arc::new(transcriber))
    }

    fn multipart_request(uri: &str, file_name: &str, fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\nRIFF0000WAVE\r\n"
        ));
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_state()).oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "audioscribe");
    }

    #[tokio::test]
    async fn test_models_listing() {
        let response = router(test_state()).oneshot(get_request("/api/models")).await.unwrap();
        let json = body_json(response).await;

        assert_eq!(json["models"], serde_json::json!(["tiny", "base", "small", "medium", "large"]));
        assert_eq!(json["default"], "base");
    }

    #[tokio::test]
    async fn test_upload_then_export() {
        let state = test_state();
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(multipart_request("/upload", "memo.wav", &[("model_size", "small"), ("language", "en")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["language"], "en");
        assert_eq!(json["segments"], 1);
        let id = json["id"].as_str().unwrap().to_string();

        let record = state.store.get(&id).await.unwrap();
        assert_eq!(record.model, Some(ModelTier::Small));
        assert_eq!(record.source_name.as_deref(), Some("memo.wav"));

        let response = app
            .clone()
            .oneshot(get_request(&format!("/download/{}/srt", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"transcription_{}.srt\"", id).as_str()
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"1\n00:00:00,000 --> 00:00:01,250\ngood morning\n\n");

        let response = app
            .oneshot(get_request(&format!("/api/transcriptions/{}/export/vtt", id)))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/vtt; charset=utf-8");
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = router(test_state());

        let response = app
            .clone()
            .oneshot(multipart_request("/api/transcriptions", "", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "no file selected");

        let response = app
            .clone()
            .oneshot(multipart_request("/api/transcriptions", "notes.txt", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(multipart_request("/upload", "memo.wav", &[("model_size", "huge")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_ids_and_formats() {
        let app = router(test_state());

        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/transcriptions/{}", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get_request(&format!("/download/{}/docx", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: ScribeError| ApiError::from(e).status();
        assert_eq!(status(ScribeError::EmptySegments("srt".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ScribeError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ScribeError::Conversion("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(ScribeError::Transcription("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_log_classification() {
        assert!(ApiError::from(ScribeError::Transcription("engine crashed".into())).is_user_facing());
        assert!(ApiError::BadRequest("no file selected".into()).is_user_facing());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ApiError::from(ScribeError::Io(io));
        assert!(!err.is_user_facing());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
