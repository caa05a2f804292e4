//! API data models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transcription::TranscriptionResult;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

/// Model tiers the service accepts
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub default: String,
    /// Recognition backend name
    pub engine: String,
    /// Tiers already loaded in this process
    pub loaded: Vec<String>,
}

/// Body returned after a successful upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub id: Uuid,
    pub text: String,
    pub language: String,
    pub duration: f64,
    /// Number of timed segments
    pub segments: usize,
}

impl UploadResponse {
    pub fn new(id: Uuid, result: &TranscriptionResult) -> Self {
        Self {
            success: true,
            id,
            text: result.text().to_string(),
            language: result.language().to_string(),
            duration: result.duration(),
            segments: result.segments().len(),
        }
    }
}
