//! Error taxonomy for the transcription core

use std::path::PathBuf;

/// Result type for audioscribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Error types for the transcription lifecycle
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("Unsupported audio format: {extension} (supported: {supported})")]
    UnsupportedFormat { extension: String, supported: String },

    #[error("Audio conversion failed: {0}")]
    Conversion(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Transcription result not found: {0}")]
    NotFound(String),

    #[error("No timed segments to render as {0}")]
    EmptySegments(String),

    #[error("Unknown model tier: {0} (expected one of tiny, base, small, medium, large)")]
    InvalidModelTier(String),

    #[error("Unknown export format: {0} (expected one of txt, srt, vtt)")]
    InvalidExportFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Whether the failure is reported to the caller as an outcome of their request.
    ///
    /// User-facing failures are logged at warn level, the rest at error level.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ScribeError::UnsupportedFormat { .. }
                | ScribeError::Conversion(_)
                | ScribeError::Transcription(_)
                | ScribeError::FileNotFound(_)
                | ScribeError::NotFound(_)
                | ScribeError::EmptySegments(_)
                | ScribeError::InvalidModelTier(_)
                | ScribeError::InvalidExportFormat(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ScribeError::UnsupportedFormat {
            extension: "txt".to_string(),
            supported: "mp3, wav".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported audio format: txt (supported: mp3, wav)");

        let err = ScribeError::FileNotFound(PathBuf::from("/tmp/missing.mp3"));
        assert_eq!(err.to_string(), "File not found: /tmp/missing.mp3");
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(ScribeError::EmptySegments("srt".to_string()).is_user_facing());
        assert!(ScribeError::NotFound("abc".to_string()).is_user_facing());
        assert!(ScribeError::Transcription("boom".to_string()).is_user_facing());
        assert!(ScribeError::Conversion("corrupt".to_string()).is_user_facing());
        assert!(ScribeError::UnsupportedFormat {
            extension: "txt".to_string(),
            supported: "mp3".to_string(),
        }
        .is_user_facing());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "scratch dir");
        assert!(!ScribeError::Io(io).is_user_facing());
    }
}
