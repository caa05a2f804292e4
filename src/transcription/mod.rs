pub mod types;
pub mod engine;
pub mod whisper;
pub mod cache;
pub mod adapter;

pub use types::{ModelTier, Segment, TranscriptionResult, UNKNOWN_LANGUAGE};
pub use engine::{ModelHandle, RawTranscript, RecognitionEngine};
pub use whisper::{WhisperBackend, WhisperCliEngine};
pub use cache::ModelCache;
pub use adapter::Transcriber;
