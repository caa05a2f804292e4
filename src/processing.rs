use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn, Level};
use walkdir::WalkDir;

use crate::audio::{AudioConverter, AudioFormat, AudioInput};
use crate::error::{Result, ScribeError};
use crate::subtitles::{self, ExportFormat};
use crate::transcription::{ModelTier, TranscriptionResult, Transcriber};

/// File name of the JSON summary written by directory runs
pub const SUMMARY_FILE_NAME: &str = "transcription_summary.json";

/// Validate, convert and transcribe one audio input.
///
/// Converted audio is deleted before returning, on success and on error.
pub async fn transcribe_input(
    converter: &AudioConverter,
    transcriber: &Transcriber,
    input: &AudioInput,
    tier: ModelTier,
    language: Option<&str>,
) -> Result<TranscriptionResult> {
    let canonical = converter.to_canonical(input).await?;
    let result = transcriber.transcribe(canonical.path(), tier, language).await?;

    if let Err(e) = canonical.close() {
        warn!("Failed to remove converted audio: {}", e);
    }
    Ok(result)
}

/// Transcribe uploaded bytes inside a request-scoped scratch directory
pub async fn transcribe_upload(
    converter: &AudioConverter,
    transcriber: &Transcriber,
    file_name: &str,
    bytes: &[u8],
    tier: ModelTier,
    language: Option<&str>,
) -> Result<TranscriptionResult> {
    let scratch = converter.scratch()?;
    let input = AudioInput::from_upload(file_name, bytes, &scratch).await?;
    debug!("Upload {} stored in {}", input.file_name(), scratch.path().display());

    let canonical = converter.to_canonical(&input).await?;
    if canonical.is_converted() {
        // Only the converted copy is needed from here on
        scratch.discard(&input.file_name())?;
    }

    let result = transcriber.transcribe(canonical.path(), tier, language).await;
    drop(canonical);
    if let Err(e) = scratch.close() {
        warn!("Failed to remove upload scratch directory: {}", e);
    }
    result
}

/// Level a failed file is logged at
pub fn failure_level(e: &ScribeError) -> Level {
    if e.is_user_facing() {
        Level::WARN
    } else {
        Level::ERROR
    }
}

/// Log a failed file at the level its error class calls for
pub fn log_failure(input: &Path, e: &ScribeError) {
    if failure_level(e) == Level::ERROR {
        error!("❌ Failed: {} - {}", input.display(), e);
    } else {
        warn!("❌ Failed: {} - {}", input.display(), e);
    }
}

/// `<stem>_transcription.<ext>` beside the input, or inside `output_dir`
pub fn default_output_path(input: &Path, format: ExportFormat, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    let file_name = format!("{}_transcription.{}", stem, format.extension());

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input
            .parent()
            .map(|parent| parent.join(&file_name))
            .unwrap_or_else(|| PathBuf::from(&file_name)),
    }
}

/// Render `result` and write it to `path`. Nothing is written when rendering fails.
pub async fn write_export(result: &TranscriptionResult, format: ExportFormat, path: &Path) -> Result<()> {
    let content = subtitles::render(result, format)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;

    info!("💾 Saved {} transcription to {}", format, path.display());
    Ok(())
}

/// Supported audio files directly inside `dir`, sorted by path
pub fn discover_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ScribeError::FileNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| AudioFormat::from_path(path).is_ok())
        .collect();

    files.sort();
    Ok(files)
}

/// Settings shared by every file of a CLI run
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    pub tier: ModelTier,
    pub language: Option<String>,
    pub format: ExportFormat,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Completed,
    Failed,
}

/// Outcome for a single file of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub language: Option<String>,
    pub duration: Option<f64>,
    pub segments: usize,
    pub processing_seconds: f64,
    pub error: Option<String>,
}

/// Summary of a directory run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_seconds: f64,
    pub results: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Transcribes files to disk with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    converter: Arc<AudioConverter>,
    transcriber: Arc<Transcriber>,
    options: TranscribeOptions,
    worker_semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl BatchProcessor {
    pub fn new(
        converter: Arc<AudioConverter>,
        transcriber: Arc<Transcriber>,
        options: TranscribeOptions,
        max_workers: usize,
    ) -> Self {
        let max_workers = max_workers.max(1);
        info!("🔧 Initializing BatchProcessor with {} workers", max_workers);

        Self {
            converter,
            transcriber,
            options,
            worker_semaphore: Arc::new(Semaphore::new(max_workers)),
            max_concurrent: max_workers,
        }
    }

    pub fn options(&self) -> &TranscribeOptions {
        &self.options
    }

    /// Transcribe a single file without writing anything
    pub async fn transcribe(&self, path: &Path) -> Result<TranscriptionResult> {
        let input = AudioInput::from_path(path)?;
        transcribe_input(
            &self.converter,
            &self.transcriber,
            &input,
            self.options.tier,
            self.options.language.as_deref(),
        )
        .await
    }

    /// Where the export for `input` goes unless the caller overrides it
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        default_output_path(input, self.options.format, self.options.output_dir.as_deref())
    }

    /// Transcribe one file and write its export
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let start_time = Instant::now();
        let output_path = self.output_path_for(path);

        let mut outcome = FileOutcome {
            input: path.to_path_buf(),
            output: None,
            status: FileStatus::Failed,
            language: None,
            duration: None,
            segments: 0,
            processing_seconds: 0.0,
            error: None,
        };

        match self.transcribe(path).await {
            Ok(result) => {
                outcome.language = Some(result.language().to_string());
                outcome.duration = Some(result.duration());
                outcome.segments = result.segments().len();

                match write_export(&result, self.options.format, &output_path).await {
                    Ok(()) => {
                        outcome.output = Some(output_path);
                        outcome.status = FileStatus::Completed;
                    }
                    Err(e) => {
                        log_failure(path, &e);
                        outcome.error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                log_failure(path, &e);
                outcome.error = Some(e.to_string());
            }
        }

        outcome.processing_seconds = start_time.elapsed().as_secs_f64();
        outcome
    }

    /// Process every supported file in `input_dir` and write a JSON summary
    pub async fn process_directory(&self, input_dir: &Path) -> Result<BatchSummary> {
        let start_time = Instant::now();

        info!("🚀 Starting batch transcription...");
        info!("📁 Input: {}", input_dir.display());

        let files = discover_audio_files(input_dir)?;
        if files.is_empty() {
            warn!("No supported audio files found in {}", input_dir.display());
        } else {
            info!("🎧 Found {} audio files to process", files.len());
        }

        let mut results = self.process_files_parallel(files).await;
        results.sort_by(|a, b| a.input.cmp(&b.input));

        let successful = results
            .iter()
            .filter(|outcome| outcome.status == FileStatus::Completed)
            .count();
        let summary = BatchSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_seconds: start_time.elapsed().as_secs_f64(),
            results,
        };

        let summary_dir = self.options.output_dir.as_deref().unwrap_or(input_dir);
        tokio::fs::create_dir_all(summary_dir).await?;
        let summary_path = summary_dir.join(SUMMARY_FILE_NAME);
        let json_data = serde_json::to_string_pretty(&summary)
            .map_err(|e| ScribeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        tokio::fs::write(&summary_path, json_data).await?;

        info!("💾 Summary saved to: {}", summary_path.display());
        Ok(summary)
    }

    async fn process_files_parallel(&self, files: Vec<PathBuf>) -> Vec<FileOutcome> {
        let (tx, mut rx) = mpsc::channel(self.max_concurrent);
        let total_files = files.len();

        for (index, path) in files.into_iter().enumerate() {
            let processor = self.clone();
            let tx = tx.clone();
            let semaphore = Arc::clone(&self.worker_semaphore);

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed: {}", e);
                        return;
                    }
                };

                info!("🎧 Processing file {}/{}: {}", index + 1, total_files, path.display());
                let outcome = processor.process_file(&path).await;

                if let Err(e) = tx.send(outcome).await {
                    error!("Failed to send result: {}", e);
                }
            });
        }

        // Channel closes once every task has dropped its sender
        drop(tx);

        let mut results = Vec::with_capacity(total_files);
        while let Some(outcome) = rx.recv().await {
            // Failures were logged by process_file with their error class
            if outcome.status == FileStatus::Completed {
                info!(
                    "✅ Completed: {} in {:.2}s",
                    outcome.input.display(),
                    outcome.processing_seconds
                );
            }
            results.push(outcome);
        }
        results
    }
}
