use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::engine::{ModelHandle, RawTranscript, RecognitionEngine};
use super::types::{ModelTier, Segment};
use crate::config::TranscriptionConfig;
use crate::error::{Result, ScribeError};
use crate::scratch::ScratchDir;

/// whisper.cpp binaries, in order of preference
const CPP_COMMANDS: [&str; 2] = ["whisper-cli", "whisper-cpp"];

/// Python OpenAI Whisper command
const PYTHON_COMMAND: &str = "whisper";

/// Which command-line whisper implementation runs a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhisperBackend {
    /// whisper.cpp, needs a ggml model file
    Cpp { command: String },
    /// openai-whisper, resolves models by name
    Python { command: String },
}

impl WhisperBackend {
    fn command(&self) -> &str {
        match self {
            WhisperBackend::Cpp { command } | WhisperBackend::Python { command } => command,
        }
    }
}

/// Recognition engine backed by a whisper command-line tool
#[derive(Debug, Clone)]
pub struct WhisperCliEngine {
    config: TranscriptionConfig,
}

impl WhisperCliEngine {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    /// Path of the ggml model file for a tier
    pub fn model_path(&self, tier: ModelTier) -> PathBuf {
        self.config.models_dir.join(format!("ggml-{}.bin", tier))
    }

    /// Detect which backend to use, honouring an explicit `backend` setting
    pub async fn detect_backend(&self) -> Result<WhisperBackend> {
        if let Some(command) = &self.config.backend {
            if !Self::check_command_available(command).await {
                return Err(ScribeError::Transcription(format!(
                    "Configured whisper backend '{}' is not available",
                    command
                )));
            }
            let is_python = Path::new(command)
                .file_name()
                .map_or(false, |name| name == PYTHON_COMMAND);
            return Ok(if is_python {
                WhisperBackend::Python { command: command.clone() }
            } else {
                WhisperBackend::Cpp { command: command.clone() }
            });
        }

        for command in CPP_COMMANDS {
            if Self::check_command_available(command).await {
                return Ok(WhisperBackend::Cpp { command: command.to_string() });
            }
        }
        if Self::check_command_available(PYTHON_COMMAND).await {
            return Ok(WhisperBackend::Python { command: PYTHON_COMMAND.to_string() });
        }

        Err(ScribeError::Transcription(
            "No Whisper backend found. Please install whisper.cpp or openai-whisper".to_string(),
        ))
    }

    /// Check if a command can be spawned
    pub async fn check_command_available(command: &str) -> bool {
        Command::new(command)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    /// Describe the available backend, if any
    pub async fn check_availability(&self) -> Result<String> {
        match self.detect_backend().await? {
            WhisperBackend::Cpp { command } => Ok(format!("whisper.cpp available ({})", command)),
            WhisperBackend::Python { command } => {
                Ok(format!("OpenAI Whisper available ({})", command))
            }
        }
    }
}

#[async_trait]
impl RecognitionEngine for WhisperCliEngine {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    async fn load(&self, tier: ModelTier) -> Result<Arc<dyn ModelHandle>> {
        let backend = self.detect_backend().await?;
        info!("🔍 Loading {} model with {}", tier, backend.command());

        let model = match &backend {
            WhisperBackend::Cpp { .. } => {
                let path = self.model_path(tier);
                if !path.exists() {
                    return Err(ScribeError::Transcription(format!(
                        "Model file not found: {}",
                        path.display()
                    )));
                }
                let size = tokio::fs::metadata(&path).await?.len();
                info!("✅ Found model: {} ({:.1} MB)", path.display(), size as f64 / 1_000_000.0);
                path.to_string_lossy().to_string()
            }
            WhisperBackend::Python { .. } => tier.to_string(),
        };

        Ok(Arc::new(WhisperCliModel {
            backend,
            model,
            tier,
            threads: self.config.threads,
            timeout: Duration::from_secs(self.config.timeout as u64),
        }))
    }
}

/// A whisper model resolved to a binary and a model argument
#[derive(Debug)]
pub struct WhisperCliModel {
    backend: WhisperBackend,
    model: String,
    tier: ModelTier,
    threads: u32,
    timeout: Duration,
}

impl WhisperCliModel {
    fn build_command(&self, audio_path: &Path, output_dir: &Path, language: Option<&str>) -> Command {
        let mut cmd = Command::new(self.backend.command());

        match &self.backend {
            WhisperBackend::Cpp { .. } => {
                cmd.arg("-f").arg(audio_path)
                    .arg("-m").arg(&self.model)
                    .arg("-oj")
                    .arg("-of").arg(output_dir.join("transcript"))
                    .arg("-t").arg(self.threads.to_string());
                if let Some(language) = language {
                    cmd.arg("-l").arg(language);
                }
            }
            WhisperBackend::Python { .. } => {
                cmd.arg(audio_path)
                    .arg("--model").arg(&self.model)
                    .arg("--output_dir").arg(output_dir)
                    .arg("--output_format").arg("json")
                    .arg("--verbose").arg("False")
                    .arg("--fp16").arg("False")
                    .arg("--temperature").arg("0.0");
                if let Some(language) = language {
                    cmd.arg("--language").arg(language);
                }
            }
        }

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ModelHandle for WhisperCliModel {
    fn tier(&self) -> ModelTier {
        self.tier
    }

    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<RawTranscript> {
        let scratch = ScratchDir::with_prefix("audioscribe-whisper-")?;
        let mut cmd = self.build_command(audio_path, scratch.path(), language);
        debug!("Executing command: {:?}", cmd);

        let start_time = Instant::now();
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(output) => output.map_err(|e| {
                ScribeError::Transcription(format!("Failed to spawn {}: {}", self.backend.command(), e))
            })?,
            Err(_) => {
                error!("⏰ {} timed out after {:.1}s", self.backend.command(), start_time.elapsed().as_secs_f64());
                return Err(ScribeError::Transcription(format!(
                    "{} timed out after {} seconds",
                    self.backend.command(),
                    self.timeout.as_secs()
                )));
            }
        };

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if !line.trim().is_empty() {
                debug!("Whisper stderr: {}", line);
            }
        }

        if !output.status.success() {
            return Err(ScribeError::Transcription(format!(
                "{} exited with {}",
                self.backend.command(),
                output.status
            )));
        }

        let json_files = find_output_files(scratch.path(), "json").await?;
        let json_path = json_files.first().ok_or_else(|| {
            ScribeError::Transcription(format!("No {} JSON output found", self.backend.command()))
        })?;

        let json_content = tokio::fs::read_to_string(json_path).await?;
        let transcript = parse_whisper_json(&json_content)?;

        info!(
            "✅ {} finished in {:.1}s: {} characters",
            self.backend.command(),
            start_time.elapsed().as_secs_f64(),
            transcript.text.len()
        );

        Ok(transcript)
    }
}

/// Find engine output files with the given extension
async fn find_output_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == extension) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Parse whisper.cpp (`-oj`) or openai-whisper JSON output
pub fn parse_whisper_json(json: &str) -> Result<RawTranscript> {
    let output: WhisperOutput = serde_json::from_str(json)
        .map_err(|e| ScribeError::Transcription(format!("Failed to parse whisper JSON output: {}", e)))?;

    if !output.transcription.is_empty() {
        let segments: Vec<Segment> = output
            .transcription
            .into_iter()
            .map(|seg| {
                Segment::new(
                    seg.offsets.from as f64 / 1000.0,
                    seg.offsets.to as f64 / 1000.0,
                    seg.text,
                )
            })
            .collect();

        let text = join_segment_text(&segments);
        let language = output
            .result
            .map(|r| r.language)
            .or(output.language);

        return Ok(RawTranscript {
            text,
            language,
            segments: Some(segments),
            duration: output.duration,
        });
    }

    let segments: Vec<Segment> = output
        .segments
        .into_iter()
        .map(|seg| Segment::new(seg.start, seg.end, seg.text))
        .collect();

    if output.text.is_none() && segments.is_empty() {
        warn!("Whisper output contained neither text nor segments");
    }

    let text = output.text.unwrap_or_else(|| join_segment_text(&segments));

    Ok(RawTranscript {
        text,
        language: output.language,
        segments: if segments.is_empty() { None } else { Some(segments) },
        duration: output.duration,
    })
}

fn join_segment_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| seg.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whisper JSON output (both layouts)
#[derive(Debug, Clone, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<WhisperTranscriptionSegment>,
    #[serde(default)]
    result: Option<WhisperResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperResult {
    language: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperTranscriptionSegment {
    offsets: WhisperOffsets,
    text: String,
}

/// Millisecond offsets
#[derive(Debug, Clone, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}
