use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

use crate::config::AudioConfig;
use crate::error::{Result, ScribeError};
use crate::scratch::ScratchDir;

/// Name of the converted file inside its scratch directory
const CANONICAL_FILE_NAME: &str = "canonical.wav";

/// Supported audio containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
    Flac,
    Aac,
    Ogg,
    Wma,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 7] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::M4a,
        AudioFormat::Flac,
        AudioFormat::Aac,
        AudioFormat::Ogg,
        AudioFormat::Wma,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "aac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wma => "wma",
        }
    }

    /// Comma-separated list of supported extensions
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|format| format.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parse an extension, with or without the leading dot, any case
    pub fn from_extension(extension: &str) -> Result<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.extension() == normalized)
            .ok_or_else(|| ScribeError::UnsupportedFormat {
                extension: if normalized.is_empty() { "<none>".to_string() } else { normalized },
                supported: Self::supported_list(),
            })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    /// Whether the engine accepts this container without transcoding
    pub fn is_canonical(&self) -> bool {
        matches!(self, AudioFormat::Wav)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Audio file awaiting transcription, with a validated container format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInput {
    path: PathBuf,
    format: AudioFormat,
}

impl AudioInput {
    /// Validate the extension of an existing file path
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = AudioFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    /// Validate an uploaded file name and write the bytes into `scratch`
    pub async fn from_upload(file_name: &str, bytes: &[u8], scratch: &ScratchDir) -> Result<Self> {
        let file_name = sanitize_file_name(file_name);
        let format = AudioFormat::from_path(Path::new(&file_name))?;
        let path = scratch.child(&file_name);
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved upload {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Audio in the form the recognition engine consumes.
///
/// Converted audio owns the scratch directory it was written to, so dropping
/// the value deletes the file. Passed-through input is never deleted.
#[derive(Debug)]
pub struct CanonicalAudio {
    path: PathBuf,
    scratch: Option<ScratchDir>,
}

impl CanonicalAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the audio was transcoded into a temporary file
    pub fn is_converted(&self) -> bool {
        self.scratch.is_some()
    }

    /// Delete the converted file now
    pub fn close(self) -> Result<()> {
        match self.scratch {
            Some(scratch) => scratch.close(),
            None => Ok(()),
        }
    }
}

/// Transcodes supported containers to 16-bit PCM WAV using ffmpeg
#[derive(Debug, Clone)]
pub struct AudioConverter {
    ffmpeg_path: String,
    target_sample_rate: u32,
    channels: u32,
    reencode_wav: bool,
    scratch_root: Option<PathBuf>,
}

impl AudioConverter {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            target_sample_rate: config.target_sample_rate,
            channels: config.channels,
            reencode_wav: config.reencode_wav,
            scratch_root: config.scratch_dir.clone(),
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Scratch directory in the configured location
    pub fn scratch(&self) -> Result<ScratchDir> {
        match &self.scratch_root {
            Some(root) => ScratchDir::new_in(root),
            None => ScratchDir::new(),
        }
    }

    /// Produce canonical audio for `input`
    pub async fn to_canonical(&self, input: &AudioInput) -> Result<CanonicalAudio> {
        if !tokio::fs::try_exists(input.path()).await.unwrap_or(false) {
            return Err(ScribeError::FileNotFound(input.path().to_path_buf()));
        }

        if input.format().is_canonical() && !self.reencode_wav {
            debug!("Passing {} through without conversion", input.path().display());
            return Ok(CanonicalAudio {
                path: input.path().to_path_buf(),
                scratch: None,
            });
        }

        let scratch = self.scratch()?;
        let output_path = scratch.child(CANONICAL_FILE_NAME);

        info!("🎵 Converting {} ({}) to WAV...", input.path().display(), input.format());

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .arg("-nostdin")
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input.path())
            .arg("-vn") // No video stream
            .args(["-acodec", "pcm_s16le"]) // 16-bit PCM
            .args(["-ar", &self.target_sample_rate.to_string()])
            .args(["-ac", &self.channels.to_string()])
            .args(["-f", "wav"])
            .arg("-y")
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ScribeError::Conversion(format!("failed to run {}: {}", self.ffmpeg_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no diagnostic output");
            warn!("ffmpeg failed for {}: {}", input.path().display(), reason);
            return Err(ScribeError::Conversion(format!(
                "ffmpeg exited with {} for {}: {}",
                output.status,
                input.file_name(),
                reason
            )));
        }

        let size = tokio::fs::metadata(&output_path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(ScribeError::Conversion(format!(
                "ffmpeg produced no audio for {}",
                input.file_name()
            )));
        }

        info!("✅ Audio converted: {} ({:.1} KB)", output_path.display(), size as f64 / 1024.0);

        Ok(CanonicalAudio {
            path: output_path,
            scratch: Some(scratch),
        })
    }

    /// Check that the ffmpeg executable can be run
    pub async fn check_availability(&self) -> bool {
        tokio::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Default for AudioConverter {
    fn default() -> Self {
        Self::new(&AudioConfig::default())
    }
}

/// Strip directory components and unusual characters from an uploaded file name
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let rest = cleaned.trim_start_matches('.');

    if rest.is_empty() {
        "upload".to_string()
    } else if rest.len() != cleaned.len() {
        // Only an extension survived
        format!("upload.{}", rest)
    } else {
        cleaned
    }
}
