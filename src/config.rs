use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::subtitles::ExportFormat;
use crate::transcription::ModelTier;

/// Configuration for audioscribe
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP service settings
    pub server: ServerConfig,

    /// Audio conversion settings
    pub audio: AudioConfig,

    /// Recognition engine settings
    pub transcription: TranscriptionConfig,

    /// Export settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// ffmpeg executable used for transcoding
    pub ffmpeg_path: String,

    /// Sample rate of canonical audio
    pub target_sample_rate: u32,

    /// Channel count of canonical audio
    pub channels: u32,

    /// Re-encode `.wav` input instead of passing it through
    pub reencode_wav: bool,

    /// Directory for scratch files (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Model tier used when a request does not name one
    pub default_model: String,

    /// Language hint (None for auto-detect)
    pub language: Option<String>,

    /// Whisper executable override (auto-detected when unset)
    pub backend: Option<String>,

    /// Directory holding `ggml-<tier>.bin` model files
    pub models_dir: PathBuf,

    /// Threads handed to the engine
    pub threads: u32,

    /// Timeout for a single recognition run (seconds)
    pub timeout: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Export format used when none is requested
    pub default_format: String,

    /// Directory for CLI output files (beside the input when unset)
    pub output_dir: Option<PathBuf>,

    /// Print timed segments after transcribing
    pub show_segments: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the audioscribe target
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            target_sample_rate: 16000, // Optimal for Whisper
            channels: 1,
            reencode_wav: false,
            scratch_dir: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            default_model: "base".to_string(),
            language: None,
            backend: None,
            models_dir: PathBuf::from("models"),
            threads: 4,
            timeout: 3600, // 60 minutes for large files
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "txt".to_string(),
            output_dir: None,
            show_segments: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TranscriptionConfig {
    /// Parsed default model tier
    pub fn default_tier(&self) -> Result<ModelTier> {
        self.default_model
            .parse()
            .map_err(|e| anyhow!("invalid transcription.default_model: {}", e))
    }
}

impl OutputConfig {
    /// Parsed default export format
    pub fn format(&self) -> Result<ExportFormat> {
        self.default_format
            .parse()
            .map_err(|e| anyhow!("invalid output.default_format: {}", e))
    }
}

impl Config {
    /// Load configuration from the first config file found, or from the environment
    pub fn load() -> Result<Self> {
        let mut config_paths: Vec<PathBuf> = vec![
            PathBuf::from("audioscribe.toml"),
            PathBuf::from("config/audioscribe.toml"),
        ];
        if let Ok(home) = std::env::var("HOME") {
            config_paths.push(Path::new(&home).join(".config/audioscribe/config.toml"));
        }
        config_paths.push(PathBuf::from("/etc/audioscribe/config.toml"));

        for path in &config_paths {
            if path.exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("cannot read {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override settings with `AUDIOSCRIBE_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("AUDIOSCRIBE_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("AUDIOSCRIBE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| anyhow!("AUDIOSCRIBE_PORT is not a valid port: {}", port))?;
        }

        if let Some(model) = lookup("AUDIOSCRIBE_MODEL") {
            self.transcription.default_model = model;
        }

        if let Some(language) = lookup("AUDIOSCRIBE_LANGUAGE") {
            self.transcription.language = Some(language).filter(|l| !l.is_empty());
        }

        if let Some(ffmpeg) = lookup("AUDIOSCRIBE_FFMPEG") {
            self.audio.ffmpeg_path = ffmpeg;
        }

        if let Some(whisper) = lookup("AUDIOSCRIBE_WHISPER_BIN") {
            self.transcription.backend = Some(whisper);
        }

        if let Some(models_dir) = lookup("AUDIOSCRIBE_MODELS_DIR") {
            self.transcription.models_dir = PathBuf::from(models_dir);
        }

        if let Some(log_level) = lookup("AUDIOSCRIBE_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.audio.target_sample_rate == 0 {
            return Err(anyhow!("audio.target_sample_rate must be greater than 0"));
        }

        if self.audio.channels == 0 {
            return Err(anyhow!("audio.channels must be greater than 0"));
        }

        if self.transcription.threads == 0 {
            return Err(anyhow!("transcription.threads must be greater than 0"));
        }

        if self.transcription.timeout == 0 {
            return Err(anyhow!("transcription.timeout must be greater than 0"));
        }

        self.transcription.default_tier()?;
        self.output.format()?;

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "audioscribe configuration:\n\
            - Server: {}:{}\n\
            - Default model: {}\n\
            - Language: {}\n\
            - Models directory: {}\n\
            - Canonical audio: {}Hz, {} channel(s)\n\
            - Default format: {}",
            self.server.host,
            self.server.port,
            self.transcription.default_model,
            self.transcription.language.as_deref().unwrap_or("auto"),
            self.transcription.models_dir.display(),
            self.audio.target_sample_rate,
            self.audio.channels,
            self.output.default_format
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_default_model(mut self, tier: ModelTier) -> Self {
        self.config.transcription.default_model = tier.to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.transcription.language = Some(language.into());
        self
    }

    pub fn with_ffmpeg(mut self, path: impl Into<String>) -> Self {
        self.config.audio.ffmpeg_path = path.into();
        self
    }

    pub fn with_default_format(mut self, format: ExportFormat) -> Self {
        self.config.output.default_format = format.to_string();
        self
    }

    pub fn reencode_wav(mut self, enable: bool) -> Self {
        self.config.audio.reencode_wav = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
