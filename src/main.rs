use anyhow::{anyhow, bail, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audioscribe::processing::{self, BatchProcessor, TranscribeOptions};
use audioscribe::subtitles::render_listing;
use audioscribe::{AudioConverter, Config, ExportFormat, ModelTier, TranscriptionResult, WhisperCliEngine};

fn cli() -> Command {
    Command::new("audioscribe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transcribe audio files to text, SRT or WebVTT")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .global(true),
        )
        .subcommand(
            Command::new("transcribe")
                .about("Transcribe an audio file or every audio file in a directory")
                .arg(
                    Arg::new("input")
                        .value_name("INPUT")
                        .help("Audio file or directory")
                        .required(true),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .value_name("SIZE")
                        .help("Whisper model size")
                        .value_parser(["tiny", "base", "small", "medium", "large"]),
                )
                .arg(
                    Arg::new("language")
                        .short('l')
                        .long("language")
                        .value_name("LANG")
                        .help("Language hint, auto-detected when omitted"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("PATH")
                        .help("Output file, or output directory for directory input"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format")
                        .value_parser(["txt", "srt", "vtt"]),
                )
                .arg(
                    Arg::new("show-segments")
                        .long("show-segments")
                        .help("Print timed segments")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("NUM")
                        .help("Number of parallel workers for directory input")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP service")
                .arg(Arg::new("host").long("host").value_name("HOST").help("Bind address"))
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Listen port")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
        .subcommand(Command::new("models").about("List model sizes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(Path::new(path))?,
        None => Config::load()?,
    };

    // Initialize logging
    let directive = if verbose {
        "audioscribe=debug,warn".to_string()
    } else {
        format!("audioscribe={},warn", config.logging.level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate()?;
    if verbose {
        info!("{}", config.summary());
    }

    match matches.subcommand() {
        Some(("transcribe", sub)) => transcribe(config, sub).await,
        Some(("serve", sub)) => serve(config, sub).await,
        Some(("models", _)) => {
            list_models(&config);
            Ok(())
        }
        _ => Err(anyhow!("unknown command")),
    }
}

async fn transcribe(config: Config, matches: &ArgMatches) -> Result<()> {
    let input = PathBuf::from(
        matches
            .get_one::<String>("input")
            .ok_or_else(|| anyhow!("INPUT is required"))?,
    );
    let output = matches.get_one::<String>("output").map(PathBuf::from);
    let workers = matches.get_one::<usize>("workers").copied().unwrap_or(1);
    let show_segments = matches.get_flag("show-segments") || config.output.show_segments;

    let tier = match matches.get_one::<String>("model") {
        Some(model) => model.parse::<ModelTier>()?,
        None => config.transcription.default_tier()?,
    };
    let format = match matches.get_one::<String>("format") {
        Some(format) => format.parse::<ExportFormat>()?,
        None => config.output.format()?,
    };

    let is_directory = input.is_dir();
    let options = TranscribeOptions {
        tier,
        language: matches
            .get_one::<String>("language")
            .cloned()
            .or_else(|| config.transcription.language.clone()),
        format,
        output_dir: if is_directory {
            output.clone().or_else(|| config.output.output_dir.clone())
        } else {
            config.output.output_dir.clone()
        },
    };

    let processor = BatchProcessor::new(
        Arc::new(AudioConverter::new(&config.audio)),
        audioscribe::whisper_transcriber(&config),
        options,
        workers,
    );

    if is_directory {
        let summary = processor.process_directory(&input).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);

        info!("✅ Successful: {}", summary.successful);
        info!("❌ Failed: {}", summary.failed);
        if summary.has_failures() {
            bail!("{} of {} files failed", summary.failed, summary.total);
        }
        return Ok(());
    }

    info!("🚀 Transcribing {} with the {} model", input.display(), tier);
    let result = processor.transcribe(&input).await.map_err(|e| {
        processing::log_failure(&input, &e);
        e
    })?;

    print!("{}", format_report(&result, show_segments));

    let output_path = output.unwrap_or_else(|| processor.output_path_for(&input));
    processing::write_export(&result, format, &output_path).await?;
    println!("\nSaved {} output to: {}", format, output_path.display());

    Ok(())
}

/// Console summary of a single-file run: header, transcript, then the optional segment listing
fn format_report(result: &TranscriptionResult, show_segments: bool) -> String {
    let mut report = format!(
        "Language: {}\nDuration: {:.2} seconds\nSegments: {}\n",
        result.language(),
        result.duration(),
        result.segments().len()
    );
    report.push_str(&format!("\nTranscription:\n{}\n", result.text().trim()));

    if show_segments && result.has_segments() {
        report.push_str("\nSegments:\n");
        report.push_str(&render_listing(result.segments()));
    }
    report
}

#[cfg(feature = "api")]
async fn serve(config: Config, matches: &ArgMatches) -> Result<()> {
    let host = matches
        .get_one::<String>("host")
        .cloned()
        .unwrap_or_else(|| config.server.host.clone());
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(config.server.port);

    let transcriber = audioscribe::whisper_transcriber(&config);
    let converter = AudioConverter::new(&config.audio);
    if !converter.check_availability().await {
        warn!("ffmpeg not found at '{}', only WAV uploads will work", config.audio.ffmpeg_path);
    }

    let server = audioscribe::api::ApiServer::new(Arc::new(config), transcriber).with_address(host, port);
    info!("Default model: {}", server.state().default_tier());

    server.start_background().await?
}

#[cfg(not(feature = "api"))]
async fn serve(_config: Config, _matches: &ArgMatches) -> Result<()> {
    bail!("audioscribe was built without the `api` feature")
}

fn list_models(config: &Config) {
    let default_tier = config.transcription.default_tier().unwrap_or_default();
    let engine = WhisperCliEngine::new(config.transcription.clone());

    println!("Available models:");
    for tier in ModelTier::ALL {
        let marker = if tier == default_tier { " (default)" } else { "" };
        let status = if engine.model_path(tier).exists() { "downloaded" } else { "not downloaded" };
        println!("  {:<8}{} [{}]", tier, marker, status);
    }
}
