use anyhow::Result;
use audioscribe::{AudioConverter, Config, ModelTier, WhisperCliEngine};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("audioscribe=info,check_transcription=info")
        .init();

    let config = Config::load()?;
    info!("🔍 Checking transcription backend availability...");

    let converter = AudioConverter::new(&config.audio);
    if converter.check_availability().await {
        info!("✅ ffmpeg available ({})", config.audio.ffmpeg_path);
        info!(
            "   Converts to {} Hz, {} channel(s) PCM WAV",
            converter.target_sample_rate(),
            converter.channels()
        );
    } else {
        info!("❌ ffmpeg not found ({}), only WAV input can be transcribed", config.audio.ffmpeg_path);
    }

    let engine = WhisperCliEngine::new(config.transcription.clone());
    match engine.check_availability().await {
        Ok(backend_info) => info!("✅ {}", backend_info),
        Err(e) => {
            info!("❌ {}", e);
            info!("💡 Recommendation: Install whisper.cpp for best performance:");
            info!("   git clone https://github.com/ggerganov/whisper.cpp.git");
            info!("   cd whisper.cpp && make -j");
            info!("   # Download models: ./models/download-ggml-model.sh base");
        }
    }

    info!("📋 Model files in {}:", config.transcription.models_dir.display());
    for tier in ModelTier::ALL {
        let path = engine.model_path(tier);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => info!("   ✅ {:<8} {:.1} MB", tier, meta.len() as f64 / 1_000_000.0),
            Err(_) => info!("   ❌ {:<8} missing ({})", tier, path.display()),
        }
    }

    Ok(())
}
