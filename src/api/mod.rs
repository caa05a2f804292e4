//! HTTP service for uploading audio and downloading transcripts.

use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::transcription::Transcriber;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{router, ApiError, AppState};

/// API server bound to the configured host and port
#[derive(Debug)]
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(config: Arc<Config>, transcriber: Arc<Transcriber>) -> Self {
        let host = config.server.host.clone();
        let port = config.server.port;
        Self {
            state: AppState::new(config, transcriber),
            host,
            port,
        }
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Start the API server in the background
    pub fn start_background(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }

    /// Serve until the listener fails
    pub async fn start(self) -> Result<()> {
        server::start_http_server(self.state, &self.host, self.port).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::{ModelCache, ModelTier, WhisperCliEngine};

    fn server(config: Config) -> ApiServer {
        let engine = Arc::new(WhisperCliEngine::new(config.transcription.clone()));
        let transcriber = Arc::new(Transcriber::new(Arc::new(ModelCache::new(engine))));
        ApiServer::new(Arc::new(config), transcriber)
    }

    #[test]
    fn test_state_uses_configured_default_tier() {
        let mut config = Config::default();
        config.transcription.default_model = "small".to_string();

        let server = server(config).with_address("127.0.0.1", 0);
        assert_eq!(server.state().default_tier(), ModelTier::Small);
    }

    #[tokio::test]
    async fn test_background_server_reports_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let handle = server(Config::default())
            .with_address("127.0.0.1", port)
            .start_background();
        let result = handle.await.unwrap();
        assert!(result.is_err());
    }
}
