//! Process-wide cache of loaded recognition models.
//!
//! Each tier gets its own `OnceCell`. Concurrent first requests for the same
//! tier await a single load; a failed load leaves the cell empty so a later
//! request can try again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use super::engine::{ModelHandle, RecognitionEngine};
use super::types::ModelTier;
use crate::error::Result;

type ModelSlot = Arc<OnceCell<Arc<dyn ModelHandle>>>;

/// Lazily loads and retains one model per tier
pub struct ModelCache {
    engine: Arc<dyn RecognitionEngine>,
    models: Mutex<HashMap<ModelTier, ModelSlot>>,
}

impl ModelCache {
    pub fn new(engine: Arc<dyn RecognitionEngine>) -> Self {
        Self {
            engine,
            models: Mutex::new(HashMap::new()),
        }
    }

    /// Get the model for `tier`, loading it on first use
    pub async fn get(&self, tier: ModelTier) -> Result<Arc<dyn ModelHandle>> {
        let slot = {
            let mut models = self.models.lock().await;
            Arc::clone(models.entry(tier).or_default())
        };

        let model = slot
            .get_or_try_init(|| async {
                info!("📦 Loading {} model via {}...", tier, self.engine.name());
                let start_time = Instant::now();
                let model = self.engine.load(tier).await?;
                info!("✅ Model {} loaded in {:.2}s", tier, start_time.elapsed().as_secs_f64());
                Ok::<_, crate::error::ScribeError>(model)
            })
            .await?;

        Ok(Arc::clone(model))
    }

    /// Tiers that currently hold a loaded model
    pub async fn loaded_tiers(&self) -> Vec<ModelTier> {
        let models = self.models.lock().await;
        let mut tiers: Vec<ModelTier> = models
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(tier, _)| *tier)
            .collect();
        tiers.sort();
        tiers
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScribeError;
    use crate::transcription::engine::RawTranscript;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct CountingModel {
        tier: ModelTier,
    }

    #[async_trait]
    impl ModelHandle for CountingModel {
        fn tier(&self) -> ModelTier {
            self.tier
        }

        async fn transcribe(&self, _audio_path: &Path, _language: Option<&str>) -> Result<RawTranscript> {
            Ok(RawTranscript::default())
        }
    }

    #[derive(Default)]
    struct CountingEngine {
        loads: AtomicUsize,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl RecognitionEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        async fn load(&self, tier: ModelTier) -> Result<Arc<dyn ModelHandle>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ScribeError::Transcription("out of memory".to_string()));
            }
            Ok(Arc::new(CountingModel { tier }))
        }
    }

    #[tokio::test]
    async fn test_sequential_gets_return_same_instance() {
        let engine = Arc::new(CountingEngine::default());
        let cache = ModelCache::new(engine.clone());

        let first = cache.get(ModelTier::Base).await.unwrap();
        let second = cache.get(ModelTier::Base).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_tiers_get_distinct_models() {
        let engine = Arc::new(CountingEngine::default());
        let cache = ModelCache::new(engine.clone());

        let base = cache.get(ModelTier::Base).await.unwrap();
        let small = cache.get(ModelTier::Small).await.unwrap();

        assert!(!Arc::ptr_eq(&base, &small));
        assert_eq!(base.tier(), ModelTier::Base);
        assert_eq!(small.tier(), ModelTier::Small);
        assert_eq!(engine.loads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.loaded_tiers().await, vec![ModelTier::Base, ModelTier::Small]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_gets_load_once() {
        let engine = Arc::new(CountingEngine::default());
        let cache = Arc::new(ModelCache::new(engine.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get(ModelTier::Base).await })
            })
            .collect();

        let models: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
        assert!(models.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let engine = Arc::new(CountingEngine {
            failures_left: AtomicUsize::new(1),
            ..CountingEngine::default()
        });
        let cache = ModelCache::new(engine.clone());

        assert!(cache.get(ModelTier::Tiny).await.is_err());
        assert!(cache.loaded_tiers().await.is_empty());

        let model = cache.get(ModelTier::Tiny).await.unwrap();
        assert_eq!(model.tier(), ModelTier::Tiny);
        assert_eq!(engine.loads.load(Ordering::SeqCst), 2);
    }
}
