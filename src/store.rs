//! In-memory store of completed transcriptions.
//!
//! Records are keyed by a random v4 UUID, never updated and never evicted.
//! Contents are lost when the process exits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, ScribeError};
use crate::transcription::{ModelTier, TranscriptionResult};

/// A stored transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Model tier that produced the result, when known
    pub model: Option<ModelTier>,
    /// Original file name of the upload, when known
    pub source_name: Option<String>,
    #[serde(flatten)]
    pub result: TranscriptionResult,
}

/// Thread-safe result store
#[derive(Debug, Default)]
pub struct ResultStore {
    records: RwLock<HashMap<Uuid, Arc<ResultRecord>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result and return its fresh identifier
    pub async fn put(&self, result: TranscriptionResult) -> Uuid {
        self.put_with(result, None, None).await
    }

    /// Store a result along with its provenance
    pub async fn put_with(
        &self,
        result: TranscriptionResult,
        model: Option<ModelTier>,
        source_name: Option<String>,
    ) -> Uuid {
        let mut records = self.records.write().await;
        loop {
            let id = Uuid::new_v4();
            if let Entry::Vacant(slot) = records.entry(id) {
                slot.insert(Arc::new(ResultRecord {
                    id,
                    created_at: Utc::now(),
                    model,
                    source_name,
                    result,
                }));
                debug!("Stored transcription result {} ({} records)", id, records.len());
                return id;
            }
        }
    }

    /// Look up a record by its identifier string
    pub async fn get(&self, id: &str) -> Result<Arc<ResultRecord>> {
        let uuid = Uuid::parse_str(id.trim()).map_err(|_| ScribeError::NotFound(id.to_string()))?;
        self.get_by_uuid(uuid).await
    }

    pub async fn get_by_uuid(&self, id: Uuid) -> Result<Arc<ResultRecord>> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ScribeError::NotFound(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
