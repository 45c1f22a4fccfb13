//! Request record persistence: an in-memory store for tests and local runs,
//! and a Postgres store keeping one JSONB document per request.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use factcheck_common::{RecordPatch, RequestRecord};

use crate::traits::RecordStore;

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

/// JSON documents in a mutex-guarded map. `update` merges top-level fields.
#[derive(Default)]
pub struct MemoryRecordStore {
    docs: Mutex<HashMap<String, Value>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, builder style.
    pub fn with_record(self, id: &str, record: RequestRecord) -> Self {
        if let Ok(doc) = serde_json::to_value(&record) {
            self.lock().insert(id.to_string(), doc);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.lock().contains_key(id))
    }

    async fn create_if_absent(&self, id: &str, record: &RequestRecord) -> Result<bool> {
        let doc = serde_json::to_value(record)?;
        match self.lock().entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(true)
            }
        }
    }

    async fn write(&self, id: &str, record: &RequestRecord) -> Result<()> {
        let doc = serde_json::to_value(record)?;
        self.lock().insert(id.to_string(), doc);
        Ok(())
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<()> {
        let fields = match serde_json::to_value(patch)? {
            Value::Object(fields) => fields,
            _ => return Err(anyhow!("record patch is not an object")),
        };
        let mut docs = self.lock();
        let doc = docs
            .get_mut(id)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| anyhow!("no record for request {id}"))?;
        doc.extend(fields);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RequestRecord>> {
        let doc = self.lock().get(id).cloned();
        Ok(doc.map(serde_json::from_value).transpose()?)
    }
}

// ---------------------------------------------------------------------------
// PgRecordStore
// ---------------------------------------------------------------------------

/// One row per request in `requests`, the record as a JSONB document.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn exists(&self, id: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM requests WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    async fn create_if_absent(&self, id: &str, record: &RequestRecord) -> Result<bool> {
        let doc = serde_json::to_value(record)?;
        let result = sqlx::query(
            r#"
            INSERT INTO requests (id, record)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn write(&self, id: &str, record: &RequestRecord) -> Result<()> {
        let doc = serde_json::to_value(record)?;
        sqlx::query(
            r#"
            INSERT INTO requests (id, record)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET record = EXCLUDED.record, updated_at = now()
            "#,
        )
        .bind(id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        debug!(request_id = id, "Record written");
        Ok(())
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<()> {
        let fields = serde_json::to_value(patch)?;
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET record = record || $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("no record for request {id}"));
        }
        debug!(request_id = id, "Record updated");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RequestRecord>> {
        let doc = sqlx::query_scalar::<_, Value>("SELECT record FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(serde_json::from_value).transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck_common::Probability;

    fn record() -> RequestRecord {
        RequestRecord {
            user_id: "u1".into(),
            video_url: "https://x/v.mp4".into(),
            claim: "Lula signs decree".into(),
            ..RequestRecord::default()
        }
    }

    #[tokio::test]
    async fn update_merges_without_touching_other_fields() {
        let store = MemoryRecordStore::new();
        store.write("r1", &record()).await.unwrap();

        store
            .update(
                "r1",
                &RecordPatch {
                    prob_video_fake: Probability::new(0.3),
                    messages: Some(vec!["Risk: Low".into()]),
                    ..RecordPatch::default()
                },
            )
            .await
            .unwrap();

        let stored = store.get("r1").await.unwrap().unwrap();
        assert_eq!(stored.claim, "Lula signs decree");
        assert_eq!(stored.prob_video_fake, Probability::new(0.3));
        assert_eq!(stored.prob_audio_fake, None);
        assert_eq!(stored.messages, vec!["Risk: Low"]);
    }

    #[tokio::test]
    async fn create_if_absent_claims_an_id_once() {
        let store = MemoryRecordStore::new();

        assert!(store.create_if_absent("r1", &record()).await.unwrap());
        let second = RequestRecord {
            claim: "something else".into(),
            ..record()
        };
        assert!(!store.create_if_absent("r1", &second).await.unwrap());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("r1").await.unwrap().unwrap().claim, "Lula signs decree");
    }

    #[tokio::test]
    async fn update_of_unknown_record_fails() {
        let store = MemoryRecordStore::new();
        assert!(store.update("missing", &RecordPatch::default()).await.is_err());
        assert!(!store.exists("missing").await.unwrap());
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
