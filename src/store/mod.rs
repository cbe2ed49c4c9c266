pub mod memory;
pub mod postgres;
pub mod rest;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::{
    config::StoreBackend,
    devices::{Record, RecordKey, Snapshot},
};

pub use self::{memory::MemoryBackend, postgres::PostgresBackend, rest::RestKvBackend};

// ---------------------------------------------------------------------------
// Raw key-value collaborator
// ---------------------------------------------------------------------------

/// Opaque get/set-by-key service. Values are JSON text; a single `set` is
/// atomic, nothing else is promised.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored record {key} is unreadable: {source}")]
    Corrupt {
        key: RecordKey,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// DeviceStore
// ---------------------------------------------------------------------------

/// Typed access to the four device records.
///
/// Every merge is one read followed by one write with no compare-and-swap:
/// concurrent writers to the same record resolve as last-write-wins.
#[derive(Clone)]
pub struct DeviceStore {
    backend: Arc<dyn KvBackend>,
}

impl DeviceStore {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Volatile store private to this process.
    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Build the store selected by configuration. Postgres migrations run here.
    pub async fn connect(backend: &StoreBackend) -> Result<Self> {
        let store = match backend {
            StoreBackend::Memory => Self::memory(),
            StoreBackend::Kv { url, token } => Self::new(RestKvBackend::new(url, token)),
            StoreBackend::Postgres { database_url } => {
                let pool = postgres::create_pool(database_url)
                    .await
                    .context("failed to connect to Postgres")?;
                postgres::run_migrations(&pool).await?;
                Self::new(PostgresBackend::new(pool))
            }
        };
        info!(durable = backend.is_durable(), "Device store ready");
        Ok(store)
    }

    /// The stored record, or `None` if nothing has been written yet.
    pub async fn read_stored<R: Record>(&self) -> Result<Option<R>, StoreError> {
        let key = R::KEY;
        let Some(raw) = self.backend.get(&key.to_string()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { key, source })
    }

    /// The stored record, or its default if absent.
    pub async fn read<R: Record>(&self) -> Result<R, StoreError> {
        Ok(self.read_stored().await?.unwrap_or_default())
    }

    pub async fn write<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let key = R::KEY.to_string();
        let raw = serde_json::to_string(record)
            .with_context(|| format!("failed to encode record {key}"))?;
        self.backend.set(&key, raw).await?;
        Ok(())
    }

    /// Read the current record, let `apply` overlay fields, persist, and
    /// return the result.
    pub async fn merge<R, F>(&self, apply: F) -> Result<R, StoreError>
    where
        R: Record,
        F: FnOnce(&mut R) + Send,
    {
        let mut record: R = self.read().await?;
        apply(&mut record);
        self.write(&record).await?;
        Ok(record)
    }

    /// Like [`merge`](Self::merge), and also stamps `last_updated` with the
    /// current time. Stamps never repeat or go backwards for one record.
    pub async fn merge_snapshot<S, F>(&self, apply: F) -> Result<S, StoreError>
    where
        S: Snapshot,
        F: FnOnce(&mut S) + Send,
    {
        let now = chrono::Utc::now().timestamp_millis();
        self.merge(move |snapshot: &mut S| {
            let stamp = next_stamp(snapshot.last_updated(), now);
            apply(snapshot);
            snapshot.set_last_updated(stamp);
        })
        .await
    }
}

fn next_stamp(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::models::{Esp32Config, Esp32Snapshot, Esp8266Snapshot};

    #[tokio::test]
    async fn read_returns_default_when_absent() {
        let store = DeviceStore::memory();
        assert!(store.read_stored::<Esp32Config>().await.unwrap().is_none());
        assert_eq!(store.read::<Esp32Config>().await.unwrap(), Esp32Config::default());
    }

    #[tokio::test]
    async fn merge_persists_and_returns_result() {
        let store = DeviceStore::memory();
        let merged = store
            .merge(|c: &mut Esp32Config| c.water_threshold = 70)
            .await
            .unwrap();
        assert_eq!(merged.water_threshold, 70);

        let stored: Esp32Config = store.read().await.unwrap();
        assert_eq!(stored, merged);
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields() {
        let store = DeviceStore::memory();
        store
            .merge_snapshot(|s: &mut Esp8266Snapshot| {
                s.temperature = 24.5;
                s.humidity = 40.0;
            })
            .await
            .unwrap();
        let merged = store
            .merge_snapshot(|s: &mut Esp8266Snapshot| s.smoke = 1)
            .await
            .unwrap();

        assert_eq!(merged.temperature, 24.5);
        assert_eq!(merged.humidity, 40.0);
        assert_eq!(merged.smoke, 1);
    }

    #[tokio::test]
    async fn snapshot_stamps_strictly_increase() {
        let store = DeviceStore::memory();
        let first = store
            .merge_snapshot(|s: &mut Esp32Snapshot| s.water_level = 50.0)
            .await
            .unwrap();
        let second = store
            .merge_snapshot(|s: &mut Esp32Snapshot| s.water_level = 50.0)
            .await
            .unwrap();
        assert!(second.last_updated > first.last_updated);
        assert!(first.last_updated > 0);
    }

    #[tokio::test]
    async fn records_are_independent() {
        let store = DeviceStore::memory();
        store
            .merge_snapshot(|s: &mut Esp32Snapshot| s.pump_state = 1)
            .await
            .unwrap();
        assert!(store.read_stored::<Esp8266Snapshot>().await.unwrap().is_none());
        assert!(store.read_stored::<Esp32Config>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_value_is_an_error() {
        let backend = MemoryBackend::new();
        backend.set("esp32:config", "{not json".to_owned()).await.unwrap();
        let store = DeviceStore::new(backend);

        let err = store.read::<Esp32Config>().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { key, .. } if key == RecordKey::ESP32_CONFIG));
    }

    #[test]
    fn next_stamp_never_repeats() {
        assert_eq!(next_stamp(0, 1_000), 1_000);
        assert_eq!(next_stamp(1_000, 1_000), 1_001);
        assert_eq!(next_stamp(2_000, 1_000), 2_001);
    }
}
