use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    devices::{
        models::{Esp32Snapshot, Esp8266Snapshot},
        DeviceClass,
    },
    store::{DeviceStore, StoreError},
};

use super::{demo, Esp32Update, Esp8266Update, Payload};

/// Latest esp32 snapshot as served to readers. `synthetic` marks generated
/// demo data that was never stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LatestReading {
    #[serde(flatten)]
    pub snapshot: Esp32Snapshot,
    /// Present and `true` only for generated demo data.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl LatestReading {
    fn stored(snapshot: Esp32Snapshot) -> Self {
        Self {
            snapshot,
            synthetic: false,
        }
    }
}

/// Ingest and read path for sensor snapshots.
#[derive(Clone)]
pub struct SensorService {
    store: DeviceStore,
    /// Staleness threshold (ms) for the esp32 demo fallback; `None` disables it.
    demo_stale_after_ms: Option<i64>,
}

impl SensorService {
    pub fn new(store: DeviceStore, demo_stale_after_ms: Option<i64>) -> Self {
        Self {
            store,
            demo_stale_after_ms,
        }
    }

    /// Coerce `payload`, overlay it on the stored esp32 snapshot and persist.
    pub async fn ingest_esp32(&self, payload: &Payload) -> Result<Esp32Snapshot, StoreError> {
        let update = Esp32Update::from_payload(payload);
        let snapshot = self
            .store
            .merge_snapshot(move |s: &mut Esp32Snapshot| update.apply(s))
            .await?;

        info!(
            device = %DeviceClass::Esp32,
            water_level = snapshot.water_level,
            motion = %snapshot.motion,
            pump_state = snapshot.pump_state,
            light_state = snapshot.light_state,
            "Reading ingested"
        );
        Ok(snapshot)
    }

    pub async fn ingest_esp8266(&self, payload: &Payload) -> Result<Esp8266Snapshot, StoreError> {
        let update = Esp8266Update::from_payload(payload);
        let snapshot = self
            .store
            .merge_snapshot(move |s: &mut Esp8266Snapshot| update.apply(s))
            .await?;

        info!(
            device = %DeviceClass::Esp8266,
            temperature = snapshot.temperature,
            humidity = snapshot.humidity,
            motion = snapshot.motion,
            smoke = snapshot.smoke,
            alarm_state = snapshot.alarm_state,
            "Reading ingested"
        );
        Ok(snapshot)
    }

    /// The stored esp32 snapshot. With the demo fallback enabled, a missing
    /// or stale snapshot is replaced by a generated one (not persisted).
    pub async fn latest_esp32(&self) -> Result<LatestReading, StoreError> {
        let stored = self.store.read_stored::<Esp32Snapshot>().await?;

        let Some(stale_after_ms) = self.demo_stale_after_ms else {
            return Ok(LatestReading::stored(stored.unwrap_or_default()));
        };

        let now = chrono::Utc::now().timestamp_millis();
        match stored {
            Some(s) if !demo::is_stale(s.last_updated, now, stale_after_ms) => {
                Ok(LatestReading::stored(s))
            }
            _ => {
                let snapshot = demo::synthetic_esp32(&mut rand::rng(), now);
                debug!(device = %DeviceClass::Esp32, "Serving synthetic reading");
                Ok(LatestReading {
                    snapshot,
                    synthetic: true,
                })
            }
        }
    }

    pub async fn latest_esp8266(&self) -> Result<Esp8266Snapshot, StoreError> {
        self.store.read().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::devices::models::Esp32Snapshot;

    fn payload(v: Value) -> Payload {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn ingest_then_read_returns_merged_snapshot() {
        let service = SensorService::new(DeviceStore::memory(), None);
        service
            .ingest_esp32(&payload(json!({ "water_level": 15, "pump_state": 1 })))
            .await
            .unwrap();

        let latest = service.latest_esp32().await.unwrap();
        assert!(!latest.synthetic);
        assert_eq!(latest.snapshot.water_level, 15.0);
        assert_eq!(latest.snapshot.pump_state, 1);
        assert_eq!(latest.snapshot.motion, "0");
        assert_eq!(latest.snapshot.light_state, 0);
    }

    #[tokio::test]
    async fn repeated_ingest_only_moves_the_stamp() {
        let service = SensorService::new(DeviceStore::memory(), None);
        let p = payload(json!({ "temperature": 21.5, "humidity": 48, "smoke": 0 }));

        let first = service.ingest_esp8266(&p).await.unwrap();
        let second = service.ingest_esp8266(&p).await.unwrap();

        assert!(second.last_updated > first.last_updated);
        assert_eq!(
            Esp8266Snapshot { last_updated: 0, ..first },
            Esp8266Snapshot { last_updated: 0, ..second }
        );
    }

    #[tokio::test]
    async fn passive_read_of_empty_store_is_default() {
        let service = SensorService::new(DeviceStore::memory(), None);
        let latest = service.latest_esp32().await.unwrap();
        assert!(!latest.synthetic);
        assert_eq!(latest.snapshot, Esp32Snapshot::default());
    }

    #[tokio::test]
    async fn demo_fallback_fills_empty_store_without_persisting() {
        let store = DeviceStore::memory();
        let service = SensorService::new(store.clone(), Some(15_000));

        let latest = service.latest_esp32().await.unwrap();
        assert!(latest.synthetic);
        assert!((35.0..=85.0).contains(&latest.snapshot.water_level));
        assert!(store.read_stored::<Esp32Snapshot>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn demo_fallback_replaces_stale_snapshot() {
        let store = DeviceStore::memory();
        store
            .write(&Esp32Snapshot {
                water_level: 5.0,
                last_updated: 1_000,
                ..Default::default()
            })
            .await
            .unwrap();
        let service = SensorService::new(store, Some(15_000));

        let latest = service.latest_esp32().await.unwrap();
        assert!(latest.synthetic);
    }

    #[tokio::test]
    async fn fresh_snapshot_wins_over_demo_data() {
        let service = SensorService::new(DeviceStore::memory(), Some(15_000));
        service
            .ingest_esp32(&payload(json!({ "water_level": 12 })))
            .await
            .unwrap();

        let latest = service.latest_esp32().await.unwrap();
        assert!(!latest.synthetic);
        assert_eq!(latest.snapshot.water_level, 12.0);
    }

    #[test]
    fn synthetic_marker_only_serialized_when_set() {
        let stored = serde_json::to_value(LatestReading::stored(Esp32Snapshot::default())).unwrap();
        assert!(stored.get("synthetic").is_none());
        assert_eq!(stored["motion"], "0");

        let generated = serde_json::to_value(LatestReading {
            snapshot: Esp32Snapshot::default(),
            synthetic: true,
        })
        .unwrap();
        assert_eq!(generated["synthetic"], true);
    }
}
