use thiserror::Error;
use tracing::{info, warn};

use crate::{
    devices::{
        models::{Esp32Config, Esp8266Config},
        DeviceClass,
    },
    sensors::Payload,
    store::{DeviceStore, StoreError},
};

use super::{Esp32ConfigPatch, Esp8266ConfigPatch};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("alarm_override must be one of auto|on|off")]
    InvalidAlarmOverride,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operator-side configuration records. Only records intent; the boards
/// read it and act on their own.
#[derive(Clone)]
pub struct ControlService {
    store: DeviceStore,
}

impl ControlService {
    pub fn new(store: DeviceStore) -> Self {
        Self { store }
    }

    pub async fn esp32_config(&self) -> Result<Esp32Config, StoreError> {
        self.store.read().await
    }

    pub async fn esp8266_config(&self) -> Result<Esp8266Config, StoreError> {
        self.store.read().await
    }

    /// Validate and merge an esp32 patch; returns the full resulting config.
    pub async fn patch_esp32(&self, payload: &Payload) -> Result<Esp32Config, ConfigError> {
        let patch = Esp32ConfigPatch::from_payload(payload);
        let config = self
            .store
            .merge(move |c: &mut Esp32Config| patch.apply(c))
            .await?;

        info!(
            device = %DeviceClass::Esp32,
            water_threshold = config.water_threshold,
            motion_light_time = config.motion_light_time,
            pump_override = config.pump_override.as_str(),
            light_override = config.light_override.as_str(),
            "Config updated"
        );
        Ok(config)
    }

    /// Validate and merge an esp8266 patch. An invalid enum value rejects the
    /// request before the store is touched.
    pub async fn patch_esp8266(&self, payload: &Payload) -> Result<Esp8266Config, ConfigError> {
        let patch = Esp8266ConfigPatch::from_payload(payload).inspect_err(|e| {
            warn!(device = %DeviceClass::Esp8266, error = %e, "Config patch rejected");
        })?;
        let config = self
            .store
            .merge(move |c: &mut Esp8266Config| patch.apply(c))
            .await?;

        info!(
            device = %DeviceClass::Esp8266,
            alarm_override = config.alarm_override.as_str(),
            "Config updated"
        );
        Ok(config)
    }
}
