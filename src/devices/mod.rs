pub mod coerce;
pub mod models;

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

// ---------------------------------------------------------------------------
// Device classes and record keys
// ---------------------------------------------------------------------------

/// The two microcontroller classes that report to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Water tank node: level sensor, PIR, pump and light relays.
    Esp32,
    /// Environment node: DHT, PIR, smoke sensor and alarm siren.
    Esp8266,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Esp32 => "esp32",
            DeviceClass::Esp8266 => "esp8266",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Latest,
    Config,
}

/// Identifies one stored record, rendered as `<class>:<kind>`
/// (e.g. `esp32:latest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub class: DeviceClass,
    pub kind: RecordKind,
}

impl RecordKey {
    pub const ESP32_LATEST: RecordKey = RecordKey::new(DeviceClass::Esp32, RecordKind::Latest);
    pub const ESP32_CONFIG: RecordKey = RecordKey::new(DeviceClass::Esp32, RecordKind::Config);
    pub const ESP8266_LATEST: RecordKey = RecordKey::new(DeviceClass::Esp8266, RecordKind::Latest);
    pub const ESP8266_CONFIG: RecordKey = RecordKey::new(DeviceClass::Esp8266, RecordKind::Config);

    pub const fn new(class: DeviceClass, kind: RecordKind) -> Self {
        Self { class, kind }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            RecordKind::Latest => "latest",
            RecordKind::Config => "config",
        };
        write!(f, "{}:{}", self.class, kind)
    }
}

// ---------------------------------------------------------------------------
// Record traits
// ---------------------------------------------------------------------------

/// A value that can live under a `RecordKey`. `Default` is what readers see
/// before anything has been written.
pub trait Record: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const KEY: RecordKey;
}

/// Sensor snapshots carry the time (epoch ms) of the update that produced them.
pub trait Snapshot: Record {
    fn last_updated(&self) -> i64;
    fn set_last_updated(&mut self, at_ms: i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_render_as_class_colon_kind() {
        assert_eq!(RecordKey::ESP32_LATEST.to_string(), "esp32:latest");
        assert_eq!(RecordKey::ESP32_CONFIG.to_string(), "esp32:config");
        assert_eq!(RecordKey::ESP8266_LATEST.to_string(), "esp8266:latest");
        assert_eq!(RecordKey::ESP8266_CONFIG.to_string(), "esp8266:config");
    }
}
