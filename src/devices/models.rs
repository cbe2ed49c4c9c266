use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

use super::{Record, RecordKey, Snapshot};

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Latest reading from the water tank node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Esp32Snapshot {
    /// Tank fill level, nominally 0-100 %. Not clamped.
    #[serde(serialize_with = "whole_as_integer")]
    pub water_level: f64,
    /// Raw PIR value as reported by the board ("0" / "1").
    pub motion: String,
    /// 0 = off, 1 = on
    pub pump_state: u8,
    /// 0 = off, 1 = on
    pub light_state: u8,
    /// Epoch milliseconds of the update that produced this value.
    pub last_updated: i64,
}

impl Default for Esp32Snapshot {
    fn default() -> Self {
        Self {
            water_level: 0.0,
            motion: "0".to_owned(),
            pump_state: 0,
            light_state: 0,
            last_updated: 0,
        }
    }
}

impl Record for Esp32Snapshot {
    const KEY: RecordKey = RecordKey::ESP32_LATEST;
}

impl Snapshot for Esp32Snapshot {
    fn last_updated(&self) -> i64 {
        self.last_updated
    }

    fn set_last_updated(&mut self, at_ms: i64) {
        self.last_updated = at_ms;
    }
}

/// Latest reading from the environment node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Esp8266Snapshot {
    /// Degrees Celsius
    #[serde(serialize_with = "whole_as_integer")]
    pub temperature: f64,
    /// Relative humidity percentage
    #[serde(serialize_with = "whole_as_integer")]
    pub humidity: f64,
    pub motion: u8,
    pub smoke: u8,
    pub alarm_state: u8,
    pub last_updated: i64,
}

impl Record for Esp8266Snapshot {
    const KEY: RecordKey = RecordKey::ESP8266_LATEST;
}

impl Snapshot for Esp8266Snapshot {
    fn last_updated(&self) -> i64 {
        self.last_updated
    }

    fn set_last_updated(&mut self, at_ms: i64) {
        self.last_updated = at_ms;
    }
}

/// Readings without a fractional part go out as JSON integers (`15`, not
/// `15.0`), the way the boards and the dashboard expect them.
fn whole_as_integer<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    // Largest magnitude below which every integer is exact in an f64.
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() <= EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

// ---------------------------------------------------------------------------
// Device configuration
// ---------------------------------------------------------------------------

/// Operator override for an actuator. `Auto` leaves the decision to the
/// board's own control logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    #[default]
    Auto,
    On,
    Off,
}

impl OverrideMode {
    /// Accepts exactly the JSON strings `"auto"`, `"on"` and `"off"`.
    pub fn from_literal(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "auto" => Some(Self::Auto),
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OverrideMode::Auto => "auto",
            OverrideMode::On => "on",
            OverrideMode::Off => "off",
        }
    }
}

pub const WATER_THRESHOLD_DEFAULT: i64 = 20;
pub const WATER_THRESHOLD_RANGE: (i64, i64) = (0, 100);
pub const MOTION_LIGHT_TIME_DEFAULT: i64 = 5_000;
pub const MOTION_LIGHT_TIME_RANGE: (i64, i64) = (100, 600_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Esp32Config {
    /// Level (%) under which the board starts the pump. 0-100.
    pub water_threshold: i64,
    /// How long the light stays on after motion, in ms. 100-600000.
    pub motion_light_time: i64,
    pub pump_override: OverrideMode,
    pub light_override: OverrideMode,
}

impl Default for Esp32Config {
    fn default() -> Self {
        Self {
            water_threshold: WATER_THRESHOLD_DEFAULT,
            motion_light_time: MOTION_LIGHT_TIME_DEFAULT,
            pump_override: OverrideMode::Auto,
            light_override: OverrideMode::Auto,
        }
    }
}

impl Record for Esp32Config {
    const KEY: RecordKey = RecordKey::ESP32_CONFIG;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Esp8266Config {
    pub alarm_override: OverrideMode,
}

impl Record for Esp8266Config {
    const KEY: RecordKey = RecordKey::ESP8266_CONFIG;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn whole_readings_serialize_without_fraction() {
        let esp32 = Esp32Snapshot {
            water_level: 15.0,
            ..Default::default()
        };
        let text = serde_json::to_string(&esp32).unwrap();
        assert!(text.starts_with(r#"{"water_level":15,"#), "{text}");

        let esp8266 = Esp8266Snapshot {
            temperature: 21.5,
            humidity: 48.0,
            ..Default::default()
        };
        let value = serde_json::to_value(&esp8266).unwrap();
        assert_eq!(value["temperature"], json!(21.5));
        assert!(value["humidity"].is_i64());

        let back: Esp8266Snapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, esp8266);
    }

    #[test]
    fn override_mode_accepts_only_exact_literals() {
        assert_eq!(OverrideMode::from_literal(&json!("on")), Some(OverrideMode::On));
        assert_eq!(OverrideMode::from_literal(&json!("auto")), Some(OverrideMode::Auto));
        assert_eq!(OverrideMode::from_literal(&json!("ON")), None);
        assert_eq!(OverrideMode::from_literal(&json!(" off")), None);
        assert_eq!(OverrideMode::from_literal(&json!(1)), None);
        assert_eq!(OverrideMode::from_literal(&Value::Null), None);
    }

    #[test]
    fn esp32_defaults_are_zeroed() {
        let s = Esp32Snapshot::default();
        assert_eq!(s.water_level, 0.0);
        assert_eq!(s.motion, "0");
        assert_eq!(s.pump_state, 0);
        assert_eq!(s.light_state, 0);
    }

    #[test]
    fn config_defaults() {
        let c = Esp32Config::default();
        assert_eq!(c.water_threshold, 20);
        assert_eq!(c.motion_light_time, 5000);
        assert_eq!(c.pump_override, OverrideMode::Auto);
        assert_eq!(Esp8266Config::default().alarm_override, OverrideMode::Auto);
    }

    #[test]
    fn partial_stored_record_fills_missing_fields_with_defaults() {
        let c: Esp32Config = serde_json::from_value(json!({ "water_threshold": 55 })).unwrap();
        assert_eq!(c.water_threshold, 55);
        assert_eq!(c.motion_light_time, 5000);
    }

    #[test]
    fn override_serializes_lowercase() {
        let v = serde_json::to_value(Esp8266Config { alarm_override: OverrideMode::Off }).unwrap();
        assert_eq!(v, json!({ "alarm_override": "off" }));
    }
}
