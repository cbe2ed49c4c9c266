use serde::Serialize;
use serde_json::Value;

use crate::{
    devices::{
        coerce,
        models::{
            Esp32Config, Esp8266Config, OverrideMode, MOTION_LIGHT_TIME_DEFAULT,
            MOTION_LIGHT_TIME_RANGE, WATER_THRESHOLD_DEFAULT, WATER_THRESHOLD_RANGE,
        },
    },
    sensors::Payload,
};

use super::ConfigError;

/// Validated esp32 config changes. `None` keeps the stored value.
///
/// | Field               | Invalid input                     |
/// |---------------------|-----------------------------------|
/// | `water_threshold`   | unparsable → 20, then clamp 0-100 |
/// | `motion_light_time` | unparsable → 5000, then clamp 100-600000 |
/// | `pump_override`     | ignored, stored value kept        |
/// | `light_override`    | ignored, stored value kept        |
///
/// Serializes to the request body a client sends, omitting unset fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Esp32ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion_light_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pump_override: Option<OverrideMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_override: Option<OverrideMode>,
}

impl Esp32ConfigPatch {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            water_threshold: payload
                .get("water_threshold")
                .map(|v| clamped_integer(v, WATER_THRESHOLD_DEFAULT, WATER_THRESHOLD_RANGE)),
            motion_light_time: payload
                .get("motion_light_time")
                .map(|v| clamped_integer(v, MOTION_LIGHT_TIME_DEFAULT, MOTION_LIGHT_TIME_RANGE)),
            pump_override: payload.get("pump_override").and_then(OverrideMode::from_literal),
            light_override: payload.get("light_override").and_then(OverrideMode::from_literal),
        }
    }

    pub fn apply(self, config: &mut Esp32Config) {
        if let Some(v) = self.water_threshold {
            config.water_threshold = v;
        }
        if let Some(v) = self.motion_light_time {
            config.motion_light_time = v;
        }
        if let Some(v) = self.pump_override {
            config.pump_override = v;
        }
        if let Some(v) = self.light_override {
            config.light_override = v;
        }
    }
}

/// Validated esp8266 config changes. An `alarm_override` that is present but
/// not `auto`/`on`/`off` rejects the whole patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Esp8266ConfigPatch {
    pub alarm_override: Option<OverrideMode>,
}

impl Esp8266ConfigPatch {
    pub fn from_payload(payload: &Payload) -> Result<Self, ConfigError> {
        let alarm_override = match payload.get("alarm_override") {
            None => None,
            Some(v) => Some(OverrideMode::from_literal(v).ok_or(ConfigError::InvalidAlarmOverride)?),
        };
        Ok(Self { alarm_override })
    }

    pub fn apply(self, config: &mut Esp8266Config) {
        if let Some(v) = self.alarm_override {
            config.alarm_override = v;
        }
    }
}

/// Parse `value` as a number (blank and null count as unparsable, a real 0
/// does not), fall back to `default`, round, and clamp into `range`.
fn clamped_integer(value: &Value, default: i64, (min, max): (i64, i64)) -> i64 {
    let parsed = match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => coerce::to_number(other),
    };
    // Float-to-int casts saturate, so huge inputs land on the clamp bounds.
    parsed
        .map(|f| f.round() as i64)
        .unwrap_or(default)
        .clamp(min, max)
}
