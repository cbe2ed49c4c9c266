use serde_json::{Map, Value};

use crate::devices::{
    coerce,
    models::{Esp32Snapshot, Esp8266Snapshot},
};

/// Raw ingest payload: a JSON object body, or the query string turned into one.
pub type Payload = Map<String, Value>;

// ---------------------------------------------------------------------------
// esp32
// ---------------------------------------------------------------------------

/// Coerced esp32 fields. `None` means the field was not in the payload and
/// the stored value is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Esp32Update {
    pub water_level: Option<f64>,
    pub motion: Option<String>,
    pub pump_state: Option<u8>,
    pub light_state: Option<u8>,
}

impl Esp32Update {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            water_level: payload.get("water_level").map(coerce::reading),
            motion: payload.get("motion").map(coerce::text),
            pump_state: payload.get("pump_state").map(coerce::strict_flag),
            light_state: payload.get("light_state").map(coerce::strict_flag),
        }
    }

    pub fn apply(self, snapshot: &mut Esp32Snapshot) {
        if let Some(v) = self.water_level {
            snapshot.water_level = v;
        }
        if let Some(v) = self.motion {
            snapshot.motion = v;
        }
        if let Some(v) = self.pump_state {
            snapshot.pump_state = v;
        }
        if let Some(v) = self.light_state {
            snapshot.light_state = v;
        }
    }
}

// ---------------------------------------------------------------------------
// esp8266
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Esp8266Update {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub motion: Option<u8>,
    pub smoke: Option<u8>,
    pub alarm_state: Option<u8>,
}

impl Esp8266Update {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            temperature: payload.get("temperature").map(coerce::reading),
            humidity: payload.get("humidity").map(coerce::reading),
            motion: payload.get("motion").map(coerce::truthy_flag),
            smoke: payload.get("smoke").map(coerce::truthy_flag),
            alarm_state: payload.get("alarm_state").map(coerce::truthy_flag),
        }
    }

    pub fn apply(self, snapshot: &mut Esp8266Snapshot) {
        if let Some(v) = self.temperature {
            snapshot.temperature = v;
        }
        if let Some(v) = self.humidity {
            snapshot.humidity = v;
        }
        if let Some(v) = self.motion {
            snapshot.motion = v;
        }
        if let Some(v) = self.smoke {
            snapshot.smoke = v;
        }
        if let Some(v) = self.alarm_state {
            snapshot.alarm_state = v;
        }
    }
}
