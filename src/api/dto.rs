use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{
    devices::models::Esp8266Snapshot,
    sensors::{LatestReading, Payload},
};

/// Acknowledgement for an accepted reading.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestAck {
    pub success: bool,
    pub message: String,
}

impl IngestAck {
    pub fn received() -> Self {
        Self {
            success: true,
            message: "Data received".to_owned(),
        }
    }
}

/// `GET /esp32/data`: the latest reading, or an acknowledgement when the
/// query carried `ingest=1`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Esp32DataResponse {
    Reading(LatestReading),
    Ack(IngestAck),
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Esp8266DataResponse {
    Reading(Esp8266Snapshot),
    Ack(IngestAck),
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    pub message: String,
}

/// Query string for `GET /esp32/data`. With `ingest=1` the remaining
/// parameters are stored as a reading; otherwise they are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Esp32IngestQuery {
    pub ingest: Option<String>,
    pub water_level: Option<String>,
    pub motion: Option<String>,
    pub pump_state: Option<String>,
    pub light_state: Option<String>,
}

/// Query string for `GET /esp8266/data`, same rules as the esp32 variant.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Esp8266IngestQuery {
    pub ingest: Option<String>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub motion: Option<String>,
    pub smoke: Option<String>,
    pub alarm_state: Option<String>,
}

/// Only `ingest=1` turns a GET into a write.
fn is_ingest(flag: &Option<String>) -> bool {
    flag.as_deref() == Some("1")
}

/// Present parameters become string fields; coercion happens downstream
/// exactly as for a JSON body.
fn to_payload<const N: usize>(fields: [(&str, Option<String>); N]) -> Payload {
    fields
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_owned(), Value::String(v))))
        .collect()
}

impl Esp32IngestQuery {
    pub fn is_ingest(&self) -> bool {
        is_ingest(&self.ingest)
    }

    pub fn into_payload(self) -> Payload {
        to_payload([
            ("water_level", self.water_level),
            ("motion", self.motion),
            ("pump_state", self.pump_state),
            ("light_state", self.light_state),
        ])
    }
}

impl Esp8266IngestQuery {
    pub fn is_ingest(&self) -> bool {
        is_ingest(&self.ingest)
    }

    pub fn into_payload(self) -> Payload {
        to_payload([
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("motion", self.motion),
            ("smoke", self.smoke),
            ("alarm_state", self.alarm_state),
        ])
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProxyParams {
    /// Board endpoint under `/api/`. Defaults to `status`.
    pub endpoint: Option<String>,
}
