use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Operator command relayed to the esp8266 siren.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlarmAction {
    AlarmOn,
    AlarmOff,
}

impl AlarmAction {
    /// Accepts exactly `"alarm_on"` or `"alarm_off"`.
    pub fn from_literal(value: &serde_json::Value) -> Option<Self> {
        match value.as_str()? {
            "alarm_on" => Some(Self::AlarmOn),
            "alarm_off" => Some(Self::AlarmOff),
            _ => None,
        }
    }

    /// Last path segment of the board's `/api/alarm/{on|off}` route.
    pub fn board_path(self) -> &'static str {
        match self {
            AlarmAction::AlarmOn => "on",
            AlarmAction::AlarmOff => "off",
        }
    }

    /// `alarm_state` the board reports once the action has been applied.
    pub fn alarm_state(self) -> u8 {
        match self {
            AlarmAction::AlarmOn => 1,
            AlarmAction::AlarmOff => 0,
        }
    }
}

/// Request body for `POST /esp8266/proxy`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AlarmRequest {
    /// `alarm_on` or `alarm_off`
    pub action: String,
}

/// Response for a relayed alarm command.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlarmResponse {
    pub success: bool,
    pub action: AlarmAction,
}
