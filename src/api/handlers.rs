use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde_json::Value;
use tracing::{error, warn};
use utoipa::OpenApi;

use super::{
    dto::{
        ErrorBody, Esp32DataResponse, Esp32IngestQuery, Esp8266DataResponse, Esp8266IngestQuery,
        IngestAck, ProxyParams,
    },
    errors::AppError,
    AppState,
};
use crate::{
    board::{
        models::{AlarmRequest, AlarmResponse},
        AlarmAction, BoardError,
    },
    devices::models::{Esp32Config, Esp32Snapshot, Esp8266Config, Esp8266Snapshot, OverrideMode},
    sensors::{LatestReading, Payload},
};

// ---------------------------------------------------------------------------
// Body parsing
// ---------------------------------------------------------------------------

/// Parse a request body as a JSON object regardless of `Content-Type`;
/// boards rarely set it.
fn parse_object(body: &[u8], message: &str) -> Result<Payload, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => {
            warn!(bytes = body.len(), "{message}");
            Err(AppError::BadRequest(message.to_owned()))
        }
    }
}

// ---------------------------------------------------------------------------
// esp32
// ---------------------------------------------------------------------------

/// Latest esp32 snapshot, or a query-string ingest when `ingest=1`.
///
/// When demo data is enabled and the stored snapshot is missing or older
/// than the staleness threshold, a generated reading marked
/// `"synthetic": true` is returned instead (and not stored).
#[utoipa::path(
    get,
    path = "/esp32/data",
    params(Esp32IngestQuery),
    responses(
        (status = 200, description = "Latest snapshot, or an ingest acknowledgement with ingest=1", body = Esp32DataResponse),
        (status = 400, description = "Malformed query string", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp32"
)]
pub async fn get_esp32_data(
    State(state): State<AppState>,
    query: Result<Query<Esp32IngestQuery>, QueryRejection>,
) -> Result<Json<Esp32DataResponse>, AppError> {
    let Query(query) = query?;
    if query.is_ingest() {
        state.sensors.ingest_esp32(&query.into_payload()).await?;
        return Ok(Json(Esp32DataResponse::Ack(IngestAck::received())));
    }
    Ok(Json(Esp32DataResponse::Reading(state.sensors.latest_esp32().await?)))
}

/// Ingest an esp32 reading. Fields not in the body keep their stored value.
#[utoipa::path(
    post,
    path = "/esp32/data",
    request_body(content = Esp32Snapshot, description = "Partial reading; any subset of water_level, motion, pump_state, light_state"),
    responses(
        (status = 200, description = "Reading stored", body = IngestAck),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp32"
)]
pub async fn post_esp32_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestAck>, AppError> {
    let payload = parse_object(&body, "Invalid JSON")?;
    state.sensors.ingest_esp32(&payload).await?;
    Ok(Json(IngestAck::received()))
}

#[utoipa::path(
    get,
    path = "/esp32/config",
    responses(
        (status = 200, description = "Current esp32 config", body = Esp32Config),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp32"
)]
pub async fn get_esp32_config(State(state): State<AppState>) -> Result<Json<Esp32Config>, AppError> {
    Ok(Json(state.control.esp32_config().await?))
}

/// Patch the esp32 config. Numbers are clamped into range; an unknown
/// override value is ignored and the stored one kept.
#[utoipa::path(
    post,
    path = "/esp32/config",
    request_body(content = Esp32Config, description = "Any subset of the config fields"),
    responses(
        (status = 200, description = "Resulting config", body = Esp32Config),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp32"
)]
pub async fn post_esp32_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Esp32Config>, AppError> {
    let payload = parse_object(&body, "Invalid config payload")?;
    Ok(Json(state.control.patch_esp32(&payload).await?))
}

// ---------------------------------------------------------------------------
// esp8266
// ---------------------------------------------------------------------------

/// Latest esp8266 snapshot, or a query-string ingest when `ingest=1`.
#[utoipa::path(
    get,
    path = "/esp8266/data",
    params(Esp8266IngestQuery),
    responses(
        (status = 200, description = "Latest snapshot, or an ingest acknowledgement with ingest=1", body = Esp8266DataResponse),
        (status = 400, description = "Malformed query string", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp8266"
)]
pub async fn get_esp8266_data(
    State(state): State<AppState>,
    query: Result<Query<Esp8266IngestQuery>, QueryRejection>,
) -> Result<Json<Esp8266DataResponse>, AppError> {
    let Query(query) = query?;
    if query.is_ingest() {
        state.sensors.ingest_esp8266(&query.into_payload()).await?;
        return Ok(Json(Esp8266DataResponse::Ack(IngestAck::received())));
    }
    Ok(Json(Esp8266DataResponse::Reading(state.sensors.latest_esp8266().await?)))
}

#[utoipa::path(
    post,
    path = "/esp8266/data",
    request_body(content = Esp8266Snapshot, description = "Partial reading; any subset of temperature, humidity, motion, smoke, alarm_state"),
    responses(
        (status = 200, description = "Reading stored", body = IngestAck),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp8266"
)]
pub async fn post_esp8266_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestAck>, AppError> {
    let payload = parse_object(&body, "Invalid JSON")?;
    state.sensors.ingest_esp8266(&payload).await?;
    Ok(Json(IngestAck::received()))
}

#[utoipa::path(
    get,
    path = "/esp8266/config",
    responses(
        (status = 200, description = "Current esp8266 config", body = Esp8266Config),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp8266"
)]
pub async fn get_esp8266_config(
    State(state): State<AppState>,
) -> Result<Json<Esp8266Config>, AppError> {
    Ok(Json(state.control.esp8266_config().await?))
}

/// Patch the esp8266 config. An invalid `alarm_override` rejects the whole
/// request and nothing is stored.
#[utoipa::path(
    post,
    path = "/esp8266/config",
    request_body(content = Esp8266Config, description = "Any subset of the config fields"),
    responses(
        (status = 200, description = "Resulting config", body = Esp8266Config),
        (status = 400, description = "Malformed JSON or invalid alarm_override", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody),
    ),
    tag = "esp8266"
)]
pub async fn post_esp8266_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Esp8266Config>, AppError> {
    let payload = parse_object(&body, "Invalid JSON")?;
    Ok(Json(state.control.patch_esp8266(&payload).await?))
}

// ---------------------------------------------------------------------------
// esp8266 board proxy
// ---------------------------------------------------------------------------

/// Relay a status query to the board (`{base}/api/{endpoint}`).
#[utoipa::path(
    get,
    path = "/esp8266/proxy",
    params(ProxyParams),
    responses(
        (status = 200, description = "Board response, passed through"),
        (status = 400, description = "Invalid endpoint name or malformed query string", body = ErrorBody),
        (status = 500, description = "ESP8266_BASE_URL not configured", body = ErrorBody),
        (status = 502, description = "Board unreachable or returned an error", body = ErrorBody),
    ),
    tag = "esp8266"
)]
pub async fn get_proxy(
    State(state): State<AppState>,
    params: Result<Query<ProxyParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let endpoint = params.endpoint.unwrap_or_default();
    state.board.status(&endpoint).await.map(Json).map_err(|e| {
        error!(error = %e, endpoint = %endpoint, "ESP8266 proxy GET failed");
        match e {
            BoardError::NotConfigured => AppError::Internal(e.to_string()),
            BoardError::InvalidEndpoint(_) => AppError::BadRequest(e.to_string()),
            _ => AppError::BadGateway("Failed to reach ESP8266 board".to_owned()),
        }
    })
}

/// Relay an alarm toggle to the board (`{base}/api/alarm/{on|off}`).
#[utoipa::path(
    post,
    path = "/esp8266/proxy",
    request_body = AlarmRequest,
    responses(
        (status = 200, description = "Board accepted the command", body = AlarmResponse),
        (status = 400, description = "Malformed JSON or invalid action", body = ErrorBody),
        (status = 500, description = "Board unreachable, returned an error, or not configured", body = ErrorBody),
    ),
    tag = "esp8266"
)]
pub async fn post_proxy(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AlarmResponse>, AppError> {
    let payload = parse_object(&body, "Invalid JSON")?;
    let action = payload
        .get("action")
        .and_then(AlarmAction::from_literal)
        .ok_or_else(|| {
            warn!(action = ?payload.get("action"), "Invalid alarm action");
            AppError::BadRequest("Invalid action".to_owned())
        })?;

    state.board.set_alarm(action).await.map_err(|e| {
        error!(error = %e, action = ?action, "ESP8266 proxy POST failed");
        match e {
            BoardError::NotConfigured => AppError::Internal(e.to_string()),
            _ => AppError::Internal("Failed to toggle alarm".to_owned()),
        }
    })?;

    Ok(Json(AlarmResponse {
        success: true,
        action,
    }))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_esp32_data, post_esp32_data, get_esp32_config, post_esp32_config,
        get_esp8266_data, post_esp8266_data, get_esp8266_config, post_esp8266_config,
        get_proxy, post_proxy, health
    ),
    components(schemas(
        Esp32Snapshot, Esp8266Snapshot, Esp32Config, Esp8266Config, OverrideMode,
        LatestReading, Esp32DataResponse, Esp8266DataResponse,
        IngestAck, ErrorBody, AlarmRequest, AlarmResponse, AlarmAction
    )),
    tags(
        (name = "esp32",   description = "Water tank node: readings and config"),
        (name = "esp8266", description = "Environment node: readings, config and board proxy"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Village Telemetry API",
        version = "0.1.0",
        description = "Latest sensor state and device configuration for the village dashboard"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
