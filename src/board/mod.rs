pub mod models;

use std::sync::Arc;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use self::models::AlarmAction;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("ESP8266_BASE_URL env var is not configured.")]
    NotConfigured,
    #[error("invalid endpoint name: {0:?}")]
    InvalidEndpoint(String),
    #[error("ESP8266 request failed: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("ESP8266 responded with {0}")]
    Status(StatusCode),
    #[error("ESP8266 returned an unreadable body: {0}")]
    InvalidBody(#[source] reqwest::Error),
}

/// Relay to the esp8266 board's own HTTP API.
///
/// One best-effort round trip per call: no retries, and no timeout beyond
/// the transport default.
#[derive(Debug, Clone)]
pub struct BoardClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    /// Without trailing `/`. `None` until configured.
    base_url: Option<String>,
}

impl BoardClient {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: Client::new(),
                base_url,
            }),
        }
    }

    fn base_url(&self) -> Result<&str, BoardError> {
        self.inner.base_url.as_deref().ok_or(BoardError::NotConfigured)
    }

    /// `GET {base}/api/{endpoint}`, returning the board's JSON untouched.
    pub async fn status(&self, endpoint: &str) -> Result<Value, BoardError> {
        let url = status_url(self.base_url()?, endpoint)?;
        debug!(url = %url, "Relaying status query to ESP8266");

        self.inner
            .http
            .get(url)
            .send()
            .await
            .map_err(BoardError::Unreachable)?
            .error_for_status()
            .map_err(|e| BoardError::Status(e.status().unwrap_or(StatusCode::BAD_GATEWAY)))?
            .json::<Value>()
            .await
            .map_err(BoardError::InvalidBody)
    }

    /// `GET {base}/api/alarm/{on|off}`. The response body is ignored.
    pub async fn set_alarm(&self, action: AlarmAction) -> Result<(), BoardError> {
        let url = format!("{}/api/alarm/{}", self.base_url()?, action.board_path());
        debug!(url = %url, action = ?action, "Relaying alarm command to ESP8266");

        self.inner
            .http
            .get(&url)
            .send()
            .await
            .map_err(BoardError::Unreachable)?
            .error_for_status()
            .map_err(|e| BoardError::Status(e.status().unwrap_or(StatusCode::BAD_GATEWAY)))?;
        Ok(())
    }
}

/// Normalise a relayed endpoint name: blank means `status`, leading `/` is
/// dropped, and anything that could escape `/api/` is refused. Percent
/// escapes are refused outright since `%2e%2e` normalises to `..`.
fn validate_endpoint(raw: &str) -> Result<&str, BoardError> {
    let endpoint = raw.trim().trim_start_matches('/');
    if endpoint.is_empty() {
        return Ok("status");
    }
    let forbidden = endpoint.contains("..")
        || endpoint
            .chars()
            .any(|c| matches!(c, '?' | '#' | '\\' | '%') || c.is_whitespace() || c.is_control());
    if forbidden {
        return Err(BoardError::InvalidEndpoint(raw.to_owned()));
    }
    Ok(endpoint)
}

/// `{base}/api/{endpoint}`, checked after URL normalisation to still sit
/// under the base URL's `/api/`.
fn status_url(base_url: &str, raw: &str) -> Result<Url, BoardError> {
    let endpoint = validate_endpoint(raw)?;
    let invalid = || BoardError::InvalidEndpoint(raw.to_owned());
    let root = Url::parse(&format!("{base_url}/api/")).map_err(|_| invalid())?;
    let url = Url::parse(&format!("{base_url}/api/{endpoint}")).map_err(|_| invalid())?;
    if url.origin() != root.origin() || !url.path().starts_with(root.path()) {
        return Err(invalid());
    }
    Ok(url)
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    /// Fake board: `/api/status` and `/api/alarm/{on,off}` succeed,
    /// `/api/broken` answers 500.
    pub(crate) async fn spawn_fake_board() -> String {
        let app = Router::new()
            .route(
                "/api/status",
                get(|| async {
                    Json(json!({
                        "temperature": 23.5,
                        "humidity": 41,
                        "motion": 0,
                        "smoke": 0,
                        "alarm_state": 1
                    }))
                }),
            )
            .route("/api/alarm/on", get(|| async { Json(json!({ "alarm": "on" })) }))
            .route("/api/alarm/off", get(|| async { Json(json!({ "alarm": "off" })) }))
            .route("/api/broken", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// An address nothing listens on.
    pub(crate) async fn dead_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn status_passes_remote_json_through() {
        let board = BoardClient::new(Some(spawn_fake_board().await));
        let body = board.status("status").await.unwrap();
        assert_eq!(body["temperature"], 23.5);
        assert_eq!(body["alarm_state"], 1);
    }

    #[tokio::test]
    async fn alarm_commands_reach_the_board() {
        let board = BoardClient::new(Some(spawn_fake_board().await));
        board.set_alarm(AlarmAction::AlarmOn).await.unwrap();
        board.set_alarm(AlarmAction::AlarmOff).await.unwrap();
    }

    #[tokio::test]
    async fn missing_base_url_is_reported_per_call() {
        let board = BoardClient::new(None);
        assert!(matches!(board.status("status").await, Err(BoardError::NotConfigured)));
        assert!(matches!(
            board.set_alarm(AlarmAction::AlarmOn).await,
            Err(BoardError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn remote_error_status_is_surfaced() {
        let board = BoardClient::new(Some(spawn_fake_board().await));
        let err = board.status("broken").await.unwrap_err();
        assert!(matches!(err, BoardError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn unreachable_board_is_surfaced() {
        let board = BoardClient::new(Some(dead_address().await));
        let err = board.set_alarm(AlarmAction::AlarmOff).await.unwrap_err();
        assert!(matches!(err, BoardError::Unreachable(_)));
    }

    #[test]
    fn endpoint_validation() {
        assert_eq!(validate_endpoint("").unwrap(), "status");
        assert_eq!(validate_endpoint("/sensors").unwrap(), "sensors");
        assert_eq!(validate_endpoint("alarm/state").unwrap(), "alarm/state");
        assert!(validate_endpoint("../admin").is_err());
        assert!(validate_endpoint("status?x=1").is_err());
        assert!(validate_endpoint("a b").is_err());
        assert!(validate_endpoint("%2e%2e/admin").is_err());
        assert!(validate_endpoint("%2E%2E/admin").is_err());
        assert!(validate_endpoint(".%2e/admin").is_err());
    }

    #[test]
    fn status_url_stays_under_api() {
        let url = status_url("http://board.local", "/sensors").unwrap();
        assert_eq!(url.as_str(), "http://board.local/api/sensors");
        let url = status_url("http://board.local/esp", "").unwrap();
        assert_eq!(url.as_str(), "http://board.local/esp/api/status");

        for escape in ["%2e%2e/admin", "../admin", "a/../../admin"] {
            assert!(
                matches!(status_url("http://board.local", escape), Err(BoardError::InvalidEndpoint(_))),
                "{escape}"
            );
        }
    }
}
