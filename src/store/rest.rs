use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::KvBackend;

// ---------------------------------------------------------------------------
// Response envelope
//
// Redis-over-REST services answer every command with the same object:
//
// Success: { "result": <T> }        (`null` for a missing key on GET)
// Failure: { "error": "<message>" }
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct KvResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

impl<T> KvResponse<T> {
    fn into_result(self) -> Result<Option<T>> {
        match self.error {
            Some(msg) => Err(anyhow!("key-value API error: {msg}")),
            None => Ok(self.result),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Durable backend speaking the Redis REST protocol:
/// `GET {url}/get/{key}` and `POST {url}/set/{key}` (raw value as body),
/// authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct RestKvBackend {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: String,
    token: String,
}

impl RestKvBackend {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: Client::new(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                token: token.to_owned(),
            }),
        }
    }

    fn url(&self, command: &str, key: &str) -> String {
        format!("{}/{}/{}", self.inner.base_url, command, key)
    }
}

#[async_trait]
impl KvBackend for RestKvBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = self.url("get", key);
        debug!(key = %key, url = %url, "KV GET");

        let resp = self
            .inner
            .http
            .get(&url)
            .bearer_auth(&self.inner.token)
            .send()
            .await
            .with_context(|| format!("KV GET {key} request failed"))?
            .error_for_status()
            .with_context(|| format!("KV GET {key} returned error status"))?
            .json::<KvResponse<String>>()
            .await
            .with_context(|| format!("failed to deserialize KV GET {key} response"))?;

        resp.into_result()
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let url = self.url("set", key);
        debug!(key = %key, bytes = value.len(), "KV SET");

        self.inner
            .http
            .post(&url)
            .bearer_auth(&self.inner.token)
            .body(value)
            .send()
            .await
            .with_context(|| format!("KV SET {key} request failed"))?
            .error_for_status()
            .with_context(|| format!("KV SET {key} returned error status"))?
            .json::<KvResponse<String>>()
            .await
            .with_context(|| format!("failed to deserialize KV SET {key} response"))?
            .into_result()
            .with_context(|| format!("KV SET {key} was rejected"))?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::{net::TcpListener, sync::RwLock};

    use super::*;

    pub(crate) const TOKEN: &str = "test-token";

    type Db = Arc<RwLock<HashMap<String, String>>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn kv_get(
        State(db): State<Db>,
        headers: HeaderMap,
        Path(key): Path<String>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
        }
        let value = db.read().await.get(&key).cloned();
        (StatusCode::OK, Json(json!({ "result": value })))
    }

    async fn kv_set(
        State(db): State<Db>,
        headers: HeaderMap,
        Path(key): Path<String>,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
        }
        db.write().await.insert(key, body);
        (StatusCode::OK, Json(json!({ "result": "OK" })))
    }

    /// Start a fake Redis REST service on an ephemeral port and return its base URL.
    pub(crate) async fn spawn_fake_kv() -> String {
        let db: Db = Arc::default();
        let app = Router::new()
            .route("/get/{key}", get(kv_get))
            .route("/set/{key}", post(kv_set))
            .with_state(db);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let kv = RestKvBackend::new(&spawn_fake_kv().await, TOKEN);
        assert!(kv.get("esp32:latest").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let kv = RestKvBackend::new(&spawn_fake_kv().await, TOKEN);
        kv.set("esp32:latest", r#"{"water_level":40.0}"#.to_owned())
            .await
            .unwrap();
        assert_eq!(
            kv.get("esp32:latest").await.unwrap().as_deref(),
            Some(r#"{"water_level":40.0}"#)
        );
    }

    #[tokio::test]
    async fn bad_token_is_an_error() {
        let kv = RestKvBackend::new(&spawn_fake_kv().await, "wrong");
        let err = kv.get("esp32:latest").await.unwrap_err();
        assert!(err.to_string().contains("error status"));
    }

    #[test]
    fn envelope_error_maps_to_err() {
        let resp: KvResponse<String> =
            serde_json::from_value(json!({ "error": "WRONGTYPE" })).unwrap();
        let err = resp.into_result().unwrap_err();
        assert!(err.to_string().contains("WRONGTYPE"));
    }
}
