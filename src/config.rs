use std::str::FromStr;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// StoreBackend
// ---------------------------------------------------------------------------

/// Where device records live.
///
/// `Memory` is volatile and private to one process; the other two are durable
/// and shared by every instance pointed at the same service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    /// Redis-style REST key-value API.
    Kv { url: String, token: String },
    Postgres { database_url: String },
}

impl StoreBackend {
    pub fn is_durable(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Backend selector as written in `STORE_BACKEND`, before connection
/// settings are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Kv,
    Postgres,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "kv" => Ok(Self::Kv),
            "postgres" => Ok(Self::Postgres),
            other => Err(anyhow::anyhow!("unknown store backend: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub store: StoreBackend,
    /// Base URL of the esp8266 board's own HTTP API, trailing `/` removed.
    /// Only the proxy routes need it, so a missing value is not a startup error.
    pub esp8266_base_url: Option<String>,
    /// Serve synthetic esp32 readings when the stored snapshot is missing or stale.
    pub demo_data: bool,
    /// Age in milliseconds after which a snapshot counts as stale.
    pub stale_after_ms: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let kind: BackendKind = optional("STORE_BACKEND", "memory").parse()?;
        let store = match kind {
            BackendKind::Memory => StoreBackend::Memory,
            BackendKind::Kv => StoreBackend::Kv {
                url: normalize_base_url(&required("KV_REST_URL")?)
                    .context("KV_REST_URL must not be empty")?,
                token: required("KV_REST_TOKEN")?,
            },
            BackendKind::Postgres => StoreBackend::Postgres {
                database_url: required("DATABASE_URL")?,
            },
        };

        let demo_default = if store.is_durable() { "true" } else { "false" };

        Ok(Self {
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            esp8266_base_url: std::env::var("ESP8266_BASE_URL")
                .ok()
                .and_then(|raw| normalize_base_url(&raw)),
            demo_data: parse_bool(&optional("DEMO_DATA", demo_default))
                .context("DEMO_DATA must be true or false")?,
            stale_after_ms: optional("STALE_AFTER_MS", "15000")
                .parse()
                .context("STALE_AFTER_MS must be an integer number of milliseconds")?,
            store,
        })
    }
}

/// Trim whitespace and one trailing `/`. Blank input means "not configured".
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("not a boolean: {other:?}")),
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
