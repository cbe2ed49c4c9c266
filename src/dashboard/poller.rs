use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tokio::time;
use tracing::{error, info, warn};

use crate::{
    board::models::{AlarmAction, AlarmResponse},
    config::normalize_base_url,
    control::Esp32ConfigPatch,
    devices::models::{Esp32Config, Esp32Snapshot, Esp8266Snapshot},
};

use super::trend::TrendBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Fetching,
}

/// Outcome of the most recent operator change (config patch or alarm toggle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Applied locally, server has not answered yet.
    Pending,
    /// Server answer is now the local value.
    Committed,
    /// Request failed; local value reverted to the last committed one.
    Failed,
}

pub struct DashboardPoller {
    http: Client,
    base_url: String,
    state: PollerState,
    esp32: Option<Esp32Snapshot>,
    esp8266: Option<Esp8266Snapshot>,
    temperature: TrendBuffer,
    humidity: TrendBuffer,
    config: Option<Esp32Config>,
    committed: Option<Esp32Config>,
    config_mutation: Option<MutationState>,
    alarm_mutation: Option<MutationState>,
}

async fn fetch_json<T: DeserializeOwned>(http: Client, url: String) -> Result<T> {
    http.get(&url)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned an error status"))?
        .json()
        .await
        .with_context(|| format!("GET {url} returned an unexpected body"))
}

impl DashboardPoller {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url).context("dashboard API URL must not be empty")?;
        Ok(Self {
            http: Client::new(),
            base_url,
            state: PollerState::Idle,
            esp32: None,
            esp8266: None,
            temperature: TrendBuffer::new(),
            humidity: TrendBuffer::new(),
            config: None,
            committed: None,
            config_mutation: None,
            alarm_mutation: None,
        })
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn esp32(&self) -> Option<&Esp32Snapshot> {
        self.esp32.as_ref()
    }

    pub fn esp8266(&self) -> Option<&Esp8266Snapshot> {
        self.esp8266.as_ref()
    }

    pub fn temperature(&self) -> &TrendBuffer {
        &self.temperature
    }

    pub fn humidity(&self) -> &TrendBuffer {
        &self.humidity
    }

    pub fn config(&self) -> Option<&Esp32Config> {
        self.config.as_ref()
    }

    pub fn config_mutation(&self) -> Option<MutationState> {
        self.config_mutation
    }

    pub fn alarm_mutation(&self) -> Option<MutationState> {
        self.alarm_mutation
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        fetch_json(self.http.clone(), self.url(path)).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} returned an error status"))?
            .json()
            .await
            .with_context(|| format!("POST {url} returned an unexpected body"))
    }

    /// One poll. Snapshots and trends change only if both fetches succeed.
    pub async fn tick(&mut self) -> Result<()> {
        self.state = PollerState::Fetching;
        let fetched = tokio::try_join!(
            self.get_json::<Esp32Snapshot>("/esp32/data"),
            self.get_json::<Esp8266Snapshot>("/esp8266/data"),
        );
        self.state = PollerState::Idle;

        let (esp32, esp8266) = fetched?;
        let now = Local::now();
        self.temperature.push_at(now, esp8266.temperature);
        self.humidity.push_at(now, esp8266.humidity);
        info!(
            water_level = esp32.water_level,
            pump_state = esp32.pump_state,
            temperature = esp8266.temperature,
            humidity = esp8266.humidity,
            alarm_state = esp8266.alarm_state,
            "Dashboard updated"
        );
        self.esp32 = Some(esp32);
        self.esp8266 = Some(esp8266);
        Ok(())
    }

    fn commit_config(&mut self, config: Esp32Config) {
        self.config = Some(config.clone());
        self.committed = Some(config);
    }

    pub async fn load_config(&mut self) -> Result<()> {
        let config = self.get_json("/esp32/config").await?;
        self.commit_config(config);
        Ok(())
    }

    fn apply_optimistic(&mut self, patch: &Esp32ConfigPatch) {
        let mut local = self.config.clone().unwrap_or_default();
        patch.clone().apply(&mut local);
        self.config = Some(local);
        self.config_mutation = Some(MutationState::Pending);
    }

    /// Apply `patch` locally, then reconcile with the server's echo. On
    /// failure the local config falls back to the last committed value.
    pub async fn patch_config(&mut self, patch: Esp32ConfigPatch) -> Result<()> {
        self.apply_optimistic(&patch);

        match self.post_json::<_, Esp32Config>("/esp32/config", &patch).await {
            Ok(config) => {
                self.commit_config(config);
                self.config_mutation = Some(MutationState::Committed);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Config patch failed; reverting");
                self.config = self.committed.clone();
                self.config_mutation = Some(MutationState::Failed);
                Err(e)
            }
        }
    }

    /// Flip the local alarm state and return the action to relay along with
    /// the snapshot to restore if the relay fails.
    fn begin_alarm_toggle(&mut self) -> (AlarmAction, Option<Esp8266Snapshot>) {
        let before = self.esp8266.clone();
        let action = match before.as_ref().map_or(0, |s| s.alarm_state) {
            1 => AlarmAction::AlarmOff,
            _ => AlarmAction::AlarmOn,
        };
        self.esp8266.get_or_insert_with(Default::default).alarm_state = action.alarm_state();
        self.alarm_mutation = Some(MutationState::Pending);
        (action, before)
    }

    /// Switch the esp8266 alarm to the opposite of its last known state
    /// through the backend's board proxy.
    pub async fn toggle_alarm(&mut self) -> Result<AlarmAction> {
        let (action, before) = self.begin_alarm_toggle();

        let relayed = self
            .post_json::<_, AlarmResponse>("/esp8266/proxy", &json!({ "action": action }))
            .await
            .and_then(|resp| {
                anyhow::ensure!(resp.success, "board proxy refused {action:?}");
                Ok(resp.action)
            });

        match relayed {
            Ok(confirmed) => {
                self.esp8266.get_or_insert_with(Default::default).alarm_state =
                    confirmed.alarm_state();
                self.alarm_mutation = Some(MutationState::Committed);
                info!(action = ?confirmed, "Alarm toggled");
                Ok(confirmed)
            }
            Err(e) => {
                warn!(error = %e, action = ?action, "Alarm toggle failed; reverting");
                self.esp8266 = before;
                self.alarm_mutation = Some(MutationState::Failed);
                Err(e)
            }
        }
    }

    /// Poll every `interval` until `shutdown` resolves, loading the config
    /// once in parallel so a slow config request never holds back the data
    /// polls. A poll still in flight at shutdown is dropped.
    pub async fn run_until<F>(&mut self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_ms = interval.as_millis() as u64, base_url = %self.base_url, "Dashboard poller started");

        let config_load = fetch_json::<Esp32Config>(self.http.clone(), self.url("/esp32/config"));
        tokio::pin!(config_load);
        let mut config_pending = true;

        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = &mut config_load, if config_pending => {
                    config_pending = false;
                    match result {
                        Ok(config) => self.commit_config(config),
                        Err(e) => error!(error = %e, "Failed to load esp32 config"),
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.tick() => {
                    if let Err(e) = result {
                        error!(error = %e, "Dashboard poll failed");
                    }
                }
            }
        }

        self.state = PollerState::Idle;
        info!("Dashboard poller stopped");
    }
}
