//! Simulated Prometheus API panel. Nothing is contacted: the connection test
//! and the reload wait for a fixed delay and report canned results.

use chrono::{DateTime, Utc};
use promeconfig_common::ValidationError;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";
pub const CONNECT_DELAY: Duration = Duration::from_millis(1500);
pub const RELOAD_DELAY: Duration = Duration::from_millis(2000);
/// How long a successful reload keeps showing "success".
pub const RELOAD_RESET_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub version: String,
    pub uptime: String,
    pub targets_active: u32,
    pub targets_total: u32,
    pub rules_loaded: u32,
    pub last_config_time: DateTime<Utc>,
}

impl StatusSnapshot {
    fn canned() -> Self {
        Self {
            version: "2.45.0".to_string(),
            uptime: "2h 15m".to_string(),
            targets_active: 8,
            targets_total: 10,
            rules_loaded: 15,
            last_config_time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiPanel {
    pub prometheus_url: String,
    connect_delay: Duration,
    reload_delay: Duration,
    reset_after: Duration,
    connection: ConnectionStatus,
    snapshot: Option<StatusSnapshot>,
    reload: ReloadStatus,
    last_reload: Option<DateTime<Utc>>,
}

impl Default for ApiPanel {
    fn default() -> Self {
        Self::with_delays(CONNECT_DELAY, RELOAD_DELAY, RELOAD_RESET_AFTER)
    }
}

impl ApiPanel {
    pub fn with_delays(connect_delay: Duration, reload_delay: Duration, reset_after: Duration) -> Self {
        Self {
            prometheus_url: DEFAULT_PROMETHEUS_URL.to_string(),
            connect_delay,
            reload_delay,
            reset_after,
            connection: ConnectionStatus::Idle,
            snapshot: None,
            reload: ReloadStatus::Idle,
            last_reload: None,
        }
    }

    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_reload(&self) -> Option<DateTime<Utc>> {
        self.last_reload
    }

    /// A success decays back to idle once `reset_after` has passed.
    pub fn reload_status(&self) -> ReloadStatus {
        match (self.reload, self.last_reload) {
            (ReloadStatus::Success, Some(at)) => {
                let elapsed = (Utc::now() - at).to_std().unwrap_or_default();
                if elapsed >= self.reset_after {
                    ReloadStatus::Idle
                } else {
                    ReloadStatus::Success
                }
            }
            (status, _) => status,
        }
    }

    /// Fails without waiting when the URL is not an http(s) address.
    pub async fn test_connection(&mut self) -> Result<&StatusSnapshot, ValidationError> {
        if let Err(e) = self.check_url() {
            self.connection = ConnectionStatus::Error(e.to_string());
            self.snapshot = None;
            return Err(e);
        }
        self.connection = ConnectionStatus::Connecting;
        info!(url = %self.prometheus_url, "Testing Prometheus connection (simulated).");
        tokio::time::sleep(self.connect_delay).await;
        self.connection = ConnectionStatus::Connected;
        Ok(self.snapshot.insert(StatusSnapshot::canned()))
    }

    pub async fn reload_configuration(&mut self) -> Result<DateTime<Utc>, ValidationError> {
        if let Err(e) = self.check_url() {
            self.reload = ReloadStatus::Error;
            return Err(e);
        }
        self.reload = ReloadStatus::Loading;
        info!(url = %self.prometheus_url, "Reloading Prometheus configuration (simulated).");
        tokio::time::sleep(self.reload_delay).await;
        let now = Utc::now();
        self.reload = ReloadStatus::Success;
        self.last_reload = Some(now);
        Ok(now)
    }

    fn check_url(&self) -> Result<(), ValidationError> {
        let url = self.prometheus_url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyField("prometheus url"));
        }
        let host = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .unwrap_or_default();
        if host.is_empty() {
            return Err(ValidationError::Invalid(format!("'{url}' is not an http(s) URL")));
        }
        Ok(())
    }
}
