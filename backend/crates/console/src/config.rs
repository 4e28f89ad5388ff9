use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConsoleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Rest,
    Hosted,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(BackendKind::Rest),
            "hosted" => Ok(BackendKind::Hosted),
            other => Err(format!("unknown backend '{other}', expected 'rest' or 'hosted'")),
        }
    }
}

/// Which spelling of the REST routes the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestRoutes {
    #[default]
    Default,
    Legacy,
}

impl FromStr for RestRoutes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(RestRoutes::Default),
            "legacy" => Ok(RestRoutes::Legacy),
            other => Err(format!("unknown route variant '{other}', expected 'default' or 'legacy'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub backend: BackendKind,
    pub rest_base_url: String,
    pub rest_routes: RestRoutes,
    pub hosted_url: Option<String>,
    pub hosted_anon_key: Option<String>,
    pub session_path: PathBuf,
    pub session_poll_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialConsoleConfig {
    backend: Option<String>,
    rest_base_url: Option<String>,
    rest_routes: Option<String>,
    hosted_url: Option<String>,
    hosted_anon_key: Option<String>,
    session_path: Option<PathBuf>,
    session_poll_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    log_dir: Option<String>,
}

fn default_rest_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".promeconfig/session.json")
}

fn default_session_poll_secs() -> u64 {
    5
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Rest,
            rest_base_url: default_rest_base_url(),
            rest_routes: RestRoutes::Default,
            hosted_url: None,
            hosted_anon_key: None,
            session_path: default_session_path(),
            session_poll_secs: default_session_poll_secs(),
            request_timeout_secs: None,
            log_dir: default_log_dir(),
        }
    }
}

impl ConsoleConfig {
    pub fn rest(base_url: impl Into<String>, session_path: impl Into<PathBuf>) -> Self {
        Self {
            rest_base_url: base_url.into(),
            session_path: session_path.into(),
            ..Default::default()
        }
    }

    pub fn hosted(
        url: impl Into<String>,
        anon_key: impl Into<String>,
        session_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend: BackendKind::Hosted,
            hosted_url: Some(url.into()),
            hosted_anon_key: Some(anon_key.into()),
            session_path: session_path.into(),
            ..Default::default()
        }
    }

    pub fn session_poll_interval(&self) -> Duration {
        Duration::from_secs(self.session_poll_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    /// Loads `.env`, then the optional TOML file, then `PROMECONFIG_*`
    /// environment variables, which win over the file.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConsoleError> {
        dotenv::dotenv().ok();

        let file_config: PartialConsoleConfig = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| ConsoleError::Config(format!("Failed to read config file at {path:?}: {e}")))?;
                toml::from_str(&contents).map_err(|e| {
                    ConsoleError::Config(format!("Failed to parse TOML from config file at {path:?}: {e}"))
                })?
            }
            _ => PartialConsoleConfig::default(),
        };

        let env_config: PartialConsoleConfig = envy::prefixed("PROMECONFIG_")
            .from_env::<PartialConsoleConfig>()
            .map_err(|e| ConsoleError::Config(format!("Failed to load config from environment: {e}")))?;

        Self::merge(env_config, file_config)
    }

    fn merge(env: PartialConsoleConfig, file: PartialConsoleConfig) -> Result<Self, ConsoleError> {
        let backend = env
            .backend
            .or(file.backend)
            .map(|b| b.parse::<BackendKind>())
            .transpose()
            .map_err(ConsoleError::Config)?
            .unwrap_or_default();
        let rest_routes = env
            .rest_routes
            .or(file.rest_routes)
            .map(|r| r.parse::<RestRoutes>())
            .transpose()
            .map_err(ConsoleError::Config)?
            .unwrap_or_default();

        let config = ConsoleConfig {
            backend,
            rest_base_url: env.rest_base_url.or(file.rest_base_url).unwrap_or_else(default_rest_base_url),
            rest_routes,
            hosted_url: env.hosted_url.or(file.hosted_url),
            hosted_anon_key: env.hosted_anon_key.or(file.hosted_anon_key),
            session_path: env.session_path.or(file.session_path).unwrap_or_else(default_session_path),
            session_poll_secs: env.session_poll_secs.or(file.session_poll_secs)
                .unwrap_or_else(default_session_poll_secs),
            request_timeout_secs: env.request_timeout_secs.or(file.request_timeout_secs),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
        };

        if config.backend == BackendKind::Hosted
            && (config.hosted_url.is_none() || config.hosted_anon_key.is_none())
        {
            return Err(ConsoleError::Config(
                "the hosted backend needs both hosted_url and hosted_anon_key".to_string(),
            ));
        }
        Ok(config)
    }
}
