use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expires_hours")]
    pub jwt_expires_hours: i64,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    jwt_expires_hours: Option<i64>,
    log_dir: Option<String>,
    min_password_len: Option<usize>,
    bcrypt_cost: Option<u32>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://promeconfig.db?mode=rwc".to_string()
}

fn default_jwt_expires_hours() -> i64 {
    24
}

/// Longest token lifetime accepted from configuration: one year.
pub const MAX_JWT_EXPIRES_HOURS: i64 = 24 * 366;

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_min_password_len() -> usize {
    promeconfig_common::validation::MIN_PASSWORD_LEN
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl ServerConfig {
    /// Defaults for everything except the two values a deployment must pick.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_expires_hours: default_jwt_expires_hours(),
            log_dir: default_log_dir(),
            min_password_len: default_min_password_len(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match config_path.map(Path::new) {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(env: PartialServerConfig, file: PartialServerConfig) -> Result<Self, String> {
        let config = ServerConfig {
            listen_addr: env.listen_addr.or(file.listen_addr).unwrap_or_else(default_listen_addr),
            database_url: env.database_url.or(file.database_url).unwrap_or_else(default_database_url),
            jwt_secret: env.jwt_secret.or(file.jwt_secret)
                .filter(|s| !s.is_empty())
                .ok_or("JWT_SECRET is required")?,
            jwt_expires_hours: env.jwt_expires_hours.or(file.jwt_expires_hours)
                .unwrap_or_else(default_jwt_expires_hours),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            min_password_len: env.min_password_len.or(file.min_password_len)
                .unwrap_or_else(default_min_password_len),
            bcrypt_cost: env.bcrypt_cost.or(file.bcrypt_cost).unwrap_or_else(default_bcrypt_cost),
        };
        if !(4..=31).contains(&config.bcrypt_cost) {
            return Err(format!("BCRYPT_COST must be between 4 and 31, got {}", config.bcrypt_cost));
        }
        if !(1..=MAX_JWT_EXPIRES_HOURS).contains(&config.jwt_expires_hours) {
            return Err(format!(
                "JWT_EXPIRES_HOURS must be between 1 and {MAX_JWT_EXPIRES_HOURS}, got {}",
                config.jwt_expires_hours
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_file() {
        let file: PartialServerConfig = toml::from_str(
            r#"
            listen_addr = "127.0.0.1:9000"
            jwt_secret = "from-file"
            min_password_len = 10
            "#,
        )
        .unwrap();
        let env = PartialServerConfig {
            jwt_secret: Some("from-env".into()),
            ..Default::default()
        };

        let config = ServerConfig::merge(env, file).unwrap();
        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.min_password_len, 10);
        assert_eq!(config.jwt_expires_hours, 24);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = ServerConfig::merge(PartialServerConfig::default(), PartialServerConfig::default())
            .unwrap_err();
        assert!(err.contains("JWT_SECRET"));
    }

    #[test]
    fn token_lifetime_must_be_in_range() {
        for hours in [0, -5, MAX_JWT_EXPIRES_HOURS + 1, i64::MAX] {
            let env = PartialServerConfig {
                jwt_secret: Some("secret".into()),
                jwt_expires_hours: Some(hours),
                ..Default::default()
            };
            let err = ServerConfig::merge(env, PartialServerConfig::default()).unwrap_err();
            assert!(err.contains("JWT_EXPIRES_HOURS"), "{hours}: {err}");
        }

        let env = PartialServerConfig {
            jwt_secret: Some("secret".into()),
            jwt_expires_hours: Some(MAX_JWT_EXPIRES_HOURS),
            ..Default::default()
        };
        assert!(ServerConfig::merge(env, PartialServerConfig::default()).is_ok());
    }
}
