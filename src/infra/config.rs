// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::PomoError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Marks the session cookie `Secure` and sends HSTS.
    #[serde(default)]
    pub force_https: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            force_https: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Allowed session lengths in minutes.
    pub durations: Vec<u32>,
    pub default_duration: u32,
    /// Whether completion may raise a desktop/terminal notification.
    pub notifications: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            durations: vec![25, 50],
            default_duration: 25,
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(paths::db_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// `FORCE_HTTPS=true` switches on HTTPS-only cookies regardless of the file.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("FORCE_HTTPS") {
            self.server.force_https = v.eq_ignore_ascii_case("true");
        }
    }

    pub fn validate(&self) -> Result<(), PomoError> {
        let t = &self.timer;
        if t.durations.is_empty() {
            return Err(PomoError::Config("timer.durations must not be empty".into()));
        }
        if let Some(bad) = t.durations.iter().find(|d| !(1..=99).contains(*d)) {
            return Err(PomoError::Config(format!(
                "timer.durations: {bad} is outside 1..=99 minutes"
            )));
        }
        if !t.durations.contains(&t.default_duration) {
            return Err(PomoError::Config(format!(
                "timer.default_duration {} is not in timer.durations",
                t.default_duration
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.server.port, 5000);
        assert!(!c.server.force_https);
        assert_eq!(c.timer.durations, vec![25, 50]);
        assert_eq!(c.timer.default_duration, 25);
        assert!(c.timer.notifications);
        assert!(c.database.path.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.timer.default_duration, 25);
        assert_eq!(config.client.server_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080
force_https = true

[timer]
durations = [15, 25, 50]
default_duration = 15
notifications = false

[database]
path = "/tmp/pomo.db"

[client]
server_url = "https://pomo.example.com"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.force_https);
        assert_eq!(config.timer.durations, vec![15, 25, 50]);
        assert!(!config.timer.notifications);
        assert_eq!(
            config.database.resolved_path(),
            PathBuf::from("/tmp/pomo.db")
        );
        assert_eq!(config.client.server_url, "https://pomo.example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_default_outside_set() {
        let mut c = Config::default();
        c.timer.default_duration = 30;
        assert!(matches!(c.validate(), Err(PomoError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_and_out_of_range() {
        let mut c = Config::default();
        c.timer.durations.clear();
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.timer.durations = vec![25, 120];
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"127.0.0.1\"\nport = 6001").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 6001);
        assert_eq!(config.timer.durations, vec![25, 50]);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.timer.durations, config.timer.durations);
        assert_eq!(deserialized.server.port, config.server.port);
    }
}
