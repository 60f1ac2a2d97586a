use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

pub const BACKEND_URL_ENV_VAR: &str = "AGRINOVA_BACKEND_URL";
pub const ANON_KEY_ENV_VAR: &str = "AGRINOVA_ANON_KEY";
pub const SERVICE_ROLE_KEY_ENV_VAR: &str = "AGRINOVA_SERVICE_ROLE_KEY";
pub const WEATHER_API_KEY_ENV_VAR: &str = "AGRINOVA_WEATHER_API_KEY";

fn default_weather_api_url() -> String {
    "http://api.weatherapi.com/v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend_url: String,
    #[serde(default)]
    pub anon_key: String,
    // only needed to roll back identities after a failed signup
    #[serde(default)]
    pub service_role_key: Option<String>,
    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,
    #[serde(default)]
    pub weather_api_key: Option<String>,
    #[serde(default)]
    pub default_city: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub trust_invalid_server_cert: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            anon_key: String::new(),
            service_role_key: None,
            weather_api_url: default_weather_api_url(),
            weather_api_key: None,
            default_city: None,
            log_level: default_log_level(),
            cache_ttl_secs: default_cache_ttl(),
            request_timeout_secs: default_request_timeout(),
            trust_invalid_server_cert: false,
        }
    }
}

impl Config {
    pub fn config_dir() -> ClientResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ClientError::Config("Failed to get config directory".into()))?;
        Ok(config_dir.join("agrinova"))
    }

    pub fn config_file_path() -> ClientResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> ClientResult<Self> {
        let mut config = Self::load_from(&Self::config_file_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Reads the config at `path`, writing defaults there first if missing.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| ClientError::Config(format!("Failed to read config file: {e}")))?;
            let config: Config = serde_json::from_str(&contents)
                .map_err(|e| ClientError::Config(format!("Failed to parse config file: {e}")))?;
            Ok(config)
        } else {
            warn!("Config file not found, using defaults");
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> ClientResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                ClientError::Config(format!("Failed to create config directory: {e}"))
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .map_err(|e| ClientError::Config(format!("Failed to write config file: {e}")))?;

        info!("Config saved to: {:?}", path);
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(BACKEND_URL_ENV_VAR) {
            self.backend_url = url;
        }
        if let Some(key) = lookup(ANON_KEY_ENV_VAR) {
            self.anon_key = key;
        }
        if let Some(key) = lookup(SERVICE_ROLE_KEY_ENV_VAR) {
            self.service_role_key = Some(key);
        }
        if let Some(key) = lookup(WEATHER_API_KEY_ENV_VAR) {
            self.weather_api_key = Some(key);
        }
    }

    pub fn backend_url(&self) -> ClientResult<&str> {
        let url = self.backend_url.trim_end_matches('/');
        if url.is_empty() {
            return Err(ClientError::Config(format!(
                "backend_url not set. Edit the config file or set {BACKEND_URL_ENV_VAR}"
            )));
        }
        Ok(url)
    }

    pub fn session_file_path() -> ClientResult<PathBuf> {
        Ok(Self::config_dir()?.join("session.json"))
    }

    pub fn credentials_file_path() -> ClientResult<PathBuf> {
        Ok(Self::config_dir()?.join("credentials.json"))
    }
}
