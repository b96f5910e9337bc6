use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono_tz::Tz;
use tracing::warn;

pub const DEFAULT_API_BASE_URL: &str = "https://neuravos-x-brainware-university.onrender.com";
const DEFAULT_TIMEZONE: Tz = chrono_tz::UTC;
const DATA_DIR_NAME: &str = "neuravos";

/// Runtime configuration for the remote service and local storage.
///
/// Values come from `NEURAVOS_*` environment variables. Persisted settings
/// (see `SettingsService`) override the base URLs and timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub api_base_url: String,
    pub scam_api_base_url: String,
    pub analyze_timeout: StdDuration,
    pub chat_timeout: StdDuration,
    pub default_timeout: StdDuration,
    pub timezone: Tz,
    pub data_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            scam_api_base_url: DEFAULT_API_BASE_URL.to_string(),
            analyze_timeout: StdDuration::from_secs(300),
            chat_timeout: StdDuration::from_secs(30),
            default_timeout: StdDuration::from_secs(60),
            timezone: DEFAULT_TIMEZONE,
            data_dir: default_data_dir(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = env_non_empty("NEURAVOS_API_BASE_URL") {
            config.api_base_url = url.clone();
            config.scam_api_base_url = url;
        }
        if let Some(url) = env_non_empty("NEURAVOS_SCAM_API_BASE_URL") {
            config.scam_api_base_url = url;
        }
        if let Some(raw) = env_non_empty("NEURAVOS_TIMEZONE") {
            match Tz::from_str(&raw) {
                Ok(tz) => config.timezone = tz,
                Err(err) => warn!(
                    target: "app::config",
                    timezone = %raw,
                    error = %err,
                    "ignoring invalid timezone"
                ),
            }
        }
        if let Some(dir) = env_non_empty("NEURAVOS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url = url.clone();
        self.scam_api_base_url = url;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("neuravos.sqlite")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}
