use std::str::FromStr;
use std::sync::RwLock;

use chrono_tz::Tz;
use reqwest::Url;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::db::repositories::settings_repository::{OverrideChange, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{AppSettings, SettingsUpdateInput};

const KEY_API_BASE_URL: &str = "api_base_url";
const KEY_SCAM_API_BASE_URL: &str = "scam_api_base_url";
const KEY_TIMEZONE: &str = "timezone";

/// User overrides layered on top of the environment configuration. An empty
/// string in an update removes the override.
pub struct SettingsService {
    db: DbPool,
    defaults: ServiceConfig,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool, defaults: ServiceConfig) -> Self {
        Self {
            db,
            defaults,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let api_base_url = normalize_override(input.api_base_url.as_deref(), ensure_valid_url)?;
        let scam_api_base_url =
            normalize_override(input.scam_api_base_url.as_deref(), ensure_valid_url)?;
        let timezone = normalize_override(input.timezone.as_deref(), ensure_valid_timezone)?;

        let changes: Vec<OverrideChange<'_>> = [
            (KEY_API_BASE_URL, &api_base_url),
            (KEY_SCAM_API_BASE_URL, &scam_api_base_url),
            (KEY_TIMEZONE, &timezone),
        ]
        .into_iter()
        .filter_map(|(key, change)| change.as_ref().map(|value| (key, value.as_deref())))
        .collect();

        self.db
            .with_connection_mut(|conn| SettingsRepository::apply_changes(conn, &changes))?;

        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }

        let settings = self.get()?;
        info!(
            target: "app::settings",
            api_base_url = %settings.api_base_url,
            timezone = %settings.timezone,
            "settings updated"
        );
        Ok(settings)
    }

    pub fn timezone(&self) -> AppResult<Tz> {
        let settings = self.get()?;
        Ok(Tz::from_str(&settings.timezone).unwrap_or(self.defaults.timezone))
    }

    /// Environment configuration with the stored overrides applied.
    pub fn effective_config(&self) -> AppResult<ServiceConfig> {
        let settings = self.get()?;
        let mut config = self.defaults.clone();
        config.api_base_url = settings.api_base_url;
        config.scam_api_base_url = settings.scam_api_base_url;
        config.timezone = Tz::from_str(&settings.timezone).unwrap_or(self.defaults.timezone);
        Ok(config)
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        let overrides = self.db.with_connection(SettingsRepository::load_overrides)?;

        let mut settings = AppSettings {
            api_base_url: self.defaults.api_base_url.clone(),
            scam_api_base_url: self.defaults.scam_api_base_url.clone(),
            timezone: self.defaults.timezone.name().to_string(),
        };

        for (key, value) in overrides {
            match key.as_str() {
                KEY_API_BASE_URL => settings.api_base_url = value,
                KEY_SCAM_API_BASE_URL => settings.scam_api_base_url = value,
                KEY_TIMEZONE => {
                    if Tz::from_str(&value).is_ok() {
                        settings.timezone = value;
                    } else {
                        warn!(
                            target: "app::settings",
                            timezone = %value,
                            "ignoring stored timezone that no longer parses"
                        );
                    }
                }
                _ => {}
            }
        }

        Ok(settings)
    }
}

/// `None` = untouched, `Some(None)` = remove override, `Some(Some(v))` = set.
fn normalize_override(
    value: Option<&str>,
    validate: fn(&str) -> AppResult<()>,
) -> AppResult<Option<Option<String>>> {
    match value.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(value) => {
            validate(value)?;
            Ok(Some(Some(value.to_string())))
        }
    }
}

fn ensure_valid_url(value: &str) -> AppResult<()> {
    let url = Url::parse(value)
        .map_err(|err| AppError::validation(format!("invalid URL '{value}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::validation("service URL must use http or https"));
    }
    Ok(())
}

fn ensure_valid_timezone(value: &str) -> AppResult<()> {
    Tz::from_str(value)
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("unknown timezone '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn service() -> (SettingsService, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("settings.sqlite")).expect("db pool");
        let defaults = ServiceConfig::default().with_base_url("https://env.example.com");
        (SettingsService::new(pool, defaults), dir)
    }

    #[test]
    fn defaults_come_from_environment_config() {
        let (service, _dir) = service();
        let settings = service.get().expect("settings");
        assert_eq!(settings.api_base_url, "https://env.example.com");
        assert_eq!(settings.timezone, "UTC");
    }

    #[test]
    fn overrides_apply_and_can_be_removed() {
        let (service, _dir) = service();
        service
            .update(SettingsUpdateInput {
                api_base_url: Some("https://override.example.com".into()),
                timezone: Some("Asia/Kolkata".into()),
                ..SettingsUpdateInput::default()
            })
            .expect("update");

        let config = service.effective_config().expect("config");
        assert_eq!(config.api_base_url, "https://override.example.com");
        assert_eq!(config.scam_api_base_url, "https://env.example.com");
        assert_eq!(config.timezone, chrono_tz::Asia::Kolkata);

        let settings = service
            .update(SettingsUpdateInput {
                api_base_url: Some("  ".into()),
                ..SettingsUpdateInput::default()
            })
            .expect("clear override");
        assert_eq!(settings.api_base_url, "https://env.example.com");
        assert_eq!(settings.timezone, "Asia/Kolkata");
    }

    #[test]
    fn rejects_bad_values_without_writing() {
        let (service, _dir) = service();
        let err = service
            .update(SettingsUpdateInput {
                timezone: Some("Mars/Olympus".into()),
                ..SettingsUpdateInput::default()
            })
            .expect_err("unknown timezone");
        assert!(matches!(err, AppError::Validation { .. }));

        assert!(service
            .update(SettingsUpdateInput {
                api_base_url: Some("ftp://files.example.com".into()),
                ..SettingsUpdateInput::default()
            })
            .is_err());
        assert_eq!(service.get().expect("settings").timezone, "UTC");
    }
}
