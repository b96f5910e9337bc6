use serde::Deserialize;

use crate::models::settings::{AppSettings, SettingsUpdateInput};

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get()).await
}

/// Stores the overrides and re-points the HTTP client at them.
pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdatePayload,
) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    let input = payload.into_input();
    run_blocking(move || {
        let settings = app_state.settings().update(input)?;
        app_state.apply_settings()?;
        Ok(settings)
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub scam_api_base_url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Drops every stored override.
    #[serde(default)]
    pub reset: Option<bool>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        if self.reset == Some(true) {
            return SettingsUpdateInput {
                api_base_url: Some(String::new()),
                scam_api_base_url: Some(String::new()),
                timezone: Some(String::new()),
            };
        }

        SettingsUpdateInput {
            api_base_url: self.api_base_url,
            scam_api_base_url: self.scam_api_base_url,
            timezone: self.timezone,
        }
    }
}
